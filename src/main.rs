use anyhow::{Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use setforge::Error;
use setforge::client::SubsonicClient;
use setforge::config::load_config;
use setforge::credits::InMemoryLedger;
use setforge::playlist::{
    BpmRange, Constraints, EnergyArc, EngineConfig, SegmentDuration, SetOrchestrator, SetSession,
    TransitionScore,
};
use setforge::provider::CatalogProvider;

/// Identity used for the local ledger
const CLI_IDENTITY: &str = "cli";

#[derive(Parser)]
#[command(name = "setforge")]
#[command(about = "Build a DJ set from a prompt and regenerate parts of it")]
#[command(version)]
struct Args {
    /// What the set should feel like
    prompt: String,

    /// JSON catalog of tracks; falls back to the OpenSubsonic server from .env
    #[arg(long = "catalog")]
    catalog: Option<String>,

    /// Engine configuration JSON file
    #[arg(short = 'c', long = "config")]
    config_file: Option<String>,

    #[arg(long = "bpm-min", requires = "bpm_max")]
    bpm_min: Option<u32>,

    #[arg(long = "bpm-max", requires = "bpm_min")]
    bpm_max: Option<u32>,

    /// Energy arc: steady, warm-up, peak, cool-down, wave
    #[arg(long = "arc", default_value = "steady")]
    arc: EnergyArc,

    /// Genre tags (repeatable)
    #[arg(short = 'g', long = "genre")]
    genres: Vec<String>,

    #[arg(long = "minutes")]
    minutes: Option<u32>,

    #[arg(short = 'n', long = "tracks")]
    tracks: Option<usize>,

    /// Split the set into segments by track count, e.g. "4,4,2"
    #[arg(long = "segments", value_delimiter = ',')]
    segments: Vec<u32>,

    /// Regenerate the segment at this 1-based position after generating
    #[arg(long = "regenerate-segment")]
    regenerate_segment: Option<usize>,

    /// Seed for reproducible catalog picks
    #[arg(long = "seed")]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("setforge=info")),
        )
        .init();

    let args = Args::parse();
    let app_config = load_config()?;
    let engine_config = match &args.config_file {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };

    let catalog = match (&args.catalog, &app_config.subsonic) {
        (Some(path), _) => CatalogProvider::load_catalog(path)?,
        (None, Some(subsonic)) => {
            let client = SubsonicClient::new(subsonic.clone());
            println!("Testing API connection...");
            client.ping()?;
            println!("✓ API connection successful");
            client.fetch_tracks(2000)?
        }
        (None, None) => {
            return Err(anyhow!(
                "No catalog: pass --catalog or set BASE_URL, USERNAME and PASSWORD"
            ));
        }
    };
    println!("Catalog holds {} tracks", catalog.len());

    let provider = match args.seed {
        Some(seed) => CatalogProvider::with_seed(catalog, seed),
        None => CatalogProvider::new(catalog),
    };
    let ledger = InMemoryLedger::new(app_config.tier);
    ledger.set_balance(CLI_IDENTITY, app_config.tier, app_config.credits);
    let orchestrator = SetOrchestrator::new(provider, ledger, engine_config);

    let constraints = Constraints {
        prompt: args.prompt.clone(),
        bpm_range: args
            .bpm_min
            .zip(args.bpm_max)
            .map(|(min_bpm, max_bpm)| BpmRange { min_bpm, max_bpm }),
        energy_arc: args.arc,
        genres: args.genres.clone(),
        moods: Vec::new(),
        target_duration_minutes: args.minutes,
        track_count: args.tracks,
    };

    let set = match orchestrator.generate(CLI_IDENTITY, constraints) {
        Ok(set) => set,
        Err(Error::InsufficientCredits(reason)) => {
            eprintln!("Out of credits ({reason}). Upgrade your plan to keep generating.");
            return Err(anyhow!("insufficient credits"));
        }
        Err(e) => return Err(e.into()),
    };

    if !args.segments.is_empty() {
        let parts = args
            .segments
            .iter()
            .enumerate()
            .map(|(i, count)| {
                (
                    Some(format!("Part {}", i + 1)),
                    SegmentDuration::Tracks { count: *count },
                )
            })
            .collect();
        orchestrator.split_into_segments(&set, parts)?;
    }

    print_set(&set);

    if let Some(position) = args.regenerate_segment {
        let segment = set
            .segments()
            .into_iter()
            .find(|d| d.position + 1 == position)
            .ok_or_else(|| anyhow!("No segment at position {}", position))?;
        println!("\nRegenerating segment '{}'...", segment.segment.name);
        let replaced = orchestrator.regenerate_segment(&set, &segment.segment.id)?;
        println!(
            "✓ Replaced {} tracks ({} locked kept, {} unfilled)",
            replaced.replaced.len(),
            replaced.kept_locked.len(),
            replaced.unfilled.len()
        );
        print_set(&set);
    }

    let check = orchestrator.gate().check(CLI_IDENTITY);
    println!(
        "\nCredits remaining: {} ({:?} tier, resets {})",
        check.credits_remaining,
        check.tier,
        check.reset_at.format("%Y-%m-%d")
    );

    Ok(())
}

fn print_set(set: &SetSession) {
    let sequence = set.sequence();
    let metadata = set.metadata();

    println!("\n{}", set.name());
    println!("{}", "=".repeat(set.name().len()));
    println!(
        "Tracks: {} | Duration: {}m{}s | Avg BPM: {} | Artists: {}",
        metadata.total_tracks,
        metadata.total_duration_secs / 60,
        metadata.total_duration_secs % 60,
        metadata
            .average_bpm
            .map(|b| format!("{b:.1}"))
            .unwrap_or_else(|| "n/a".to_string()),
        metadata.artist_count
    );
    println!(
        "Transitions: {} smooth, {} ok, {} jarring | Flow: {:.2} | Arc fit: {} | Artist diversity: {:.2}",
        metadata.transitions.smooth,
        metadata.transitions.ok,
        metadata.transitions.jarring,
        metadata.flow_score,
        metadata
            .arc_fit
            .map(|f| format!("{f:.2}"))
            .unwrap_or_else(|| "n/a".to_string()),
        metadata.artist_diversity
    );

    let segments = set.segments();
    for (i, node) in sequence.nodes().iter().enumerate() {
        if let Some(segment) = segments.iter().find(|d| d.range.start == i && !d.range.is_empty()) {
            println!("  -- {} ({}) --", segment.segment.name, segment.segment.color);
        }
        let track = &node.track;
        let transition = match node.transition_to_next().map(|t| t.score()) {
            Some(TransitionScore::Smooth) => " →smooth",
            Some(TransitionScore::Ok) => " →ok",
            Some(TransitionScore::Jarring) => " →jarring",
            None => "",
        };
        println!(
            "  {:>2}. \"{}\" by {} [{}bpm, energy {}] {}:{:02}{}{}",
            i + 1,
            track.title,
            track.artist,
            track.bpm.map(|b| b.to_string()).unwrap_or_else(|| "?".to_string()),
            track.energy.map(|e| e.to_string()).unwrap_or_else(|| "?".to_string()),
            track.duration_secs / 60,
            track.duration_secs % 60,
            if node.is_locked { " 🔒" } else { "" },
            transition
        );
    }
}
