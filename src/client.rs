//! Minimal OpenSubsonic client used to pull a track catalog for the CLI.

use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use ureq::Agent;
use urlencoding::encode;

use crate::config::SubsonicConfig;
use crate::models::Track;

/// Song as returned by getRandomSongs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubsonicSong {
    id: String,
    title: String,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    genre: Option<String>,
    #[serde(default)]
    bpm: Option<u32>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    cover_art: Option<String>,
}

impl SubsonicSong {
    /// Songs without a duration cannot be placed in a set
    fn into_track(self) -> Option<Track> {
        let duration_secs = self.duration.filter(|d| *d > 0)?;
        Some(Track {
            id: self.id,
            title: self.title,
            artist: self.artist.unwrap_or_else(|| "Unknown".to_string()),
            duration_secs,
            // servers report 0 when the tag is missing
            bpm: self.bpm.filter(|b| *b > 0),
            energy: None,
            key: None,
            genre: self.genre,
            thumbnail: self.cover_art,
            ai_reasoning: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RandomSongsResponse {
    #[serde(rename = "subsonic-response")]
    subsonic_response: SubsonicResponse,
}

#[derive(Debug, Deserialize)]
struct SubsonicResponse {
    status: String,
    #[serde(rename = "randomSongs")]
    random_songs: Option<RandomSongs>,
}

#[derive(Debug, Deserialize)]
struct RandomSongs {
    #[serde(default)]
    song: Vec<SubsonicSong>,
}

/// A simple Subsonic API client using salt + token authentication
pub struct SubsonicClient {
    agent: Agent,
    base_url: String,
    username: String,
    password: String,
}

impl SubsonicClient {
    pub fn new(config: SubsonicConfig) -> Self {
        SubsonicClient {
            agent: Agent::new(),
            base_url: config.base_url,
            username: config.username,
            password: config.password,
        }
    }

    /// Generate authentication parameters: a random salt and md5(password + salt)
    fn generate_auth_params(&self) -> (String, String) {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let salt = format!("{:x}", md5::compute(format!("{nanos}setforge")))[..8].to_string();
        let token = format!("{:x}", md5::compute(format!("{}{}", self.password, salt)));
        (salt, token)
    }

    fn endpoint(&self, method: &str, extra: &str) -> String {
        let (salt, token) = self.generate_auth_params();
        format!(
            "{}/rest/{}?u={}&t={}&s={}&v=1.16.1&c=setforge&f=json{}",
            self.base_url.trim_end_matches('/'),
            method,
            encode(&self.username),
            token,
            salt,
            extra
        )
    }

    /// Test the API connection
    pub fn ping(&self) -> Result<()> {
        let response = self
            .agent
            .get(&self.endpoint("ping", ""))
            .call()
            .map_err(|e| anyhow!("Ping failed: {}", e))?;
        let body = response.into_string()?;
        if body.contains("\"status\":\"failed\"") {
            return Err(anyhow!("Server rejected credentials"));
        }
        Ok(())
    }

    /// Fetch `count` random tracks, batching requests of at most 500 and
    /// de-duplicating by id
    pub fn fetch_tracks(&self, count: usize) -> Result<Vec<Track>> {
        const MAX_PER_REQUEST: usize = 500;
        const MAX_ATTEMPTS: usize = 20;

        let mut tracks = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut attempts = 0;

        while tracks.len() < count && attempts < MAX_ATTEMPTS {
            attempts += 1;
            let batch = self.fetch_batch(MAX_PER_REQUEST.min(count))?;
            let batch_size = batch.len();
            let before = tracks.len();

            for track in batch {
                if tracks.len() >= count {
                    break;
                }
                if seen_ids.insert(track.id.clone()) {
                    tracks.push(track);
                }
            }

            let added = tracks.len() - before;
            debug!(attempts, batch_size, added, total = tracks.len(), "Fetched batch");
            if added == 0 {
                warn!("No new tracks in batch, library is probably smaller than requested");
                break;
            }
        }

        info!(fetched = tracks.len(), requested = count, "Catalog fetched");
        Ok(tracks)
    }

    fn fetch_batch(&self, size: usize) -> Result<Vec<Track>> {
        let url = self.endpoint("getRandomSongs", &format!("&size={size}"));
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;
        let body = response.into_string()?;

        let parsed: RandomSongsResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;
        if parsed.subsonic_response.status != "ok" {
            return Err(anyhow!(
                "API returned error status: {}",
                parsed.subsonic_response.status
            ));
        }

        Ok(parsed
            .subsonic_response
            .random_songs
            .map(|r| r.song.into_iter().filter_map(SubsonicSong::into_track).collect())
            .unwrap_or_default())
    }
}
