use anyhow::{Result, anyhow};

use crate::credits::Tier;

/// OpenSubsonic connection settings
#[derive(Debug, Clone)]
pub struct SubsonicConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Present only when BASE_URL, USERNAME and PASSWORD are all set
    pub subsonic: Option<SubsonicConfig>,
    pub tier: Tier,
    pub credits: u32,
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<AppConfig> {
    // Load `.env` file if present
    dotenv::dotenv().ok();

    let subsonic = match (
        std::env::var("BASE_URL"),
        std::env::var("USERNAME"),
        std::env::var("PASSWORD"),
    ) {
        (Ok(base_url), Ok(username), Ok(password)) => Some(SubsonicConfig {
            base_url,
            username,
            password,
        }),
        _ => None,
    };

    let tier: Tier = std::env::var("SETFORGE_TIER")
        .unwrap_or_else(|_| "pro".to_string())
        .parse()?;

    let credits = match std::env::var("SETFORGE_CREDITS") {
        Ok(value) => value
            .parse()
            .map_err(|e| anyhow!("SETFORGE_CREDITS must be a number: {}", e))?,
        Err(_) => tier.monthly_credits(),
    };

    Ok(AppConfig {
        subsonic,
        tier,
        credits,
    })
}
