use anyhow::{Context, Result};

/// Server credentials loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<Config> {
    // Load `.env` file if present
    dotenv::dotenv().ok();
    // Read variables
    let base_url = std::env::var("BASE_URL").context("BASE_URL is not set")?;
    let username = std::env::var("USERNAME").context("USERNAME is not set")?;
    let password = std::env::var("PASSWORD").context("PASSWORD is not set")?;
    Ok(Config {
        base_url,
        username,
        password,
    })
}
