//! Config command handlers.

use anyhow::{Context, Result};
use pollr_core::config;

pub fn path() -> Result<()> {
    println!("{}", config::paths::config_path().display());
    Ok(())
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn generate() -> Result<()> {
    let toml = config::Config::generate()?;
    print!("{toml}");
    Ok(())
}

pub fn set_backend(url: &str, anon_key: &str) -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::save_backend(url, anon_key)
        .with_context(|| format!("save backend settings to {}", config_path.display()))?;
    println!("✓ Backend set to {}", url.trim_end_matches('/'));
    println!("  Saved to: {}", config_path.display());
    Ok(())
}
