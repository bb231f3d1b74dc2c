//! Configuration management for pollr.
//!
//! Loads configuration from ${POLLR_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding `[backend] url`.
pub const BACKEND_URL_ENV: &str = "POLLR_SUPABASE_URL";
/// Environment variable overriding `[backend] anon_key`.
pub const ANON_KEY_ENV: &str = "POLLR_SUPABASE_ANON_KEY";

/// Returns the default config template with comments.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments/sections from the template are always present,
/// while the user's customized values are preserved.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for pollr configuration and data directories.
    //!
    //! POLLR_HOME resolution order:
    //! 1. POLLR_HOME environment variable (if set)
    //! 2. ~/.config/pollr (default)

    use std::path::PathBuf;

    /// Returns the pollr home directory.
    ///
    /// Checks POLLR_HOME first, falls back to ~/.config/pollr and finally to
    /// a relative `.pollr` when no home directory can be determined.
    pub fn pollr_home() -> PathBuf {
        if let Ok(home) = std::env::var("POLLR_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".pollr"),
            |h| h.join(".config").join("pollr"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        pollr_home().join("config.toml")
    }

    /// Returns the path to the persisted auth session.
    pub fn session_path() -> PathBuf {
        pollr_home().join("session.json")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        pollr_home().join("logs")
    }
}

/// Backend project settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Public anon key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
}

/// Backend settings after env/config resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBackend {
    pub url: String,
    pub anon_key: String,
}

impl BackendConfig {
    /// Resolves URL and anon key with precedence: env > config.
    ///
    /// # Errors
    /// Returns an error if either value is missing or the URL is malformed.
    pub fn resolve(&self) -> Result<ResolvedBackend> {
        resolve_backend(
            std::env::var(BACKEND_URL_ENV).ok(),
            std::env::var(ANON_KEY_ENV).ok(),
            self,
        )
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn resolve_backend(
    env_url: Option<String>,
    env_key: Option<String>,
    config: &BackendConfig,
) -> Result<ResolvedBackend> {
    let url = non_blank(env_url.as_deref())
        .or_else(|| non_blank(config.url.as_deref()))
        .with_context(|| {
            format!("No backend URL configured. Set {BACKEND_URL_ENV} or url in [backend].")
        })?;
    url::Url::parse(&url).with_context(|| format!("Invalid backend URL: {url}"))?;

    let anon_key = non_blank(env_key.as_deref())
        .or_else(|| non_blank(config.anon_key.as_deref()))
        .with_context(|| {
            format!("No anon key configured. Set {ANON_KEY_ENV} or anon_key in [backend].")
        })?;

    Ok(ResolvedBackend {
        url: url.trim_end_matches('/').to_string(),
        anon_key,
    })
}

/// Session handling options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Refresh tokens in the background while active
    pub auto_refresh: bool,
    /// Seconds before expiry at which a token counts as stale
    pub refresh_margin_secs: u64,
    /// Background refresher tick
    pub tick_secs: u64,
    /// Redirect link for password reset emails
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_reset_redirect: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            refresh_margin_secs: 90,
            tick_secs: 30,
            password_reset_redirect: None,
        }
    }
}

impl AuthConfig {
    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }

    /// Tick interval, never shorter than one second.
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs.max(1))
    }
}

/// Logging options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Saves the backend URL and anon key to the config file.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_backend(url: &str, anon_key: &str) -> Result<()> {
        Self::save_backend_to(&paths::config_path(), url, anon_key)
    }

    /// Saves the `[backend]` fields to a specific config file path.
    ///
    /// Creates the file with the default template if it doesn't exist.
    /// If the file exists, merges user values into the latest template.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_backend_to(path: &Path, url: &str, anon_key: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        url::Url::parse(url).with_context(|| format!("Invalid backend URL: {url}"))?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["backend"]["url"] = value(url.trim_end_matches('/'));
        doc["backend"]["anon_key"] = value(anon_key);

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Uses the embedded template for structure/comments and merges
    /// generated values from `Config::default()` into it.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn generate() -> Result<String> {
        let generated_toml = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;
        merge_with_template(&generated_toml)
    }

    /// Writes config content through a temp file + rename, creating parent
    /// directories as needed.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();
        assert!(config.backend.url.is_none());
        assert!(config.auth.auto_refresh);
        assert_eq!(config.auth.refresh_margin_secs, 90);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[backend]\nurl = \"https://demo.supabase.co\"\n[auth]\ntick_secs = 5\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(
            config.backend.url.as_deref(),
            Some("https://demo.supabase.co")
        );
        assert_eq!(config.auth.tick_secs, 5);
        assert_eq!(config.auth.refresh_margin_secs, 90);
        assert!(!config.log.file);
    }

    #[test]
    fn test_init_creates_config_from_template() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("[backend]"));
        assert!(contents.contains("# url ="));
        assert!(contents.contains("refresh_margin_secs = 90"));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_save_backend_preserves_other_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[log]\nlevel = \"debug\"\n").unwrap();

        Config::save_backend_to(&config_path, "https://demo.supabase.co/", "anon-123").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(
            config.backend.url.as_deref(),
            Some("https://demo.supabase.co")
        );
        assert_eq!(config.backend.anon_key.as_deref(), Some("anon-123"));
        assert_eq!(config.log.level, "debug");

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Refresh the access token"));
    }

    #[test]
    fn test_save_backend_rejects_bad_url() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        assert!(Config::save_backend_to(&config_path, "not a url", "k").is_err());
        assert!(!config_path.exists());
    }

    #[test]
    fn test_generate_contains_defaults() {
        let toml = Config::generate().unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.auth.tick_secs, 30);
        assert!(toml.contains("# Also write a daily log file"));
    }

    #[test]
    fn test_resolve_backend_env_wins() {
        let config = BackendConfig {
            url: Some("https://config.example.com".to_string()),
            anon_key: Some("config-key".to_string()),
        };
        let resolved = resolve_backend(
            Some("https://env.example.com/".to_string()),
            None,
            &config,
        )
        .unwrap();
        assert_eq!(resolved.url, "https://env.example.com");
        assert_eq!(resolved.anon_key, "config-key");
    }

    #[test]
    fn test_resolve_backend_blank_env_falls_back() {
        let config = BackendConfig {
            url: Some("https://config.example.com".to_string()),
            anon_key: Some("config-key".to_string()),
        };
        let resolved =
            resolve_backend(Some("  ".to_string()), Some(String::new()), &config).unwrap();
        assert_eq!(resolved.url, "https://config.example.com");
    }

    #[test]
    fn test_resolve_backend_missing_values() {
        let err = resolve_backend(None, None, &BackendConfig::default()).unwrap_err();
        assert!(err.to_string().contains(BACKEND_URL_ENV));

        let config = BackendConfig {
            url: Some("https://config.example.com".to_string()),
            anon_key: None,
        };
        let err = resolve_backend(None, None, &config).unwrap_err();
        assert!(err.to_string().contains(ANON_KEY_ENV));
    }

    #[test]
    fn test_tick_never_zero() {
        let auth = AuthConfig {
            tick_secs: 0,
            ..Default::default()
        };
        assert_eq!(auth.tick(), Duration::from_secs(1));
    }
}
