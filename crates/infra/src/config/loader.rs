//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `FEIRA_BACKEND_URL`: Base URL of the hosted backend project
//! - `FEIRA_BACKEND_ANON_KEY`: Anonymous API key
//! - `FEIRA_RETRY_MAX_ATTEMPTS`: Attempt budget for remote calls (optional)
//! - `FEIRA_RETRY_INITIAL_DELAY_MS`: Delay before the first retry (optional)
//! - `FEIRA_RETRY_MAX_DELAY_MS`: Backoff delay cap (optional)
//! - `FEIRA_RETRY_BACKOFF_MULTIPLIER`: Delay growth factor (optional)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./feira.json` or `./feira.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use feira_domain::{BackendConfig, Config, FeiraError, Result, RetrySettings};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `FeiraError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// The backend URL and key are required; retry knobs keep their defaults
/// when unset.
///
/// # Errors
/// Returns `FeiraError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<Config> {
    let url = env_var("FEIRA_BACKEND_URL")?;
    let anon_key = env_var("FEIRA_BACKEND_ANON_KEY")?;

    let defaults = RetrySettings::default();
    let retry = RetrySettings {
        max_attempts: env_parse("FEIRA_RETRY_MAX_ATTEMPTS", defaults.max_attempts)?,
        initial_delay_ms: env_parse("FEIRA_RETRY_INITIAL_DELAY_MS", defaults.initial_delay_ms)?,
        max_delay_ms: env_parse("FEIRA_RETRY_MAX_DELAY_MS", defaults.max_delay_ms)?,
        backoff_multiplier: env_parse(
            "FEIRA_RETRY_BACKOFF_MULTIPLIER",
            defaults.backoff_multiplier,
        )?,
    };

    Ok(Config { backend: BackendConfig { url, anon_key }, retry })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `FeiraError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FeiraError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FeiraError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FeiraError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FeiraError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FeiraError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(FeiraError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    // Try current working directory
    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("feira.json"),
            cwd.join("feira.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
        ]);
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("feira.json"),
                exe_dir.join("feira.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| FeiraError::Config(format!("Missing required environment variable: {}", key)))
}

/// Parse an optional environment variable, keeping `default` when unset.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| FeiraError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn parses_json_config() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"backend": {{"url": "https://xyz.supabase.co", "anon_key": "anon"}}}}"#
        )
        .unwrap();

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.backend.url, "https://xyz.supabase.co");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn parses_toml_config_with_retry_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            "[backend]\nurl = \"https://xyz.supabase.co\"\nanon_key = \"anon\"\n\n\
             [retry]\nmax_attempts = 5\ninitial_delay_ms = 250\nmax_delay_ms = 4000\n\
             backoff_multiplier = 1.5\n"
        )
        .unwrap();

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 250);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/feira.json")));
        assert!(matches!(result, Err(FeiraError::Config(_))));
    }

    #[test]
    fn rejects_unknown_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "backend: {{}}").unwrap();
        let result = load_from_file(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(FeiraError::Config(_))));
    }
}
