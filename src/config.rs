use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::models::MimeClass;
use crate::notifications::ToastPosition;

/// 750 MB, shared by images and videos unless configured otherwise
pub const DEFAULT_MEDIA_SIZE_LIMIT_BYTES: u64 = 750_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app_name: String,
    pub video_size_limit_bytes: u64,
    pub image_size_limit_bytes: u64,
    pub max_concurrent_uploads: usize,
    pub selection_limit: usize,
    pub notification_visibility_ms: u64,
    pub notification_position: ToastPosition,
    pub upload_endpoint: Option<String>,
    pub reachability_url: Option<String>,
    pub request_timeout_secs: u64,
    /// Server error code treated as "nothing to report"
    pub silent_error_code: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Media Uploader".to_string(),
            video_size_limit_bytes: DEFAULT_MEDIA_SIZE_LIMIT_BYTES,
            image_size_limit_bytes: DEFAULT_MEDIA_SIZE_LIMIT_BYTES,
            max_concurrent_uploads: 1,
            selection_limit: 1,
            notification_visibility_ms: 5000,
            notification_position: ToastPosition::Bottom,
            upload_endpoint: None,
            reachability_url: None,
            request_timeout_secs: 120,
            silent_error_code: Some("DATA_NOT_FOUND".to_string()),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn size_limit_for(&self, class: MimeClass) -> u64 {
        match class {
            MimeClass::Image => self.image_size_limit_bytes,
            MimeClass::Video => self.video_size_limit_bytes,
        }
    }

    pub fn notification_visibility(&self) -> Duration {
        Duration::from_millis(self.notification_visibility_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Endpoint used for connectivity checks, falling back to the upload endpoint.
    pub fn reachability_target(&self) -> Option<&str> {
        self.reachability_url
            .as_deref()
            .or(self.upload_endpoint.as_deref())
    }
}

fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("Media Uploader");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

pub fn load_config() -> AppResult<Config> {
    let config_path = get_config_path()?;

    if config_path.exists() {
        load_config_from(&config_path)
    } else {
        let default_config = Config::default();
        save_config_to(&config_path, &default_config)?;
        Ok(default_config)
    }
}

pub fn load_config_from(config_path: &Path) -> AppResult<Config> {
    let config_str = fs::read_to_string(config_path)?;
    let config: Config = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        log::warn!(
            "Failed to parse config file {}: {}. Using defaults.",
            config_path.display(),
            e
        );
        Config::default()
    });

    validate_config(&config)?;
    Ok(config)
}

pub fn save_config(config: &Config) -> AppResult<()> {
    validate_config(config)?;
    save_config_to(&get_config_path()?, config)
}

pub fn save_config_to(config_path: &Path, config: &Config) -> AppResult<()> {
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(config_path, config_str)?;

    log::info!("Configuration saved to {}", config_path.display());
    Ok(())
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    if config.video_size_limit_bytes == 0 {
        return Err(AppError::validation("video_size_limit_bytes", "Must be greater than 0"));
    }

    if config.image_size_limit_bytes == 0 {
        return Err(AppError::validation("image_size_limit_bytes", "Must be greater than 0"));
    }

    if config.max_concurrent_uploads == 0 || config.max_concurrent_uploads > 8 {
        return Err(AppError::validation("max_concurrent_uploads", "Must be between 1 and 8"));
    }

    if config.selection_limit == 0 {
        return Err(AppError::validation("selection_limit", "Must be greater than 0"));
    }

    if config.notification_visibility_ms < 500 {
        return Err(AppError::validation("notification_visibility_ms", "Must be at least 500ms"));
    }

    if config.request_timeout_secs == 0 {
        return Err(AppError::validation("request_timeout_secs", "Must be greater than 0"));
    }

    for (field, url) in [
        ("upload_endpoint", &config.upload_endpoint),
        ("reachability_url", &config.reachability_url),
    ] {
        if let Some(url) = url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(AppError::validation(field, "Must be an http(s) URL"));
            }
        }
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}

// Reset configuration to defaults
pub fn reset_config() -> AppResult<()> {
    let config_path = get_config_path()?;

    if config_path.exists() {
        let backup_path = config_path.with_extension("json.reset_backup");
        fs::copy(&config_path, &backup_path)?;
        log::info!("Existing config backed up to {}", backup_path.display());
    }

    save_config_to(&config_path, &Config::default())?;

    log::info!("Configuration reset to defaults");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.max_concurrent_uploads, 1);
        assert_eq!(config.size_limit_for(MimeClass::Image), 750_000_000);
        assert_eq!(config.size_limit_for(MimeClass::Video), 750_000_000);
    }

    #[test]
    fn test_validate_config_rejects_bad_values() {
        let mut config = Config::default();
        config.max_concurrent_uploads = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.upload_endpoint = Some("ftp://example.com".to_string());
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_reachability_target_falls_back_to_endpoint() {
        let mut config = Config::default();
        assert_eq!(config.reachability_target(), None);

        config.upload_endpoint = Some("https://example.com/upload".to_string());
        assert_eq!(config.reachability_target(), Some("https://example.com/upload"));

        config.reachability_url = Some("https://example.com/ping".to_string());
        assert_eq!(config.reachability_target(), Some("https://example.com/ping"));
    }

    #[test]
    fn test_save_and_load_round_trip_with_backup() {
        let dir = std::env::temp_dir().join(format!("media_uploader_cfg_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = Config::default();
        config.selection_limit = 5;
        save_config_to(&path, &config).unwrap();
        save_config_to(&path, &config).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(path.with_extension("json.bak").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = std::env::temp_dir().join(format!("media_uploader_cfg_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, r#"{ "max_concurrent_uploads": 3 }"#).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.max_concurrent_uploads, 3);
        assert_eq!(loaded.selection_limit, 1);

        let _ = fs::remove_dir_all(&dir);
    }
}
