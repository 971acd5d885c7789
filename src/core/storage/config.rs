//! Config storage service

use std::fs;

use crate::core::models::AppConfig;
use crate::core::traits::StorageConfig;
use crate::error::AppResult;

/// Config storage service
pub struct ConfigStorage;

impl ConfigStorage {
    /// Load the app config, writing defaults when no file exists yet
    pub fn load<S: StorageConfig>(storage: &S) -> AppResult<AppConfig> {
        let config_path = storage.config_path();

        if !config_path.exists() {
            let default_config = AppConfig::default();
            Self::save(storage, &default_config)?;
            tracing::info!("Wrote default config to {:?}", config_path);
            return Ok(default_config);
        }

        let content = fs::read_to_string(&config_path)?;
        let config: AppConfig = serde_json::from_str(&content)?;

        Ok(config)
    }

    /// Save the app config
    pub fn save<S: StorageConfig>(storage: &S, config: &AppConfig) -> AppResult<()> {
        let config_path = storage.config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(config)?;

        // Write to a temp file first, then rename over the old one
        let temp_path = config_path.with_extension("json.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &config_path)?;

        Ok(())
    }
}
