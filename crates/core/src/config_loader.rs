use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};

use crate::config::AppConfig;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by merging defaults, a TOML file, `ADSIGHT_`
    /// environment variables, and a sibling JSON file.
    ///
    /// Missing files are skipped. Nested keys use `__` in environment
    /// variables, e.g. `ADSIGHT_VALIDATION__MIN_SAMPLE_SIZE=50`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be parsed or a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        Self::extract(Self::base(path), path)
    }

    /// Loads configuration with a profile overlay, `Config.<profile>.toml`
    /// next to the base file.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be parsed or a value is out of range.
    pub fn load_with_profile(path: impl AsRef<Path>, profile: &str) -> Result<AppConfig> {
        let path = path.as_ref();
        let overlay = path.with_file_name(format!("Config.{profile}.toml"));
        let figment = Self::base(path).merge(Toml::file(overlay));
        Self::extract(figment, path)
    }

    fn base(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file(path))
    }

    fn extract(figment: Figment, path: &Path) -> Result<AppConfig> {
        let config: AppConfig = figment
            .merge(Env::prefixed("ADSIGHT_").split("__"))
            .join(Json::file(path.with_extension("json")))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        config.validation.validate()?;
        Ok(config)
    }
}
