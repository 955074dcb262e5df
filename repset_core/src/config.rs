//! Configuration file support for Repset.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/repset/config.toml`.

use crate::{Error, Exercise, ExercisePrescription, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub profile: ProfileConfig,

    #[serde(default)]
    pub composer: ComposerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Who is using this installation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
        }
    }
}

/// Defaults applied when an exercise is added to a template
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComposerConfig {
    #[serde(default = "default_sets")]
    pub sets: u32,

    #[serde(default = "default_reps")]
    pub reps: String,

    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            sets: default_sets(),
            reps: default_reps(),
            rest_seconds: default_rest_seconds(),
        }
    }
}

impl ComposerConfig {
    /// Prescription used for newly added exercises
    pub fn prescription(&self) -> ExercisePrescription {
        ExercisePrescription {
            sets: Some(self.sets),
            reps: Some(self.reps.clone()),
            duration_seconds: None,
            rest_seconds: Some(self.rest_seconds),
            notes: None,
        }
    }
}

/// Session runner parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_rest_extend_seconds")]
    pub rest_extend_seconds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rest_extend_seconds: default_rest_extend_seconds(),
        }
    }
}

/// Extra exercises merged into the built-in catalog
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub custom: Vec<Exercise>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from(".local/share"))
    });
    base.join("repset")
}

fn default_user_id() -> String {
    "local".into()
}

fn default_sets() -> u32 {
    3
}

fn default_reps() -> String {
    "10".into()
}

fn default_rest_seconds() -> u32 {
    60
}

fn default_rest_extend_seconds() -> u32 {
    15
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the composer and runner cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.profile.user_id.trim().is_empty() {
            return Err(Error::Config("profile.user_id must not be empty".into()));
        }
        if self.composer.sets == 0 {
            return Err(Error::Config("composer.sets must be at least 1".into()));
        }
        if self.session.rest_extend_seconds == 0 {
            return Err(Error::Config(
                "session.rest_extend_seconds must be at least 1".into(),
            ));
        }
        for exercise in &self.catalog.custom {
            Exercise::new(exercise.id.clone(), exercise.name.clone())
                .map_err(|e| Error::Config(format!("catalog.custom: {}", e)))?;
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from(".config"))
        });
        base.join("repset").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.profile.user_id, "local");
        assert_eq!(config.composer.sets, 3);
        assert_eq!(config.composer.reps, "10");
        assert_eq!(config.composer.rest_seconds, 60);
        assert_eq!(config.session.rest_extend_seconds, 15);
        assert!(config.catalog.custom.is_empty());
    }

    #[test]
    fn test_default_prescription_matches_composer_defaults() {
        let config = Config::default();
        assert_eq!(config.composer.prescription(), ExercisePrescription::default());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.profile.user_id = "coach_ana".into();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.profile.user_id, "coach_ana");
        assert_eq!(loaded.composer.rest_seconds, config.composer.rest_seconds);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[session]
rest_extend_seconds = 30

[[catalog.custom]]
id = "sled_push"
name = "Sled Push"
equipment = ["sled"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.rest_extend_seconds, 30);
        assert_eq!(config.composer.sets, 3); // default
        assert_eq!(config.catalog.custom.len(), 1);
        assert!(config.catalog.custom[0].active);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[composer]\nsets = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
