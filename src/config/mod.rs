pub mod registry;

pub use registry::{EditError, SettingEntry, SettingsRegistry, ValueKind};

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use thiserror::Error;

use crate::models::{APP_DIR_NAME, Settings};

/// File name of the settings document inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Directory used instead of the platform config dir when there is none.
pub const LOCAL_CONFIG_DIR: &str = ".qimba";

/// Errors from reading or writing the settings file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine a configuration directory for this platform")]
    NoConfigDir,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Invalid {
        path: Utf8PathBuf,
        #[source]
        source: EditError,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml_ng::Error),

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Config file already exists at {0}")]
    AlreadyExists(Utf8PathBuf),
}

/// Configuration manager for loading and saving the YAML settings file.
///
/// Settings are read once at startup and written only on an explicit
/// [`save`](Self::save); nothing is persisted automatically.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a manager for `config_path`, or for the default location when
    /// no path is given. Falls back to `.qimba/config.yaml` in the working
    /// directory when the platform has no config directory.
    ///
    /// The error that forced the fallback is returned alongside so the caller
    /// can report it once logging is up.
    pub fn resolve(config_path: Option<Utf8PathBuf>) -> (Self, Option<ConfigError>) {
        Self::resolve_with(config_path, Self::default_config_path)
    }

    fn resolve_with<F>(config_path: Option<Utf8PathBuf>, default_path: F) -> (Self, Option<ConfigError>)
    where
        F: FnOnce() -> Result<Utf8PathBuf, ConfigError>,
    {
        match config_path.map_or_else(default_path, Ok) {
            Ok(config_path) => (Self { config_path }, None),
            Err(error) => (Self::with_path(Self::local_config_path()), Some(error)),
        }
    }

    /// Create a manager for an explicit path.
    pub fn with_path<P: AsRef<Utf8Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// `<platform config dir>/qimba/config.yaml`
    pub fn default_config_path() -> Result<Utf8PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// `.qimba/config.yaml`, relative to the working directory
    pub fn local_config_path() -> Utf8PathBuf {
        Utf8Path::new(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Read and parse the settings file without checking its values.
    ///
    /// A missing file is not an error and yields the defaults. Used by
    /// `config edit`, which has to be able to repair an out-of-range value.
    pub fn read(&self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
            return Ok(Settings::default());
        }

        let file_contents =
            fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Read {
                path: self.config_path.clone(),
                source,
            })?;

        serde_yaml_ng::from_str(&file_contents).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })
    }

    /// Load settings, returning an error for unreadable or malformed files
    /// and for values the setting registry would refuse.
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn try_load(&self) -> Result<Settings, ConfigError> {
        let settings = self.read()?;

        SettingsRegistry::standard()
            .validate(&settings)
            .map_err(|source| ConfigError::Invalid {
                path: self.config_path.clone(),
                source,
            })?;

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(settings)
    }

    /// Load settings, falling back to defaults with a warning when the file
    /// cannot be read, cannot be parsed or holds invalid values.
    pub fn load(&self) -> Settings {
        self.try_load().unwrap_or_else(|error| {
            tracing::warn!("Failed to load configuration: {}; using defaults", error);
            Settings::default()
        })
    }

    /// Save settings to the managed path.
    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        Self::save_to(&self.config_path, settings)
    }

    /// Save settings to `path`, creating parent directories as needed.
    pub fn save_to(path: &Utf8Path, settings: &Settings) -> Result<(), ConfigError> {
        let yaml_string = serde_yaml_ng::to_string(settings).map_err(ConfigError::Serialize)?;

        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, yaml_string).map_err(write_error)?;

        tracing::info!("Saved config to {}", path);
        Ok(())
    }

    /// Write a fresh default settings file to `path`.
    ///
    /// Refuses to replace an existing file unless `force` is set.
    pub fn init(path: &Utf8Path, force: bool) -> Result<Settings, ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        let settings = Settings::default();
        Self::save_to(path, &settings)?;
        Ok(settings)
    }
}
