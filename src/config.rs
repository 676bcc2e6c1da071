use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{errors::AtitweakError, performance::LevelSettings};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/atitweak/config.json";

const LIBRARY_PATHS_JSON: &str = "library_paths";
const LOG_LEVEL_JSON: &str = "log_level";
const PROFILES_JSON: &str = "profiles";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open configuration file \"{path}\": {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse configuration file \"{path}\": {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid \"{key}\" entry in the configuration: {source}")]
    Entry {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error("Unknown profile \"{name}\"")]
    UnknownProfile { name: String },
    #[error("Invalid profile \"{name}\": {source}")]
    InvalidProfile {
        name: String,
        source: AtitweakError,
    },
}

type Result<T> = std::result::Result<T, ConfigError>;

// Named set of values applied with `--profile`, clocks in MHz, voltage in VDC
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileConfig {
    pub name: String,

    pub engine_clock: Option<f64>,
    pub memory_clock: Option<f64>,
    pub core_voltage: Option<f64>,
}

impl ProfileConfig {
    pub fn settings(&self) -> Result<LevelSettings> {
        LevelSettings::from_user_values(self.engine_clock, self.memory_clock, self.core_voltage)
            .map_err(|source| ConfigError::InvalidProfile {
                name: self.name.clone(),
                source,
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    // Tried in order before the platform default library names
    pub library_paths: Vec<String>,
    pub log_level: Option<String>,

    profiles: HashMap<String, ProfileConfig>,

    // Problems found while parsing, logged once logging is set up
    warnings: Vec<String>,
}

impl Config {
    // Load the configuration.
    //
    // An explicit path must be readable, the default path is only used when
    // it exists and built-in defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))
            }
            None => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Parsing config file at: {path:?}");

        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let config_json: Value =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        Self::from_value(config_json)
    }

    pub fn from_value(config_json: Value) -> Result<Self> {
        let mut config = Self::default();

        if let Some(paths) = config_json.get(LIBRARY_PATHS_JSON) {
            config.library_paths = serde_json::from_value(paths.clone()).map_err(|source| {
                ConfigError::Entry {
                    key: LIBRARY_PATHS_JSON,
                    source,
                }
            })?;
        }

        if let Some(level) = config_json.get(LOG_LEVEL_JSON) {
            config.log_level = serde_json::from_value(level.clone()).map_err(|source| {
                ConfigError::Entry {
                    key: LOG_LEVEL_JSON,
                    source,
                }
            })?;
        }

        // A broken profile only loses that profile
        if let Some(Value::Array(profiles)) = config_json.get(PROFILES_JSON) {
            for profile in profiles {
                if let Err(err) = config.parse_profile(profile.clone()) {
                    config.warnings.push(format!("Failed to parse profile: {err}"));
                }
            }
        }

        Ok(config)
    }

    fn parse_profile(&mut self, profile_json: Value) -> std::result::Result<(), serde_json::Error> {
        let profile: ProfileConfig = serde_json::from_value(profile_json)?;

        // If the profile is already in the config ignore it
        if self.profiles.contains_key(profile.name.as_str()) {
            self.warnings.push(format!(
                "Redefinition of profile: \"{}\", ignoring it",
                profile.name.as_str()
            ));

            return Ok(());
        }

        self.profiles.insert(profile.name.clone(), profile);

        Ok(())
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn profile(&self, name: &str) -> Result<&ProfileConfig> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: name.to_string(),
            })
    }
}
