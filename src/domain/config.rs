use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for a ledger.
///
/// Stored as `config.toml` in the data directory. A missing file means the
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Whether to create the default set of departments when the store has
    /// none.
    pub seed_departments: bool,

    /// Whether employees may reference a department code that is not in the
    /// registry.
    ///
    /// When `false` (default), adding or moving an employee to an unknown
    /// department is rejected.
    pub allow_unknown_departments: bool,

    /// Number of decimal places used when displaying salaries.
    salary_decimals: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_departments: true,
            allow_unknown_departments: false,
            salary_decimals: default_salary_decimals(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Loads the configuration, falling back to the defaults if the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed. A
    /// broken file never silently turns into the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Read(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content).map_err(ConfigError::Write)
    }

    /// Returns the number of decimal places used to display salaries.
    #[must_use]
    pub const fn salary_decimals(&self) -> usize {
        self.salary_decimals
    }

    /// Sets the number of decimal places used to display salaries.
    ///
    /// Values above 6 are clamped.
    pub fn set_salary_decimals(&mut self, decimals: usize) {
        self.salary_decimals = decimals.min(MAX_SALARY_DECIMALS);
    }
}

const MAX_SALARY_DECIMALS: usize = 6;

const fn default_salary_decimals() -> usize {
    2
}

const fn default_true() -> bool {
    true
}

/// Errors that can occur when reading or writing a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse config file: {0}")]
    Parse(#[source] toml::de::Error),
    /// The config could not be rendered as TOML.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] toml::ser::Error),
    /// The config file could not be written.
    #[error("Failed to write config file: {0}")]
    Write(#[source] std::io::Error),
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_true")]
        seed_departments: bool,

        #[serde(default)]
        allow_unknown_departments: bool,

        /// Number of decimal places used when displaying salaries.
        #[serde(default = "default_salary_decimals")]
        salary_decimals: usize,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                seed_departments,
                allow_unknown_departments,
                salary_decimals,
            } => Self {
                seed_departments,
                allow_unknown_departments,
                salary_decimals: salary_decimals.min(MAX_SALARY_DECIMALS),
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            seed_departments: config.seed_departments,
            allow_unknown_departments: config.allow_unknown_departments,
            salary_decimals: config.salary_decimals,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nseed_departments = false\nallow_unknown_departments = true\nsalary_decimals = 0\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert!(!config.seed_departments);
        assert!(config.allow_unknown_departments);
        assert_eq!(config.salary_decimals(), 0);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(matches!(error, ConfigError::Read(_)));
        assert!(error.to_string().starts_with("Failed to read config file:"));
        assert_eq!(Config::load_or_default(&missing).unwrap(), Config::default());
    }

    #[test]
    fn load_or_default_rejects_broken_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nallow_unknown_departments = yes\n")
            .unwrap();

        let error = Config::load_or_default(file.path()).unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nsalary_decimals = \"two\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.to_string().starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        // Tests that deserialising an empty file returns the default configuration.
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.allow_unknown_departments = true;
        config.set_salary_decimals(42);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.salary_decimals(), MAX_SALARY_DECIMALS);
    }
}
