use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scheduling::RegionalHolidayCalendar;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub holidays: HolidayConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HolidayConfig {
    /// ISO 3166-2 region code for the public holiday calendar.
    pub region: String,
    /// How many years of holidays to precompute, starting at the current one.
    pub horizon_years: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub holiday_region: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    database: RawDatabase,
    holidays: RawHolidays,
    logging: RawLogging,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawDatabase {
    url: String,
    max_connections: u32,
    timeout_secs: u64,
}

impl Default for RawDatabase {
    fn default() -> Self {
        Self { url: "sqlite://pantry.db".to_string(), max_connections: 5, timeout_secs: 30 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawHolidays {
    region: String,
    horizon_years: u16,
}

impl Default for RawHolidays {
    fn default() -> Self {
        Self { region: "DE-SH".to_string(), horizon_years: 3 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawLogging {
    level: String,
    format: LogFormat,
}

impl Default for RawLogging {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

impl AppConfig {
    /// Resolution order: explicit `LoadOptions` overrides, then `PANTRY_*`
    /// environment variables, then the TOML file, then built-in defaults.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let path = options
            .config_path
            .or_else(|| env::var("PANTRY_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("pantry.toml"));

        let raw = if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
            toml::from_str::<RawConfig>(&contents)
                .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?
        } else if options.require_file {
            return Err(ConfigError::MissingConfigFile(path));
        } else {
            RawConfig::default()
        };

        let database_url = options
            .overrides
            .database_url
            .or_else(|| env::var("PANTRY_DATABASE_URL").ok())
            .unwrap_or(raw.database.url);
        let log_level = options
            .overrides
            .log_level
            .or_else(|| env::var("PANTRY_LOG_LEVEL").ok())
            .unwrap_or(raw.logging.level);
        let holiday_region = options
            .overrides
            .holiday_region
            .or_else(|| env::var("PANTRY_HOLIDAY_REGION").ok())
            .unwrap_or(raw.holidays.region);

        let config = Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections: raw.database.max_connections,
                timeout_secs: raw.database.timeout_secs,
            },
            holidays: HolidayConfig {
                region: holiday_region,
                horizon_years: raw.holidays.horizon_years,
            },
            logging: LoggingConfig { level: log_level, format: raw.logging.format },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.database.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "database.timeout_secs must be at least 1".to_string(),
            ));
        }
        if RegionalHolidayCalendar::for_region(&self.holidays.region, 2026..=2026).is_none() {
            return Err(ConfigError::Validation(format!(
                "unknown holiday region `{}`",
                self.holidays.region
            )));
        }
        if !(1..=10).contains(&self.holidays.horizon_years) {
            return Err(ConfigError::Validation(
                "holidays.horizon_years must be between 1 and 10".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation("logging.level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Calendar for the configured region, starting at `from_year`. The
    /// region was validated on load, so an unknown code can only mean the
    /// config changed underneath us; that degenerates to an empty calendar.
    pub fn holiday_calendar(&self, from_year: i32) -> RegionalHolidayCalendar {
        let until = from_year + i32::from(self.holidays.horizon_years) - 1;
        RegionalHolidayCalendar::for_region(&self.holidays.region, from_year..=until)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    fn isolated_options() -> LoadOptions {
        // Point at a path that does not exist so the defaults apply
        // regardless of files in the working directory.
        LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/pantry.toml")),
            ..LoadOptions::default()
        }
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let config = AppConfig::load(isolated_options()).expect("load defaults");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.holidays.region, "DE-SH");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn missing_file_is_an_error_when_required() {
        let options = LoadOptions { require_file: true, ..isolated_options() };
        assert!(matches!(AppConfig::load(options), Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn file_values_are_parsed_and_validated() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[database]\nurl = \"sqlite://orders.db\"\nmax_connections = 2\n\n[logging]\nlevel = \"debug\"\nformat = \"json\"\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            ..LoadOptions::default()
        })
        .expect("load file");
        assert_eq!(config.database.url, "sqlite://orders.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.format, LogFormat::Json);
        // Sections absent from the file keep their defaults.
        assert_eq!(config.holidays.horizon_years, 3);
    }

    #[test]
    fn overrides_take_precedence() {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                log_level: Some("trace".to_string()),
                holiday_region: None,
            },
            ..isolated_options()
        })
        .expect("load with overrides");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn unknown_holiday_region_fails_validation() {
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                holiday_region: Some("US-CA".to_string()),
                ..ConfigOverrides::default()
            },
            ..isolated_options()
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn holiday_calendar_spans_the_configured_horizon() {
        let config = AppConfig::load(isolated_options()).expect("load defaults");
        let calendar = config.holiday_calendar(2026);
        // Three years, ten holidays each.
        assert_eq!(calendar.len(), 30);
    }
}
