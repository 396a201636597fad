use serde::Serialize;

use pantry_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Serialize)]
struct ConfigView {
    database_url: String,
    database_max_connections: u32,
    database_timeout_secs: u64,
    holiday_region: String,
    holiday_horizon_years: u16,
    log_level: String,
    log_format: LogFormat,
}

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let view = ConfigView {
                database_url: config.database.url,
                database_max_connections: config.database.max_connections,
                database_timeout_secs: config.database.timeout_secs,
                holiday_region: config.holidays.region,
                holiday_horizon_years: config.holidays.horizon_years,
                log_level: config.logging.level,
                log_format: config.logging.format,
            };
            serde_json::to_string_pretty(&view)
                .unwrap_or_else(|error| format!("failed to render configuration: {error}"))
        }
        Err(error) => format!("configuration issue: {error}"),
    }
}
