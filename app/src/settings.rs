use config::{Config, ConfigError, Environment, File};
use infrastructure::MonitoringConfig;
use serde::Deserialize;

use crate::heating::RoomAdjustment;
use crate::home::Home;
use crate::system::SystemConfig;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub monitoring: MonitoringConfig,
    pub home: Home,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub adjustments: Vec<RoomAdjustment>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config.toml"))
            .add_source(
                Environment::with_prefix("DEEP_HEATING")
                    .prefix_separator("_")
                    .separator("__"),
            );

        builder.build()?.try_deserialize()
    }
}
