use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitoringConfig {
    pub service_name: String,
    pub logs: EnvFilterConfig,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EnvFilterConfig {
    pub default_level: String,
    #[serde(default)]
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl TryInto<EnvFilter> for EnvFilterConfig {
    type Error = tracing_subscriber::filter::ParseError;

    fn try_into(self) -> Result<EnvFilter, Self::Error> {
        EnvFilter::builder()
            .with_default_directive(self.default_level.parse()?)
            .parse(self.filters.join(","))
    }
}

impl MonitoringConfig {
    pub fn init(&self) -> anyhow::Result<()> {
        let filter: EnvFilter = self.logs.clone().try_into()?;

        match self.format {
            LogFormat::Plain => tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer())
                .with(filter)
                .try_init()?,
            LogFormat::Json => tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
                .with(filter)
                .try_init()?,
        }

        tracing::info!(service = %self.service_name, "Monitoring initialized");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_from_config() {
        let config = EnvFilterConfig {
            default_level: "info".to_string(),
            filters: vec!["deep_heating=debug".to_string(), "tokio=warn".to_string()],
        };

        let filter: Result<EnvFilter, _> = config.try_into();

        assert!(filter.is_ok());
    }

    #[test]
    fn invalid_default_level_is_rejected() {
        let config = EnvFilterConfig {
            default_level: "not a level".to_string(),
            filters: vec![],
        };

        let filter: Result<EnvFilter, _> = config.try_into();

        assert!(filter.is_err());
    }
}
