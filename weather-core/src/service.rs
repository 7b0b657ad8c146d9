use std::sync::Arc;

use anyhow::Context;

use crate::{
    client::ResourceClient,
    config::Config,
    date::DateRange,
    error::FetchError,
    fanout::{fetch_range, fetch_weather},
    gateway::{ResourceGateway, temperature_gateway, windspeed_gateway},
    model::{Temperature, Weather, WindSpeed},
};

pub type TemperatureGateway = Arc<dyn ResourceGateway<Resource = Temperature>>;
pub type WindSpeedGateway = Arc<dyn ResourceGateway<Resource = WindSpeed>>;

/// Both upstream gateways, shared by every inbound request.
#[derive(Clone)]
pub struct WeatherService {
    temperatures: TemperatureGateway,
    speeds: WindSpeedGateway,
}

impl WeatherService {
    pub fn new(temperatures: TemperatureGateway, speeds: WindSpeedGateway) -> Self {
        Self {
            temperatures,
            speeds,
        }
    }

    /// Build HTTP gateways from config. Each upstream host gets its own client and
    /// connection cap.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;

        let temperatures = temperature_gateway(config, build_client(config)?)?;
        let speeds = windspeed_gateway(config, build_client(config)?)?;

        Ok(Self::new(Arc::new(temperatures), Arc::new(speeds)))
    }

    pub async fn temperatures(&self, range: DateRange) -> Result<Vec<Temperature>, FetchError> {
        fetch_range(&self.temperatures, range).await
    }

    pub async fn speeds(&self, range: DateRange) -> Result<Vec<WindSpeed>, FetchError> {
        fetch_range(&self.speeds, range).await
    }

    pub async fn weather(&self, range: DateRange) -> Result<Vec<Weather>, FetchError> {
        fetch_weather(&self.temperatures, &self.speeds, range).await
    }
}

fn build_client(config: &Config) -> anyhow::Result<ResourceClient> {
    ResourceClient::new(&config.client)
        .context("Failed to build upstream HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn from_config_rejects_incomplete_config() {
        let err = WeatherService::from_config(&Config::default())
            .err()
            .unwrap();

        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn from_config_builds_with_valid_config() {
        let cfg = Config {
            temperature_base_url: Some("http://localhost:8000/".into()),
            windspeed_base_url: Some("http://localhost:8080/".into()),
            ..Config::default()
        };

        assert!(WeatherService::from_config(&cfg).is_ok());
    }
}
