use std::{fmt, marker::PhantomData};

use async_trait::async_trait;
use reqwest::Method;

use crate::{
    client::ResourceClient,
    config::{Config, ConfigError},
    date::Day,
    error::FetchError,
    model::{Resource, Temperature, WindSpeed},
};

/// Upstream families the gateway aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    Temperature,
    WindSpeed,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Temperature => "temperature",
            Upstream::WindSpeed => "windspeed",
        }
    }

    /// Environment variable holding the upstream base URL.
    pub fn env_var(&self) -> &'static str {
        match self {
            Upstream::Temperature => "TEMPERATURE_BASE_URL",
            Upstream::WindSpeed => "WINDSPEED_BASE_URL",
        }
    }

    pub const fn all() -> &'static [Upstream] {
        &[Upstream::Temperature, Upstream::WindSpeed]
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of one resource record per day.
#[async_trait]
pub trait ResourceGateway: Send + Sync {
    type Resource: Resource;

    async fn fetch_at(&self, day: Day) -> Result<Self::Resource, FetchError>;
}

/// Gateway backed by an upstream exposing `GET <base_url>?at=<instant>`.
pub struct HttpGateway<T> {
    base_url: String,
    client: ResourceClient,
    _resource: PhantomData<fn() -> T>,
}

impl<T> HttpGateway<T> {
    pub fn new(base_url: impl Into<String>, client: ResourceClient) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            _resource: PhantomData,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, day: Day) -> String {
        format!("{}?at={}", self.base_url(), day)
    }
}

impl<T> fmt::Debug for HttpGateway<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url())
            .field("resource", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T: Resource> ResourceGateway for HttpGateway<T> {
    type Resource = T;

    async fn fetch_at(&self, day: Day) -> Result<T, FetchError> {
        let body = self.client.fetch(Method::GET, &self.url_for(day)).await?;

        serde_json::from_slice(&body).map_err(|_| FetchError::decode())
    }
}

/// Construct the temperature gateway from config.
pub fn temperature_gateway(
    config: &Config,
    client: ResourceClient,
) -> Result<HttpGateway<Temperature>, ConfigError> {
    let base_url = config.require_base_url(Upstream::Temperature)?;
    Ok(HttpGateway::new(base_url, client))
}

/// Construct the wind-speed gateway from config.
pub fn windspeed_gateway(
    config: &Config,
    client: ResourceClient,
) -> Result<HttpGateway<WindSpeed>, ConfigError> {
    let base_url = config.require_base_url(Upstream::WindSpeed)?;
    Ok(HttpGateway::new(base_url, client))
}
