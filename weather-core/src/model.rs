use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// A per-day record served by one upstream family.
pub trait Resource: DeserializeOwned + Send + 'static {
    /// ISO-8601 date of the record, used for ordering.
    fn date(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    #[serde(default)]
    pub temp: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindSpeed {
    #[serde(default)]
    pub north: f64,
    #[serde(default)]
    pub west: f64,
    pub date: String,
}

/// Temperature and wind speed for the same day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Weather {
    pub north: f64,
    pub west: f64,
    pub temp: f64,
    pub date: String,
}

impl Resource for Temperature {
    fn date(&self) -> &str {
        &self.date
    }
}

impl Resource for WindSpeed {
    fn date(&self) -> &str {
        &self.date
    }
}

impl Weather {
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }

    pub fn apply_temperature(&mut self, temperature: &Temperature) {
        self.temp = temperature.temp;
    }

    pub fn apply_wind_speed(&mut self, speed: &WindSpeed) {
        self.north = speed.north;
        self.west = speed.west;
    }
}
