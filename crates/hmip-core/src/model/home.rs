use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::epoch_millis;

/// Current conditions at the home's location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Weather {
    pub temperature: f64,
    pub weather_condition: String,
    pub weather_day_time: String,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub humidity: i64,
    pub wind_speed: f64,
    pub wind_direction: i64,
}

/// Coordinates are kept as the strings the cloud sends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub city: String,
    pub latitude: String,
    pub longitude: String,
}

/// The home record: global settings of one access point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeState {
    pub id: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default, rename = "currentAPVersion")]
    pub current_ap_version: Option<String>,
    #[serde(default, rename = "availableAPVersion")]
    pub available_ap_version: Option<String>,
    #[serde(default)]
    pub time_zone_id: Option<String>,
    #[serde(default)]
    pub pin_assigned: bool,
    /// Radio duty cycle utilisation in percent.
    #[serde(default)]
    pub duty_cycle: Option<f64>,
    #[serde(default)]
    pub update_state: Option<String>,
    #[serde(default)]
    pub power_meter_unit_price: Option<f64>,
    #[serde(default)]
    pub power_meter_currency: Option<String>,
    #[serde(default)]
    pub device_update_strategy: Option<String>,
    #[serde(default)]
    pub last_ready_for_update_timestamp: Option<i64>,
    #[serde(default)]
    pub ap_exchange_client_id: Option<String>,
    #[serde(default)]
    pub ap_exchange_state: Option<String>,
    #[serde(default)]
    pub weather: Weather,
    #[serde(default)]
    pub location: Location,
}

impl HomeState {
    pub fn last_ready_for_update(&self) -> Option<DateTime<Utc>> {
        epoch_millis(self.last_ready_for_update_timestamp)
    }
}

/// A one-time OAuth token issued for third-party integrations.
#[derive(Debug, Clone)]
pub struct OAuthOtk {
    pub auth_token: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOtk {
    auth_token: String,
    #[serde(default)]
    expiration_timestamp: Option<i64>,
}

impl OAuthOtk {
    pub(crate) fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        let raw = RawOtk::deserialize(value)?;
        Ok(Self {
            auth_token: SecretString::from(raw.auth_token),
            expires_at: epoch_millis(raw.expiration_timestamp),
        })
    }
}
