//! Payload snapshot model — fuel and cargo state.
//!
//! Payload data arrives on its own subscription (`payload.read`), decoded
//! independently of the telemetry schema, and is forwarded to consumers on
//! a dedicated channel.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parameters for the payload subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadRequest {
    pub weight_unit: String,
    pub volume_unit: String,
    pub length_unit: String,
    /// Snapshot interval requested from the service.
    pub interval: Duration,
}

impl Default for PayloadRequest {
    fn default() -> Self {
        Self {
            weight_unit: "Lbs".to_string(),
            volume_unit: "gal".to_string(),
            length_unit: "ft".to_string(),
            interval: Duration::from_secs(10),
        }
    }
}

/// One structured payload snapshot: aircraft weights, fuel tanks and
/// payload stations, in the units named by the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayloadSnapshot {
    pub weight_unit: String,
    pub volume_unit: String,
    pub length_unit: String,
    pub gross_weight: f64,
    pub max_gross_weight: f64,
    pub empty_weight: f64,
    pub total_payload_weight: f64,
    pub total_fuel_weight: f64,
    pub total_fuel_volume: f64,
    pub total_fuel_capacity_weight: f64,
    pub total_fuel_capacity_volume: f64,
    pub total_fuel_percent: f64,
    pub fuel_tanks: Vec<FuelTank>,
    pub payload_stations: Vec<PayloadStation>,
}

/// State of one fuel tank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FuelTank {
    pub index: i32,
    pub name: String,
    pub is_present: bool,
    pub weight: f64,
    pub volume: f64,
    pub percent: f64,
    pub capacity_weight: f64,
    pub capacity_volume: f64,
}

/// One cargo or passenger station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayloadStation {
    pub index: i32,
    pub name: String,
    pub weight: f64,
    pub position: HashMap<String, f64>,
}
