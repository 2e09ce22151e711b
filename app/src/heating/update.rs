use serde::{Deserialize, Serialize};

use crate::core::{ClimateId, DegreeCelsius, SensorId, Timestamp};
use crate::schedule::WeekSchedule;

use super::{ClimateAction, ClimateMode, TemperatureReading};

/// Full device report of a TRV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrvUpdate {
    pub id: ClimateId,
    pub name: String,
    pub temperature: TemperatureReading,
    pub target: DegreeCelsius,
    pub mode: ClimateMode,
    pub is_heating: bool,
    #[serde(default)]
    pub schedule: Option<WeekSchedule>,
}

/// Device report of the central heating plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatingUpdate {
    pub id: ClimateId,
    pub name: String,
    pub temperature: TemperatureReading,
    pub target: DegreeCelsius,
    pub mode: ClimateMode,
    pub is_heating: bool,
    #[serde(default)]
    pub schedule: Option<WeekSchedule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureSensorUpdate {
    pub id: SensorId,
    pub temperature: TemperatureReading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonEvent {
    pub switch_id: String,
    pub time: Timestamp,
}

/// Outcome of applying a [`ClimateAction`] through the device API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action: ClimateAction,
    pub ok: bool,
}

impl TrvUpdate {
    pub fn is_valid(&self) -> bool {
        self.temperature.temperature.is_finite()
            && self.target.is_finite()
            && self.schedule.as_ref().is_none_or(WeekSchedule::is_valid)
    }
}

impl HeatingUpdate {
    pub fn is_valid(&self) -> bool {
        self.temperature.temperature.is_finite() && self.target.is_finite()
    }
}

impl TemperatureSensorUpdate {
    pub fn is_valid(&self) -> bool {
        self.temperature.temperature.is_finite()
    }
}
