use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{ClimateId, DegreeCelsius, RoomName, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClimateMode {
    #[display("auto")]
    Auto,
    #[display("heat")]
    Heat,
    #[display("off")]
    Off,
}

/// Whether a value was reported by the device or derived from a command the device accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlSource {
    Device,
    Synthesised,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
pub enum HouseMode {
    Auto,
    Sleeping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
pub enum RoomModeValue {
    Off,
    Auto,
    Sleeping,
}

impl From<HouseMode> for RoomModeValue {
    fn from(value: HouseMode) -> Self {
        match value {
            HouseMode::Auto => RoomModeValue::Auto,
            HouseMode::Sleeping => RoomModeValue::Sleeping,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub temperature: DegreeCelsius,
    pub time: Timestamp,
}

impl TemperatureReading {
    pub fn new(temperature: DegreeCelsius, time: Timestamp) -> Self {
        Self { temperature, time }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrvTemperature {
    pub climate_entity_id: ClimateId,
    pub reading: TemperatureReading,
}

#[derive(Debug, Clone)]
pub struct TrvControlState {
    pub climate_entity_id: ClimateId,
    pub target: DegreeCelsius,
    pub mode: ClimateMode,
    pub source: ControlSource,
}

impl TrvControlState {
    /// Change detection: a synthesised state confirming what the device reported is no change.
    pub fn same_control(a: &Self, b: &Self) -> bool {
        a.climate_entity_id == b.climate_entity_id && a.target == b.target && a.mode == b.mode
    }
}

#[derive(Debug, Clone)]
pub struct ClimateEntityStatus {
    pub climate_entity_id: ClimateId,
    pub is_heating: bool,
    pub source: ControlSource,
}

impl ClimateEntityStatus {
    pub fn same_status(a: &Self, b: &Self) -> bool {
        a.climate_entity_id == b.climate_entity_id && a.is_heating == b.is_heating
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrvSchedule {
    pub climate_entity_id: ClimateId,
    pub schedule: crate::schedule::WeekSchedule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrvScheduledTarget {
    pub climate_entity_id: ClimateId,
    pub target: DegreeCelsius,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrvDesiredTargetTemperature {
    pub climate_entity_id: ClimateId,
    pub target: DegreeCelsius,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomMode {
    pub room_name: RoomName,
    pub mode: RoomModeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAdjustment {
    #[serde(alias = "room_name")]
    pub room_name: RoomName,
    #[serde(default)]
    pub adjustment: f64,
}

impl RoomAdjustment {
    pub fn none(room_name: RoomName) -> Self {
        Self {
            room_name,
            adjustment: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomScheduledTarget {
    pub room_name: RoomName,
    pub target: DegreeCelsius,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomTargetTemperature {
    pub room_name: RoomName,
    pub target: DegreeCelsius,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomTemperature {
    pub room_name: RoomName,
    pub reading: TemperatureReading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomHeatingStatus {
    pub room_name: RoomName,
    pub is_heating: bool,
}

/// Everything known about a room at the moment one of its inputs changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomDecisionPoint {
    pub room_name: RoomName,
    pub target: DegreeCelsius,
    pub temperature: DegreeCelsius,
    pub trv_targets: HashMap<ClimateId, DegreeCelsius>,
    pub trv_temperatures: HashMap<ClimateId, DegreeCelsius>,
    pub trv_modes: HashMap<ClimateId, ClimateMode>,
}

impl RoomDecisionPoint {
    /// Projection per TRV, for every TRV whose temperature, target and mode are all known.
    pub fn trv_decision_points(&self) -> Vec<TrvDecisionPoint> {
        let mut points: Vec<TrvDecisionPoint> = self
            .trv_temperatures
            .iter()
            .filter_map(|(id, temperature)| {
                Some(TrvDecisionPoint {
                    climate_entity_id: id.clone(),
                    room_name: self.room_name.clone(),
                    room_target: self.target,
                    room_temperature: self.temperature,
                    trv_temperature: *temperature,
                    trv_target: *self.trv_targets.get(id)?,
                    trv_mode: *self.trv_modes.get(id)?,
                })
            })
            .collect();

        points.sort_by(|a, b| a.climate_entity_id.cmp(&b.climate_entity_id));
        points
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrvDecisionPoint {
    pub climate_entity_id: ClimateId,
    pub room_name: RoomName,
    pub room_target: DegreeCelsius,
    pub room_temperature: DegreeCelsius,
    pub trv_temperature: DegreeCelsius,
    pub trv_target: DegreeCelsius,
    pub trv_mode: ClimateMode,
}

/// Outbound command for a TRV or the heating plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateAction {
    pub climate_entity_id: ClimateId,
    pub mode: ClimateMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_temperature: Option<DegreeCelsius>,
}

impl ClimateAction {
    pub fn auto(climate_entity_id: ClimateId) -> Self {
        Self {
            climate_entity_id,
            mode: ClimateMode::Auto,
            target_temperature: None,
        }
    }

    pub fn heat(climate_entity_id: ClimateId, target: DegreeCelsius) -> Self {
        Self {
            climate_entity_id,
            mode: ClimateMode::Heat,
            target_temperature: Some(target),
        }
    }
}

impl std::fmt::Display for ClimateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target_temperature {
            Some(target) => write!(f, "{} -> {} {}", self.climate_entity_id, self.mode, target),
            None => write!(f, "{} -> {}", self.climate_entity_id, self.mode),
        }
    }
}
