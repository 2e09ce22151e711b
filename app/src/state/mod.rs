mod materializer;

pub use materializer::{StateMaterializer, StateStreams};

use serde::{Deserialize, Serialize};

use crate::core::{ClimateId, DegreeCelsius, RoomName};
use crate::heating::{
    RoomAdjustment, RoomHeatingStatus, RoomMode, RoomModeValue, RoomTargetTemperature, RoomTemperature,
    TemperatureReading,
};

/// Externally visible snapshot of the whole household.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepHeatingState {
    pub rooms: Vec<RoomState>,
    pub is_heating: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub name: RoomName,
    pub temperature: Option<TemperatureReading>,
    pub target_temperature: Option<DegreeCelsius>,
    pub mode: Option<RoomModeValue>,
    pub is_heating: Option<bool>,
    pub adjustment: f64,
    pub radiators: Vec<RadiatorState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadiatorState {
    pub name: ClimateId,
    pub temperature: Option<TemperatureReading>,
    pub target_temperature: Option<TemperatureReading>,
    pub desired_target_temperature: Option<TemperatureReading>,
    pub is_heating: Option<bool>,
}

/// One change coming from one of the independent update streams.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    RadiatorTemperature {
        room_name: RoomName,
        climate_entity_id: ClimateId,
        reading: TemperatureReading,
    },
    RadiatorTarget {
        room_name: RoomName,
        climate_entity_id: ClimateId,
        reading: TemperatureReading,
    },
    RadiatorHeating {
        room_name: RoomName,
        climate_entity_id: ClimateId,
        is_heating: bool,
    },
    RadiatorDesiredTarget {
        room_name: RoomName,
        climate_entity_id: ClimateId,
        reading: TemperatureReading,
    },
    RoomTemperature(RoomTemperature),
    RoomTarget(RoomTargetTemperature),
    RoomMode(RoomMode),
    RoomHeating(RoomHeatingStatus),
    RoomAdjustment(RoomAdjustment),
    HeatingStatus(bool),
}

impl DeepHeatingState {
    pub fn room(&self, name: &RoomName) -> Option<&RoomState> {
        self.rooms.iter().find(|room| &room.name == name)
    }

    pub fn apply(&mut self, update: StateUpdate) {
        match update {
            StateUpdate::RadiatorTemperature {
                room_name,
                climate_entity_id,
                reading,
            } => self.radiator(room_name, climate_entity_id).temperature = Some(reading),
            StateUpdate::RadiatorTarget {
                room_name,
                climate_entity_id,
                reading,
            } => self.radiator(room_name, climate_entity_id).target_temperature = Some(reading),
            StateUpdate::RadiatorHeating {
                room_name,
                climate_entity_id,
                is_heating,
            } => self.radiator(room_name, climate_entity_id).is_heating = Some(is_heating),
            StateUpdate::RadiatorDesiredTarget {
                room_name,
                climate_entity_id,
                reading,
            } => self.radiator(room_name, climate_entity_id).desired_target_temperature = Some(reading),
            StateUpdate::RoomTemperature(t) => self.room_mut(t.room_name).temperature = Some(t.reading),
            StateUpdate::RoomTarget(t) => self.room_mut(t.room_name).target_temperature = Some(t.target),
            StateUpdate::RoomMode(m) => self.room_mut(m.room_name).mode = Some(m.mode),
            StateUpdate::RoomHeating(s) => self.room_mut(s.room_name).is_heating = Some(s.is_heating),
            StateUpdate::RoomAdjustment(a) => self.room_mut(a.room_name).adjustment = a.adjustment,
            StateUpdate::HeatingStatus(is_heating) => self.is_heating = Some(is_heating),
        }
    }

    fn room_mut(&mut self, name: RoomName) -> &mut RoomState {
        let index = match self.rooms.iter().position(|room| room.name == name) {
            Some(index) => index,
            None => {
                self.rooms.push(RoomState::new(name));
                self.rooms.len() - 1
            }
        };

        &mut self.rooms[index]
    }

    fn radiator(&mut self, room_name: RoomName, id: ClimateId) -> &mut RadiatorState {
        let room = self.room_mut(room_name);

        let index = match room.radiators.iter().position(|radiator| radiator.name == id) {
            Some(index) => index,
            None => {
                room.radiators.push(RadiatorState::new(id));
                room.radiators.len() - 1
            }
        };

        &mut room.radiators[index]
    }
}

impl RoomState {
    fn new(name: RoomName) -> Self {
        Self {
            name,
            temperature: None,
            target_temperature: None,
            mode: None,
            is_heating: None,
            adjustment: 0.0,
            radiators: vec![],
        }
    }
}

impl RadiatorState {
    fn new(name: ClimateId) -> Self {
        Self {
            name,
            temperature: None,
            target_temperature: None,
            desired_target_temperature: None,
            is_heating: None,
        }
    }
}
