use std::collections::HashMap;

use crate::core::{ClimateId, DegreeCelsius, InvariantViolation, RoomName};
use crate::heating::{
    ClimateMode, RoomAdjustment, RoomDecisionPoint, RoomMode, RoomScheduledTarget, RoomTargetTemperature,
    TrvAction, TrvControlState, TrvDesiredTargetTemperature, determine_action, room_target_temperature,
};
use crate::reactive::Join;

#[derive(Default)]
pub struct RoomTargetInputs {
    pub scheduled: Option<RoomScheduledTarget>,
    pub mode: Option<RoomMode>,
    pub adjustment: Option<RoomAdjustment>,
}

impl Join<RoomName> for RoomTargetInputs {
    type Output = Result<RoomTargetTemperature, InvariantViolation>;

    fn combine(&self, _: &RoomName) -> Option<Self::Output> {
        Some(room_target_temperature(
            self.scheduled.as_ref()?,
            self.mode.as_ref()?,
            self.adjustment.as_ref()?,
        ))
    }
}

#[derive(Default)]
pub struct RoomDecisionInputs {
    pub target: Option<DegreeCelsius>,
    pub temperature: Option<DegreeCelsius>,
    pub trv_targets: HashMap<ClimateId, DegreeCelsius>,
    pub trv_temperatures: HashMap<ClimateId, DegreeCelsius>,
    pub trv_modes: HashMap<ClimateId, ClimateMode>,
}

impl Join<RoomName> for RoomDecisionInputs {
    type Output = RoomDecisionPoint;

    fn combine(&self, room_name: &RoomName) -> Option<Self::Output> {
        Some(RoomDecisionPoint {
            room_name: room_name.clone(),
            target: self.target?,
            temperature: self.temperature?,
            trv_targets: self.trv_targets.clone(),
            trv_temperatures: self.trv_temperatures.clone(),
            trv_modes: self.trv_modes.clone(),
        })
    }
}

#[derive(Default)]
pub struct TrvActionInputs {
    pub desired: Option<TrvDesiredTargetTemperature>,
    pub control: Option<TrvControlState>,
    pub temperature: Option<DegreeCelsius>,
    pub scheduled_target: Option<DegreeCelsius>,
}

impl Join<ClimateId> for TrvActionInputs {
    type Output = Result<TrvAction, InvariantViolation>;

    fn combine(&self, _: &ClimateId) -> Option<Self::Output> {
        determine_action(
            self.desired.as_ref()?,
            self.control.as_ref()?,
            self.temperature?,
            self.scheduled_target?,
        )
        .transpose()
    }
}
