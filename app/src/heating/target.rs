use crate::core::{DegreeCelsius, InvariantViolation};

use super::{
    COMFORT_FLOOR, MAX_TARGET, MIN_TARGET, RoomAdjustment, RoomMode, RoomModeValue, RoomScheduledTarget,
    RoomTargetTemperature, TrvDecisionPoint, TrvDesiredTargetTemperature,
};

pub fn room_target_temperature(
    scheduled: &RoomScheduledTarget,
    mode: &RoomMode,
    adjustment: &RoomAdjustment,
) -> Result<RoomTargetTemperature, InvariantViolation> {
    if scheduled.room_name != mode.room_name || scheduled.room_name != adjustment.room_name {
        return Err(InvariantViolation::MismatchedRoom {
            scheduled: scheduled.room_name.clone(),
            mode: mode.room_name.clone(),
            adjustment: adjustment.room_name.clone(),
        });
    }

    let target = match mode.mode {
        RoomModeValue::Off => MIN_TARGET,
        RoomModeValue::Sleeping => COMFORT_FLOOR,
        RoomModeValue::Auto => (scheduled.target + DegreeCelsius(adjustment.adjustment)).max(COMFORT_FLOOR),
    };

    Ok(RoomTargetTemperature {
        room_name: scheduled.room_name.clone(),
        target,
    })
}

/// Target for one TRV so that the room sensor, not the TRV's own sensor, reaches the room
/// target. The offset between both sensors is carried over, rounded towards the direction the
/// room still has to go.
pub fn trv_desired_target_temperature(point: &TrvDecisionPoint) -> TrvDesiredTargetTemperature {
    let unrounded = point.room_target + (point.trv_temperature - point.room_temperature);

    let rounded = if point.room_temperature < point.room_target {
        unrounded.round_up_to_half()
    } else {
        unrounded.round_down_to_half()
    };

    TrvDesiredTargetTemperature {
        climate_entity_id: point.climate_entity_id.clone(),
        target: rounded.clamp(MIN_TARGET, MAX_TARGET),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClimateId, RoomName};
    use crate::heating::ClimateMode;

    fn inputs(
        scheduled: f64,
        mode: RoomModeValue,
        adjustment: f64,
    ) -> (RoomScheduledTarget, RoomMode, RoomAdjustment) {
        let room_name = RoomName::from("Lounge");
        (
            RoomScheduledTarget {
                room_name: room_name.clone(),
                target: DegreeCelsius(scheduled),
            },
            RoomMode {
                room_name: room_name.clone(),
                mode,
            },
            RoomAdjustment { room_name, adjustment },
        )
    }

    fn target_of(scheduled: f64, mode: RoomModeValue, adjustment: f64) -> DegreeCelsius {
        let (scheduled, mode, adjustment) = inputs(scheduled, mode, adjustment);
        room_target_temperature(&scheduled, &mode, &adjustment).unwrap().target
    }

    fn point(room_target: f64, trv_temperature: f64, room_temperature: f64) -> TrvDecisionPoint {
        TrvDecisionPoint {
            climate_entity_id: ClimateId::from("trv"),
            room_name: RoomName::from("Lounge"),
            room_target: DegreeCelsius(room_target),
            room_temperature: DegreeCelsius(room_temperature),
            trv_temperature: DegreeCelsius(trv_temperature),
            trv_target: DegreeCelsius(20.0),
            trv_mode: ClimateMode::Auto,
        }
    }

    fn desired(room_target: f64, trv_temperature: f64, room_temperature: f64) -> DegreeCelsius {
        trv_desired_target_temperature(&point(room_target, trv_temperature, room_temperature)).target
    }

    #[test]
    fn room_target_per_mode() {
        assert_eq!(target_of(21.0, RoomModeValue::Off, 2.0), DegreeCelsius(7.0));
        assert_eq!(target_of(21.0, RoomModeValue::Sleeping, 2.0), DegreeCelsius(15.0));
        assert_eq!(target_of(21.0, RoomModeValue::Auto, -1.5), DegreeCelsius(19.5));
    }

    #[test]
    fn auto_target_never_drops_below_comfort_floor() {
        assert_eq!(target_of(8.0, RoomModeValue::Auto, -5.0), DegreeCelsius(15.0));
    }

    #[test]
    fn inputs_for_different_rooms_are_rejected() {
        let (scheduled, mode, mut adjustment) = inputs(21.0, RoomModeValue::Auto, 0.0);
        adjustment.room_name = RoomName::from("Study");

        assert_eq!(
            room_target_temperature(&scheduled, &mode, &adjustment),
            Err(InvariantViolation::MismatchedRoom {
                scheduled: RoomName::from("Lounge"),
                mode: RoomName::from("Lounge"),
                adjustment: RoomName::from("Study"),
            })
        );
    }

    #[test]
    fn desired_target_carries_sensor_offset() {
        assert_eq!(desired(20.0, 21.0, 19.0), DegreeCelsius(22.0));
        assert_eq!(desired(20.0, 18.0, 20.0), DegreeCelsius(18.0));
    }

    #[test]
    fn desired_target_rounds_towards_remaining_work() {
        //room below target: round up
        assert_eq!(desired(20.0, 19.3, 19.0), DegreeCelsius(20.5));
        //room at or above target: round down
        assert_eq!(desired(20.0, 20.8, 20.0), DegreeCelsius(20.5));
        assert_eq!(desired(20.0, 21.3, 21.0), DegreeCelsius(20.0));
    }

    #[test]
    fn fractional_offset_rounds_up_to_next_half() {
        assert_eq!(desired(20.1, 19.5, 19.1), DegreeCelsius(20.5));
    }

    #[test]
    fn desired_target_is_clamped() {
        assert_eq!(desired(20.0, 30.0, 10.0), DegreeCelsius(32.0));
        assert_eq!(desired(18.0, 10.0, 25.0), DegreeCelsius(7.0));
    }
}
