use crate::core::{DegreeCelsius, InvariantViolation, range::Range};

use super::{ClimateAction, ClimateMode, TrvControlState, TrvDesiredTargetTemperature};

/// Command for a TRV. Same shape as any other climate command.
pub type TrvAction = ClimateAction;

/// Decides whether a TRV needs a command to reach its desired target.
///
/// The TRV is left on its own schedule (`auto`) while the desired target lies between what the
/// schedule asks for and what the TRV measures: the device would get there by itself. Otherwise
/// it is forced to `heat` at the desired target. Only differences to the current control state
/// produce a command, and a TRV switched off by hand is never touched.
pub fn determine_action(
    desired: &TrvDesiredTargetTemperature,
    current: &TrvControlState,
    trv_temperature: DegreeCelsius,
    trv_scheduled_target: DegreeCelsius,
) -> Result<Option<TrvAction>, InvariantViolation> {
    if desired.climate_entity_id != current.climate_entity_id {
        return Err(InvariantViolation::MismatchedClimateEntity {
            expected: desired.climate_entity_id.clone(),
            actual: current.climate_entity_id.clone(),
        });
    }

    if current.mode == ClimateMode::Off {
        return Ok(None);
    }

    let candidate = if Range::new(trv_scheduled_target, trv_temperature).contains(&desired.target) {
        ClimateAction::auto(desired.climate_entity_id.clone())
    } else {
        ClimateAction::heat(desired.climate_entity_id.clone(), desired.target)
    };

    let mode_changed = candidate.mode != current.mode;
    let target_changed = candidate.mode == ClimateMode::Heat && desired.target != current.target;

    Ok((mode_changed || target_changed).then_some(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClimateId;
    use crate::heating::ControlSource;

    fn desired(target: f64) -> TrvDesiredTargetTemperature {
        TrvDesiredTargetTemperature {
            climate_entity_id: ClimateId::from("trv"),
            target: DegreeCelsius(target),
        }
    }

    fn current(mode: ClimateMode, target: f64) -> TrvControlState {
        TrvControlState {
            climate_entity_id: ClimateId::from("trv"),
            target: DegreeCelsius(target),
            mode,
            source: ControlSource::Device,
        }
    }

    fn decide(
        desired_target: f64,
        mode: ClimateMode,
        current_target: f64,
        measured: f64,
        scheduled: f64,
    ) -> Option<TrvAction> {
        determine_action(
            &desired(desired_target),
            &current(mode, current_target),
            DegreeCelsius(measured),
            DegreeCelsius(scheduled),
        )
        .unwrap()
    }

    #[test]
    fn trv_switched_off_is_left_alone() {
        assert_eq!(decide(23.0, ClimateMode::Off, 7.0, 18.5, 18.0), None);
    }

    #[test]
    fn desired_outside_range_forces_heat() {
        assert_eq!(
            decide(23.0, ClimateMode::Auto, 18.0, 18.5, 18.0),
            Some(ClimateAction::heat(ClimateId::from("trv"), DegreeCelsius(23.0)))
        );
    }

    #[test]
    fn desired_inside_range_returns_to_auto() {
        assert_eq!(
            decide(23.0, ClimateMode::Heat, 23.0, 18.5, 23.0),
            Some(ClimateAction::auto(ClimateId::from("trv")))
        );
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert_eq!(decide(18.0, ClimateMode::Auto, 18.0, 20.0, 18.0), None);
        assert_eq!(decide(20.0, ClimateMode::Auto, 18.0, 20.0, 18.0), None);
        assert_eq!(decide(20.0, ClimateMode::Auto, 18.0, 18.0, 20.0), None);
        assert_eq!(
            decide(20.5, ClimateMode::Auto, 18.0, 20.0, 18.0),
            Some(ClimateAction::heat(ClimateId::from("trv"), DegreeCelsius(20.5)))
        );
    }

    #[test]
    fn heat_with_same_target_needs_no_command() {
        assert_eq!(decide(23.0, ClimateMode::Heat, 23.0, 18.5, 18.0), None);
    }

    #[test]
    fn heat_with_other_target_is_updated() {
        assert_eq!(
            decide(22.0, ClimateMode::Heat, 23.0, 18.5, 18.0),
            Some(ClimateAction::heat(ClimateId::from("trv"), DegreeCelsius(22.0)))
        );
    }

    #[test]
    fn auto_candidate_ignores_target_difference() {
        assert_eq!(decide(19.0, ClimateMode::Auto, 25.0, 18.0, 20.0), None);
    }

    #[test]
    fn control_state_of_other_trv_is_a_violation() {
        let result = determine_action(
            &desired(21.0),
            &TrvControlState {
                climate_entity_id: ClimateId::from("other"),
                ..current(ClimateMode::Auto, 20.0)
            },
            DegreeCelsius(19.0),
            DegreeCelsius(20.0),
        );

        assert!(matches!(result, Err(InvariantViolation::MismatchedClimateEntity { .. })));
    }
}
