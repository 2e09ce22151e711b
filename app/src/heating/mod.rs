mod action;
mod demand;
mod mode;
mod model;
mod target;
mod update;

pub use action::{TrvAction, determine_action};
pub use demand::HeatingDemand;
pub use mode::{house_mode, room_mode};
pub use model::*;
pub use target::{room_target_temperature, trv_desired_target_temperature};
pub use update::*;

use crate::core::DegreeCelsius;

/// Lowest target the devices accept, used for rooms that are switched off.
pub const MIN_TARGET: DegreeCelsius = DegreeCelsius(7.0);
/// Highest target the devices accept.
pub const MAX_TARGET: DegreeCelsius = DegreeCelsius(32.0);
/// Floor for occupied rooms and the fixed target while the house sleeps.
pub const COMFORT_FLOOR: DegreeCelsius = DegreeCelsius(15.0);
