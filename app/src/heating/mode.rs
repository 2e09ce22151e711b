use chrono::Timelike;

use crate::core::{RoomName, Timestamp};

use super::{ClimateMode, HouseMode, RoomMode, RoomModeValue};

const NIGHT_ENDS_AT_HOUR: u32 = 5;
const GOODNIGHT_FROM_HOUR: u32 = 20;

/// Sleeping before 5am, or after a goodnight press made today from 8pm on.
pub fn house_mode(now: &Timestamp, last_goodnight: Option<&Timestamp>) -> HouseMode {
    if now.hour() < NIGHT_ENDS_AT_HOUR {
        return HouseMode::Sleeping;
    }

    match last_goodnight {
        Some(pressed) if pressed.date_naive() == now.date_naive() && pressed.hour() >= GOODNIGHT_FROM_HOUR => {
            HouseMode::Sleeping
        }
        _ => HouseMode::Auto,
    }
}

/// A TRV switched off by hand takes its whole room out of the schedule.
pub fn room_mode<'a>(
    room_name: &RoomName,
    house_mode: HouseMode,
    trv_modes: impl IntoIterator<Item = &'a ClimateMode>,
) -> RoomMode {
    let mode = if trv_modes.into_iter().any(|mode| *mode == ClimateMode::Off) {
        RoomModeValue::Off
    } else {
        house_mode.into()
    };

    RoomMode {
        room_name: room_name.clone(),
        mode,
    }
}
