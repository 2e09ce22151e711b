use derive_more::{Display, Error};

use crate::core::id::{ClimateId, RoomName};

/// Composition defects of the reconciliation graph. These are never recovered from: the
/// affected computation is abandoned and the violation is logged.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum InvariantViolation {
    #[display("target temperature inputs disagree on room: scheduled={scheduled}, mode={mode}, adjustment={adjustment}")]
    MismatchedRoom {
        scheduled: RoomName,
        mode: RoomName,
        adjustment: RoomName,
    },

    #[display("control state of {actual} joined into decision for {expected}")]
    MismatchedClimateEntity { expected: ClimateId, actual: ClimateId },
}
