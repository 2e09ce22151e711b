pub mod error;
pub mod id;
pub mod range;
pub mod time;
pub mod unit;

pub use error::InvariantViolation;
pub use id::{ClimateId, RoomName, SensorId};
pub use time::Timestamp;
pub use unit::DegreeCelsius;
