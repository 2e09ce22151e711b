mod config;

pub use config::{Home, RoomDefinition};
