pub mod adapter;
pub mod core;
pub mod heating;
pub mod home;
pub mod reactive;
pub mod schedule;
pub mod settings;
pub mod state;
pub mod system;

pub use settings::Settings;
