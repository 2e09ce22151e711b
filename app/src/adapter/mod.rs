mod dispatcher;
mod poller;
pub mod stdio;

pub use dispatcher::ActionDispatcher;
pub use poller::Poller;

use std::future::Future;

use crate::heating::ClimateAction;
use crate::system::HeatingInput;

/// Device API the commands are applied through.
pub trait ClimateApi: Send + Sync + 'static {
    fn apply(&self, action: &ClimateAction) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Pull-based source of device and sensor reports.
pub trait UpdateSource: Send + 'static {
    fn name(&self) -> &str;

    fn fetch(&mut self) -> impl Future<Output = anyhow::Result<Vec<HeatingInput>>> + Send;
}
