use std::time::Duration;

use tokio::{sync::mpsc, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::UpdateSource;
use crate::system::HeatingInput;

/// Polls an [`UpdateSource`] at most once per refresh interval and forwards what it returns.
/// A slow fetch delays the next one instead of queueing up missed polls.
pub struct Poller<S: UpdateSource> {
    source: S,
    refresh_interval: Duration,
    sender: mpsc::Sender<HeatingInput>,
}

impl<S: UpdateSource> Poller<S> {
    pub fn new(source: S, refresh_interval: Duration, sender: mpsc::Sender<HeatingInput>) -> Self {
        Self {
            source,
            refresh_interval,
            sender,
        }
    }

    pub async fn run(mut self, token: CancellationToken) {
        let mut timer = tokio::time::interval(self.refresh_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = timer.tick() => {}
            }

            let inputs = match self.source.fetch().await {
                Ok(inputs) => inputs,
                Err(e) => {
                    tracing::warn!("Error polling {}: {:?}", self.source.name(), e);
                    continue;
                }
            };

            tracing::debug!("Polled {} updates from {}", inputs.len(), self.source.name());

            for input in inputs {
                if let Err(e) = self.sender.send(input).await {
                    tracing::error!("Error forwarding update from {}, stopping: {}", self.source.name(), e);
                    return;
                }
            }
        }
    }
}
