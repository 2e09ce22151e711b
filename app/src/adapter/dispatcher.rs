use std::sync::Arc;

use infrastructure::EventListener;
use tokio::{sync::mpsc, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::heating::{ActionResult, ClimateAction};
use crate::system::HeatingInput;

use super::ClimateApi;

/// Applies published commands through a [`ClimateApi`] and reports every outcome back to the
/// heating system. Calls run concurrently, so a slow or failing device delays nobody else.
pub struct ActionDispatcher<A: ClimateApi> {
    api: Arc<A>,
    actions: EventListener<ClimateAction>,
    results: mpsc::Sender<HeatingInput>,
}

impl<A: ClimateApi> ActionDispatcher<A> {
    pub fn new(api: A, actions: EventListener<ClimateAction>, results: mpsc::Sender<HeatingInput>) -> Self {
        Self {
            api: Arc::new(api),
            actions,
            results,
        }
    }

    pub async fn run(mut self, token: CancellationToken) {
        let mut calls: JoinSet<ActionResult> = JoinSet::new();

        loop {
            tokio::select! {
                _ = token.cancelled() => break,

                action = self.actions.recv() => match action {
                    Some(action) => {
                        calls.spawn(apply(Arc::clone(&self.api), action));
                    }
                    None => {
                        tracing::info!("Action stream closed, stopping dispatcher");
                        break;
                    }
                },

                Some(result) = calls.join_next(), if !calls.is_empty() => match result {
                    Ok(result) => {
                        if let Err(e) = self.results.send(HeatingInput::ActionResult(result)).await {
                            tracing::error!("Error reporting command result, heating system is gone: {}", e);
                            break;
                        }
                    }
                    Err(e) => tracing::error!("Command task failed: {}", e),
                },
            }
        }
    }
}

async fn apply<A: ClimateApi>(api: Arc<A>, action: ClimateAction) -> ActionResult {
    tracing::info!("Applying command {}", action);

    match api.apply(&action).await {
        Ok(()) => ActionResult { action, ok: true },
        Err(e) => {
            tracing::warn!("Command {} failed: {:?}", action, e);
            ActionResult { action, ok: false }
        }
    }
}
