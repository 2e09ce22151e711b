mod graph;
mod joins;

pub use graph::HeatingGraph;

use std::time::Duration;

use infrastructure::{EventBus, EventEmitter, EventListener};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
    time::MissedTickBehavior,
};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::core::{Timestamp, time};
use crate::heating::{
    ActionResult, ButtonEvent, ClimateAction, HeatingUpdate, RoomAdjustment, TemperatureSensorUpdate, TrvUpdate,
};
use crate::home::Home;
use crate::reactive::Debouncer;
use crate::state::{DeepHeatingState, StateMaterializer};

/// Everything that can enter the heating system from outside.
#[derive(Debug, Clone, PartialEq, derive_more::From, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeatingInput {
    Trv(TrvUpdate),
    Heating(HeatingUpdate),
    Sensor(TemperatureSensorUpdate),
    Button(ButtonEvent),
    Adjustment(RoomAdjustment),
    ActionResult(ActionResult),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_action_debounce_secs")]
    pub action_debounce_secs: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Program and arguments polled every refresh interval for JSON-lines reports.
    #[serde(default)]
    pub poll_command: Option<Vec<String>>,
}

fn default_tick_interval_secs() -> u64 {
    63
}

fn default_action_debounce_secs() -> u64 {
    5
}

fn default_refresh_interval_secs() -> u64 {
    60
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            action_debounce_secs: default_action_debounce_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            poll_command: None,
        }
    }
}

impl SystemConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn action_debounce(&self) -> Duration {
        Duration::from_secs(self.action_debounce_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Commands one device may have in flight before a slow listener starts losing them.
const ACTION_SLOTS_PER_DEVICE: usize = 8;

fn action_bus_capacity(home: &Home) -> usize {
    //room devices plus the plant
    (home.climate_entities().count() + 1) * ACTION_SLOTS_PER_DEVICE
}

pub struct HeatingSystem {
    graph: HeatingGraph,
    config: SystemConfig,
    clock: fn() -> Timestamp,
    input_tx: mpsc::Sender<HeatingInput>,
    input_rx: mpsc::Receiver<HeatingInput>,
    action_bus: EventBus<ClimateAction>,
    state_tx: watch::Sender<DeepHeatingState>,
}

/// A started [`HeatingSystem`]. Dropping it stops every task of the system.
pub struct RunningSystem {
    input_tx: mpsc::Sender<HeatingInput>,
    action_emitter: EventEmitter<ClimateAction>,
    state_rx: watch::Receiver<DeepHeatingState>,
    tasks: JoinSet<()>,
    cancel_on_drop: DropGuard,
}

impl HeatingSystem {
    pub fn new(home: Home, adjustments: Vec<RoomAdjustment>, config: SystemConfig) -> Self {
        Self::with_clock(home, adjustments, config, time::now)
    }

    pub fn with_clock(
        home: Home,
        adjustments: Vec<RoomAdjustment>,
        config: SystemConfig,
        clock: fn() -> Timestamp,
    ) -> Self {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (state_tx, _) = watch::channel(DeepHeatingState::default());
        let action_bus = EventBus::new("climate_actions", action_bus_capacity(&home));

        Self {
            graph: HeatingGraph::new(home, adjustments, clock()),
            config,
            clock,
            input_tx,
            input_rx,
            action_bus,
            state_tx,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<HeatingInput> {
        self.input_tx.clone()
    }

    pub fn subscribe_actions(&self) -> EventListener<ClimateAction> {
        self.action_bus.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DeepHeatingState> {
        self.state_tx.subscribe()
    }

    pub fn spawn(mut self) -> RunningSystem {
        let token = CancellationToken::new();
        let mut tasks = JoinSet::new();

        let materializer = StateMaterializer::new(
            self.graph.home().clone(),
            self.graph.state_streams(),
            self.state_tx.clone(),
        );
        tasks.spawn(materializer.run(token.child_token()));

        let action_emitter = self.action_bus.emitter();
        let runner = Runner {
            graph: self.graph,
            clock: self.clock,
            inputs: self.input_rx,
            debouncer: Debouncer::new(self.config.action_debounce()),
            actions: action_emitter.clone(),
        };
        tasks.spawn(runner.run(self.config.tick_interval(), token.child_token()));

        RunningSystem {
            input_tx: self.input_tx,
            action_emitter,
            state_rx: self.state_tx.subscribe(),
            tasks,
            cancel_on_drop: token.drop_guard(),
        }
    }
}

impl RunningSystem {
    pub fn sender(&self) -> mpsc::Sender<HeatingInput> {
        self.input_tx.clone()
    }

    pub fn subscribe_actions(&self) -> EventListener<ClimateAction> {
        self.action_emitter.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DeepHeatingState> {
        self.state_rx.clone()
    }

    /// Resolves once any task of the system stopped on its own.
    pub async fn stopped(&mut self) {
        if let Some(Err(e)) = self.tasks.join_next().await {
            tracing::error!("Heating system task failed: {}", e);
        }
    }

    pub async fn shutdown(self) {
        let RunningSystem {
            mut tasks,
            cancel_on_drop,
            ..
        } = self;

        drop(cancel_on_drop);

        while let Some(task) = tasks.join_next().await {
            if let Err(e) = task {
                tracing::error!("Heating system task failed during shutdown: {}", e);
            }
        }

        tracing::info!("Heating system stopped");
    }
}

struct Runner {
    graph: HeatingGraph,
    clock: fn() -> Timestamp,
    inputs: mpsc::Receiver<HeatingInput>,
    debouncer: Debouncer<crate::core::ClimateId, ClimateAction>,
    actions: EventEmitter<ClimateAction>,
}

impl Runner {
    async fn run(mut self, tick_interval: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,

                input = self.inputs.recv() => match input {
                    Some(input) => {
                        tracing::debug!("Handling input {:?}", input);
                        let actions = self.graph.handle(input, (self.clock)());
                        self.debounce(actions);
                    }
                    None => {
                        tracing::info!("All input senders dropped, stopping heating system");
                        break;
                    }
                },

                _ = ticker.tick() => {
                    let actions = self.graph.tick((self.clock)());
                    self.debounce(actions);
                }

                Some(action) = self.debouncer.next(), if !self.debouncer.is_empty() => {
                    tracing::info!("Publishing command {}", action);
                    self.actions.send(action);
                }
            }
        }
    }

    fn debounce(&mut self, actions: Vec<ClimateAction>) {
        for action in actions {
            self.debouncer.push(action.climate_entity_id.clone(), action);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::ClimateId;

    fn home_with_trvs(count: usize) -> Home {
        let ids: Vec<String> = (0..count).map(|i| format!("trv-{i}")).collect();

        serde_json::from_value(json!({
            "rooms": [{ "name": "Hall", "climate_entity_ids": ids }],
            "sleep_switch_id": "hall-switch",
            "heating_id": "boiler"
        }))
        .unwrap()
    }

    #[test]
    fn unread_commands_of_every_device_are_kept() {
        let system = HeatingSystem::new(home_with_trvs(100), vec![], SystemConfig::default());
        let mut listener = system.subscribe_actions();
        let emitter = system.action_bus.emitter();

        for i in 0..100 {
            emitter.send(ClimateAction::auto(ClimateId::from(format!("trv-{i}").as_str())));
        }
        emitter.send(ClimateAction::auto(ClimateId::from("boiler")));

        let received = std::iter::from_fn(|| listener.try_recv()).count();
        assert_eq!(received, 101);
    }
}
