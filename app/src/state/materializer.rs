use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::core::{ClimateId, RoomName, time};
use crate::heating::{
    ClimateEntityStatus, RoomAdjustment, RoomHeatingStatus, RoomMode, RoomTargetTemperature, RoomTemperature,
    TemperatureReading, TrvControlState, TrvDesiredTargetTemperature, TrvTemperature,
};
use crate::home::Home;
use crate::reactive::Subscription;

use super::{DeepHeatingState, StateUpdate};

/// The streams the snapshot is built from, one subscription each.
pub struct StateStreams {
    pub radiator_temperatures: Subscription<TrvTemperature>,
    pub radiator_targets: Subscription<TrvControlState>,
    pub radiator_statuses: Subscription<ClimateEntityStatus>,
    pub radiator_desired_targets: Subscription<TrvDesiredTargetTemperature>,
    pub room_temperatures: Subscription<RoomTemperature>,
    pub room_targets: Subscription<RoomTargetTemperature>,
    pub room_modes: Subscription<RoomMode>,
    pub room_statuses: Subscription<RoomHeatingStatus>,
    pub room_adjustments: Subscription<RoomAdjustment>,
    pub heating_status: Subscription<ClimateEntityStatus>,
}

/// Sole owner of the snapshot. Every stream is applied as it arrives and the full snapshot is
/// published after each individual update.
pub struct StateMaterializer {
    home: Home,
    state: DeepHeatingState,
    streams: StateStreams,
    tx: watch::Sender<DeepHeatingState>,
}

impl StateMaterializer {
    pub fn new(home: Home, streams: StateStreams, tx: watch::Sender<DeepHeatingState>) -> Self {
        Self {
            home,
            state: DeepHeatingState::default(),
            streams,
            tx,
        }
    }

    pub async fn run(mut self, token: CancellationToken) {
        loop {
            let streams = &mut self.streams;

            let update = tokio::select! {
                _ = token.cancelled() => break,
                Some(t) = streams.radiator_temperatures.recv() => {
                    self.radiator(&t.climate_entity_id, |room_name, climate_entity_id| StateUpdate::RadiatorTemperature {
                        room_name,
                        climate_entity_id,
                        reading: t.reading,
                    })
                }
                Some(c) = streams.radiator_targets.recv() => {
                    self.radiator(&c.climate_entity_id, |room_name, climate_entity_id| StateUpdate::RadiatorTarget {
                        room_name,
                        climate_entity_id,
                        reading: TemperatureReading::new(c.target, time::now()),
                    })
                }
                Some(s) = streams.radiator_statuses.recv() => {
                    self.radiator(&s.climate_entity_id, |room_name, climate_entity_id| StateUpdate::RadiatorHeating {
                        room_name,
                        climate_entity_id,
                        is_heating: s.is_heating,
                    })
                }
                Some(d) = streams.radiator_desired_targets.recv() => {
                    self.radiator(&d.climate_entity_id, |room_name, climate_entity_id| {
                        StateUpdate::RadiatorDesiredTarget {
                            room_name,
                            climate_entity_id,
                            reading: TemperatureReading::new(d.target, time::now()),
                        }
                    })
                }
                Some(t) = streams.room_temperatures.recv() => Some(StateUpdate::RoomTemperature(t)),
                Some(t) = streams.room_targets.recv() => Some(StateUpdate::RoomTarget(t)),
                Some(m) = streams.room_modes.recv() => Some(StateUpdate::RoomMode(m)),
                Some(s) = streams.room_statuses.recv() => Some(StateUpdate::RoomHeating(s)),
                Some(a) = streams.room_adjustments.recv() => Some(StateUpdate::RoomAdjustment(a)),
                Some(s) = streams.heating_status.recv() => Some(StateUpdate::HeatingStatus(s.is_heating)),
                else => {
                    tracing::error!("All state streams closed, stopping state materializer");
                    break;
                }
            };

            if let Some(update) = update {
                tracing::trace!("Applying state update {:?}", update);
                self.state.apply(update);
                self.tx.send_replace(self.state.clone());
            }
        }
    }

    fn radiator(
        &self,
        id: &ClimateId,
        update: impl FnOnce(RoomName, ClimateId) -> StateUpdate,
    ) -> Option<StateUpdate> {
        match self.home.room_of_climate_entity(id) {
            Some(room) => Some(update(room.name.clone(), id.clone())),
            None => {
                tracing::warn!("Radiator {} belongs to no room, not adding to state", id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::DegreeCelsius;
    use crate::heating::{ClimateMode, ControlSource};
    use crate::reactive::KeyedReplay;

    struct Sources {
        radiator_temperatures: KeyedReplay<ClimateId, TrvTemperature>,
        radiator_targets: KeyedReplay<ClimateId, TrvControlState>,
        radiator_statuses: KeyedReplay<ClimateId, ClimateEntityStatus>,
        radiator_desired_targets: KeyedReplay<ClimateId, TrvDesiredTargetTemperature>,
        room_temperatures: KeyedReplay<RoomName, RoomTemperature>,
        room_targets: KeyedReplay<RoomName, RoomTargetTemperature>,
        room_modes: KeyedReplay<RoomName, RoomMode>,
        room_statuses: KeyedReplay<RoomName, RoomHeatingStatus>,
        room_adjustments: KeyedReplay<RoomName, RoomAdjustment>,
        heating_status: KeyedReplay<ClimateId, ClimateEntityStatus>,
    }

    impl Sources {
        fn new() -> Self {
            Self {
                radiator_temperatures: KeyedReplay::distinct(
                    "trv_temperatures",
                    |t: &TrvTemperature| t.climate_entity_id.clone(),
                ),
                radiator_targets: KeyedReplay::with_equality(
                    "trv_control_states",
                    |c: &TrvControlState| c.climate_entity_id.clone(),
                    TrvControlState::same_control,
                ),
                radiator_statuses: KeyedReplay::with_equality(
                    "trv_statuses",
                    |s: &ClimateEntityStatus| s.climate_entity_id.clone(),
                    ClimateEntityStatus::same_status,
                ),
                radiator_desired_targets: KeyedReplay::distinct(
                    "trv_desired",
                    |d: &TrvDesiredTargetTemperature| d.climate_entity_id.clone(),
                ),
                room_temperatures: KeyedReplay::distinct(
                    "room_temperatures",
                    |t: &RoomTemperature| t.room_name.clone(),
                ),
                room_targets: KeyedReplay::distinct("room_targets", |t: &RoomTargetTemperature| t.room_name.clone()),
                room_modes: KeyedReplay::distinct("room_modes", |m: &RoomMode| m.room_name.clone()),
                room_statuses: KeyedReplay::distinct("room_statuses", |s: &RoomHeatingStatus| s.room_name.clone()),
                room_adjustments: KeyedReplay::distinct("room_adjustments", |a: &RoomAdjustment| a.room_name.clone()),
                heating_status: KeyedReplay::with_equality(
                    "heating_status",
                    |s: &ClimateEntityStatus| s.climate_entity_id.clone(),
                    ClimateEntityStatus::same_status,
                ),
            }
        }

        fn streams(&mut self) -> StateStreams {
            StateStreams {
                radiator_temperatures: self.radiator_temperatures.subscribe(),
                radiator_targets: self.radiator_targets.subscribe(),
                radiator_statuses: self.radiator_statuses.subscribe(),
                radiator_desired_targets: self.radiator_desired_targets.subscribe(),
                room_temperatures: self.room_temperatures.subscribe(),
                room_targets: self.room_targets.subscribe(),
                room_modes: self.room_modes.subscribe(),
                room_statuses: self.room_statuses.subscribe(),
                room_adjustments: self.room_adjustments.subscribe(),
                heating_status: self.heating_status.subscribe(),
            }
        }
    }

    fn home() -> Home {
        serde_json::from_value(json!({
            "rooms": [{ "name": "Lounge", "climate_entity_ids": ["trv-lounge"] }],
            "sleep_switch_id": "hall-switch",
            "heating_id": "boiler"
        }))
        .unwrap()
    }

    async fn wait_for(
        rx: &mut watch::Receiver<DeepHeatingState>,
        condition: impl FnMut(&DeepHeatingState) -> bool,
    ) -> DeepHeatingState {
        rx.wait_for(condition).await.unwrap().clone()
    }

    #[tokio::test]
    async fn snapshot_follows_each_stream() {
        let mut sources = Sources::new();
        let (tx, mut rx) = watch::channel(DeepHeatingState::default());
        let token = CancellationToken::new();

        let materializer = StateMaterializer::new(home(), sources.streams(), tx);
        let task = tokio::spawn(materializer.run(token.clone()));

        sources.room_temperatures.push(RoomTemperature {
            room_name: RoomName::from("Lounge"),
            reading: TemperatureReading::new(DegreeCelsius(19.5), time::now()),
        });
        sources.radiator_targets.push(TrvControlState {
            climate_entity_id: ClimateId::from("trv-lounge"),
            target: DegreeCelsius(21.0),
            mode: ClimateMode::Heat,
            source: ControlSource::Device,
        });
        sources.heating_status.push(ClimateEntityStatus {
            climate_entity_id: ClimateId::from("boiler"),
            is_heating: true,
            source: ControlSource::Device,
        });

        let state = wait_for(&mut rx, |state| {
            state.is_heating.is_some()
                && state
                    .rooms
                    .first()
                    .is_some_and(|room| room.temperature.is_some() && !room.radiators.is_empty())
        })
        .await;

        assert_eq!(state.rooms.len(), 1);
        assert_eq!(
            state.rooms[0].radiators[0].target_temperature.map(|r| r.temperature),
            Some(DegreeCelsius(21.0))
        );
        assert_eq!(state.is_heating, Some(true));

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn radiator_of_unknown_room_is_skipped() {
        let mut sources = Sources::new();
        let (tx, mut rx) = watch::channel(DeepHeatingState::default());
        let token = CancellationToken::new();

        sources.radiator_statuses.push(ClimateEntityStatus {
            climate_entity_id: ClimateId::from("trv-attic"),
            is_heating: true,
            source: ControlSource::Device,
        });
        sources.room_modes.push(RoomMode {
            room_name: RoomName::from("Lounge"),
            mode: crate::heating::RoomModeValue::Auto,
        });

        let task = tokio::spawn(StateMaterializer::new(home(), sources.streams(), tx).run(token.clone()));

        let state = wait_for(&mut rx, |state| !state.rooms.is_empty()).await;
        token.cancel();
        task.await.unwrap();

        assert_eq!(state.rooms.len(), 1);
        assert!(state.rooms[0].radiators.is_empty());
    }
}
