use std::sync::Arc;

use crate::core::{ClimateId, DegreeCelsius, InvariantViolation, RoomName, Timestamp};
use crate::heating::{
    ActionResult, ButtonEvent, ClimateAction, ClimateEntityStatus, ClimateMode, ControlSource, HeatingDemand,
    HeatingUpdate, HouseMode, MIN_TARGET, RoomAdjustment, RoomDecisionPoint, RoomHeatingStatus, RoomMode,
    RoomScheduledTarget, RoomTargetTemperature, RoomTemperature, TemperatureReading, TemperatureSensorUpdate,
    TrvControlState, TrvDesiredTargetTemperature, TrvSchedule, TrvScheduledTarget, TrvTemperature,
    TrvUpdate, house_mode, room_mode, trv_desired_target_temperature,
};
use crate::home::{Home, RoomDefinition};
use crate::reactive::{JoinArena, KeyedReplay};
use crate::schedule::{WeekSchedule, scheduled_target};
use crate::state::StateStreams;

use super::HeatingInput;
use super::joins::{RoomDecisionInputs, RoomTargetInputs, TrvActionInputs};

/// The reconciliation graph of one household.
///
/// Every derived value lives in a [`KeyedReplay`] keyed by room or device, so a change only
/// travels further when it actually changed something. Multi-input steps are latest-value joins
/// in [`JoinArena`]s. The graph is synchronous and has exactly one writer; commands produced while
/// handling an input are returned to the caller.
pub struct HeatingGraph {
    home: Arc<Home>,
    now: Timestamp,
    house_mode: HouseMode,
    last_goodnight: Option<Timestamp>,
    demand: HeatingDemand,

    trv_temperatures: KeyedReplay<ClimateId, TrvTemperature>,
    trv_control_states: KeyedReplay<ClimateId, TrvControlState>,
    trv_statuses: KeyedReplay<ClimateId, ClimateEntityStatus>,
    trv_schedules: KeyedReplay<ClimateId, TrvSchedule>,
    trv_scheduled_targets: KeyedReplay<ClimateId, TrvScheduledTarget>,
    trv_desired_targets: KeyedReplay<ClimateId, TrvDesiredTargetTemperature>,
    room_temperatures: KeyedReplay<RoomName, RoomTemperature>,
    room_scheduled_targets: KeyedReplay<RoomName, RoomScheduledTarget>,
    room_modes: KeyedReplay<RoomName, RoomMode>,
    room_adjustments: KeyedReplay<RoomName, RoomAdjustment>,
    room_targets: KeyedReplay<RoomName, RoomTargetTemperature>,
    room_statuses: KeyedReplay<RoomName, RoomHeatingStatus>,
    heating_status: KeyedReplay<ClimateId, ClimateEntityStatus>,

    room_target_inputs: JoinArena<RoomName, RoomTargetInputs>,
    room_decision_inputs: JoinArena<RoomName, RoomDecisionInputs>,
    trv_action_inputs: JoinArena<ClimateId, TrvActionInputs>,

    actions: Vec<ClimateAction>,
    trv_decisions_due: Vec<ClimateId>,
}

impl HeatingGraph {
    pub fn new(home: Home, adjustments: Vec<RoomAdjustment>, now: Timestamp) -> Self {
        let demand = HeatingDemand::new(home.heating_id.clone());

        let mut graph = Self {
            home: Arc::new(home),
            now,
            house_mode: house_mode(&now, None),
            last_goodnight: None,
            demand,

            trv_temperatures: KeyedReplay::distinct(
                "trv_temperatures",
                |t: &TrvTemperature| t.climate_entity_id.clone(),
            ),
            trv_control_states: KeyedReplay::with_equality(
                "trv_control_states",
                |c: &TrvControlState| c.climate_entity_id.clone(),
                TrvControlState::same_control,
            ),
            trv_statuses: KeyedReplay::with_equality(
                "trv_statuses",
                |s: &ClimateEntityStatus| s.climate_entity_id.clone(),
                ClimateEntityStatus::same_status,
            ),
            trv_schedules: KeyedReplay::distinct("trv_schedules", |s: &TrvSchedule| s.climate_entity_id.clone()),
            trv_scheduled_targets: KeyedReplay::distinct(
                "trv_scheduled_targets",
                |t: &TrvScheduledTarget| t.climate_entity_id.clone(),
            ),
            trv_desired_targets: KeyedReplay::distinct(
                "trv_desired_targets",
                |d: &TrvDesiredTargetTemperature| d.climate_entity_id.clone(),
            ),
            room_temperatures: KeyedReplay::distinct("room_temperatures", |t: &RoomTemperature| t.room_name.clone()),
            room_scheduled_targets: KeyedReplay::distinct(
                "room_scheduled_targets",
                |t: &RoomScheduledTarget| t.room_name.clone(),
            ),
            room_modes: KeyedReplay::distinct("room_modes", |m: &RoomMode| m.room_name.clone()),
            room_adjustments: KeyedReplay::distinct("room_adjustments", |a: &RoomAdjustment| a.room_name.clone()),
            room_targets: KeyedReplay::distinct("room_targets", |t: &RoomTargetTemperature| t.room_name.clone()),
            room_statuses: KeyedReplay::distinct("room_statuses", |s: &RoomHeatingStatus| s.room_name.clone()),
            heating_status: KeyedReplay::with_equality(
                "heating_status",
                |s: &ClimateEntityStatus| s.climate_entity_id.clone(),
                ClimateEntityStatus::same_status,
            ),

            room_target_inputs: JoinArena::new(),
            room_decision_inputs: JoinArena::new(),
            trv_action_inputs: JoinArena::new(),

            actions: vec![],
            trv_decisions_due: vec![],
        };

        for adjustment in adjustments {
            graph.on_room_adjustment(adjustment);
        }

        let home = Arc::clone(&graph.home);
        for room in &home.rooms {
            if graph.room_adjustments.get(&room.name).is_none() {
                graph.set_room_adjustment(RoomAdjustment::none(room.name.clone()));
            }
        }

        graph.refresh_house_mode();
        graph.refresh_schedules();

        graph
    }

    pub fn home(&self) -> &Home {
        &self.home
    }

    /// Applies one inbound update and returns the commands it caused, at most one per device.
    pub fn handle(&mut self, input: HeatingInput, now: Timestamp) -> Vec<ClimateAction> {
        self.now = now;

        match input {
            HeatingInput::Trv(update) => self.on_trv_update(update),
            HeatingInput::Heating(update) => self.on_heating_update(update),
            HeatingInput::Sensor(update) => self.on_sensor_update(update),
            HeatingInput::Button(event) => self.on_button_event(event),
            HeatingInput::Adjustment(adjustment) => self.on_room_adjustment(adjustment),
            HeatingInput::ActionResult(result) => self.on_action_result(result),
        }

        self.take_actions()
    }

    /// Re-evaluates everything that depends on the wall clock: house mode and schedules.
    pub fn tick(&mut self, now: Timestamp) -> Vec<ClimateAction> {
        self.now = now;

        self.refresh_house_mode();
        self.refresh_schedules();

        self.take_actions()
    }

    /// Subscriptions for the state materializer. Each starts with the current values.
    pub fn state_streams(&mut self) -> StateStreams {
        StateStreams {
            radiator_temperatures: self.trv_temperatures.subscribe(),
            radiator_targets: self.trv_control_states.subscribe(),
            radiator_statuses: self.trv_statuses.subscribe(),
            radiator_desired_targets: self.trv_desired_targets.subscribe(),
            room_temperatures: self.room_temperatures.subscribe(),
            room_targets: self.room_targets.subscribe(),
            room_modes: self.room_modes.subscribe(),
            room_statuses: self.room_statuses.subscribe(),
            room_adjustments: self.room_adjustments.subscribe(),
            heating_status: self.heating_status.subscribe(),
        }
    }

    pub fn house_mode(&self) -> HouseMode {
        self.house_mode
    }

    pub fn room_mode(&self, room_name: &RoomName) -> Option<&RoomMode> {
        self.room_modes.get(room_name)
    }

    pub fn room_target(&self, room_name: &RoomName) -> Option<DegreeCelsius> {
        self.room_targets.get(room_name).map(|t| t.target)
    }

    pub fn room_temperature(&self, room_name: &RoomName) -> Option<DegreeCelsius> {
        self.room_temperatures.get(room_name).map(|t| t.reading.temperature)
    }

    pub fn desired_target(&self, id: &ClimateId) -> Option<DegreeCelsius> {
        self.trv_desired_targets.get(id).map(|d| d.target)
    }

    pub fn control_state(&self, id: &ClimateId) -> Option<&TrvControlState> {
        self.trv_control_states.get(id)
    }

    fn take_actions(&mut self) -> Vec<ClimateAction> {
        //TRVs decide once per input on their final join state, intermediate states never leak out
        for id in std::mem::take(&mut self.trv_decisions_due) {
            match self.trv_action_inputs.combine(&id) {
                Some(Ok(action)) => {
                    tracing::info!("Emitting command {}", action);
                    self.actions.push(action);
                }
                Some(Err(e)) => tracing::error!("Skipping TRV decision: {}", e),
                None => {}
            }
        }

        let mut actions: Vec<ClimateAction> = vec![];

        //a later command for the same device supersedes an earlier one
        for action in std::mem::take(&mut self.actions) {
            actions.retain(|a| a.climate_entity_id != action.climate_entity_id);
            actions.push(action);
        }

        actions
    }

    // INBOUND

    fn on_trv_update(&mut self, update: TrvUpdate) {
        if self.home.room_of_climate_entity(&update.id).is_none() {
            tracing::warn!("Ignoring update of unknown TRV {} ({})", update.id, update.name);
            return;
        }

        if !update.is_valid() {
            tracing::warn!("Ignoring malformed update of TRV {}: {:?}", update.id, update);
            return;
        }

        tracing::debug!(
            "TRV {} reports {} (target {}, mode {}, heating {})",
            update.id,
            update.temperature.temperature,
            update.target,
            update.mode,
            update.is_heating
        );

        self.set_trv_temperature(TrvTemperature {
            climate_entity_id: update.id.clone(),
            reading: update.temperature,
        });

        self.set_trv_control_state(TrvControlState {
            climate_entity_id: update.id.clone(),
            target: update.target,
            mode: update.mode,
            source: ControlSource::Device,
        });

        self.set_trv_status(ClimateEntityStatus {
            climate_entity_id: update.id.clone(),
            is_heating: update.is_heating,
            source: ControlSource::Device,
        });

        //repeated reports still re-issue a plant command that was lost
        self.update_demand(&update.id);

        if let Some(schedule) = update.schedule {
            self.set_trv_schedule(TrvSchedule {
                climate_entity_id: update.id,
                schedule,
            });
        }
    }

    fn on_heating_update(&mut self, update: HeatingUpdate) {
        if &update.id != self.demand.heating_id() {
            tracing::warn!("Ignoring update of foreign heating plant {} ({})", update.id, update.name);
            return;
        }

        if !update.is_valid() {
            tracing::warn!("Ignoring malformed update of heating plant {}: {:?}", update.id, update);
            return;
        }

        tracing::debug!("Heating plant {} reports heating {}", update.id, update.is_heating);

        self.heating_status.push(ClimateEntityStatus {
            climate_entity_id: update.id,
            is_heating: update.is_heating,
            source: ControlSource::Device,
        });

        if let Some(action) = self.demand.evaluate() {
            self.actions.push(action);
        }
    }

    fn on_sensor_update(&mut self, update: TemperatureSensorUpdate) {
        if !update.is_valid() {
            tracing::warn!("Ignoring malformed reading of sensor {}: {:?}", update.id, update.temperature);
            return;
        }

        let home = Arc::clone(&self.home);
        let mut rooms = home.rooms_with_sensor(&update.id).peekable();

        if rooms.peek().is_none() {
            tracing::warn!("Ignoring reading of sensor {} that belongs to no room", update.id);
            return;
        }

        for room in rooms {
            tracing::debug!("Room {} measures {}", room.name, update.temperature.temperature);
            self.set_room_temperature(RoomTemperature {
                room_name: room.name.clone(),
                reading: update.temperature,
            });
        }
    }

    fn on_button_event(&mut self, event: ButtonEvent) {
        if event.switch_id != self.home.sleep_switch_id {
            tracing::debug!("Ignoring press of switch {}", event.switch_id);
            return;
        }

        tracing::info!("Goodnight switch pressed at {}", event.time);

        self.last_goodnight = match self.last_goodnight {
            Some(last) if last > event.time => Some(last),
            _ => Some(event.time),
        };

        self.refresh_house_mode();
    }

    fn on_room_adjustment(&mut self, adjustment: RoomAdjustment) {
        if self.home.room(&adjustment.room_name).is_none() {
            tracing::warn!("Ignoring adjustment of unknown room {}", adjustment.room_name);
            return;
        }

        if !adjustment.adjustment.is_finite() {
            tracing::warn!("Ignoring non-finite adjustment of room {}", adjustment.room_name);
            return;
        }

        self.set_room_adjustment(adjustment);
    }

    fn on_action_result(&mut self, result: ActionResult) {
        let ActionResult { action, ok } = result;

        if &action.climate_entity_id == self.demand.heating_id() {
            if ok {
                let is_heating = action.target_temperature.is_some_and(|target| target > MIN_TARGET);
                self.heating_status.push(ClimateEntityStatus {
                    climate_entity_id: action.climate_entity_id,
                    is_heating,
                    source: ControlSource::Synthesised,
                });
            } else {
                tracing::warn!("Command {} for heating plant failed, repeating it with the next report", action);
                self.demand.forget_edge();
            }

            return;
        }

        if self.home.room_of_climate_entity(&action.climate_entity_id).is_none() {
            tracing::warn!("Ignoring result of command {} for unknown device", action);
            return;
        }

        if !ok {
            tracing::warn!("Command {} failed, waiting for the next device report", action);
            return;
        }

        let target = match action.mode {
            ClimateMode::Heat => action.target_temperature,
            ClimateMode::Auto => self
                .trv_scheduled_targets
                .get(&action.climate_entity_id)
                .map(|t| t.target),
            ClimateMode::Off => Some(MIN_TARGET),
        };

        let Some(target) = target else {
            tracing::debug!("No target known for accepted command {}, waiting for device report", action);
            return;
        };

        self.set_trv_control_state(TrvControlState {
            climate_entity_id: action.climate_entity_id,
            target,
            mode: action.mode,
            source: ControlSource::Synthesised,
        });
    }

    // TRV

    fn set_trv_temperature(&mut self, temperature: TrvTemperature) {
        if !self.trv_temperatures.push(temperature.clone()) {
            return;
        }

        let home = Arc::clone(&self.home);
        let Some(room) = home.room_of_climate_entity(&temperature.climate_entity_id) else {
            return;
        };

        let id = &temperature.climate_entity_id;
        let value = temperature.reading.temperature;

        self.trv_action_inputs.update(id, |inputs| inputs.temperature = Some(value));
        self.trv_decision_due(id);

        let point = self.room_decision_inputs.write(&room.name, |inputs| {
            inputs.trv_temperatures.insert(id.clone(), value);
        });
        self.on_room_decision_point(point);

        self.update_demand(id);

        if room.temperature_sensor_id.is_none() {
            self.refresh_room_temperature_from_trvs(room);
        }
    }

    fn set_trv_control_state(&mut self, state: TrvControlState) {
        if !self.trv_control_states.push(state.clone()) {
            return;
        }

        let home = Arc::clone(&self.home);
        let Some(room) = home.room_of_climate_entity(&state.climate_entity_id) else {
            return;
        };

        let id = state.climate_entity_id.clone();
        let (target, mode) = (state.target, state.mode);

        self.trv_action_inputs.update(&id, |inputs| inputs.control = Some(state));
        self.trv_decision_due(&id);

        let point = self.room_decision_inputs.write(&room.name, |inputs| {
            inputs.trv_targets.insert(id.clone(), target);
            inputs.trv_modes.insert(id.clone(), mode);
        });
        self.on_room_decision_point(point);

        self.refresh_room_mode(room);
        self.update_demand(&id);
    }

    fn set_trv_status(&mut self, status: ClimateEntityStatus) {
        if !self.trv_statuses.push(status.clone()) {
            return;
        }

        let home = Arc::clone(&self.home);
        if let Some(room) = home.room_of_climate_entity(&status.climate_entity_id) {
            self.refresh_room_status(room);
        }
    }

    fn set_trv_schedule(&mut self, schedule: TrvSchedule) {
        if !self.trv_schedules.push(schedule.clone()) {
            return;
        }

        let home = Arc::clone(&self.home);
        if let Some(room) = home.room_of_climate_entity(&schedule.climate_entity_id) {
            self.refresh_room_schedule(room);
        }
    }

    fn set_trv_desired_target(&mut self, desired: TrvDesiredTargetTemperature) {
        if !self.trv_desired_targets.push(desired.clone()) {
            return;
        }

        tracing::debug!("Desired target of TRV {} is {}", desired.climate_entity_id, desired.target);

        let id = desired.climate_entity_id.clone();
        self.trv_action_inputs.update(&id, |inputs| inputs.desired = Some(desired));
        self.trv_decision_due(&id);
    }

    /// The TRV's own schedule wins, the room's schedule stands in for TRVs without one.
    fn refresh_trv_scheduled_target(&mut self, room: &RoomDefinition, id: &ClimateId) {
        let own = self
            .trv_schedules
            .get(id)
            .and_then(|s| scheduled_target(&s.schedule, &self.now));

        let Some(target) = own.or_else(|| self.room_scheduled_targets.get(&room.name).map(|t| t.target)) else {
            return;
        };

        let scheduled = TrvScheduledTarget {
            climate_entity_id: id.clone(),
            target,
        };

        if self.trv_scheduled_targets.push(scheduled) {
            self.trv_action_inputs.update(id, |inputs| inputs.scheduled_target = Some(target));
            self.trv_decision_due(id);
        }
    }

    fn trv_decision_due(&mut self, id: &ClimateId) {
        if !self.trv_decisions_due.contains(id) {
            self.trv_decisions_due.push(id.clone());
        }
    }

    fn update_demand(&mut self, id: &ClimateId) {
        let (Some(control), Some(temperature)) = (self.trv_control_states.get(id), self.trv_temperatures.get(id)) else {
            return;
        };

        if let Some(action) = self
            .demand
            .update(id, control.target, temperature.reading.temperature)
        {
            self.actions.push(action);
        }
    }

    // ROOM

    fn set_room_temperature(&mut self, temperature: RoomTemperature) {
        if !self.room_temperatures.push(temperature.clone()) {
            return;
        }

        let value = temperature.reading.temperature;
        let point = self
            .room_decision_inputs
            .write(&temperature.room_name, |inputs| inputs.temperature = Some(value));
        self.on_room_decision_point(point);
    }

    fn set_room_scheduled_target(&mut self, scheduled: RoomScheduledTarget) {
        if !self.room_scheduled_targets.push(scheduled.clone()) {
            return;
        }

        tracing::debug!("Scheduled target of room {} is {}", scheduled.room_name, scheduled.target);

        let room_name = scheduled.room_name.clone();
        let target = self
            .room_target_inputs
            .write(&room_name, |inputs| inputs.scheduled = Some(scheduled));
        self.on_room_target(target);
    }

    fn set_room_mode(&mut self, mode: RoomMode) {
        if !self.room_modes.push(mode.clone()) {
            return;
        }

        tracing::info!("Room {} is now in mode {}", mode.room_name, mode.mode);

        let room_name = mode.room_name.clone();
        let target = self.room_target_inputs.write(&room_name, |inputs| inputs.mode = Some(mode));
        self.on_room_target(target);
    }

    fn set_room_adjustment(&mut self, adjustment: RoomAdjustment) {
        if !self.room_adjustments.push(adjustment.clone()) {
            return;
        }

        tracing::info!("Room {} adjusted by {}", adjustment.room_name, adjustment.adjustment);

        let room_name = adjustment.room_name.clone();
        let target = self
            .room_target_inputs
            .write(&room_name, |inputs| inputs.adjustment = Some(adjustment));
        self.on_room_target(target);
    }

    fn on_room_target(&mut self, target: Option<Result<RoomTargetTemperature, InvariantViolation>>) {
        match target {
            Some(Ok(target)) => self.set_room_target(target),
            Some(Err(e)) => tracing::error!("Skipping room target: {}", e),
            None => {}
        }
    }

    fn set_room_target(&mut self, target: RoomTargetTemperature) {
        if !self.room_targets.push(target.clone()) {
            return;
        }

        tracing::info!("Target of room {} is {}", target.room_name, target.target);

        let point = self
            .room_decision_inputs
            .write(&target.room_name, |inputs| inputs.target = Some(target.target));
        self.on_room_decision_point(point);
    }

    fn on_room_decision_point(&mut self, point: Option<RoomDecisionPoint>) {
        let Some(point) = point else {
            return;
        };

        for trv in point.trv_decision_points() {
            self.set_trv_desired_target(trv_desired_target_temperature(&trv));
        }
    }

    fn refresh_room_mode(&mut self, room: &RoomDefinition) {
        let mode = room_mode(
            &room.name,
            self.house_mode,
            room.climate_entity_ids
                .iter()
                .filter_map(|id| self.trv_control_states.get(id))
                .map(|state| &state.mode),
        );

        self.set_room_mode(mode);
    }

    fn refresh_room_status(&mut self, room: &RoomDefinition) {
        let mut statuses = room
            .climate_entity_ids
            .iter()
            .filter_map(|id| self.trv_statuses.get(id))
            .peekable();

        if statuses.peek().is_none() {
            return;
        }

        let is_heating = statuses.any(|status| status.is_heating);

        self.room_statuses.push(RoomHeatingStatus {
            room_name: room.name.clone(),
            is_heating,
        });
    }

    fn refresh_room_temperature_from_trvs(&mut self, room: &RoomDefinition) {
        let readings: Vec<TemperatureReading> = room
            .climate_entity_ids
            .iter()
            .filter_map(|id| self.trv_temperatures.get(id))
            .map(|t| t.reading)
            .collect();

        let (Some(temperature), Some(time)) = (
            DegreeCelsius::mean(readings.iter().map(|r| r.temperature)),
            readings.iter().map(|r| r.time).max(),
        ) else {
            return;
        };

        self.set_room_temperature(RoomTemperature {
            room_name: room.name.clone(),
            reading: TemperatureReading::new(temperature, time),
        });
    }

    /// A room's own program, or else the onboard program of its first TRV that reported one.
    fn room_schedule(&self, room: &RoomDefinition) -> Option<WeekSchedule> {
        room.schedule.clone().or_else(|| {
            room.climate_entity_ids
                .iter()
                .find_map(|id| self.trv_schedules.get(id))
                .map(|s| s.schedule.clone())
        })
    }

    fn refresh_room_schedule(&mut self, room: &RoomDefinition) {
        let target = self
            .room_schedule(room)
            .and_then(|schedule| scheduled_target(&schedule, &self.now));

        if let Some(target) = target {
            self.set_room_scheduled_target(RoomScheduledTarget {
                room_name: room.name.clone(),
                target,
            });
        }

        for id in &room.climate_entity_ids {
            self.refresh_trv_scheduled_target(room, id);
        }
    }

    // HOUSE

    fn refresh_house_mode(&mut self) {
        let mode = house_mode(&self.now, self.last_goodnight.as_ref());

        if mode != self.house_mode {
            tracing::info!("House mode changed from {} to {}", self.house_mode, mode);
            self.house_mode = mode;
        }

        let home = Arc::clone(&self.home);
        for room in &home.rooms {
            self.refresh_room_mode(room);
        }
    }

    fn refresh_schedules(&mut self) {
        let home = Arc::clone(&self.home);
        for room in &home.rooms {
            self.refresh_room_schedule(room);
        }
    }
}
