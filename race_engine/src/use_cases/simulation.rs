// Tick pipeline: composes vehicle, race session, triggers and traces in a fixed per-tick order.

use crate::domain::entities::BestTimes;
use crate::domain::errors::TraceError;
use crate::domain::physics::ArcadeBody;
use crate::domain::ports::RigidBodyPort;
use crate::domain::state::{ControlVector, RacePhase, RaceState, SimEvent, VehicleTelemetry};
use crate::domain::systems::race::RaceSession;
use crate::domain::systems::respawn::resolve_respawn_pose;
use crate::domain::systems::scheduler::FixedStepScheduler;
use crate::domain::systems::vehicle::VehicleController;
use crate::domain::track::Track;
use crate::domain::tuning::{RaceTuning, VehicleTuning};
use crate::use_cases::trace::{
    InputTrace, ReplayOptions, ReplayResult, ReplayStatus, TraceDeck, TraceFrame, TraceMode,
};
use crate::use_cases::types::FrameUpdate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Simulation<B: RigidBodyPort> {
    pub(crate) track: Arc<Track>,
    pub(crate) body: B,
    pub(crate) vehicle: VehicleController,
    pub(crate) race: RaceSession,
    pub(crate) race_tuning: RaceTuning,
    scheduler: FixedStepScheduler,
    pub(crate) traces: TraceDeck,
    live_control: ControlVector,
    tick: u64,
    freeze_remaining_ms: f32,
    pub(crate) upside_down_ms: f32,
    inside_checkpoints: BTreeSet<u32>,
    inside_boost_pads: BTreeSet<String>,
    events: Vec<SimEvent>,
}

impl Simulation<ArcadeBody> {
    /// Headless simulation on the reference arcade body, placed at the track spawn.
    pub fn arcade(track: Arc<Track>, best: Option<BestTimes>, fixed_step: f32) -> Self {
        let tuning = VehicleTuning::default();
        let body = ArcadeBody::from_tuning(&tuning, track.spawn_pose());
        Self::new(track, body, tuning, RaceTuning::default(), best, fixed_step)
    }
}

impl<B: RigidBodyPort> Simulation<B> {
    pub fn new(
        track: Arc<Track>,
        body: B,
        vehicle_tuning: VehicleTuning,
        race_tuning: RaceTuning,
        best: Option<BestTimes>,
        fixed_step: f32,
    ) -> Self {
        let race = RaceSession::new(track.checkpoint_count(), best);
        let mut simulation = Self {
            track,
            body,
            vehicle: VehicleController::new(vehicle_tuning),
            race,
            race_tuning,
            scheduler: FixedStepScheduler::new(fixed_step),
            traces: TraceDeck::new(),
            live_control: ControlVector::default(),
            tick: 0,
            freeze_remaining_ms: 0.0,
            upside_down_ms: 0.0,
            inside_checkpoints: BTreeSet::new(),
            inside_boost_pads: BTreeSet::new(),
            events: Vec::new(),
        };
        let spawn = simulation.track.spawn_pose();
        simulation.vehicle.respawn(&mut simulation.body, spawn);
        simulation
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn vehicle(&self) -> &VehicleController {
        &self.vehicle
    }

    pub fn race_state(&self) -> &RaceState {
        self.race.state()
    }

    pub fn best_times(&self) -> BestTimes {
        self.race.best_times()
    }

    pub fn telemetry(&self) -> VehicleTelemetry {
        self.vehicle.telemetry(&self.body)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn fixed_step(&self) -> f32 {
        self.scheduler.step()
    }

    pub fn fixed_step_hz(&self) -> f32 {
        1.0 / self.scheduler.step()
    }

    pub fn is_replaying(&self) -> bool {
        self.traces.mode() == TraceMode::Replaying
    }

    /// Replaces the held axes. Pending one-shot requests stay queued until a tick consumes them.
    pub fn set_control(&mut self, control: ControlVector) {
        let pending = self.live_control;
        self.live_control = ControlVector {
            respawn_requested: pending.respawn_requested || control.respawn_requested,
            restart_requested: pending.restart_requested || control.restart_requested,
            fly_toggle_requested: pending.fly_toggle_requested || control.fly_toggle_requested,
            ..control.clamped()
        };
    }

    /// Feeds one variable-length frame through the fixed-step scheduler. Returns ticks run.
    ///
    /// A restart inside a tick resets the scheduler and ends the frame.
    pub fn advance_frame(&mut self, frame_delta: f32) -> u32 {
        self.scheduler.accumulate(frame_delta);
        let mut ticks = 0;
        while let Some(dt) = self.scheduler.next_step(ticks) {
            self.tick(dt);
            ticks += 1;
        }
        ticks
    }

    /// Events produced since the last drain, in tick order.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn frame_update(&mut self) -> FrameUpdate {
        FrameUpdate {
            tick: self.tick,
            race: self.race.state().clone(),
            telemetry: self.telemetry(),
            events: self.take_events(),
        }
    }

    /// Pending live one-shots are consumed here and nowhere else, so a frame that runs no tick
    /// or is frozen keeps them queued for the next tick that reads controls.
    fn resolve_control(&mut self) -> ControlVector {
        let live = self.live_control;
        self.live_control.clear_one_shots();
        if self.traces.mode() == TraceMode::Replaying {
            if let Some(control) = self.traces.next_control() {
                return control;
            }
        }
        live
    }

    /// One fixed step of the whole pipeline.
    pub fn tick(&mut self, dt: f32) {
        self.tick += 1;
        let dt_ms = dt * 1000.0;

        if self.freeze_remaining_ms > 0.0 {
            self.freeze_remaining_ms = (self.freeze_remaining_ms - dt_ms).max(0.0);
            return;
        }

        let control = self.resolve_control();

        if control.restart_requested {
            self.restart_run();
            self.events.push(SimEvent::RunRestarted);
            self.freeze_remaining_ms = self.race_tuning.action_freeze_ms;
            self.finish_tick(&control);
            return;
        }
        if control.respawn_requested {
            self.respawn_at_last_checkpoint(false);
            self.finish_tick(&control);
            return;
        }
        if control.fly_toggle_requested {
            let enabled = self.vehicle.toggle_fly_mode(&mut self.body);
            info!(enabled, "fly mode toggled");
            self.events.push(SimEvent::FlyModeChanged { enabled });
        }

        self.race.update(f64::from(dt_ms), control.has_drive_intent());

        let driving = if self.race.phase() == RacePhase::Running {
            control.held()
        } else {
            ControlVector::default()
        };
        self.vehicle.pre_step(&mut self.body, &driving, dt);
        self.body.step(dt);
        self.vehicle.post_step(&mut self.body, dt);

        if self.update_auto_right(dt_ms) {
            self.finish_tick(&control);
            return;
        }

        self.process_triggers();
        self.finish_tick(&control);
    }

    /// Returns true when the vehicle was recovered this tick.
    fn update_auto_right(&mut self, dt_ms: f32) -> bool {
        let stuck = self.vehicle.is_upside_down(&self.body)
            && !self.vehicle.state().grounded
            && self.vehicle.speed_kmh(&self.body) < self.race_tuning.auto_right_max_speed_kmh;
        if !stuck {
            self.upside_down_ms = 0.0;
            return false;
        }

        self.upside_down_ms += dt_ms;
        if self.upside_down_ms < self.race_tuning.auto_right_trigger_ms {
            return false;
        }

        info!("vehicle stuck upside down, auto-righting");
        self.traces.note_auto_respawn();
        self.respawn_at_last_checkpoint(true);
        true
    }

    fn process_triggers(&mut self) {
        let position = self.body.translation();

        let inside: BTreeSet<u32> = self.track.checkpoint_orders_at(position).into_iter().collect();
        for order in inside.difference(&self.inside_checkpoints) {
            let result = self.race.register_checkpoint(*order);
            if !result.valid {
                continue;
            }
            self.events.push(SimEvent::CheckpointPassed {
                order: *order,
                split_ms: result.split_ms.unwrap_or(0.0),
                split_delta_ms: result.split_delta_ms,
            });
            if result.finished {
                self.events.push(SimEvent::RaceFinished {
                    elapsed_ms: self.race.state().elapsed_ms,
                    improved_best: result.improved_best,
                });
            }
        }
        self.inside_checkpoints = inside;

        let pads: Vec<(String, f32, f32)> = self
            .track
            .boost_pads_at(position)
            .into_iter()
            .map(|pad| (pad.id.clone(), pad.force, pad.duration_ms as f32))
            .collect();
        let mut inside_pads = BTreeSet::new();
        for (id, force, duration_ms) in pads {
            if !self.inside_boost_pads.contains(&id) {
                self.vehicle.activate_boost(force, duration_ms);
                self.events.push(SimEvent::BoostActivated { pad_id: id.clone() });
            }
            inside_pads.insert(id);
        }
        self.inside_boost_pads = inside_pads;
    }

    fn finish_tick(&mut self, control: &ControlVector) {
        let position = self.body.translation();
        let speed_kmh = self.vehicle.speed_kmh(&self.body);
        let checkpoint_order = self.race.state().current_checkpoint_order;

        match self.traces.mode() {
            TraceMode::Recording => self.traces.record(TraceFrame {
                tick: self.tick,
                control: *control,
                position: position.to_array(),
                speed_kmh,
                checkpoint_order,
            }),
            TraceMode::Replaying => {
                self.traces.observe(position, speed_kmh, checkpoint_order);
                let finished = self.race.phase() == RacePhase::Finished;
                if self.traces.finish_if_exhausted(finished).is_some() {
                    self.events.push(SimEvent::ReplayFinished);
                }
            }
            TraceMode::Idle => {}
        }
    }

    fn place_at(&mut self, checkpoint_order: i64) {
        let pose = resolve_respawn_pose(&self.track, checkpoint_order);
        self.vehicle.respawn(&mut self.body, pose);
        self.inside_checkpoints.clear();
        self.inside_boost_pads.clear();
        self.upside_down_ms = 0.0;
    }

    fn respawn_at_last_checkpoint(&mut self, automatic: bool) {
        let last = i64::from(self.race.state().current_checkpoint_order) - 1;
        debug!(last, automatic, "respawning");
        self.place_at(last);
        self.freeze_remaining_ms = self.race_tuning.action_freeze_ms;
        self.events.push(SimEvent::Respawned { automatic });
    }

    /// Back to the spawn with a fresh run on the ground. Best times survive.
    pub fn restart_run(&mut self) {
        self.race.restart_run();
        self.vehicle.set_fly_mode(&mut self.body, false);
        self.place_at(-1);
        self.freeze_remaining_ms = 0.0;
        self.scheduler.reset();
        info!("run restarted");
    }

    /// Places the vehicle at a checkpoint (`-1` for the spawn) with an optional planar speed.
    pub fn stage_at(&mut self, checkpoint_order: i64, initial_speed_kmh: Option<f32>) {
        self.place_at(checkpoint_order);
        if let Some(speed_kmh) = initial_speed_kmh {
            self.vehicle.launch(&mut self.body, speed_kmh);
        }
    }

    pub fn start_recording(&mut self, label: &str) -> Result<(), TraceError> {
        let hz = self.fixed_step_hz();
        let track_id = self.track.id().to_string();
        self.traces.start_recording(label, &track_id, hz)
    }

    pub fn stop_recording(&mut self) -> InputTrace {
        let hz = self.fixed_step_hz();
        let track_id = self.track.id().to_string();
        self.traces.stop_recording(&track_id, hz)
    }

    pub fn play_trace(&mut self, trace: InputTrace, options: ReplayOptions) {
        self.traces.begin_replay(trace);
        if options.restart_before_play {
            self.restart_run();
        }
        if options.start_checkpoint_order.is_some() || options.initial_speed_kmh.is_some() {
            self.stage_at(
                options.start_checkpoint_order.unwrap_or(-1),
                options.initial_speed_kmh,
            );
        }
        self.live_control = ControlVector::default();
        // An empty trace has nothing to consume and ends straight away.
        if self.traces.finish_if_exhausted(false).is_some() {
            self.events.push(SimEvent::ReplayFinished);
        }
    }

    pub fn replay_status(&self) -> ReplayStatus {
        self.traces.status()
    }

    pub fn last_replay_result(&self) -> Option<ReplayResult> {
        self.traces.last_result().cloned()
    }
}
