// Frame loop task that exclusively owns the simulation. Everything else talks to it through
// channels.

use crate::domain::ports::{BestTimeStore, RigidBodyPort};
use crate::domain::state::{DebugSnapshot, SimEvent};
use crate::use_cases::diagnostics::DiagnosticsPort;
use crate::use_cases::simulation::Simulation;
use crate::use_cases::types::{FrameUpdate, SimCommand};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Shared configuration for spawning the race loop.
#[derive(Debug, Clone)]
pub struct RaceLoopSettings {
    /// Capacity for inbound commands.
    pub command_channel_capacity: usize,
    /// Capacity for broadcast frame updates.
    pub frame_broadcast_capacity: usize,
    /// Wall-clock interval between frames. The simulation still ticks at its fixed step.
    pub frame_interval: Duration,
}

/// Channels onto a running race loop.
#[derive(Clone)]
pub struct RaceHandle {
    /// Commands into the loop.
    pub command_tx: mpsc::Sender<SimCommand>,
    /// Every frame update, for streaming consumers.
    pub frame_tx: broadcast::Sender<FrameUpdate>,
    /// Latest frame update, for polling consumers and lag recovery.
    pub latest_frame_tx: watch::Sender<FrameUpdate>,
    /// Latest debug snapshot.
    pub debug_tx: watch::Sender<DebugSnapshot>,
    /// Stops the loop when notified.
    pub shutdown: Arc<Notify>,
}

pub fn spawn_race_loop<B>(
    mut simulation: Simulation<B>,
    store: Arc<dyn BestTimeStore>,
    settings: RaceLoopSettings,
) -> RaceHandle
where
    B: RigidBodyPort + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(settings.command_channel_capacity);
    let (frame_tx, _frame_rx) = broadcast::channel(settings.frame_broadcast_capacity);
    let (latest_frame_tx, _latest_rx) = watch::channel(simulation.frame_update());
    let (debug_tx, _debug_rx) = watch::channel(simulation.debug_snapshot());
    let shutdown = Arc::new(Notify::new());

    let handle = RaceHandle {
        command_tx,
        frame_tx,
        latest_frame_tx,
        debug_tx,
        shutdown,
    };

    tokio::spawn(race_loop(
        simulation,
        command_rx,
        handle.clone(),
        store,
        settings.frame_interval,
    ));

    handle
}

pub async fn race_loop<B>(
    mut simulation: Simulation<B>,
    mut command_rx: mpsc::Receiver<SimCommand>,
    handle: RaceHandle,
    store: Arc<dyn BestTimeStore>,
    frame_interval: Duration,
) where
    B: RigidBodyPort + Send + 'static,
{
    // Drive frames at the configured interval and feed real elapsed time to the scheduler.
    let mut interval = tokio::time::interval(frame_interval);
    let mut last_frame = Instant::now();

    info!(track_id = simulation.track().id(), "race loop started");

    loop {
        tokio::select! {
            _ = handle.shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {}
        }

        while let Ok(command) = command_rx.try_recv() {
            apply_command(&mut simulation, command);
        }

        let now = Instant::now();
        let frame_delta = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        // Pending one-shots stay queued until a tick reads them.
        simulation.advance_frame(frame_delta);

        let update = simulation.frame_update();
        if update
            .events
            .iter()
            .any(|event| matches!(event, SimEvent::RaceFinished { improved_best: true, .. }))
        {
            let _ = persist_best_times(&simulation, store.clone());
        }

        let _ = handle.debug_tx.send(simulation.debug_snapshot());
        let _ = handle.latest_frame_tx.send(update.clone());
        let _ = handle.frame_tx.send(update);
    }

    info!("race loop stopped");
}

fn persist_best_times<B: RigidBodyPort>(
    simulation: &Simulation<B>,
    store: Arc<dyn BestTimeStore>,
) -> JoinHandle<()> {
    let track_id = simulation.track().id().to_string();
    let best = simulation.best_times();
    // File IO stays off the loop task.
    tokio::task::spawn_blocking(move || match store.save(&track_id, &best) {
        Ok(()) => info!(track_id = %track_id, best_ms = ?best.best_ms, "best time saved"),
        Err(e) => error!(track_id = %track_id, error = %e, "failed to save best time"),
    })
}

/// Routes one command into the simulation and answers its reply channel.
pub fn apply_command<B: RigidBodyPort>(simulation: &mut Simulation<B>, command: SimCommand) {
    match command {
        SimCommand::Control(control) => simulation.set_control(control),
        other => apply_diagnostics(simulation, other),
    }
}

fn apply_diagnostics(port: &mut dyn DiagnosticsPort, command: SimCommand) {
    match command {
        SimCommand::Control(_) => {}
        SimCommand::Respawn {
            checkpoint_order,
            initial_speed_kmh,
            reply,
        } => {
            port.force_respawn(checkpoint_order, initial_speed_kmh);
            let _ = reply.send(port.debug_snapshot());
        }
        SimCommand::StartRecording { label, reply } => {
            let _ = reply.send(port.start_recording(&label));
        }
        SimCommand::StopRecording { reply } => {
            let _ = reply.send(port.stop_recording());
        }
        SimCommand::PlayTrace {
            trace,
            options,
            reply,
        } => {
            port.play_trace(trace, options);
            let _ = reply.send(port.replay_status());
        }
        SimCommand::ReplayStatus { reply } => {
            let _ = reply.send(port.replay_status());
        }
        SimCommand::ReplayResult { reply } => {
            let _ = reply.send(port.last_replay_result());
        }
    }
    debug!("diagnostics command applied");
}
