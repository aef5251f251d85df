// Framework bootstrap for the race server runtime.

use crate::domain::ports::BestTimeStore;
use crate::frameworks::config;
use crate::interface_adapters::net::frame_update_serializer;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::stores::JsonFileStore;
use crate::interface_adapters::tracks::load_track;
use crate::use_cases::{RaceLoopSettings, Simulation, spawn_race_loop};

use axum::extract::ws::Utf8Bytes;
use std::net::SocketAddr;
use std::{io::Result, path::PathBuf, sync::Arc};
use tokio::sync::{broadcast, watch};

pub fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    // try_init so a second bootstrap in the same process keeps the first subscriber.
    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Everything the server reads from the environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub track_path: PathBuf,
    pub best_times_path: PathBuf,
    pub fixed_step: f32,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self {
            track_path: config::track_path(),
            best_times_path: config::best_times_path(),
            fixed_step: config::fixed_step(),
        }
    }
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    run_with_settings(listener, ServerSettings::from_env()).await
}

pub async fn run_with_settings(
    listener: tokio::net::TcpListener,
    settings: ServerSettings,
) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(&settings)?;
    let app = app(state);

    tracing::info!(%address, "listening");

    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state(settings: &ServerSettings) -> Result<Arc<AppState>> {
    let track_path = &settings.track_path;
    let track = load_track(track_path).map_err(|e| {
        tracing::error!(path = %track_path.display(), error = %e, "failed to load track");
        std::io::Error::other(e)
    })?;
    let track = Arc::new(track);

    let best_times_path = &settings.best_times_path;
    let store: Arc<dyn BestTimeStore> = Arc::new(JsonFileStore::new(best_times_path));
    // Missing or unreadable records only cost the best-time comparison, never the run.
    let best = store.load(track.id()).unwrap_or_else(|e| {
        tracing::warn!(path = %best_times_path.display(), error = %e, "ignoring stored best times");
        None
    });

    let simulation = Simulation::arcade(track.clone(), best, settings.fixed_step);
    let fixed_step_hz = simulation.fixed_step_hz();
    tracing::debug!(
        track_id = track.id(),
        fixed_step_hz,
        best_times_path = %best_times_path.display(),
        "simulation configured"
    );

    let race = spawn_race_loop(
        simulation,
        store,
        RaceLoopSettings {
            command_channel_capacity: config::COMMAND_CHANNEL_CAPACITY,
            frame_broadcast_capacity: config::FRAME_BROADCAST_CAPACITY,
            frame_interval: config::FRAME_INTERVAL,
        },
    );

    let (frame_bytes_tx, _frame_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(config::FRAME_BROADCAST_CAPACITY);
    let (frame_latest_tx, _frame_latest_rx) = watch::channel(Utf8Bytes::from(""));

    tokio::spawn(frame_update_serializer(
        race.frame_tx.subscribe(),
        frame_bytes_tx.clone(),
        frame_latest_tx.clone(),
    ));

    Ok(Arc::new(AppState {
        race,
        frame_bytes_tx,
        frame_latest_tx,
        track_id: Arc::from(track.id()),
        fixed_step_hz,
    }))
}
