pub mod api;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod publish;
pub mod run;
pub mod utils;

use axum::{Router, routing};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::run::{RunEvent, RunStore};

pub struct AppState {
    pub config: Config,
    /// Held for the whole sync + build sequence
    pub publish_lock: Mutex<()>,
    pub runs: Mutex<RunStore>,
    /// Every queued, started and finished run is announced here. The server
    /// itself never subscribes; it is the hook for anything that wants to
    /// follow runs as they happen instead of polling `/status`.
    pub run_events: broadcast::Sender<RunEvent>,
    /// Cancelled on shutdown; running commands are killed
    pub shutdown: CancellationToken,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let (run_events, _) = broadcast::channel(100);
        Self {
            config,
            publish_lock: Mutex::new(()),
            runs: Mutex::new(RunStore::default()),
            run_events,
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(api::root))
        .route("/status", routing::get(api::status))
        .route("/github", routing::post(api::handle_webhook))
        .with_state(state)
}
