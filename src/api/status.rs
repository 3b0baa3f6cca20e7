//! Liveness and status endpoints

use axum::{Json, extract::State as AxumState};
use serde::Serialize;

use crate::SharedState;
use crate::run::{Run, RunStatus};

const RECENT_RUNS: usize = 10;

pub async fn root() -> &'static str {
    "site_hook is running"
}

/// Server information
#[derive(Debug, Serialize)]
pub struct ServerStats {
    pub name: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub started_at: String,
}

/// Run counts over the remembered history
#[derive(Debug, Serialize)]
pub struct RunStats {
    pub queued: usize,
    pub running: usize,
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub server: ServerStats,
    pub runs: RunStats,
    pub recent: Vec<Run>,
}

/// GET /status - server uptime and the latest publish runs
pub async fn status(AxumState(state): AxumState<SharedState>) -> Json<StatusResponse> {
    let server = ServerStats {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        started_at: state.started_at.to_rfc3339(),
    };

    let store = state.runs.lock().await;
    let runs = RunStats {
        queued: store.count_by_status(RunStatus::Queued),
        running: store.count_by_status(RunStatus::Running),
        success: store.count_by_status(RunStatus::Success),
        failed: store.count_by_status(RunStatus::Failed),
    };

    Json(StatusResponse {
        server,
        runs,
        recent: store.recent_runs(RECENT_RUNS),
    })
}
