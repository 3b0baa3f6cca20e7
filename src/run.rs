use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// How many finished or pending runs are remembered
pub const DEFAULT_MAX_RUNS: usize = 24;

/// Represents the status of a publish run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Success,
    Failed,
}

/// One sync + build sequence triggered by a push
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub git_ref: String,
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
    pub pusher: Option<String>,
    pub status: RunStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
    pub build_error: Option<String>,
}

impl Run {
    /// Create a new run in Queued status
    pub fn new(git_ref: String) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            git_ref,
            commit_sha: None,
            commit_message: None,
            pusher: None,
            status: RunStatus::Queued,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            sync_error: None,
            build_error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Record the outcome of both steps. The run succeeds only if the build did.
    pub fn finish(&mut self, sync_error: Option<String>, build_error: Option<String>) {
        self.status = if build_error.is_none() {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        self.sync_error = sync_error;
        self.build_error = build_error;
        self.completed_at = Some(Utc::now());
    }
}

/// Bounded in-memory history, newest last
pub struct RunStore {
    runs: VecDeque<Run>,
    max_runs: usize,
}

impl RunStore {
    pub fn new(max_runs: usize) -> Self {
        Self {
            runs: VecDeque::with_capacity(max_runs),
            max_runs,
        }
    }

    pub fn add_run(&mut self, run: Run) {
        while self.runs.len() >= self.max_runs.max(1) {
            self.runs.pop_front();
        }
        self.runs.push_back(run);
    }

    /// Applies `f` to the run with `id`. Returns false if it has been evicted.
    pub fn update_run<F: FnOnce(&mut Run)>(&mut self, id: &str, f: F) -> bool {
        match self.runs.iter_mut().find(|r| r.id == id) {
            Some(run) => {
                f(run);
                true
            }
            None => false,
        }
    }

    pub fn get_run(&self, id: &str) -> Option<&Run> {
        self.runs.iter().find(|r| r.id == id)
    }

    /// Most recent runs first
    pub fn recent_runs(&self, limit: usize) -> Vec<Run> {
        self.runs.iter().rev().take(limit).cloned().collect()
    }

    pub fn count_by_status(&self, status: RunStatus) -> usize {
        self.runs.iter().filter(|r| r.status == status).count()
    }
}

impl Default for RunStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RUNS)
    }
}

/// Broadcast whenever a run changes state
#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    pub run_id: String,
    pub status: RunStatus,
    pub timestamp: String,
}

impl RunEvent {
    pub fn new(run_id: &str, status: RunStatus) -> Self {
        Self {
            run_id: run_id.to_string(),
            status,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
