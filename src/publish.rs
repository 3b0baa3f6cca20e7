//! Pull the working copy and rebuild the site into the serving directory

use std::io::ErrorKind;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::run::{RunEvent, RunStatus};
use crate::utils::run_command;
use crate::SharedState;

/// Runs the two external steps against the configured working copy.
pub struct Publisher<'a> {
    config: &'a Config,
    cancel: &'a CancellationToken,
}

impl<'a> Publisher<'a> {
    pub fn new(config: &'a Config, cancel: &'a CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// `git pull` inside the local repository.
    ///
    /// A missing or unreadable repository path is only logged; the pull is
    /// attempted anyway and will report its own failure.
    pub async fn sync(&self) -> Result<()> {
        let repo = &self.config.local_repo_dir;
        match tokio::fs::metadata(repo).await {
            Ok(meta) if !meta.is_dir() => {
                warn!("Local repo {} is not a directory", repo.display());
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Local repo {} does not exist", repo.display());
            }
            Err(e) => {
                warn!("Could not inspect local repo {}: {}", repo.display(), e);
            }
        }

        match run_command(
            &self.config.git,
            &["pull"],
            repo,
            self.config.command_timeout,
            self.cancel,
        )
        .await
        {
            Ok(_) => {
                info!("Pulled latest changes into {}", repo.display());
                Ok(())
            }
            Err(e) => {
                error!("Could not pull repo to {}: {}", repo.display(), e);
                Err(e)
            }
        }
    }

    /// `<site builder> -d <server dir>` inside the local repository.
    pub async fn build(&self) -> Result<()> {
        let server_dir = self.config.server_dir.to_string_lossy();
        match run_command(
            &self.config.site_builder,
            &["-d", &*server_dir],
            &self.config.local_repo_dir,
            self.config.command_timeout,
            self.cancel,
        )
        .await
        {
            Ok(_) => {
                info!("Site published to {}", server_dir);
                Ok(())
            }
            Err(e) => {
                error!("Error running {}: {}", self.config.site_builder, e);
                Err(e)
            }
        }
    }
}

/// Runs sync then build for a queued run.
///
/// Holds `publish_lock` for the whole sequence, so overlapping deliveries run
/// one after another against the working copy.
pub async fn run_publish(state: SharedState, run_id: String) {
    let _guard = state.publish_lock.lock().await;

    state.runs.lock().await.update_run(&run_id, |r| r.mark_running());
    let _ = state
        .run_events
        .send(RunEvent::new(&run_id, RunStatus::Running));
    info!("Run {} - pulling and rebuilding site", run_id);

    let publisher = Publisher::new(&state.config, &state.shutdown);
    let sync_error = publisher.sync().await.err().map(|e| e.to_string());
    let build_error = publisher.build().await.err().map(|e| e.to_string());
    // TODO: send webmentions for new posts once the build succeeds

    let status = if build_error.is_none() {
        info!("Run {} completed successfully.", run_id);
        RunStatus::Success
    } else {
        error!("Run {} failed.", run_id);
        RunStatus::Failed
    };
    state
        .runs
        .lock()
        .await
        .update_run(&run_id, |r| r.finish(sync_error, build_error));
    let _ = state.run_events.send(RunEvent::new(&run_id, status));
}
