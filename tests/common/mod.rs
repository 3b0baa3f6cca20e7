//! Shared testing utilities: a throwaway site with fake `git` and `hugo`.

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue};
use site_hook::config::Config;
use site_hook::run::{RunEvent, RunStatus};
use site_hook::utils::sign_payload;
use site_hook::{AppState, SharedState};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tracing::subscriber::DefaultGuard;

pub const SECRET: &str = "It's a Secret to Everybody";

pub const PUSH_PAYLOAD: &str = r#"{
    "ref": "refs/heads/main",
    "before": "6113728f27ae82c7b1a177c8d03f9e96e0adf246",
    "after": "0d1a26e67d8f5eaf1f6ba5c57fc3c7d91ac0fd1c",
    "repository": { "name": "blog", "full_name": "someone/blog" },
    "pusher": { "name": "someone", "email": "someone@example.com" },
    "head_commit": { "id": "0d1a26e67d8f5eaf1f6ba5c57fc3c7d91ac0fd1c", "message": "Add post" }
}"#;

/// Working copy, serving directory and step log in one temp directory.
#[allow(dead_code)]
pub struct TestSite {
    root: TempDir,
    pub repo_dir: PathBuf,
    pub server_dir: PathBuf,
    pub steps_log: PathBuf,
    git: PathBuf,
    builder: PathBuf,
}

#[allow(dead_code)]
impl TestSite {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory for tests");
        let repo_dir = root.path().join("repo");
        let server_dir = root.path().join("public");
        let steps_log = root.path().join("steps.log");
        fs::create_dir_all(repo_dir.join("content")).unwrap();
        fs::write(repo_dir.join("content").join("index.md"), "# Hello\n").unwrap();

        // Each step logs start/end around a short sleep so overlapping runs would interleave.
        let git = write_script(
            root.path(),
            "fake-git",
            &format!(
                "echo sync-start >> '{log}'\nsleep 0.2\necho sync-end >> '{log}'\n",
                log = steps_log.display()
            ),
        );
        let builder = write_script(
            root.path(),
            "fake-hugo",
            &format!(
                "echo build-start >> '{log}'\n\
                 [ \"$1\" = \"-d\" ] || exit 2\n\
                 mkdir -p \"$2\"\n\
                 cp -R content/. \"$2\"/\n\
                 sleep 0.2\n\
                 echo build-end >> '{log}'\n",
                log = steps_log.display()
            ),
        );

        Self {
            root,
            repo_dir,
            server_dir,
            steps_log,
            git,
            builder,
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn config(&self) -> Config {
        Config {
            github_secret: SECRET.to_string(),
            local_repo_dir: self.repo_dir.clone(),
            server_dir: self.server_dir.clone(),
            github_token: None,
            site_builder: self.builder.to_string_lossy().into_owned(),
            git: self.git.to_string_lossy().into_owned(),
            command_timeout: Duration::from_secs(20),
        }
    }

    pub fn state(&self) -> SharedState {
        Arc::new(AppState::new(self.config()))
    }

    /// Lines written by the fake steps, in order.
    pub fn steps(&self) -> Vec<String> {
        fs::read_to_string(&self.steps_log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Headers GitHub sends with a JSON delivery.
pub fn github_headers(event: &str, signature: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-github-event", HeaderValue::from_str(event).unwrap());
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    if let Some(signature) = signature {
        headers.insert("x-hub-signature-256", HeaderValue::from_str(signature).unwrap());
    }
    headers
}

pub fn signed(event: &str, body: &str) -> (HeaderMap, Bytes) {
    let signature = sign_payload(SECRET, body.as_bytes());
    (
        github_headers(event, Some(&signature)),
        Bytes::from(body.to_string()),
    )
}

/// Waits until `count` runs have reached a final status.
pub async fn wait_for_finished(rx: &mut broadcast::Receiver<RunEvent>, count: usize) -> Vec<RunEvent> {
    let mut finished = Vec::new();
    while finished.len() < count {
        let event = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out waiting for publish run")
            .expect("run event channel closed");
        if matches!(event.status, RunStatus::Success | RunStatus::Failed) {
            finished.push(event);
        }
    }
    finished
}

/// Log lines emitted on the current thread while the guard is alive.
#[allow(dead_code)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
    _guard: DefaultGuard,
}

#[allow(dead_code)]
#[derive(Clone)]
struct LogWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[allow(dead_code)]
impl CapturedLogs {
    /// Installs a thread-local subscriber. `#[tokio::test]` runs on a
    /// current-thread runtime, so handler logs land here.
    pub fn start() -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = LogWriter(buffer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);
        Self { buffer, _guard }
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}
