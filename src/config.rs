//! Flat `KEY=VALUE` configuration file and the settings read from it

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HookError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "env";
pub const DEFAULT_SITE_BUILDER: &str = "hugo";
pub const DEFAULT_GIT: &str = "git";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

pub const GITHUB_SECRET: &str = "GITHUB_SECRET";
pub const LOCAL_REPO_DIR: &str = "LOCAL_REPO_DIR";
pub const SERVER_DIR: &str = "SERVER_DIR";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const SITE_BUILDER: &str = "SITE_BUILDER";
pub const GIT_BIN: &str = "GIT_BIN";
pub const COMMAND_TIMEOUT_SECS: &str = "COMMAND_TIMEOUT_SECS";

/// Settings shared by every part of the server. Built once at startup.
#[derive(Clone)]
pub struct Config {
    pub github_secret: String,
    pub local_repo_dir: PathBuf,
    pub server_dir: PathBuf,
    /// Loaded for completeness; the publish flow never uses it.
    pub github_token: Option<String>,
    pub site_builder: String,
    pub git: String,
    pub command_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("github_secret", &"<redacted>")
            .field("local_repo_dir", &self.local_repo_dir)
            .field("server_dir", &self.server_dir)
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("site_builder", &self.site_builder)
            .field("git", &self.git)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl Config {
    /// Read the env file into the process environment, then build the config from it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_env_file(path.as_ref())?;
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(HookError::MissingSetting(key));

        let command_timeout = match get(COMMAND_TIMEOUT_SECS) {
            None => Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(HookError::ConfigError(format!(
                        "{} must be a positive number of seconds, got {:?}",
                        COMMAND_TIMEOUT_SECS, raw
                    )));
                }
            },
        };

        Ok(Self {
            github_secret: require(GITHUB_SECRET)?,
            local_repo_dir: PathBuf::from(require(LOCAL_REPO_DIR)?),
            server_dir: PathBuf::from(require(SERVER_DIR)?),
            github_token: get(GITHUB_TOKEN),
            site_builder: get(SITE_BUILDER).unwrap_or_else(|| DEFAULT_SITE_BUILDER.to_string()),
            git: get(GIT_BIN).unwrap_or_else(|| DEFAULT_GIT.to_string()),
            command_timeout,
        })
    }
}

/// Split every non-blank line on its first `=`.
///
/// There is no quoting, escaping or comment syntax. A non-blank line without
/// `=` fails the whole file.
pub fn parse_env_file(contents: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => pairs.push((key.to_string(), value.to_string())),
            None => {
                return Err(HookError::MalformedConfigLine {
                    line_no: idx + 1,
                    line: line.to_string(),
                });
            }
        }
    }
    Ok(pairs)
}

/// Apply every pair from the file to the process environment.
///
/// The file is parsed completely before anything is set, so a malformed line
/// leaves the environment untouched. File values override existing variables.
/// Returns how many variables were set.
pub fn load_env_file(path: &Path) -> Result<usize> {
    let contents = fs::read_to_string(path).map_err(|source| HookError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let pairs = parse_env_file(&contents)?;

    for (key, value) in &pairs {
        // SAFETY: called before the async runtime or any other thread is started.
        unsafe { std::env::set_var(key, value) };
    }
    Ok(pairs.len())
}
