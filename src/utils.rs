use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{self, debug, info};

use crate::error::{HookError, Result};

// For signature verification
use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Verifies a GitHub signature header against the raw request body.
///
/// Accepts `sha256=<hex>` (`X-Hub-Signature-256`) and the legacy
/// `sha1=<hex>` (`X-Hub-Signature`).
pub fn verify_github_signature(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    let (algorithm, git_signature) = match signature_header.split_once('=') {
        Some((algorithm, hex)) => (algorithm, hex),
        None => return false,
    };

    let Ok(git_signature_bytes) = hex_decode(git_signature.trim()) else {
        debug!("Signature header is not valid hex");
        return false;
    };

    // Constant-time comparison via verify_slice
    match algorithm {
        "sha256" => match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mut mac) => {
                mac.update(payload);
                mac.verify_slice(&git_signature_bytes).is_ok()
            }
            Err(_) => false,
        },
        "sha1" => match HmacSha1::new_from_slice(secret.as_bytes()) {
            Ok(mut mac) => {
                mac.update(payload);
                mac.verify_slice(&git_signature_bytes).is_ok()
            }
            Err(_) => false,
        },
        other => {
            debug!("Unsupported signature algorithm {:?}", other);
            false
        }
    }
}

/// Computes the `X-Hub-Signature-256` value GitHub would send for `payload`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Computes the legacy `X-Hub-Signature` value for `payload`.
pub fn sign_payload_sha1(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

/// Runs `program args..` in `cwd`, bounded by `timeout` and `cancel`.
///
/// The child is killed when the deadline passes or the token is cancelled.
/// Returns stdout on a zero exit status.
pub async fn run_command(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String> {
    let command = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    info!("Running (cwd = '{}'): {}", cwd.display(), command);

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| HookError::CommandSpawn {
            command: command.clone(),
            source,
        })?;

    let output = tokio::select! {
        _ = cancel.cancelled() => {
            return Err(HookError::Cancelled { command });
        }
        result = tokio::time::timeout(timeout, child.wait_with_output()) => match result {
            Ok(output) => output?,
            Err(_) => return Err(HookError::CommandTimedOut { command, timeout }),
        },
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        debug!("{} output:\n{}", command, stdout);
        Ok(stdout)
    } else {
        Err(HookError::CommandFailed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
