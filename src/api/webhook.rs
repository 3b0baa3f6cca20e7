//! Webhook handler for GitHub deliveries

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode, header},
};
use tracing::{debug, info, warn};

use crate::SharedState;
use crate::error::WebhookRejection;
use crate::event::{PushEvent, WebhookEvent, payload_from_body};
use crate::publish::run_publish;
use crate::run::{Run, RunEvent, RunStatus};
use crate::utils::verify_github_signature;

const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
const LEGACY_SIGNATURE_HEADER: &str = "X-Hub-Signature";
const EVENT_HEADER: &str = "X-GitHub-Event";

/// Handles the GitHub webhook POST request.
///
/// Push events are answered with 202 once the publish run is queued; other
/// event types get 204 and are only logged.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookRejection> {
    let event = match authenticate_and_decode(&state.config.github_secret, &headers, &body) {
        Ok(event) => event,
        Err(rejection) => {
            warn!("Rejected webhook delivery: {}", rejection);
            return Err(rejection);
        }
    };

    match event {
        WebhookEvent::Push(push) => {
            queue_publish(state, push).await;
            Ok(StatusCode::ACCEPTED)
        }
        WebhookEvent::Ping(ping) => {
            info!(
                "Ping from hook {:?}: {}",
                ping.hook_id,
                ping.zen.as_deref().unwrap_or("")
            );
            Ok(StatusCode::NO_CONTENT)
        }
        WebhookEvent::Other(kind) => {
            info!("Event type {}. Ignoring.", kind);
            Ok(StatusCode::NO_CONTENT)
        }
    }
}

fn authenticate_and_decode(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<WebhookEvent, WebhookRejection> {
    // The SHA-1 header is only consulted when the SHA-256 one is absent
    let signature = headers
        .get(SIGNATURE_HEADER)
        .or_else(|| headers.get(LEGACY_SIGNATURE_HEADER))
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookRejection::MissingSignature)?;
    if !verify_github_signature(secret, body, signature) {
        return Err(WebhookRejection::InvalidSignature);
    }

    let event_type = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookRejection::MissingEventType)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let payload = payload_from_body(content_type, body)?;
    WebhookEvent::parse(event_type, &payload)
}

async fn queue_publish(state: SharedState, push: PushEvent) {
    debug!("{:#?}", &push);
    let mut run = Run::new(push.git_ref.clone());
    run.commit_sha = push.after.clone();
    run.commit_message = push.head_commit.as_ref().and_then(|c| c.message.clone());
    run.pusher = push.pusher.as_ref().and_then(|p| p.name.clone());
    let run_id = run.id.clone();

    state.runs.lock().await.add_run(run);
    let _ = state
        .run_events
        .send(RunEvent::new(&run_id, RunStatus::Queued));

    info!(
        "Created run {} for push to '{}' branch '{}'",
        run_id,
        push.repository.full_name.as_deref().unwrap_or(&push.repository.name),
        push.branch()
    );

    // Respond right away; GitHub gives up on deliveries after 10 seconds
    tokio::spawn(run_publish(state, run_id));
}
