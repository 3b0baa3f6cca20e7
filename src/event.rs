//! GitHub webhook payloads the server understands

use serde::Deserialize;

use crate::error::WebhookRejection;

/// A decoded webhook delivery. Only `Push` triggers a publish.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Push(PushEvent),
    Ping(PingEvent),
    /// Any other event type, kept by name for logging.
    Other(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub before: Option<String>,
    pub after: Option<String>,
    pub repository: Repository,
    pub pusher: Option<Pusher>,
    pub head_commit: Option<HeadCommit>,
}

impl PushEvent {
    /// Branch name without the `refs/heads/` prefix.
    pub fn branch(&self) -> &str {
        self.git_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.git_ref)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pusher {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    pub id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingEvent {
    pub zen: Option<String>,
    pub hook_id: Option<u64>,
}

impl WebhookEvent {
    /// Decode `payload` according to the `X-GitHub-Event` value.
    ///
    /// Payloads of event types we do not act on are not parsed at all.
    pub fn parse(event_type: &str, payload: &[u8]) -> Result<Self, WebhookRejection> {
        let decode_err = |e: serde_json::Error| WebhookRejection::Decode {
            event: event_type.to_string(),
            reason: e.to_string(),
        };
        match event_type {
            "push" => serde_json::from_slice(payload)
                .map(WebhookEvent::Push)
                .map_err(decode_err),
            "ping" => serde_json::from_slice(payload)
                .map(WebhookEvent::Ping)
                .map_err(decode_err),
            other => Ok(WebhookEvent::Other(other.to_string())),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            WebhookEvent::Push(_) => "push",
            WebhookEvent::Ping(_) => "ping",
            WebhookEvent::Other(name) => name,
        }
    }
}

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Extract the JSON document from a delivery body.
///
/// GitHub sends either `application/json` or `application/x-www-form-urlencoded`
/// with the JSON in a `payload` field. Anything else, including a missing
/// content type, is rejected.
pub fn payload_from_body(content_type: Option<&str>, body: &[u8]) -> Result<Vec<u8>, WebhookRejection> {
    let raw = content_type.unwrap_or_default();
    // Parameters such as `; charset=utf-8` are ignored
    let media_type = raw.split(';').next().unwrap_or_default().trim();

    if media_type.eq_ignore_ascii_case(JSON_CONTENT_TYPE) {
        return Ok(body.to_vec());
    }
    if !media_type.eq_ignore_ascii_case(FORM_CONTENT_TYPE) {
        return Err(WebhookRejection::UnsupportedContentType(raw.to_string()));
    }

    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned().into_bytes())
        .ok_or_else(|| WebhookRejection::Decode {
            event: "form".to_string(),
            reason: "no payload field in form body".to_string(),
        })
}
