//! GitHub webhook payload → [`ChangeEvent`].

use chrono::Utc;
use serde::Deserialize;

use testsync_core::{ChangeEvent, EventKind, RepoRef, Revision};

use crate::error::WebhookError;

/// What an inbound delivery turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Event(ChangeEvent),
    /// Acknowledged with 200 and the given message; nothing is processed.
    Ignored(&'static str),
}

pub const EVENT_IGNORED: &str = "Event ignored";
pub const ACTION_IGNORED: &str = "Action ignored";

const PR_ACTIONS: &[&str] = &["opened", "synchronize", "reopened"];

// ---------------------------------------------------------------------------
// Wire shapes (only the fields we read)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    owner: Owner,
}

#[derive(Debug, Deserialize)]
struct Owner {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Commit {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    before: String,
    after: String,
    #[serde(default)]
    deleted: bool,
    repository: Repository,
    #[serde(default)]
    head_commit: Option<Commit>,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    head: GitRef,
    base: GitRef,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    action: String,
    number: u64,
    pull_request: PullRequest,
    repository: Repository,
}

impl Repository {
    fn into_ref(self) -> Result<RepoRef, WebhookError> {
        let owner = self
            .owner
            .login
            .or(self.owner.name)
            .ok_or_else(|| WebhookError::InvalidPayload("repository owner missing".into()))?;
        Ok(RepoRef::new(owner, self.name))
    }
}

// ---------------------------------------------------------------------------
// parse_event
// ---------------------------------------------------------------------------

/// Parse one delivery.
///
/// `event_type` is the `X-GitHub-Event` header; an absent or unsupported
/// type is ignored, as are branch deletions, tag pushes and pull request
/// actions other than opened/synchronize/reopened.
pub fn parse_event(
    event_type: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
) -> Result<Inbound, WebhookError> {
    let Some(kind) = event_type.and_then(EventKind::from_header) else {
        return Ok(Inbound::Ignored(EVENT_IGNORED));
    };

    let event = match kind {
        EventKind::Push => {
            let push: PushPayload = decode(body)?;
            let Some(branch) = push.git_ref.strip_prefix("refs/heads/") else {
                return Ok(Inbound::Ignored(EVENT_IGNORED));
            };
            let after = Revision::from(push.after.as_str());
            if push.deleted || after.is_null() {
                return Ok(Inbound::Ignored(EVENT_IGNORED));
            }
            ChangeEvent {
                kind,
                branch: branch.to_owned(),
                repo: push.repository.into_ref()?,
                before: Revision::from(push.before),
                after,
                trigger_text: push.head_commit.map(|c| c.message).unwrap_or_default(),
                pull_number: None,
                signature: signature.map(str::to_owned),
                received_at: Utc::now(),
            }
        }
        EventKind::PullRequest => {
            let pr: PullRequestPayload = decode(body)?;
            if !PR_ACTIONS.contains(&pr.action.as_str()) {
                return Ok(Inbound::Ignored(ACTION_IGNORED));
            }
            let body = pr.pull_request.body.unwrap_or_default();
            ChangeEvent {
                kind,
                repo: pr.repository.into_ref()?,
                before: Revision::from(pr.pull_request.base.sha),
                after: Revision::from(pr.pull_request.head.sha),
                branch: pr.pull_request.head.git_ref,
                trigger_text: format!("{}\n{}", pr.pull_request.title, body),
                pull_number: Some(pr.number),
                signature: signature.map(str::to_owned),
                received_at: Utc::now(),
            }
        }
    };
    Ok(Inbound::Event(event))
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, WebhookError> {
    serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}
