//! GitHub REST implementation of [`HostingService`].
//!
//! | operation            | endpoint                                             |
//! |----------------------|------------------------------------------------------|
//! | push file listing    | `GET /repos/{o}/{r}/compare/{before}...{after}`      |
//! | first push of branch | `GET /repos/{o}/{r}/commits/{after}`                 |
//! | pull request listing | `GET /repos/{o}/{r}/pulls/{n}/files` (paginated)     |
//! | read                 | `GET /repos/{o}/{r}/contents/{path}?ref=…`           |
//! | write                | `PUT /repos/{o}/{r}/contents/{path}`                 |
//! | head commit message  | `GET /repos/{o}/{r}/commits/{sha}`                   |
//!
//! Reads retry with exponential backoff on transport errors, 5xx and 429.
//! Writes are never retried here; the writer owns conflict handling.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use testsync_core::{ChangeEvent, EventKind, FileChange, FileStatus, RepoRef, RevisionMarker, Secret};
use testsync_sync::{FileEntry, HostingError, HostingService, PutFile};

use crate::error::DaemonError;

const PER_PAGE: usize = 100;
/// The pull request files endpoint stops at 3000 files.
const MAX_PAGES: usize = 30;
const READ_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(500);

pub struct GithubClient {
    http: Client,
    api_base: Url,
}

impl GithubClient {
    pub fn new(api_base: &str, token: &Secret, call_timeout: Duration) -> Result<Self, DaemonError> {
        let api_base = Url::parse(api_base)
            .map_err(|e| DaemonError::Client(format!("invalid GitHub API URL {api_base}: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(DaemonError::Client(format!(
                "GitHub API URL {api_base} cannot carry a path"
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| DaemonError::Client("GitHub token is not a valid header value".into()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));

        let http = Client::builder()
            .user_agent(concat!("testsync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(call_timeout)
            .build()
            .map_err(|e| DaemonError::Client(e.to_string()))?;
        Ok(Self { http, api_base })
    }

    /// `{base}/repos/{owner}/{name}/{tail…}`; every `/` in `tail` starts a
    /// new, separately escaped segment.
    fn endpoint(&self, repo: &RepoRef, tail: &[&str]) -> Result<Url, HostingError> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| HostingError::Unavailable("GitHub API URL cannot carry a path".into()))?;
            segments.pop_if_empty();
            segments.extend(["repos", repo.owner.as_str(), repo.name.as_str()]);
            segments.extend(tail.iter().flat_map(|part| part.split('/')));
        }
        Ok(url)
    }

    /// GET with retries. `Ok(None)` on 404.
    async fn get_json(&self, url: Url) -> Result<Option<Value>, HostingError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.http.get(url.clone()).send().await {
                Ok(resp) => match resp.status() {
                    StatusCode::NOT_FOUND => return Ok(None),
                    status if status.is_success() => {
                        return resp
                            .json::<Value>()
                            .await
                            .map(Some)
                            .map_err(|e| HostingError::Decode(e.to_string()));
                    }
                    status if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
                        error_for(resp).await
                    }
                    _ => return Err(error_for(resp).await),
                },
                Err(e) => HostingError::Unavailable(e.to_string()),
            };

            if attempt >= READ_ATTEMPTS {
                return Err(error);
            }
            let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
            warn!(url = %url, attempt, error = %error, delay_ms = delay.as_millis() as u64, "GitHub read failed; retrying");
            tokio::time::sleep(delay).await;
        }
    }

    async fn pull_request_files(&self, repo: &RepoRef, number: u64) -> Result<Vec<FileChange>, HostingError> {
        let number_segment = number.to_string();
        let mut files = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut url = self.endpoint(repo, &["pulls", &number_segment, "files"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
            let body = self.get_json(url).await?.ok_or_else(|| HostingError::Status {
                status: 404,
                message: format!("pull request #{number} not found"),
            })?;
            let batch = decode_files(Some(body))?;
            let last = batch.len() < PER_PAGE;
            files.extend(batch);
            if last {
                break;
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl HostingService for GithubClient {
    async fn list_changed_files(&self, event: &ChangeEvent) -> Result<Vec<FileChange>, HostingError> {
        let repo = &event.repo;
        let files = match event.kind {
            EventKind::Push => {
                // A new branch has no `before`; list the head commit instead.
                let url = if event.before.is_null() || event.before.as_str().is_empty() {
                    self.endpoint(repo, &["commits", event.after.as_str()])?
                } else {
                    let range = format!("{}...{}", event.before, event.after);
                    self.endpoint(repo, &["compare", &range])?
                };
                let body = self.get_json(url).await?.ok_or_else(|| HostingError::Status {
                    status: 404,
                    message: format!("revisions {}...{} not found", event.before, event.after),
                })?;
                decode_files(body.get("files").cloned())?
            }
            EventKind::PullRequest => {
                let number = event.pull_number.ok_or_else(|| {
                    HostingError::Decode("pull request event without a number".into())
                })?;
                self.pull_request_files(repo, number).await?
            }
        };
        debug!(repo = %repo, files = files.len(), "listed changed files");
        Ok(files)
    }

    async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Option<FileEntry>, HostingError> {
        let mut url = self.endpoint(repo, &["contents", path])?;
        url.query_pairs_mut().append_pair("ref", reference);
        match self.get_json(url).await? {
            Some(body) => decode_content(body),
            None => Ok(None),
        }
    }

    async fn put_file(&self, repo: &RepoRef, file: PutFile) -> Result<RevisionMarker, HostingError> {
        let url = self.endpoint(repo, &["contents", &file.path])?;
        let mut body = json!({
            "message": file.message,
            "content": B64.encode(file.content.as_bytes()),
            "branch": file.branch,
        });
        if let Some(marker) = &file.marker {
            body["sha"] = json!(marker.0);
        }

        let resp = self
            .http
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| HostingError::Unavailable(e.to_string()))?;
        let status = resp.status();
        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(HostingError::Conflict { path: file.path });
        }
        if !status.is_success() {
            return Err(error_for(resp).await);
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| HostingError::Decode(e.to_string()))?;
        value
            .pointer("/content/sha")
            .and_then(Value::as_str)
            .map(RevisionMarker::from)
            .ok_or_else(|| HostingError::Decode("contents response without a sha".into()))
    }

    async fn head_commit_message(
        &self,
        repo: &RepoRef,
        sha: &str,
    ) -> Result<Option<String>, HostingError> {
        let url = self.endpoint(repo, &["commits", sha])?;
        Ok(self.get_json(url).await?.and_then(|body| {
            body.pointer("/commit/message")
                .and_then(Value::as_str)
                .map(str::to_owned)
        }))
    }
}

// ---------------------------------------------------------------------------
// Wire decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireFile {
    filename: String,
    #[serde(default)]
    status: FileStatus,
    #[serde(default)]
    additions: u32,
    #[serde(default)]
    deletions: u32,
    #[serde(default)]
    changes: u32,
    #[serde(default)]
    patch: Option<String>,
    #[serde(default)]
    previous_filename: Option<String>,
}

impl From<WireFile> for FileChange {
    fn from(w: WireFile) -> Self {
        FileChange {
            path: w.filename,
            status: w.status,
            additions: w.additions,
            deletions: w.deletions,
            changes: w.changes,
            patch: w.patch,
            previous_path: w.previous_filename,
        }
    }
}

fn decode_files(value: Option<Value>) -> Result<Vec<FileChange>, HostingError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let files: Vec<WireFile> =
        serde_json::from_value(value).map_err(|e| HostingError::Decode(e.to_string()))?;
    Ok(files.into_iter().map(FileChange::from).collect())
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

/// Contents API body → entry. Directories and non-file entries read as `None`.
fn decode_content(body: Value) -> Result<Option<FileEntry>, HostingError> {
    if body.is_array() {
        return Ok(None);
    }
    let wire: WireContent =
        serde_json::from_value(body).map_err(|e| HostingError::Decode(e.to_string()))?;
    if wire.kind != "file" {
        return Ok(None);
    }
    if wire.encoding.as_deref().is_some_and(|enc| enc != "base64") {
        return Err(HostingError::Decode(format!(
            "unsupported content encoding {:?}",
            wire.encoding
        )));
    }

    // The API wraps base64 at 60 columns.
    let packed: String = wire
        .content
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = B64
        .decode(packed.as_bytes())
        .map_err(|e| HostingError::Decode(e.to_string()))?;
    let content = String::from_utf8(bytes).map_err(|e| HostingError::Decode(e.to_string()))?;
    Ok(Some(FileEntry {
        content,
        marker: RevisionMarker(wire.sha),
    }))
}

async fn error_for(resp: Response) -> HostingError {
    let status = resp.status().as_u16();
    let headers = resp.headers();
    let retry_after_secs = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .is_some_and(|v| v.as_bytes() == b"0");
    let message = resp.text().await.unwrap_or_default();
    classify_status(status, exhausted, retry_after_secs, message)
}

/// 429, or 403 from an exhausted quota, is a rate limit; anything else keeps
/// its status.
fn classify_status(
    status: u16,
    quota_exhausted: bool,
    retry_after_secs: Option<u64>,
    message: String,
) -> HostingError {
    match status {
        429 => HostingError::RateLimited { retry_after_secs },
        403 if quota_exhausted || retry_after_secs.is_some() => {
            HostingError::RateLimited { retry_after_secs }
        }
        _ => HostingError::Status {
            status,
            message: message.chars().take(200).collect(),
        },
    }
}
