//! Hash-gated test-file commits.
//!
//! ## `commit_test_file` protocol
//!
//! 1. Normalise line endings to LF.
//! 2. SHA-256 hash the normalised content.
//! 3. Read the current entry on the target branch (content + marker).
//! 4. Compare digests → skip if identical.
//! 5. Dry-run → report and stop.
//! 6. Write with the marker (create when absent).
//! 7. On a revision conflict, re-read the marker and retry once.

use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use testsync_core::{RepoRef, RevisionMarker};

use crate::diff::{normalize_line_endings, synthesize_patch};
use crate::error::{HostingError, SyncError};
use crate::hosting::{FileEntry, HostingService, PutFile};

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual test-file commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// The file did not exist and was created.
    Created { path: String },
    /// The file existed with different content and was updated.
    Updated { path: String },
    /// Content digest matches what is already committed.
    Unchanged { path: String },
    /// Dry-run: the file *would* have been written.
    WouldWrite { path: String },
}

impl WriteResult {
    pub fn path(&self) -> &str {
        match self {
            WriteResult::Created { path }
            | WriteResult::Updated { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }

    /// `true` when a commit was actually issued.
    pub fn is_write(&self) -> bool {
        matches!(self, WriteResult::Created { .. } | WriteResult::Updated { .. })
    }
}

/// One commit to make.
#[derive(Debug, Clone, Copy)]
pub struct TestCommit<'a> {
    pub repo: &'a RepoRef,
    pub branch: &'a str,
    pub path: &'a str,
    pub content: &'a str,
    pub message: &'a str,
}

// ---------------------------------------------------------------------------
// commit_test_file
// ---------------------------------------------------------------------------

pub fn content_digest(content: &str) -> String {
    let mut h = Sha256::new();
    h.update(content.as_bytes());
    hex::encode(h.finalize())
}

/// Commit one test file through `hosting`. See the module docs for the steps.
pub async fn commit_test_file(
    hosting: &dyn HostingService,
    commit: TestCommit<'_>,
    dry_run: bool,
    call_timeout: Duration,
) -> Result<WriteResult, SyncError> {
    let content = normalize_line_endings(commit.content);
    let digest = content_digest(&content);
    let path = commit.path.to_owned();

    let existing = read_entry(hosting, &commit, call_timeout).await?;
    if is_same(existing.as_ref(), &digest) {
        debug!(path = %path, "unchanged");
        return Ok(WriteResult::Unchanged { path });
    }

    if dry_run {
        let before = existing.as_ref().map(|e| e.content.as_str());
        info!(path = %path, "[dry-run] would write");
        debug!("{}", synthesize_patch(&path, before, &content));
        return Ok(WriteResult::WouldWrite { path });
    }

    let marker = existing.map(|e| e.marker);
    let mut created = marker.is_none();
    match put(hosting, &commit, &content, marker, call_timeout).await {
        Ok(()) => {}
        Err(SyncError::Hosting(HostingError::Conflict { .. })) => {
            warn!(path = %path, "revision conflict; re-reading marker and retrying");
            let fresh = read_entry(hosting, &commit, call_timeout).await?;
            if is_same(fresh.as_ref(), &digest) {
                return Ok(WriteResult::Unchanged { path });
            }
            let marker = fresh.map(|e| e.marker);
            created = marker.is_none();
            match put(hosting, &commit, &content, marker, call_timeout).await {
                Ok(()) => {}
                Err(SyncError::Hosting(HostingError::Conflict { .. })) => {
                    return Err(SyncError::WriteConflict { path });
                }
                Err(e) => return Err(e),
            }
        }
        Err(e) => return Err(e),
    }

    info!(path = %path, created, "committed test file");
    Ok(if created {
        WriteResult::Created { path }
    } else {
        WriteResult::Updated { path }
    })
}

fn is_same(entry: Option<&FileEntry>, digest: &str) -> bool {
    entry.is_some_and(|e| content_digest(&normalize_line_endings(&e.content)) == digest)
}

async fn read_entry(
    hosting: &dyn HostingService,
    commit: &TestCommit<'_>,
    call_timeout: Duration,
) -> Result<Option<FileEntry>, SyncError> {
    tokio::time::timeout(
        call_timeout,
        hosting.get_file(commit.repo, commit.path, commit.branch),
    )
    .await
    .map_err(|_| SyncError::Timeout {
        operation: "test file read",
    })?
    .map_err(SyncError::from)
}

async fn put(
    hosting: &dyn HostingService,
    commit: &TestCommit<'_>,
    content: &str,
    marker: Option<RevisionMarker>,
    call_timeout: Duration,
) -> Result<(), SyncError> {
    let file = PutFile {
        path: commit.path.to_owned(),
        content: content.to_owned(),
        branch: commit.branch.to_owned(),
        message: commit.message.to_owned(),
        marker,
    };
    tokio::time::timeout(call_timeout, hosting.put_file(commit.repo, file))
        .await
        .map_err(|_| SyncError::Timeout {
            operation: "test file write",
        })??;
    Ok(())
}
