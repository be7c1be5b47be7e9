//! Code-hosting collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use testsync_core::{ChangeEvent, FileChange, RepoRef, RevisionMarker};

use crate::error::HostingError;

/// A file read from the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub content: String,
    /// Marker to present when updating this file.
    pub marker: RevisionMarker,
}

/// A single-file commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutFile {
    pub path: String,
    pub content: String,
    pub branch: String,
    pub message: String,
    /// Current marker of the file; `None` creates it.
    pub marker: Option<RevisionMarker>,
}

/// Read/write access to repository content.
///
/// Implementations return `Ok(None)` for a missing path or a directory. Per-file
/// patches come with [`Self::list_changed_files`]; there is no separate diff
/// lookup.
#[async_trait]
pub trait HostingService: Send + Sync {
    /// Files touched by the event, in the order the service reports them.
    async fn list_changed_files(&self, event: &ChangeEvent) -> Result<Vec<FileChange>, HostingError>;

    /// File at `reference` (commit SHA or branch name).
    async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Option<FileEntry>, HostingError>;

    /// Content only, for callers that never write back.
    async fn get_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Option<String>, HostingError> {
        Ok(self.get_file(repo, path, reference).await?.map(|entry| entry.content))
    }

    /// Create or update one file as a single commit; returns the new marker.
    async fn put_file(&self, repo: &RepoRef, file: PutFile) -> Result<RevisionMarker, HostingError>;

    /// Message of the commit `sha`, if the service can report it.
    async fn head_commit_message(
        &self,
        _repo: &RepoRef,
        _sha: &str,
    ) -> Result<Option<String>, HostingError> {
        Ok(None)
    }
}
