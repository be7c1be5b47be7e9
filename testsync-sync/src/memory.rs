//! In-memory [`HostingService`] for tests and offline runs.
//!
//! Files live in a map keyed by `(reference, path)`; a reference is any commit
//! SHA or branch name the caller seeds. Writes land under the target branch
//! and are recorded in a write log.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use testsync_core::{ChangeEvent, FileChange, RepoRef, RevisionMarker};

use crate::error::HostingError;
use crate::hosting::{FileEntry, HostingService, PutFile};

/// One recorded `put_file` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub path: String,
    pub branch: String,
    pub message: String,
    pub content: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    files: HashMap<(String, String), FileEntry>,
    changes: Vec<FileChange>,
    commit_messages: HashMap<String, String>,
    failing_paths: HashSet<String>,
    pending_conflicts: HashMap<String, usize>,
    listing_fails: bool,
    writes: Vec<WriteRecord>,
    next_marker: u64,
}

impl State {
    fn marker(&mut self) -> RevisionMarker {
        self.next_marker += 1;
        RevisionMarker(format!("m{}", self.next_marker))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryHosting {
    state: Mutex<State>,
}

impl InMemoryHosting {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `content` at `path` under `reference`.
    pub fn seed(&self, reference: &str, path: &str, content: &str) {
        let mut state = self.lock();
        let marker = state.marker();
        state.files.insert(
            (reference.to_owned(), path.to_owned()),
            FileEntry {
                content: content.to_owned(),
                marker,
            },
        );
    }

    /// Changed files reported for every event.
    pub fn set_changes(&self, changes: Vec<FileChange>) {
        self.lock().changes = changes;
    }

    pub fn set_commit_message(&self, sha: &str, message: &str) {
        self.lock()
            .commit_messages
            .insert(sha.to_owned(), message.to_owned());
    }

    /// Every read of `path` fails with [`HostingError::Unavailable`].
    pub fn fail_reads_of(&self, path: &str) {
        self.lock().failing_paths.insert(path.to_owned());
    }

    /// The next `count` writes to `path` fail with [`HostingError::Conflict`].
    pub fn inject_conflicts(&self, path: &str, count: usize) {
        self.lock().pending_conflicts.insert(path.to_owned(), count);
    }

    pub fn fail_listing(&self) {
        self.lock().listing_fails = true;
    }

    /// Content at `path` under `reference`, if any.
    pub fn content(&self, reference: &str, path: &str) -> Option<String> {
        self.lock()
            .files
            .get(&(reference.to_owned(), path.to_owned()))
            .map(|e| e.content.clone())
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    pub fn writes_to(&self, path: &str) -> Vec<WriteRecord> {
        self.lock()
            .writes
            .iter()
            .filter(|w| w.path == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HostingService for InMemoryHosting {
    async fn list_changed_files(&self, _event: &ChangeEvent) -> Result<Vec<FileChange>, HostingError> {
        let state = self.lock();
        if state.listing_fails {
            return Err(HostingError::Unavailable("listing disabled".into()));
        }
        Ok(state.changes.clone())
    }

    async fn get_file(
        &self,
        _repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Option<FileEntry>, HostingError> {
        let state = self.lock();
        if state.failing_paths.contains(path) {
            return Err(HostingError::Unavailable(format!("read of {path} failed")));
        }
        Ok(state
            .files
            .get(&(reference.to_owned(), path.to_owned()))
            .cloned())
    }

    async fn put_file(&self, _repo: &RepoRef, file: PutFile) -> Result<RevisionMarker, HostingError> {
        let mut state = self.lock();
        if let Some(remaining) = state.pending_conflicts.get_mut(&file.path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(HostingError::Conflict { path: file.path });
            }
        }

        let key = (file.branch.clone(), file.path.clone());
        let current = state.files.get(&key).map(|e| e.marker.clone());
        if current != file.marker {
            return Err(HostingError::Conflict { path: file.path });
        }

        let marker = state.marker();
        state.files.insert(
            key,
            FileEntry {
                content: file.content.clone(),
                marker: marker.clone(),
            },
        );
        state.writes.push(WriteRecord {
            path: file.path,
            branch: file.branch,
            message: file.message,
            content: file.content,
            at: Utc::now(),
        });
        Ok(marker)
    }

    async fn head_commit_message(
        &self,
        _repo: &RepoRef,
        sha: &str,
    ) -> Result<Option<String>, HostingError> {
        Ok(self.lock().commit_messages.get(sha).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoRef {
        RepoRef::new("octo", "app")
    }

    fn put(path: &str, content: &str, marker: Option<RevisionMarker>) -> PutFile {
        PutFile {
            path: path.into(),
            content: content.into(),
            branch: "main".into(),
            message: "msg".into(),
            marker,
        }
    }

    #[tokio::test]
    async fn create_then_update_with_marker() {
        let hosting = InMemoryHosting::new();
        let m1 = hosting.put_file(&repo(), put("a.ts", "one", None)).await.expect("create");
        let m2 = hosting
            .put_file(&repo(), put("a.ts", "two", Some(m1.clone())))
            .await
            .expect("update");
        assert_ne!(m1, m2);
        assert_eq!(hosting.content("main", "a.ts").as_deref(), Some("two"));
        assert_eq!(hosting.writes().len(), 2);
    }

    #[tokio::test]
    async fn stale_marker_conflicts() {
        let hosting = InMemoryHosting::new();
        hosting.seed("main", "a.ts", "one");
        let err = hosting
            .put_file(&repo(), put("a.ts", "two", None))
            .await
            .expect_err("create over existing");
        assert!(matches!(err, HostingError::Conflict { .. }));
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let hosting = InMemoryHosting::new();
        let got = hosting.get_file_content(&repo(), "nope.ts", "main").await.expect("read");
        assert!(got.is_none());
    }
}
