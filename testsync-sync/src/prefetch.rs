//! Concurrent batch read of current / base / test content.
//!
//! A missing path reads as absent. A failed or timed-out read is different:
//! the whole snapshot for that file degrades to all-absent fields, so the
//! file fails instead of being treated as untested. The batch itself never
//! fails.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use testsync_core::paths::test_file_path;
use testsync_core::{ContentSnapshot, FileChange, FileStatus, RepoRef};

use crate::hosting::HostingService;

/// A read that did not produce an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadFailed;

/// Resolve a [`ContentSnapshot`] for every file, keyed by source path.
///
/// `head` is read for the current and test content, `base` for the prior
/// content. Added files skip the base read.
pub async fn prefetch(
    hosting: &dyn HostingService,
    repo: &RepoRef,
    files: &[FileChange],
    head: &str,
    base: &str,
    call_timeout: Duration,
) -> HashMap<String, ContentSnapshot> {
    let reads = files.iter().map(|file| async move {
        let test_path = test_file_path(&file.path);
        let skip_base = file.status == FileStatus::Added;

        let (current, base_content, test) = tokio::join!(
            read(hosting, repo, &file.path, head, call_timeout),
            async {
                if skip_base {
                    Ok(None)
                } else {
                    read(hosting, repo, &file.path, base, call_timeout).await
                }
            },
            read(hosting, repo, &test_path, head, call_timeout),
        );

        let snapshot = match (current, base_content, test) {
            (Ok(current), Ok(base), Ok(test)) => ContentSnapshot {
                current,
                base,
                test,
                test_file_path: test_path,
            },
            _ => {
                warn!(path = %file.path, "snapshot degraded after a failed read");
                ContentSnapshot::empty(test_path)
            }
        };
        debug!(
            path = %file.path,
            current = snapshot.current.is_some(),
            base = snapshot.base.is_some(),
            test = snapshot.test.is_some(),
            "prefetched"
        );
        (file.path.clone(), snapshot)
    });

    join_all(reads).await.into_iter().collect()
}

async fn read(
    hosting: &dyn HostingService,
    repo: &RepoRef,
    path: &str,
    reference: &str,
    call_timeout: Duration,
) -> Result<Option<String>, ReadFailed> {
    match tokio::time::timeout(call_timeout, hosting.get_file_content(repo, path, reference)).await {
        Ok(Ok(content)) => Ok(content),
        Ok(Err(e)) => {
            warn!(path, reference, error = %e, "content read failed");
            Err(ReadFailed)
        }
        Err(_) => {
            warn!(path, reference, timeout_secs = call_timeout.as_secs(), "content read timed out");
            Err(ReadFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryHosting;

    fn repo() -> RepoRef {
        RepoRef::new("octo", "app")
    }

    #[tokio::test]
    async fn missing_files_read_as_absent() {
        let hosting = InMemoryHosting::new();
        hosting.seed("head", "src/a.ts", "const a = 1;\n");
        let files = vec![FileChange::new("src/a.ts", FileStatus::Modified)];

        let got = prefetch(&hosting, &repo(), &files, "head", "base", Duration::from_secs(5)).await;
        let snapshot = &got["src/a.ts"];
        assert_eq!(snapshot.current.as_deref(), Some("const a = 1;\n"));
        assert!(snapshot.base.is_none());
        assert!(snapshot.test.is_none());
        assert_eq!(snapshot.test_file_path, "src/__tests__/a.test.ts");
    }

    #[tokio::test]
    async fn failed_test_read_degrades_the_whole_snapshot() {
        let hosting = InMemoryHosting::new();
        hosting.seed("head", "src/a.ts", "const a = 1;\n");
        hosting.seed("head", "src/b.ts", "const b = 1;\n");
        hosting.fail_reads_of("src/__tests__/a.test.ts");
        let files = vec![
            FileChange::new("src/a.ts", FileStatus::Added),
            FileChange::new("src/b.ts", FileStatus::Added),
        ];

        let got = prefetch(&hosting, &repo(), &files, "head", "base", Duration::from_secs(5)).await;
        assert_eq!(got["src/a.ts"], ContentSnapshot::empty("src/__tests__/a.test.ts"));
        assert_eq!(got["src/b.ts"].current.as_deref(), Some("const b = 1;\n"));
    }
}
