//! Event processing: guards, fan-out, and the per-file test lifecycle.
//!
//! ```text
//! event ─► bot guard ─► branch filter ─► skip directive ─► list files
//!       ─► prefetch ─► per file (concurrent, shared deadline):
//!            classify ─► prune (in memory) ─► skip | cleanup | generate ─► commit
//! ```
//!
//! A file issues at most one commit per event: pruning happens in memory and
//! the pruned text either is committed on its own or is handed to the
//! authoring collaborator, whose output is the single commit.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

use testsync_core::paths::{should_process_file, test_file_path};
use testsync_core::{
    ChangeEvent, ChangeType, ContentSnapshot, EventKind, FileChange, FileState, FileStatus,
    GeneratedTestResult, GenerationKind, Settings, SkipDecision, TestAuthoringStrategy,
};
use testsync_detector::{
    extract_functions, is_own_commit, parse_with, BranchFilter, ChangeClassifier, HeuristicClassifier,
};

use crate::authoring::{TestAuthor, TestAuthoringRequest};
use crate::diff::synthesize_patch;
use crate::error::{AuthoringError, SyncError};
use crate::hosting::HostingService;
use crate::prefetch::prefetch;
use crate::prune::{prune, PruneResult};
use crate::writer::{commit_test_file, TestCommit, WriteResult};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why an event was answered without touching any file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    BotOriginated,
    BranchNotAllowed { branch: String },
    NoProcessableFiles,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::BotOriginated => write!(f, "Ignoring event produced by the test bot"),
            IgnoreReason::BranchNotAllowed { branch } => {
                write!(f, "Branch '{branch}' is not in the allowed list")
            }
            IgnoreReason::NoProcessableFiles => write!(f, "No processable source files changed"),
        }
    }
}

/// Result of one file's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: String,
    pub test_path: String,
    pub state: FileState,
    pub change_type: Option<ChangeType>,
    pub writes: Vec<WriteResult>,
    pub error: Option<String>,
}

impl FileOutcome {
    fn failed(path: &str, test_path: &str, error: impl fmt::Display) -> Self {
        Self {
            path: path.to_owned(),
            test_path: test_path.to_owned(),
            state: FileState::Failed,
            change_type: None,
            writes: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchResult {
    /// Files that ended in any state other than [`FileState::Failed`].
    pub fn processed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.state.is_success()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn get(&self, path: &str) -> Option<&FileOutcome> {
        self.outcomes.iter().find(|o| o.path == path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored(IgnoreReason),
    Processed(BatchResult),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    hosting: Arc<dyn HostingService>,
    author: Arc<dyn TestAuthor>,
    classifier: Arc<dyn ChangeClassifier>,
    settings: Settings,
    branch_filter: BranchFilter,
}

impl Orchestrator {
    pub fn new(hosting: Arc<dyn HostingService>, author: Arc<dyn TestAuthor>, settings: Settings) -> Self {
        let branch_filter = BranchFilter::parse(&settings.allowed_branches);
        Self {
            hosting,
            author,
            classifier: Arc::new(HeuristicClassifier),
            settings,
            branch_filter,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ChangeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one event end to end.
    ///
    /// Only event-level failures (listing the changed files) are returned as
    /// errors; every per-file failure is reported as [`FileState::Failed`].
    pub async fn process_event(&self, event: &ChangeEvent) -> Result<EventOutcome, SyncError> {
        if self.is_bot_event(event).await {
            info!(repo = %event.repo, kind = %event.kind, "ignoring bot-originated event");
            return Ok(EventOutcome::Ignored(IgnoreReason::BotOriginated));
        }
        if !self.branch_filter.allows(&event.branch) {
            info!(branch = %event.branch, "branch not allowed");
            return Ok(EventOutcome::Ignored(IgnoreReason::BranchNotAllowed {
                branch: event.branch.clone(),
            }));
        }

        let skip = parse_with(&event.trigger_text, &self.settings.skip_directive);
        debug!(should_skip = skip.should_skip, reason = %skip.reason, "skip directive");

        let listed = timeout(
            self.settings.call_timeout(),
            self.hosting.list_changed_files(event),
        )
        .await
        .map_err(|_| SyncError::Timeout {
            operation: "changed file listing",
        })??;
        let files = processable(listed);
        if files.is_empty() {
            info!(repo = %event.repo, "no processable files");
            return Ok(EventOutcome::Ignored(IgnoreReason::NoProcessableFiles));
        }
        info!(repo = %event.repo, branch = %event.branch, files = files.len(), "processing event");

        let mut snapshots = prefetch(
            self.hosting.as_ref(),
            &event.repo,
            &files,
            event.after.as_str(),
            event.before.as_str(),
            self.settings.call_timeout(),
        )
        .await;

        let deadline = Instant::now() + self.settings.batch_timeout();
        let tasks = files.iter().map(|change| {
            let snapshot = snapshots
                .remove(&change.path)
                .unwrap_or_else(|| ContentSnapshot::empty(test_file_path(&change.path)));
            let skip = &skip;
            async move {
                let test_path = snapshot.test_file_path.clone();
                let work = self
                    .process_file(event, change, snapshot, skip)
                    .instrument(info_span!("file", path = %change.path));
                match timeout_at(deadline, work).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(path = %change.path, "batch deadline exceeded");
                        FileOutcome::failed(&change.path, &test_path, "batch deadline exceeded")
                    }
                }
            }
        });
        let outcomes = join_all(tasks).await;

        let batch = BatchResult { outcomes };
        info!(
            processed = batch.processed(),
            total = batch.total(),
            "event complete"
        );
        Ok(EventOutcome::Processed(batch))
    }

    async fn is_bot_event(&self, event: &ChangeEvent) -> bool {
        let marker = &self.settings.bot_marker;
        if is_own_commit(&event.trigger_text, marker) {
            return true;
        }
        if event.kind != EventKind::PullRequest {
            return false;
        }
        // A synchronize caused by our own commit carries the human PR text.
        match timeout(
            self.settings.call_timeout(),
            self.hosting.head_commit_message(&event.repo, event.after.as_str()),
        )
        .await
        {
            Ok(Ok(Some(message))) => is_own_commit(&message, marker),
            Ok(Ok(None)) => false,
            Ok(Err(e)) => {
                warn!(error = %e, "head commit lookup failed");
                false
            }
            Err(_) => {
                warn!("head commit lookup timed out");
                false
            }
        }
    }

    async fn process_file(
        &self,
        event: &ChangeEvent,
        change: &FileChange,
        snapshot: ContentSnapshot,
        skip: &SkipDecision,
    ) -> FileOutcome {
        let mut outcome = FileOutcome {
            path: change.path.clone(),
            test_path: snapshot.test_file_path.clone(),
            state: FileState::Failed,
            change_type: None,
            writes: Vec::new(),
            error: None,
        };
        match self.run_lifecycle(event, change, &snapshot, skip, &mut outcome).await {
            Ok(state) => {
                outcome.state = state;
                info!(state = %state, change_type = ?outcome.change_type, "file complete");
            }
            Err(e) => {
                warn!(error = %e, "file failed");
                outcome.state = FileState::Failed;
                outcome.error = Some(e.to_string());
            }
        }
        outcome
    }

    async fn run_lifecycle(
        &self,
        event: &ChangeEvent,
        change: &FileChange,
        snapshot: &ContentSnapshot,
        skip: &SkipDecision,
        outcome: &mut FileOutcome,
    ) -> Result<FileState, SyncError> {
        let path = change.path.as_str();
        let Some(current) = snapshot.current.as_deref() else {
            return Err(SyncError::MissingContent { path: path.to_owned() });
        };

        let patch = change.patch.clone();
        let analysis = self
            .classifier
            .classify(patch.as_deref(), current, snapshot.base.as_deref());
        outcome.change_type = Some(analysis.change_type);
        debug!(
            change_type = %analysis.change_type,
            added = ?analysis.added_functions,
            removed = ?analysis.removed_functions,
            "classified"
        );

        // A name removed and re-added in the same diff is still declared.
        let declared: HashSet<String> = extract_functions(current).into_iter().collect();
        let stale: BTreeSet<String> = analysis
            .removed_functions
            .iter()
            .filter(|name| !declared.contains(*name))
            .cloned()
            .collect();
        let cleanup = skip.cleanup_removed_functions && self.settings.cleanup_enabled && !stale.is_empty();
        let pruned: Option<PruneResult> = match (&snapshot.test, cleanup) {
            (Some(test), true) => Some(prune(test, &stale)).filter(|p| p.changed),
            _ => None,
        };

        if skip.should_skip {
            if let Some(p) = &pruned {
                self.commit_cleanup(event, snapshot, p, outcome).await?;
            }
            return Ok(FileState::Skipped);
        }

        if analysis.change_type.is_cosmetic() {
            return Ok(FileState::Skipped);
        }

        let strategy = self.settings.strategy;
        if strategy == TestAuthoringStrategy::Incremental
            && analysis.change_type == ChangeType::FunctionRemoval
        {
            if let Some(p) = &pruned {
                self.commit_cleanup(event, snapshot, p, outcome).await?;
                return Ok(FileState::CleanupOnly);
            }
        }

        let had_tests = snapshot.test.is_some();
        let kind = strategy.generation_kind(had_tests);
        let diff_patch = match kind {
            GenerationKind::Regenerate => Some(
                patch.unwrap_or_else(|| synthesize_patch(path, snapshot.base.as_deref(), current)),
            ),
            GenerationKind::New | GenerationKind::Update => None,
        };
        let request = TestAuthoringRequest {
            current_code: current.to_owned(),
            previous_code: snapshot.base.clone(),
            existing_tests: pruned
                .as_ref()
                .map(|p| p.content.clone())
                .or_else(|| snapshot.test.clone()),
            diff_patch,
            source_path: path.to_owned(),
            test_path: snapshot.test_file_path.clone(),
            framework: self.settings.framework.clone(),
            change_type: Some(kind),
        };

        let generated = match self.generate(&request).await {
            Ok(generated) => generated,
            Err(e) => {
                if let Some(p) = &pruned {
                    if let Err(commit_err) = self.commit_cleanup(event, snapshot, p, outcome).await {
                        warn!(error = %commit_err, "cleanup commit after failed generation also failed");
                    }
                }
                return Err(e);
            }
        };

        let meta = &generated.metadata;
        info!(
            framework = %meta.framework,
            total_tests = meta.coverage.total_tests,
            normal_cases = meta.coverage.normal_cases,
            edge_cases = meta.coverage.edge_cases,
            error_cases = meta.coverage.error_cases,
            complexity = %meta.estimated_complexity,
            quality = %meta.test_quality,
            "generated tests"
        );
        if !meta.recommendations.is_empty() {
            debug!(recommendations = ?meta.recommendations, assumptions = ?meta.assumptions, "generation notes");
        }

        let verb = match kind {
            GenerationKind::New => "Add",
            GenerationKind::Update => "Update",
            GenerationKind::Regenerate => "Regenerate",
        };
        let message = format!("{verb} tests for {path} [{}]", self.settings.bot_marker);
        self.commit(event, &snapshot.test_file_path, &generated.tests, &message, outcome)
            .await?;

        Ok(strategy.completed_state(had_tests))
    }

    async fn generate(
        &self,
        request: &TestAuthoringRequest,
    ) -> Result<GeneratedTestResult, SyncError> {
        let generated = timeout(self.settings.call_timeout(), self.author.generate(request))
            .await
            .map_err(|_| SyncError::Timeout {
                operation: "test generation",
            })??;
        if generated.tests.trim().is_empty() {
            return Err(AuthoringError::EmptyResponse.into());
        }
        Ok(generated)
    }

    async fn commit_cleanup(
        &self,
        event: &ChangeEvent,
        snapshot: &ContentSnapshot,
        pruned: &PruneResult,
        outcome: &mut FileOutcome,
    ) -> Result<(), SyncError> {
        let names: Vec<&str> = pruned.removed.iter().map(String::as_str).collect();
        let message = format!(
            "Cleanup tests for removed functions: {} [{}]",
            names.join(", "),
            self.settings.bot_marker
        );
        self.commit(event, &snapshot.test_file_path, &pruned.content, &message, outcome)
            .await
    }

    async fn commit(
        &self,
        event: &ChangeEvent,
        test_path: &str,
        content: &str,
        message: &str,
        outcome: &mut FileOutcome,
    ) -> Result<(), SyncError> {
        let result = commit_test_file(
            self.hosting.as_ref(),
            TestCommit {
                repo: &event.repo,
                branch: &event.branch,
                path: test_path,
                content,
                message,
            },
            self.settings.dry_run,
            self.settings.call_timeout(),
        )
        .await?;
        outcome.writes.push(result);
        Ok(())
    }
}

/// Drop removed and non-source files; keep the first entry per path.
fn processable(files: Vec<FileChange>) -> Vec<FileChange> {
    let mut seen = HashSet::new();
    files
        .into_iter()
        .filter(|f| f.status != FileStatus::Removed && should_process_file(&f.path))
        .filter(|f| seen.insert(f.path.clone()))
        .collect()
}
