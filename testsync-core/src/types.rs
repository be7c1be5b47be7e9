//! Domain types for change events, file changes and classification results.
//!
//! Repository paths are `/`-separated strings as reported by the hosting
//! service, not local filesystem paths, so they are carried as `String`.
//! All types are serializable via serde so they can be logged and returned
//! from the webhook endpoint.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A commit identifier or branch name used as a read reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(pub String);

impl Revision {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for the all-zero SHA the hosting service sends for created or
    /// deleted refs.
    pub fn is_null(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Revision {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque token identifying the stored version of a file (a blob SHA on
/// GitHub). Writes that update a file must present the current marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionMarker(pub String);

impl fmt::Display for RevisionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RevisionMarker {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RevisionMarker {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Repository coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Kind of repository event that triggered processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
}

impl EventKind {
    /// Map the value of the event-type header to a supported kind.
    pub fn from_header(value: &str) -> Option<Self> {
        match value.trim() {
            "push" => Some(EventKind::Push),
            "pull_request" => Some(EventKind::PullRequest),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Push => write!(f, "push"),
            EventKind::PullRequest => write!(f, "pull_request"),
        }
    }
}

/// Status of a file within a change set, as reported by the hosting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    #[default]
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    #[serde(other)]
    Unknown,
}

/// Classified nature of a source change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeType {
    NoChange,
    CommentOnly,
    WhitespaceOnly,
    FunctionAddition,
    FunctionRemoval,
    FunctionModification,
    Mixed,
    NewFile,
    Unknown,
}

impl ChangeType {
    /// Every change type in a stable order.
    pub fn all() -> &'static [ChangeType] {
        &[
            ChangeType::NoChange,
            ChangeType::CommentOnly,
            ChangeType::WhitespaceOnly,
            ChangeType::FunctionAddition,
            ChangeType::FunctionRemoval,
            ChangeType::FunctionModification,
            ChangeType::Mixed,
            ChangeType::NewFile,
            ChangeType::Unknown,
        ]
    }

    /// Changes that never warrant test generation.
    pub fn is_cosmetic(&self) -> bool {
        matches!(
            self,
            ChangeType::NoChange | ChangeType::CommentOnly | ChangeType::WhitespaceOnly
        )
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeType::NoChange => "no-change",
            ChangeType::CommentOnly => "comment-only",
            ChangeType::WhitespaceOnly => "whitespace-only",
            ChangeType::FunctionAddition => "function-addition",
            ChangeType::FunctionRemoval => "function-removal",
            ChangeType::FunctionModification => "function-modification",
            ChangeType::Mixed => "mixed",
            ChangeType::NewFile => "new-file",
            ChangeType::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// What the test-authoring collaborator is asked to do with the test file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    /// No test file exists yet.
    New,
    /// Preserve unrelated tests, add or remove only what changed.
    Update,
    /// Rebuild the complete test file from the diff.
    Regenerate,
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationKind::New => write!(f, "new"),
            GenerationKind::Update => write!(f, "update"),
            GenerationKind::Regenerate => write!(f, "regenerate"),
        }
    }
}

/// Terminal state of one file's test lifecycle within an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Skipped,
    CleanupOnly,
    GeneratedNew,
    Updated,
    RegeneratedComplete,
    Failed,
}

impl FileState {
    /// Every state except [`FileState::Failed`] counts as processed.
    pub fn is_success(&self) -> bool {
        !matches!(self, FileState::Failed)
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileState::Skipped => write!(f, "skipped"),
            FileState::CleanupOnly => write!(f, "cleanup-only"),
            FileState::GeneratedNew => write!(f, "generated-new"),
            FileState::Updated => write!(f, "updated"),
            FileState::RegeneratedComplete => write!(f, "regenerated-complete"),
            FileState::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One trigger occurrence. Created on webhook receipt, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: EventKind,
    pub repo: RepoRef,
    /// Prior revision (push `before`, pull request base SHA).
    pub before: Revision,
    /// Head revision (push `after`, pull request head SHA).
    pub after: Revision,
    /// Branch that receives generated test commits.
    pub branch: String,
    /// Commit message, or pull request title and body.
    pub trigger_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// One file touched by a [`ChangeEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub status: FileStatus,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    #[serde(default)]
    pub changes: u32,
    /// Unified diff hunks; absent for binary or very large diffs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            additions: 0,
            deletions: 0,
            changes: 0,
            patch: None,
            previous_path: None,
        }
    }

    pub fn with_patch(mut self, patch: impl Into<String>) -> Self {
        self.patch = Some(patch.into());
        self
    }
}

/// The three content states of one changed file, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentSnapshot {
    /// Content at the head revision.
    pub current: Option<String>,
    /// Content at the prior revision; absent for new files.
    pub base: Option<String>,
    /// Content of the existing test file at the head revision.
    pub test: Option<String>,
    pub test_file_path: String,
}

impl ContentSnapshot {
    /// Snapshot with every content field absent.
    pub fn empty(test_file_path: impl Into<String>) -> Self {
        Self {
            current: None,
            base: None,
            test: None,
            test_file_path: test_file_path.into(),
        }
    }
}

/// Classification result for one file change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeAnalysis {
    pub change_type: ChangeType,
    pub has_code_changes: bool,
    pub has_function_removals: bool,
    pub has_function_additions: bool,
    pub has_function_modifications: bool,
    pub added_functions: BTreeSet<String>,
    pub removed_functions: BTreeSet<String>,
    pub modified_functions: BTreeSet<String>,
}

impl ChangeAnalysis {
    /// Conservative result used whenever classification cannot complete.
    pub fn unknown() -> Self {
        Self::cosmetic(ChangeType::Unknown, true)
    }

    /// Result for a change type that carries no function sets.
    pub fn cosmetic(change_type: ChangeType, has_code_changes: bool) -> Self {
        Self {
            change_type,
            has_code_changes,
            has_function_removals: false,
            has_function_additions: false,
            has_function_modifications: false,
            added_functions: BTreeSet::new(),
            removed_functions: BTreeSet::new(),
            modified_functions: BTreeSet::new(),
        }
    }

    /// Build an analysis from collected function sets. Flags are derived from
    /// the sets so they can never disagree with them.
    pub fn from_sets(
        change_type: ChangeType,
        has_code_changes: bool,
        added: BTreeSet<String>,
        removed: BTreeSet<String>,
        modified: BTreeSet<String>,
    ) -> Self {
        Self {
            change_type,
            has_code_changes,
            has_function_removals: !removed.is_empty(),
            has_function_additions: !added.is_empty(),
            has_function_modifications: change_type == ChangeType::FunctionModification
                || !modified.is_empty(),
            added_functions: added,
            removed_functions: removed,
            modified_functions: modified,
        }
    }
}

/// Result of scanning trigger text for the skip directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipDecision {
    pub should_skip: bool,
    /// Stale-test cleanup still runs when generation is skipped.
    pub cleanup_removed_functions: bool,
    pub reason: String,
}

/// Test counts reported by the test-authoring collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Coverage {
    pub normal_cases: u32,
    pub edge_cases: u32,
    pub error_cases: u32,
    pub total_tests: u32,
}

/// Informational metadata returned alongside generated tests. Logged only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestMetadata {
    pub comments: String,
    pub framework: String,
    pub coverage: Coverage,
    pub assumptions: Vec<String>,
    pub recommendations: Vec<String>,
    pub estimated_complexity: String,
    pub test_quality: String,
    pub time_to_write: String,
    pub dependencies: Vec<String>,
}

/// Output of the test-authoring collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTestResult {
    /// Complete test file source, written verbatim.
    pub tests: String,
    pub metadata: TestMetadata,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
