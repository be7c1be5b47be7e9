//! testsync core library: domain types, configuration, test-path rule, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes and domain structs shared by every crate
//! - [`config`]: [`Settings`] loading (defaults → YAML file → environment)
//! - [`paths`]: source path → test path mapping and file filtering
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{Secret, Settings, TestAuthoringStrategy};
pub use error::ConfigError;
pub use types::{
    ChangeAnalysis, ChangeEvent, ChangeType, ContentSnapshot, Coverage, EventKind, FileChange,
    FileState, FileStatus, GeneratedTestResult, GenerationKind, RepoRef, Revision,
    RevisionMarker, SkipDecision, TestMetadata,
};
