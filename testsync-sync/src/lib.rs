//! # testsync-sync
//!
//! Test-file lifecycle orchestration against a hosting service.
//!
//! Build an [`Orchestrator`] from a [`HostingService`], a [`TestAuthor`] and a
//! classifier, then call [`Orchestrator::process_event`] once per inbound
//! [`testsync_core::ChangeEvent`].

pub mod authoring;
pub mod diff;
pub mod error;
pub mod hosting;
pub mod memory;
pub mod pipeline;
pub mod prefetch;
pub mod prune;
pub mod writer;

pub use authoring::{TestAuthor, TestAuthoringRequest};
pub use error::{AuthoringError, HostingError, SyncError};
pub use hosting::{FileEntry, HostingService, PutFile};
pub use memory::InMemoryHosting;
pub use pipeline::{BatchResult, EventOutcome, FileOutcome, IgnoreReason, Orchestrator};
pub use prefetch::prefetch;
pub use prune::{prune, PruneResult};
pub use writer::{commit_test_file, TestCommit, WriteResult};
