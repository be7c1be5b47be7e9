//! Change detection for `testsync-detector`.
//!
//! - [`classify`]: diff or snapshot pair → [`testsync_core::ChangeAnalysis`]
//! - [`directive`]: skip directive and bot-marker scanning of trigger text
//! - [`branch`]: branch allow-list matching
//!
//! Everything here is pure and total: failures degrade to conservative
//! results and are logged, never returned.

pub mod branch;
pub mod classify;
pub mod directive;

pub use branch::{is_allowed, BranchFilter, BranchPattern};
pub use classify::{classify, extract_functions, ChangeClassifier, HeuristicClassifier};
pub use directive::{is_own_commit, parse, parse_with, DEFAULT_SKIP_DIRECTIVE};
