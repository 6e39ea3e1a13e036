//! Reconcilers for topic declarations
//!
//! Reconcilers are responsible for:
//! - Deciding whether a topic must be created
//! - Validating and applying declared broker configs
//! - Reporting what was applied

pub mod topic;

pub use topic::{ReconciliationReport, TopicReconciler, TopicState};
