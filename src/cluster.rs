//! Cluster collaborator interfaces
//!
//! The reconciler only talks to the cluster through these two traits, so the
//! ZooKeeper / `kafka-topics.sh` backends in [`crate::adapters`] can be swapped
//! for a native admin client (or an in-memory fake) without touching it.

use crate::error::Result;
use crate::topic::TopicConfigRecord;

/// Outcome of checking one `key=value` against the live cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    /// The cluster accepts the value
    Valid,
    /// The cluster rejected the value
    Invalid { reason: String },
    /// The check could not be performed at all
    CheckFailed { reason: String },
}

/// Existence lookups against the coordination service
#[allow(async_fn_in_trait)]
pub trait TopicRegistry {
    /// Whether `topic` is registered in the cluster
    async fn exists(&self, topic: &str) -> Result<bool>;
}

/// Topic administration operations
#[allow(async_fn_in_trait)]
pub trait TopicAdmin {
    /// Register a new topic with the record's replication factor and partition count
    async fn create_topic(&self, record: &TopicConfigRecord) -> Result<()>;

    /// Check whether the cluster accepts `key=value` for `topic`
    async fn check_config(&self, topic: &str, key: &str, value: &str) -> ValidationResult;

    /// Apply `key=value` to `topic`
    async fn alter_config(&self, topic: &str, key: &str, value: &str) -> Result<()>;
}
