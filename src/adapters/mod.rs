//! Cluster backends for the collaborator traits in [`crate::cluster`]

mod kafka_topics;
mod zk_registry;

pub use kafka_topics::*;
pub use zk_registry::*;
