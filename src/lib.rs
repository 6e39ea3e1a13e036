//! Kafka topic configuration sync
//!
//! Reads one declarative YAML file per topic, creates the topic when the
//! cluster does not know it yet, and applies every declared broker config.

pub mod adapters;
pub mod cluster;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod reconcilers;
pub mod settings;
pub mod topic;

pub use error::{Error, Result};
