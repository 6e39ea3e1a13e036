//! Prometheus metrics for kafka-topic-sync
//!
//! The tool is one-shot, so metrics are exported as a textfile at the end of a
//! run instead of being served.

mod prometheus;

pub use self::prometheus::*;
