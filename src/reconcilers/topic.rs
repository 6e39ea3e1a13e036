//! Topic reconciler
//!
//! Handles the business logic for a single topic declaration:
//! - Existence check against the coordination service
//! - Creation when the topic is absent
//! - Validation and application of every declared broker config

use std::fmt;
use std::time::Instant;

use serde::{Serialize, Serializer};
use tracing::{error, info, warn};

use crate::cluster::{TopicAdmin, TopicRegistry, ValidationResult};
use crate::error::{Error, Result};
use crate::metrics;
use crate::topic::{is_creation_only_key, TopicConfigRecord};

/// Where a topic stands in the cluster during one run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopicState {
    /// Not registered yet, creation pending
    AbsentPending,
    /// Registered; terminal for the run
    Present,
}

impl TopicState {
    fn from_exists(exists: bool) -> Self {
        if exists {
            TopicState::Present
        } else {
            TopicState::AbsentPending
        }
    }
}

/// Configs applied to one topic
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub topic: String,
    /// Whether the topic was created in this run
    pub created: bool,
    #[serde(serialize_with = "serialize_pairs")]
    pub applied: Vec<(String, String)>,
}

impl ReconciliationReport {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    fn record(&mut self, key: &str, value: &str) {
        self.applied.push((key.to_string(), value.to_string()));
    }

    /// Value applied for `key`, if any
    pub fn applied_value(&self, key: &str) -> Option<&str> {
        self.applied
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn serialize_pairs<S: Serializer>(
    pairs: &[(String, String)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(pairs.iter().map(|(k, v)| (k, v)))
}

impl fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic '{}' configured with {{", self.topic)?;
        for (i, (key, value)) in self.applied.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Reconciles topic declarations against the cluster
pub struct TopicReconciler<'a, R, A> {
    registry: &'a R,
    admin: &'a A,
    documentation_url: &'a str,
}

impl<'a, R, A> TopicReconciler<'a, R, A>
where
    R: TopicRegistry,
    A: TopicAdmin,
{
    pub fn new(registry: &'a R, admin: &'a A, documentation_url: &'a str) -> Self {
        Self {
            registry,
            admin,
            documentation_url,
        }
    }

    /// Bring `record`'s topic into the declared shape
    pub async fn reconcile(&self, record: &TopicConfigRecord) -> Result<ReconciliationReport> {
        let start = Instant::now();
        let result = self.reconcile_inner(record).await;
        metrics::RECONCILE_DURATION.observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(report) => {
                metrics::TOPICS.with_label_values(&["success"]).inc();
                info!(
                    topic = %record.name(),
                    created = report.created,
                    applied = report.applied.len(),
                    duration = ?start.elapsed(),
                    "Topic reconciled"
                );
            }
            Err(e) => {
                metrics::TOPICS.with_label_values(&["failure"]).inc();
                error!(topic = %record.name(), error = %e, "Topic reconciliation failed");
            }
        }

        result
    }

    async fn reconcile_inner(&self, record: &TopicConfigRecord) -> Result<ReconciliationReport> {
        let mut report = ReconciliationReport::new(record.name());

        let state = TopicState::from_exists(self.registry.exists(record.name()).await?);
        if state == TopicState::AbsentPending {
            self.create(record).await?;
            report.created = true;
        } else {
            info!(topic = %record.name(), "Topic already exists, reconciling configs only");
        }

        self.apply_configs(record, &mut report).await?;
        Ok(report)
    }

    /// AbsentPending -> Present
    async fn create(&self, record: &TopicConfigRecord) -> Result<()> {
        self.admin.create_topic(record).await?;

        // The tool may exit cleanly without registering anything
        if !self.registry.exists(record.name()).await? {
            return Err(Error::CreationFailed {
                topic: record.name().to_string(),
                reason: "topic is still not registered after the create command".into(),
            });
        }

        metrics::TOPICS_CREATED.inc();
        info!(topic = %record.name(), "Topic created");
        Ok(())
    }

    /// Check then apply each declared config, stopping at the first rejection
    async fn apply_configs(
        &self,
        record: &TopicConfigRecord,
        report: &mut ReconciliationReport,
    ) -> Result<()> {
        let topic = record.name();

        for (key, value) in record.extra_configs() {
            if is_creation_only_key(key) {
                continue;
            }

            match self.admin.check_config(topic, key, value).await {
                ValidationResult::Valid => {}
                ValidationResult::Invalid { reason } => {
                    metrics::CONFIGS_REJECTED.inc();
                    warn!(topic = %topic, key = %key, value = %value, reason = %reason, "Config rejected by cluster");
                    return Err(Error::InvalidConfig {
                        topic: topic.to_string(),
                        key: key.clone(),
                        value: value.clone(),
                        source_file: record.source().to_path_buf(),
                        documentation_url: self.documentation_url.to_string(),
                    });
                }
                ValidationResult::CheckFailed { reason } => {
                    return Err(Error::ConfigCheckFailed {
                        topic: topic.to_string(),
                        key: key.clone(),
                        reason,
                    });
                }
            }

            self.admin.alter_config(topic, key, value).await?;
            metrics::CONFIGS_APPLIED.inc();
            report.record(key, value);
            info!(topic = %topic, key = %key, value = %value, "Config applied");
        }

        Ok(())
    }
}
