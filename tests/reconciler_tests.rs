//! Integration tests for topic reconciliation and the multi-topic driver
//!
//! These tests run the reconciler against an in-memory cluster that records
//! every call, so the exact sequence of cluster operations can be asserted.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use kafka_topic_sync::cluster::{TopicAdmin, TopicRegistry, ValidationResult};
use kafka_topic_sync::driver::{Driver, ErrorPolicy, OutputFormat};
use kafka_topic_sync::metrics;
use kafka_topic_sync::reconcilers::TopicReconciler;
use kafka_topic_sync::topic::TopicConfigRecord;
use kafka_topic_sync::{Error, Result};
use tempfile::{tempdir, TempDir};

const DOC_URL: &str = "http://kafka.apache.org/documentation.html#brokerconfigs";

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
enum Call {
    Exists(String),
    Create {
        topic: String,
        replication: u32,
        partitions: u32,
    },
    Check {
        topic: String,
        key: String,
        value: String,
    },
    Alter {
        topic: String,
        key: String,
        value: String,
    },
}

#[derive(Default)]
struct MockCluster {
    topics: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    rejected_keys: HashSet<String>,
    unverifiable_keys: HashSet<String>,
    failing_alter_keys: HashSet<String>,
    unavailable: bool,
    create_is_noop: bool,
}

impl MockCluster {
    fn with_topics(topics: &[&str]) -> Self {
        let cluster = Self::default();
        cluster
            .topics
            .lock()
            .unwrap()
            .extend(topics.iter().map(|t| t.to_string()));
        cluster
    }

    fn rejecting(mut self, key: &str) -> Self {
        self.rejected_keys.insert(key.to_string());
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn creates(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .collect()
    }

    fn checked_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Check { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    fn altered_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Alter { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl TopicRegistry for MockCluster {
    async fn exists(&self, topic: &str) -> Result<bool> {
        self.push(Call::Exists(topic.to_string()));
        if self.unavailable {
            return Err(Error::coordination("zk:2181", "connection refused"));
        }
        Ok(self.topics.lock().unwrap().contains(topic))
    }
}

impl TopicAdmin for MockCluster {
    async fn create_topic(&self, record: &TopicConfigRecord) -> Result<()> {
        self.push(Call::Create {
            topic: record.name().to_string(),
            replication: record.replication_factor(),
            partitions: record.partition_count(),
        });
        if !self.create_is_noop {
            self.topics.lock().unwrap().insert(record.name().to_string());
        }
        Ok(())
    }

    async fn check_config(&self, topic: &str, key: &str, value: &str) -> ValidationResult {
        self.push(Call::Check {
            topic: topic.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        if self.rejected_keys.contains(key) {
            ValidationResult::Invalid {
                reason: format!("Error: unknown config {}", key),
            }
        } else if self.unverifiable_keys.contains(key) {
            ValidationResult::CheckFailed {
                reason: "cannot run kafka-topics.sh".into(),
            }
        } else {
            ValidationResult::Valid
        }
    }

    async fn alter_config(&self, topic: &str, key: &str, value: &str) -> Result<()> {
        self.push(Call::Alter {
            topic: topic.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        if self.failing_alter_keys.contains(key) {
            return Err(Error::AlterFailed {
                topic: topic.to_string(),
                key: key.to_string(),
                reason: "Error while executing config command".into(),
            });
        }
        Ok(())
    }
}

fn orders_record() -> TopicConfigRecord {
    TopicConfigRecord::new("orders", 3, 6, [("retention.ms", "86400000")]).unwrap()
}

fn write_topic(dir: &TempDir, file: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(file);
    fs::write(&path, contents).unwrap();
    path
}

fn output_of(buffer: Vec<u8>) -> String {
    String::from_utf8(buffer).unwrap()
}

fn paths(files: &[&Path]) -> Vec<PathBuf> {
    files.iter().map(|p| p.to_path_buf()).collect()
}

// ============================================================================
// Reconciler Tests
// ============================================================================

#[tokio::test]
async fn absent_topic_is_created_then_configured() {
    let cluster = MockCluster::default();
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);

    let report = reconciler.reconcile(&orders_record()).await.unwrap();

    assert_eq!(
        cluster.calls(),
        vec![
            Call::Exists("orders".into()),
            Call::Create {
                topic: "orders".into(),
                replication: 3,
                partitions: 6,
            },
            Call::Exists("orders".into()),
            Call::Check {
                topic: "orders".into(),
                key: "retention.ms".into(),
                value: "86400000".into(),
            },
            Call::Alter {
                topic: "orders".into(),
                key: "retention.ms".into(),
                value: "86400000".into(),
            },
        ]
    );
    assert!(report.created);
    assert_eq!(
        report.applied,
        vec![("retention.ms".to_string(), "86400000".to_string())]
    );
    assert_eq!(
        report.to_string(),
        "Topic 'orders' configured with {retention.ms: \"86400000\"}"
    );
}

#[tokio::test]
async fn present_topic_is_never_created() {
    let cluster = MockCluster::with_topics(&["orders"]);
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);

    let report = reconciler.reconcile(&orders_record()).await.unwrap();

    assert!(cluster.creates().is_empty());
    assert!(!report.created);
    assert_eq!(cluster.altered_keys(), vec!["retention.ms"]);
    assert_eq!(report.applied_value("retention.ms"), Some("86400000"));
}

#[tokio::test]
async fn creation_uses_declared_counts_exactly() {
    for (replication, partitions) in [(1, 1), (2, 48), (5, 1), (3, 6)] {
        let cluster = MockCluster::default();
        let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
        let record =
            TopicConfigRecord::new("payments", replication, partitions, Vec::<(String, String)>::new())
                .unwrap();

        reconciler.reconcile(&record).await.unwrap();

        assert_eq!(
            cluster.creates(),
            vec![Call::Create {
                topic: "payments".into(),
                replication,
                partitions,
            }]
        );
    }
}

#[tokio::test]
async fn invalid_config_halts_remaining_keys() {
    let cluster = MockCluster::with_topics(&["orders"]).rejecting("retention.bogus");
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
    let record = TopicConfigRecord::new(
        "orders",
        3,
        6,
        [
            ("cleanup.policy", "delete"),
            ("retention.bogus", "1"),
            ("segment.ms", "600000"),
        ],
    )
    .unwrap();

    let err = reconciler.reconcile(&record).await.unwrap_err();

    match &err {
        Error::InvalidConfig {
            topic,
            key,
            documentation_url,
            ..
        } => {
            assert_eq!(topic, "orders");
            assert_eq!(key, "retention.bogus");
            assert_eq!(documentation_url, DOC_URL);
        }
        other => panic!("expected InvalidConfig, got {:?}", other),
    }
    assert!(err.to_string().contains("retention.bogus"));
    assert!(err.to_string().contains(DOC_URL));

    assert_eq!(cluster.checked_keys(), vec!["cleanup.policy", "retention.bogus"]);
    assert_eq!(cluster.altered_keys(), vec!["cleanup.policy"]);
}

#[tokio::test]
async fn failed_check_is_fatal_for_the_topic() {
    let mut cluster = MockCluster::with_topics(&["orders"]);
    cluster.unverifiable_keys.insert("retention.ms".into());
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);

    let err = reconciler.reconcile(&orders_record()).await.unwrap_err();

    assert!(matches!(err, Error::ConfigCheckFailed { ref key, .. } if key == "retention.ms"));
    assert!(cluster.altered_keys().is_empty());
}

#[tokio::test]
async fn failed_alter_after_valid_check_halts_remaining_keys() {
    let mut cluster = MockCluster::with_topics(&["orders"]);
    cluster.failing_alter_keys.insert("retention.ms".into());
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
    let record = TopicConfigRecord::new(
        "orders",
        3,
        6,
        [
            ("cleanup.policy", "delete"),
            ("retention.ms", "86400000"),
            ("segment.ms", "600000"),
        ],
    )
    .unwrap();

    let err = reconciler.reconcile(&record).await.unwrap_err();

    assert!(matches!(err, Error::AlterFailed { ref key, .. } if key == "retention.ms"));
    assert_eq!(cluster.checked_keys(), vec!["cleanup.policy", "retention.ms"]);
    assert_eq!(cluster.altered_keys(), vec!["cleanup.policy", "retention.ms"]);
}

#[tokio::test]
async fn unreachable_coordination_service_stops_before_creation() {
    let cluster = MockCluster {
        unavailable: true,
        ..Default::default()
    };
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);

    let err = reconciler.reconcile(&orders_record()).await.unwrap_err();

    assert!(matches!(err, Error::CoordinationServiceUnavailable { .. }));
    assert_eq!(cluster.calls(), vec![Call::Exists("orders".into())]);
}

#[tokio::test]
async fn silent_creation_noop_is_detected() {
    let cluster = MockCluster {
        create_is_noop: true,
        ..Default::default()
    };
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);

    let err = reconciler.reconcile(&orders_record()).await.unwrap_err();

    assert!(matches!(err, Error::CreationFailed { ref topic, .. } if topic == "orders"));
    assert!(cluster.checked_keys().is_empty());
}

#[tokio::test]
async fn second_run_reapplies_without_creating() {
    let cluster = MockCluster::default();
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
    let record = orders_record();

    let first = reconciler.reconcile(&record).await.unwrap();
    let second = reconciler.reconcile(&record).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.applied, second.applied);
    assert_eq!(cluster.creates().len(), 1);
    assert_eq!(cluster.altered_keys(), vec!["retention.ms", "retention.ms"]);
}

#[tokio::test]
async fn creation_only_keys_are_never_reconciled() {
    let dir = tempdir().unwrap();
    let path = write_topic(
        &dir,
        "audit.yaml",
        "replication: 2\nretention.ms: 1000\npartitions: 4\ncleanup.policy: compact\n",
    );
    let record = TopicConfigRecord::load(&path).unwrap();

    let cluster = MockCluster::default();
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
    let report = reconciler.reconcile(&record).await.unwrap();

    let checked = cluster.checked_keys();
    assert_eq!(checked, vec!["retention.ms", "cleanup.policy"]);
    assert!(report.applied_value("replication").is_none());
    assert!(report.applied_value("partitions").is_none());
}

// ============================================================================
// Driver Tests
// ============================================================================

#[tokio::test]
async fn driver_prints_report_per_topic() {
    let dir = tempdir().unwrap();
    let orders = write_topic(
        &dir,
        "orders.yaml",
        "replication: 3\npartitions: 6\nretention.ms: \"86400000\"\n",
    );
    let audit = write_topic(&dir, "audit.yaml", "replication: 1\npartitions: 1\n");

    let cluster = MockCluster::with_topics(&["audit"]);
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
    let mut driver = Driver::new(reconciler, ErrorPolicy::Abort, Vec::new());

    let summary = driver.run(&paths(&[&orders, &audit])).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.created(), 1);
    assert_eq!(
        output_of(driver.into_output()),
        "Topic 'orders' configured with {retention.ms: \"86400000\"}\n\
         Topic 'audit' configured with {}\n"
    );
}

#[tokio::test]
async fn malformed_declaration_makes_no_cluster_calls() {
    let dir = tempdir().unwrap();
    let path = write_topic(&dir, "orders.yaml", "replication: 3\nretention.ms: 1000\n");

    let cluster = MockCluster::default();
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
    let mut driver = Driver::new(reconciler, ErrorPolicy::Abort, Vec::new());
    let failures = metrics::TOPICS.with_label_values(&["failure"]);
    let failures_before = failures.get();

    let err = driver.run(&paths(&[&path])).await.unwrap_err();

    assert!(matches!(err, Error::MalformedConfig { .. }));
    assert!(err.to_string().contains("partitions"));
    assert!(cluster.calls().is_empty());
    // Other tests share the registry, so only a lower bound holds
    assert!(failures.get() >= failures_before + 1.0);
}

#[tokio::test]
async fn missing_declaration_is_reported() {
    let dir = tempdir().unwrap();
    let cluster = MockCluster::default();
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
    let mut driver = Driver::new(reconciler, ErrorPolicy::Abort, Vec::new());

    let err = driver
        .run(&[dir.path().join("ghost.yaml")])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingConfigFile { .. }));
    assert!(err.to_string().contains("ghost.yaml"));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn abort_policy_leaves_later_topics_untouched() {
    let dir = tempdir().unwrap();
    let bad = write_topic(&dir, "bad.yaml", "replication: 1\npartitions: 1\nbogus: x\n");
    let good = write_topic(&dir, "good.yaml", "replication: 1\npartitions: 1\n");

    let cluster = MockCluster::default().rejecting("bogus");
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
    let mut driver = Driver::new(reconciler, ErrorPolicy::Abort, Vec::new());

    let err = driver.run(&paths(&[&bad, &good])).await.unwrap_err();

    assert!(matches!(err, Error::InvalidConfig { ref key, .. } if key == "bogus"));
    assert!(!cluster.calls().contains(&Call::Exists("good".into())));
    assert!(driver.into_output().is_empty());
}

#[tokio::test]
async fn continue_policy_processes_remaining_topics() {
    let dir = tempdir().unwrap();
    let bad = write_topic(&dir, "bad.yaml", "replication: 1\npartitions: 1\nbogus: x\n");
    let broken = write_topic(&dir, "broken.yaml", "replication: 1\n");
    let good = write_topic(&dir, "good.yaml", "replication: 1\npartitions: 2\nretention.ms: 5\n");

    let cluster = MockCluster::default().rejecting("bogus");
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
    let mut driver = Driver::new(reconciler, ErrorPolicy::Continue, Vec::new());

    let summary = driver.run(&paths(&[&bad, &broken, &good])).await.unwrap();

    assert!(!summary.is_success());
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].topic, "good");
    assert_eq!(summary.failures.len(), 2);
    assert_eq!(summary.failures[0].source, bad);
    assert!(matches!(summary.failures[1].error, Error::MalformedConfig { .. }));
    assert_eq!(
        output_of(driver.into_output()),
        "Topic 'good' configured with {retention.ms: \"5\"}\n"
    );
}

#[tokio::test]
async fn json_output_is_one_object_per_topic() {
    let dir = tempdir().unwrap();
    let orders = write_topic(
        &dir,
        "orders.yaml",
        "replication: 3\npartitions: 6\nretention.ms: \"86400000\"\n",
    );

    let cluster = MockCluster::default();
    let reconciler = TopicReconciler::new(&cluster, &cluster, DOC_URL);
    let mut driver =
        Driver::new(reconciler, ErrorPolicy::Abort, Vec::new()).with_format(OutputFormat::Json);

    driver.run(&paths(&[&orders])).await.unwrap();

    let output = output_of(driver.into_output());
    let value: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
    assert_eq!(value["topic"], "orders");
    assert_eq!(value["created"], true);
    assert_eq!(value["applied"]["retention.ms"], "86400000");
}

#[test]
fn error_policy_from_flag() {
    assert_eq!(ErrorPolicy::from_continue_flag(false), ErrorPolicy::Abort);
    assert_eq!(ErrorPolicy::from_continue_flag(true), ErrorPolicy::Continue);
}
