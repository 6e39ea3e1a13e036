//! `kafka-topics.sh` backend
//!
//! Creates topics and alters their configs through the Kafka command-line
//! tool. The tool exits 0 on many failures, so for `--alter` the combined
//! stdout/stderr is also searched for "error" (case-insensitive). Matches that
//! fall inside text the tool merely echoes back (the topic name, the config
//! key or value) are ignored; any other benign "error" is still misread as a
//! failure. Creation relies on the exit status and a follow-up existence check.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::cluster::{TopicAdmin, ValidationResult};
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::topic::TopicConfigRecord;

const ERROR_TOKEN: &str = "error";

/// Whether command output signals a rejected operation
pub fn output_reports_error(output: &str) -> bool {
    output_reports_error_ignoring(output, &[])
}

/// Like [`output_reports_error`], skipping matches inside any `echoed` text
pub fn output_reports_error_ignoring(output: &str, echoed: &[&str]) -> bool {
    let haystack = output.to_lowercase();

    let mut spans = Vec::new();
    for text in echoed.iter().filter(|t| !t.is_empty()) {
        let needle = text.to_lowercase();
        spans.extend(
            haystack
                .match_indices(needle.as_str())
                .map(|(start, m)| (start, start + m.len())),
        );
    }

    haystack.match_indices(ERROR_TOKEN).any(|(start, _)| {
        let end = start + ERROR_TOKEN.len();
        !spans.iter().any(|&(s, e)| s <= start && end <= e)
    })
}

/// Captured result of one tool invocation
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub success: bool,
    pub code: Option<i32>,
    /// stdout followed by stderr
    pub output: String,
}

impl CommandOutcome {
    /// Whether the tool rejected the operation, ignoring `echoed` arguments
    pub fn rejected(&self, echoed: &[&str]) -> bool {
        !self.success || output_reports_error_ignoring(&self.output, echoed)
    }

    /// Short description of the failure for error messages
    pub fn describe(&self) -> String {
        let text = self.output.trim();
        match (self.code, text.is_empty()) {
            (Some(code), true) => format!("exited with status {}", code),
            (None, true) => "terminated by signal".to_string(),
            (_, false) => text.to_string(),
        }
    }
}

/// Topic administration via `kafka-topics.sh --zookeeper ...`
#[derive(Debug, Clone)]
pub struct KafkaTopicsCli {
    script: PathBuf,
    zookeeper_connect: String,
}

impl KafkaTopicsCli {
    pub fn new(script: impl Into<PathBuf>, zookeeper_connect: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            zookeeper_connect: zookeeper_connect.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.kafka_topics_script(), settings.zookeeper_connect.clone())
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Arguments for creating `record`'s topic
    pub fn create_args(&self, record: &TopicConfigRecord) -> Vec<OsString> {
        vec![
            "--zookeeper".into(),
            self.zookeeper_connect.clone().into(),
            "--create".into(),
            "--replication-factor".into(),
            record.replication_factor().to_string().into(),
            "--partitions".into(),
            record.partition_count().to_string().into(),
            "--topic".into(),
            record.name().into(),
        ]
    }

    /// Arguments for setting `key=value` on `topic`
    pub fn alter_args(&self, topic: &str, key: &str, value: &str) -> Vec<OsString> {
        vec![
            "--zookeeper".into(),
            self.zookeeper_connect.clone().into(),
            "--alter".into(),
            "--config".into(),
            format!("{}={}", key, value).into(),
            "--topic".into(),
            topic.into(),
        ]
    }

    async fn run(&self, args: Vec<OsString>) -> std::io::Result<CommandOutcome> {
        debug!(script = %self.script.display(), args = ?args, "Running kafka-topics");

        let output = Command::new(&self.script)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutcome {
            success: output.status.success(),
            code: output.status.code(),
            output: text,
        })
    }
}

impl TopicAdmin for KafkaTopicsCli {
    async fn create_topic(&self, record: &TopicConfigRecord) -> Result<()> {
        info!(topic = %record.name(), "Creating new topic \"{}\"", record);

        let outcome = self
            .run(self.create_args(record))
            .await
            .map_err(|e| Error::CreationFailed {
                topic: record.name().to_string(),
                reason: format!("cannot run {}: {}", self.script.display(), e),
            })?;

        if !outcome.success {
            return Err(Error::CreationFailed {
                topic: record.name().to_string(),
                reason: outcome.describe(),
            });
        }

        Ok(())
    }

    async fn check_config(&self, topic: &str, key: &str, value: &str) -> ValidationResult {
        let outcome = match self.run(self.alter_args(topic, key, value)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(topic = %topic, key = %key, error = %e, "Config check could not run");
                return ValidationResult::CheckFailed {
                    reason: format!("cannot run {}: {}", self.script.display(), e),
                };
            }
        };

        if outcome.rejected(&[topic, key, value]) {
            ValidationResult::Invalid {
                reason: outcome.describe(),
            }
        } else {
            ValidationResult::Valid
        }
    }

    async fn alter_config(&self, topic: &str, key: &str, value: &str) -> Result<()> {
        let outcome = self
            .run(self.alter_args(topic, key, value))
            .await
            .map_err(|e| Error::AlterFailed {
                topic: topic.to_string(),
                key: key.to_string(),
                reason: format!("cannot run {}: {}", self.script.display(), e),
            })?;

        if outcome.rejected(&[topic, key, value]) {
            return Err(Error::AlterFailed {
                topic: topic.to_string(),
                key: key.to_string(),
                reason: outcome.describe(),
            });
        }

        Ok(())
    }
}
