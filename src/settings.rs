//! Static settings
//!
//! Loaded once at process start from an optional YAML file and then
//! overridden by command-line flags. Every component receives the settings
//! (or the part it needs) explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the topic administration script inside `kafka_bin_dir`
pub const KAFKA_TOPICS_SCRIPT: &str = "kafka-topics.sh";

/// Process-wide settings
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct Settings {
    /// ZooKeeper connect string (`host:port[,host:port...][/chroot]`)
    #[serde(default = "default_zookeeper_connect")]
    pub zookeeper_connect: String,

    /// ZooKeeper session timeout in seconds
    #[serde(default = "default_zookeeper_timeout_secs")]
    pub zookeeper_timeout_secs: u64,

    /// Directory containing the Kafka command-line tools
    #[serde(default = "default_kafka_bin_dir")]
    pub kafka_bin_dir: PathBuf,

    /// Directory holding one `<topic>.yaml` file per topic
    #[serde(default = "default_topics_dir")]
    pub topics_dir: PathBuf,

    /// Where operators should look up valid broker configs
    #[serde(default = "default_documentation_url")]
    pub documentation_url: String,

    /// Keep going with the remaining topics after one fails
    #[serde(default)]
    pub continue_on_error: bool,
}

fn default_zookeeper_connect() -> String {
    "localhost:2181".into()
}

fn default_zookeeper_timeout_secs() -> u64 {
    30
}

fn default_kafka_bin_dir() -> PathBuf {
    PathBuf::from("/opt/kafka/bin")
}

fn default_topics_dir() -> PathBuf {
    PathBuf::from("/etc/kafka/topics")
}

fn default_documentation_url() -> String {
    "http://kafka.apache.org/documentation.html#brokerconfigs".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            zookeeper_connect: default_zookeeper_connect(),
            zookeeper_timeout_secs: default_zookeeper_timeout_secs(),
            kafka_bin_dir: default_kafka_bin_dir(),
            topics_dir: default_topics_dir(),
            documentation_url: default_documentation_url(),
            continue_on_error: false,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Cannot read settings file {}: {}", path.display(), e))
        })?;

        // An empty file means "all defaults"
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.zookeeper_connect.trim().is_empty() {
            return Err(Error::config("zookeeper_connect must not be empty"));
        }

        if self.zookeeper_timeout_secs == 0 {
            return Err(Error::config("zookeeper_timeout_secs must be greater than 0"));
        }

        if self.kafka_bin_dir.as_os_str().is_empty() {
            return Err(Error::config("kafka_bin_dir must not be empty"));
        }

        if self.topics_dir.as_os_str().is_empty() {
            return Err(Error::config("topics_dir must not be empty"));
        }

        Ok(())
    }

    /// Full path of `kafka-topics.sh`
    pub fn kafka_topics_script(&self) -> PathBuf {
        self.kafka_bin_dir.join(KAFKA_TOPICS_SCRIPT)
    }

    /// ZooKeeper session timeout
    pub fn zookeeper_timeout(&self) -> Duration {
        Duration::from_secs(self.zookeeper_timeout_secs)
    }
}
