//! ZooKeeper-backed topic existence checks

use std::time::Duration;

use tracing::{debug, trace};
use zookeeper::{WatchedEvent, Watcher, ZooKeeper};

use crate::cluster::TopicRegistry;
use crate::error::{Error, Result};
use crate::settings::Settings;

/// Namespace under which brokers register topics
pub const TOPICS_PATH: &str = "/brokers/topics";

/// ZooKeeper node for `topic`
pub fn topic_path(topic: &str) -> String {
    format!("{}/{}", TOPICS_PATH, topic)
}

struct SessionWatcher;

impl Watcher for SessionWatcher {
    fn handle(&self, event: WatchedEvent) {
        trace!(state = ?event.keeper_state, "ZooKeeper session event");
    }
}

/// Opens a fresh ZooKeeper session for every lookup and closes it afterwards
#[derive(Debug, Clone)]
pub struct ZkTopicRegistry {
    connect: String,
    timeout: Duration,
}

impl ZkTopicRegistry {
    pub fn new(connect: impl Into<String>, timeout: Duration) -> Self {
        Self {
            connect: connect.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.zookeeper_connect.clone(), settings.zookeeper_timeout())
    }

    fn exists_blocking(connect: &str, timeout: Duration, path: &str) -> Result<bool> {
        let zk = ZooKeeper::connect(connect, timeout, SessionWatcher)
            .map_err(|e| Error::coordination(connect, e))?;

        let stat = zk.exists(path, false);
        if let Err(e) = zk.close() {
            debug!(error = ?e, "Failed to close ZooKeeper session cleanly");
        }

        stat.map(|s| s.is_some())
            .map_err(|e| Error::coordination(connect, e))
    }
}

impl TopicRegistry for ZkTopicRegistry {
    async fn exists(&self, topic: &str) -> Result<bool> {
        let connect = self.connect.clone();
        let timeout = self.timeout;
        let path = topic_path(topic);

        debug!(path = %path, connect = %connect, "Checking topic registration");

        tokio::task::spawn_blocking(move || Self::exists_blocking(&connect, timeout, &path))
            .await
            .map_err(|e| Error::coordination(self.connect.clone(), e))?
    }
}
