//! Declarative topic configuration record
//!
//! One YAML file per topic. The topic name comes from the file name
//! (`orders.yaml` declares `orders`); the file itself is a flat mapping:
//!
//! ```yaml
//! replication: 3
//! partitions: 6
//! retention.ms: 86400000
//! cleanup.policy: delete
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};

/// Key holding the replication factor
pub const REPLICATION_KEY: &str = "replication";

/// Key holding the partition count
pub const PARTITIONS_KEY: &str = "partitions";

/// Longest topic name the broker accepts
pub const MAX_TOPIC_NAME_LEN: usize = 249;

/// Creation-only keys, never reconciled as broker configs
pub fn is_creation_only_key(key: &str) -> bool {
    key == REPLICATION_KEY || key == PARTITIONS_KEY
}

/// A loaded topic declaration. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TopicConfigRecord {
    name: String,
    replication_factor: u32,
    partition_count: u32,
    extra_configs: Vec<(String, String)>,
    source: PathBuf,
}

impl TopicConfigRecord {
    /// Build a record directly. Creation-only keys in `extra_configs` are dropped.
    pub fn new<K, V>(
        name: impl Into<String>,
        replication_factor: u32,
        partition_count: u32,
        extra_configs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        let source = PathBuf::from(format!("{}.yaml", name));

        validate_topic_name(&name).map_err(|reason| Error::malformed(&source, reason))?;
        if replication_factor == 0 {
            return Err(Error::malformed(&source, "'replication' must be at least 1"));
        }
        if partition_count == 0 {
            return Err(Error::malformed(&source, "'partitions' must be at least 1"));
        }

        let extra_configs = extra_configs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| !is_creation_only_key(k))
            .collect();

        Ok(Self {
            name,
            replication_factor,
            partition_count,
            extra_configs,
            source,
        })
    }

    /// Load a record from a declarative YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::InvalidData => Error::malformed(path, "file is not valid UTF-8"),
            _ => Error::MissingConfigFile {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let name = topic_name_from_path(path)?;
        Self::parse(&name, &raw, path)
    }

    /// Parse file contents for topic `name`; `path` is used for error context only
    pub fn parse(name: &str, raw: &str, path: &Path) -> Result<Self> {
        validate_topic_name(name).map_err(|reason| Error::malformed(path, reason))?;

        let value: Value = serde_yaml::from_str(raw)
            .map_err(|e| Error::malformed(path, format!("invalid YAML: {}", e)))?;

        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Err(Error::malformed(path, "file is empty")),
            _ => return Err(Error::malformed(path, "expected a mapping of config keys")),
        };

        let replication_factor = required_count(&mapping, REPLICATION_KEY, path)?;
        let partition_count = required_count(&mapping, PARTITIONS_KEY, path)?;

        let mut extra_configs = Vec::with_capacity(mapping.len());
        for (key, value) in &mapping {
            let key = scalar_to_string(key)
                .ok_or_else(|| Error::malformed(path, format!("unsupported key {:?}", key)))?;
            if is_creation_only_key(&key) {
                continue;
            }
            let value = scalar_to_string(value).ok_or_else(|| {
                Error::malformed(path, format!("value of '{}' must be a scalar", key))
            })?;
            extra_configs.push((key, value));
        }

        Ok(Self {
            name: name.to_string(),
            replication_factor,
            partition_count,
            extra_configs,
            source: path.to_path_buf(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replication_factor(&self) -> u32 {
        self.replication_factor
    }

    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }

    /// Broker configs in declaration order, creation-only keys excluded
    pub fn extra_configs(&self) -> &[(String, String)] {
        &self.extra_configs
    }

    /// File the record was loaded from
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl fmt::Display for TopicConfigRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} --replication-factor {} --partitions {}",
            self.name, self.replication_factor, self.partition_count
        )
    }
}

/// Derive the topic name from a file path (base name, extension stripped)
pub fn topic_name_from_path(path: &Path) -> Result<String> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::malformed(path, "cannot derive a topic name from the file name"))?;

    validate_topic_name(stem).map_err(|reason| Error::malformed(path, reason))?;
    Ok(stem.to_string())
}

/// Check a topic name against the broker's naming rules
pub fn validate_topic_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("topic name must not be empty".into());
    }
    if name == "." || name == ".." {
        return Err(format!("'{}' is not a legal topic name", name));
    }
    if name.len() > MAX_TOPIC_NAME_LEN {
        return Err(format!(
            "topic name is {} characters long, the maximum is {}",
            name.len(),
            MAX_TOPIC_NAME_LEN
        ));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(format!("topic name '{}' contains illegal character {:?}", name, c));
    }
    Ok(())
}

fn required_count(mapping: &Mapping, key: &str, path: &Path) -> Result<u32> {
    let value = mapping
        .get(key)
        .ok_or_else(|| Error::malformed(path, format!("missing required key '{}'", key)))?;

    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed.and_then(|n| u32::try_from(n).ok()) {
        Some(n) if n >= 1 => Ok(n),
        _ => Err(Error::malformed(
            path,
            format!("'{}' must be a positive integer, got {}", key, render(value)),
        )),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn render(value: &Value) -> String {
    scalar_to_string(value).unwrap_or_else(|| format!("{:?}", value))
}
