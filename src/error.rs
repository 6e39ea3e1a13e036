//! Error types for kafka-topic-sync

use std::path::PathBuf;

use thiserror::Error;

/// Exit code used for every fatal condition
pub const FATAL_EXIT_CODE: u8 = 2;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Sync error types
#[derive(Error, Debug)]
pub enum Error {
    /// Declarative topic file (or its directory) is missing or unreadable
    #[error("Missing topic configuration file {}: {source}", .path.display())]
    MissingConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Declarative topic file could not be interpreted
    #[error("Malformed topic configuration in {}: {reason}", .path.display())]
    MalformedConfig { path: PathBuf, reason: String },

    /// ZooKeeper could not be reached or queried
    #[error("Coordination service at '{connect}' unavailable: {reason}")]
    CoordinationServiceUnavailable { connect: String, reason: String },

    /// Topic creation was rejected or silently ignored
    #[error("Failed to create topic '{topic}': {reason}")]
    CreationFailed { topic: String, reason: String },

    /// The cluster rejected a declared broker config
    #[error(
        "\"{key}={value}\" declared in {} is not a valid configuration for topic '{topic}', please refer to {documentation_url}",
        .source_file.display()
    )]
    InvalidConfig {
        topic: String,
        key: String,
        value: String,
        source_file: PathBuf,
        documentation_url: String,
    },

    /// The validity check itself could not be carried out
    #[error("Could not check config '{key}' for topic '{topic}': {reason}")]
    ConfigCheckFailed {
        topic: String,
        key: String,
        reason: String,
    },

    /// A config passed the check but applying it failed
    #[error("Failed to apply config '{key}' to topic '{topic}': {reason}")]
    AlterFailed {
        topic: String,
        key: String,
        reason: String,
    },

    /// Settings error
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a settings error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a malformed-config error for a declarative file
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::MalformedConfig {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a coordination-service error
    pub fn coordination(connect: impl Into<String>, reason: impl ToString) -> Self {
        Error::CoordinationServiceUnavailable {
            connect: connect.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        FATAL_EXIT_CODE
    }
}
