//! Recoverable failure types for the sensor registry.
//!
//! Nothing here is fatal: storage failures degrade a repository to
//! in-memory operation and simulation failures leave the timer paused.
//! Form validation does not use these types at all, it reports through
//! [`crate::validation::FieldErrors`].

use std::path::PathBuf;

// ---

/// Failure talking to the key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt value under `{key}`: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Quota exceeded writing `{key}`: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },
}

/// Failure driving the real-time simulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("No sensor selected for the simulation")]
    NoSensorSelected,

    #[error("Sensor #{0} is not registered")]
    UnknownSensor(u64),
}

pub type StorageResult<T> = Result<T, StorageError>;
