//! Error types for the probe-cook-engine crate.
//!
//! Estimation never fails with an error: every estimator returns an
//! `Option` and "no estimate" is a normal outcome. Errors are reserved for
//! host-facing commands, configuration and the external collaborators
//! (preference storage, notification dispatch).

use thiserror::Error;

use crate::data::CookingState;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// The command is not allowed in the current lifecycle state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// The rejected operation.
        operation: String,
        /// The lifecycle state at the time of the call.
        state: CookingState,
    },

    /// The food selection is not present in the food table.
    #[error("Unknown food: {category}/{food}/{doneness}")]
    UnknownFood {
        /// Requested category.
        category: String,
        /// Requested food.
        food: String,
        /// Requested doneness.
        doneness: String,
    },

    /// The preference store failed.
    #[error("Storage error: {reason}")]
    Storage {
        /// Description of the failure.
        reason: String,
    },

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Preferences or configuration could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A notification could not be delivered.
    #[error("Notification failed: {reason}")]
    Notification {
        /// Description of the failure.
        reason: String,
    },

    /// The specified probe was not found.
    #[error("Probe not found: {identifier}")]
    ProbeNotFound {
        /// The identifier that was searched for.
        identifier: String,
    },

    /// The maximum number of monitored probes has been reached.
    #[error("Maximum probes ({max}) already monitored")]
    MaxProbesReached {
        /// The maximum number of probes allowed.
        max: usize,
    },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn invalid_parameter(name: &str, value: impl ToString) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
