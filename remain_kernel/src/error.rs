//! Error taxonomy surfaced to the calling application.
//!
//! Absence signals and recoverable strategy failures never reach this
//! type; they are handled inside the probe runner and dispatch engine.

use thiserror::Error;

use crate::capability::CapabilityFlag;
use crate::host::HostError;
use crate::operation::OperationKind;
use crate::version::HostVersion;

#[derive(Debug, Error)]
pub enum RemainError {
    /// Host is below the minimum supported baseline. Aborts startup.
    #[error("host below supported baseline ({probe}): {reason}")]
    ProbeFatal { probe: &'static str, reason: String },

    /// No strategy for the operation worked on this host.
    #[error("{operation} is not supported on host {version}")]
    Unsupported {
        operation: OperationKind,
        version: HostVersion,
    },

    /// The native shape lacks the requested member.
    #[error("field '{field}' unavailable on {shape}")]
    FieldUnavailable { shape: String, field: &'static str },

    /// The bridge could not map an object to any known native shape.
    #[error("cannot map {object} to a native shape on host {version}")]
    IncompatibleHost { object: String, version: HostVersion },

    #[error("capability {0} recorded twice")]
    DuplicateCapability(CapabilityFlag),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Host(#[from] HostError),
}

impl RemainError {
    /// True for errors a strategy may recover from by falling through.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RemainError::FieldUnavailable { .. } => true,
            RemainError::Host(e) => e.is_absence(),
            _ => false,
        }
    }
}
