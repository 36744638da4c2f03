/// Remain Kernel — Strategy Model
///
/// A strategy is one concrete way to perform an operation, gated by the
/// capability values it requires. Strategies are plain fn pointers so a
/// table of them is `Copy`-cheap and trivially `Send + Sync`.

use std::fmt;

use crate::capability::{CapabilityFlag, CapabilityRegistry, CapabilityValue};
use crate::error::RemainError;
use crate::host::{Host, HostError};
use crate::operation::{Operation, Outcome};

// ── Requirements ───────────────────────────────────────────────────

/// `flag` must hold exactly `value` for the strategy to be eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub flag: CapabilityFlag,
    pub value: CapabilityValue,
}

impl Requirement {
    pub const fn supported(flag: CapabilityFlag) -> Self {
        Self {
            flag,
            value: CapabilityValue::Supported(true),
        }
    }

    pub const fn equals(flag: CapabilityFlag, value: CapabilityValue) -> Self {
        Self { flag, value }
    }

    pub fn holds(&self, registry: &CapabilityRegistry) -> bool {
        registry.get(self.flag) == Some(self.value)
    }
}

// ── Context and errors ─────────────────────────────────────────────

/// What a strategy body may touch.
pub struct StrategyContext<'a> {
    pub host: &'a dyn Host,
    pub registry: &'a CapabilityRegistry,
}

/// Failure of a single strategy attempt.
#[derive(Debug)]
pub enum StrategyError {
    /// Expected absence; the engine tries the next strategy.
    Recoverable(String),
    /// Propagated to the caller as-is.
    Fatal(RemainError),
}

impl fmt::Display for StrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyError::Recoverable(reason) => write!(f, "recoverable: {}", reason),
            StrategyError::Fatal(err) => write!(f, "fatal: {}", err),
        }
    }
}

impl From<HostError> for StrategyError {
    fn from(err: HostError) -> Self {
        if err.is_absence() {
            StrategyError::Recoverable(err.to_string())
        } else {
            StrategyError::Fatal(RemainError::Host(err))
        }
    }
}

impl From<RemainError> for StrategyError {
    fn from(err: RemainError) -> Self {
        if err.is_recoverable() {
            StrategyError::Recoverable(err.to_string())
        } else {
            StrategyError::Fatal(err)
        }
    }
}

impl From<prost::EncodeError> for StrategyError {
    fn from(err: prost::EncodeError) -> Self {
        StrategyError::Fatal(RemainError::Host(HostError::Failed(err.to_string())))
    }
}

pub type StrategyFn = fn(&StrategyContext<'_>, &Operation) -> Result<Outcome, StrategyError>;

// ── Strategy ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Strategy {
    pub name: &'static str,
    pub requires: Vec<Requirement>,
    pub run: StrategyFn,
}

impl Strategy {
    pub fn new(name: &'static str, requires: &[Requirement], run: StrategyFn) -> Self {
        Self {
            name,
            requires: requires.to_vec(),
            run,
        }
    }

    /// True when every requirement holds. No requirements means always eligible.
    pub fn eligible(&self, registry: &CapabilityRegistry) -> bool {
        self.requires.iter().all(|r| r.holds(registry))
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .finish()
    }
}

/// Error for a strategy handed an operation of the wrong kind.
pub(crate) fn mismatch(strategy: &'static str, op: &Operation) -> StrategyError {
    StrategyError::Fatal(RemainError::Host(HostError::Failed(format!(
        "strategy {} cannot run {}",
        strategy,
        op.kind()
    ))))
}
