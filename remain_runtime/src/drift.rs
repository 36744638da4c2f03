//! Drift detection: probe determinism and registry comparison.
//!
//! Two probes of one host must fingerprint identically. Two different
//! hosts are compared flag by flag.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;
use thiserror::Error;

use remain_kernel::hashing::canonical_hash;
use remain_kernel::host::Introspect;
use remain_kernel::{probe_all, CapabilityFlag, CapabilityRegistry, CapabilityValue, HostVersion, RemainError};

#[derive(Debug, Error)]
pub enum DriftError {
    #[error(transparent)]
    Probe(#[from] RemainError),

    #[error("probing is not deterministic: {first} then {second}")]
    Nondeterministic { first: String, second: String },
}

/// Probe `host` twice and require identical fingerprints.
/// Returns the fingerprint.
pub fn verify_probe_determinism(host: &dyn Introspect) -> Result<String, DriftError> {
    let first = canonical_hash(&probe_all(host)?);
    let second = canonical_hash(&probe_all(host)?);

    if first != second {
        return Err(DriftError::Nondeterministic { first, second });
    }
    Ok(first)
}

/// One flag whose value differs between two registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFlag {
    pub flag: CapabilityFlag,
    pub before: CapabilityValue,
    pub after: CapabilityValue,
}

/// What changes when moving from registry `a` to registry `b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub version_a: HostVersion,
    pub version_b: HostVersion,
    pub fingerprint_a: String,
    pub fingerprint_b: String,
    /// Boolean flags false (or unrecorded) in `a`, true in `b`.
    pub gained: Vec<CapabilityFlag>,
    /// Boolean flags true in `a`, false (or unrecorded) in `b`.
    pub lost: Vec<CapabilityFlag>,
    /// Non-boolean flags with different values.
    pub changed: Vec<ChangedFlag>,
}

impl DriftReport {
    /// True when the two registries agree on every flag.
    pub fn is_empty(&self) -> bool {
        self.gained.is_empty() && self.lost.is_empty() && self.changed.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} -> {}", self.version_a, self.version_b);
        if self.is_empty() {
            out.push_str("  no capability drift\n");
            return out;
        }
        for flag in &self.gained {
            let _ = writeln!(out, "  + {}", flag);
        }
        for flag in &self.lost {
            let _ = writeln!(out, "  - {}", flag);
        }
        for change in &self.changed {
            let _ = writeln!(out, "  ~ {}: {} -> {}", change.flag, change.before, change.after);
        }
        out
    }
}

pub fn compare_registries(a: &CapabilityRegistry, b: &CapabilityRegistry) -> DriftReport {
    let flags: BTreeSet<CapabilityFlag> = a.iter().chain(b.iter()).map(|(flag, _)| flag).collect();

    let mut gained = Vec::new();
    let mut lost = Vec::new();
    let mut changed = Vec::new();

    for flag in flags {
        match (a.get(flag), b.get(flag)) {
            (before, after) if before == after => {}
            (Some(CapabilityValue::Supported(true)), _) => lost.push(flag),
            (_, Some(CapabilityValue::Supported(true))) => gained.push(flag),
            (Some(before), Some(after)) => changed.push(ChangedFlag { flag, before, after }),
            // Recorded false on one side, missing on the other.
            _ => {}
        }
    }

    DriftReport {
        version_a: a.version(),
        version_b: b.version(),
        fingerprint_a: canonical_hash(a),
        fingerprint_b: canonical_hash(b),
        gained,
        lost,
        changed,
    }
}
