/// Remain Kernel — Canonical Registry Hashing
///
/// Deterministic canonical serialization + SHA-256 fingerprint of a
/// CapabilityRegistry. Two probes of the same host must produce the
/// same fingerprint.
///
/// Rules:
///   - Field order: registry_format, host_version, capabilities
///   - Capabilities in flag declaration order, values as display strings
///   - UTF-8 JSON, no whitespace

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::capability::CapabilityRegistry;
use crate::REGISTRY_FORMAT;

/// Canonical serialization of a registry to UTF-8 JSON bytes.
pub fn canonical_serialize(registry: &CapabilityRegistry) -> Vec<u8> {
    build_canonical_value(registry).to_string().into_bytes()
}

/// SHA-256 of the canonical serialization. Lowercase hex string.
pub fn canonical_hash(registry: &CapabilityRegistry) -> String {
    let digest = Sha256::digest(canonical_serialize(registry));
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Build the canonical value in strict field order.
///
/// serde_json::Map preserves insertion order (preserve_order feature).
fn build_canonical_value(registry: &CapabilityRegistry) -> Value {
    let mut caps = Map::new();
    for (flag, value) in registry.iter() {
        caps.insert(flag.name().to_string(), Value::String(value.to_string()));
    }

    let mut root = Map::new();
    root.insert("registry_format".to_string(), Value::from(REGISTRY_FORMAT));
    root.insert(
        "host_version".to_string(),
        Value::String(registry.version().to_string()),
    );
    root.insert("capabilities".to_string(), Value::Object(caps));
    Value::Object(root)
}

/// Human-readable report of a registry (pretty JSON, same field order).
pub fn report(registry: &CapabilityRegistry) -> String {
    let mut value = build_canonical_value(registry);
    if let Value::Object(map) = &mut value {
        map.insert(
            "fingerprint".to_string(),
            Value::String(canonical_hash(registry)),
        );
    }
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}
