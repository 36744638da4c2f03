#![forbid(unsafe_code)]

//! Remain Kernel — capability probing and adaptive dispatch.
//!
//! Discovers once what the running host exposes, freezes the answer in a
//! `CapabilityRegistry`, and routes every logical operation through an
//! ordered list of strategies gated by that registry.
//!
//! Nothing in this crate touches native object layouts; that lives in
//! `remain_runtime`.

/// Registry fingerprint format version. Bump when the canonical layout changes.
pub const REGISTRY_FORMAT: u32 = 1;

pub mod error;
pub mod version;
pub mod host;
pub mod capability;
pub mod probe;
pub mod hashing;
pub mod text;
pub mod packets;
pub mod operation;
pub mod strategy;
pub mod strategies;
pub mod dispatch;

pub use capability::{CapabilityFlag, CapabilityRegistry, CapabilityValue};
pub use dispatch::{DispatchEngine, Dispatched};
pub use error::RemainError;
pub use host::{Attribute, EntityId, Host, HostError, ItemStack, StableObject};
pub use operation::{Operation, OperationKind, Outcome};
pub use probe::probe_all;
pub use version::HostVersion;
