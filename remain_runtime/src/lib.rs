#![forbid(unsafe_code)]

//! Remain Runtime
//!
//! Wires the kernel to a live host: the opaque object bridge and its
//! per-shape member cache, the tagged compound model over items and
//! entities, the `Remain` facade, configuration, drift reports and an
//! in-process simulated host.
//!
//! Capability decisions and strategy selection stay in `remain_kernel`.

pub mod config;
pub mod shape_cache;
pub mod bridge;
pub mod nbt;
pub mod remain;
pub mod drift;
pub mod sim;

pub use config::{Namespace, RemainConfig};
pub use nbt::{NbtCompound, NbtEntity, NbtItem, NbtList, NbtListCompound, Tag, TagKind};
pub use remain::Remain;
