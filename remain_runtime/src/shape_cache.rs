//! Per-shape member cache for the object bridge.
//!
//! Keyed by (native shape, field, access). Stores resolved member ids and
//! negative results alike, so a missing member is only looked up once per
//! shape. Holds ids, never values: a write can never make it stale.

use std::collections::HashMap;

use parking_lot::RwLock;

use remain_kernel::host::{MemberId, ShapeId};

/// Which half of a field spec a lookup resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

type Key = (ShapeId, &'static str, Access);

#[derive(Debug, Default)]
pub struct ShapeCache {
    members: RwLock<HashMap<Key, Option<MemberId>>>,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(Some(id))` resolved, `Some(None)` known missing, `None` never looked up.
    pub fn get(&self, shape: &ShapeId, field: &'static str, access: Access) -> Option<Option<MemberId>> {
        self.members.read().get(&(shape.clone(), field, access)).copied()
    }

    /// Two callers racing on the same key write the same value; last one wins.
    pub fn insert(&self, shape: &ShapeId, field: &'static str, access: Access, member: Option<MemberId>) {
        self.members.write().insert((shape.clone(), field, access), member);
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }
}
