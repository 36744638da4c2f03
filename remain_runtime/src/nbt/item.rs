//! Root-level compounds for items and entities.

use std::ops::Deref;
use std::sync::Arc;

use remain_kernel::host::{EntityId, ItemStack};

use super::compound::NbtCompound;
use super::root::{EntityRoot, ItemRoot};
use crate::bridge::ObjectBridge;

/// Tag of an item. Edits apply to a private copy of the item; read the
/// result back with [`NbtItem::item`]. The item passed in is never touched.
pub struct NbtItem {
    root: Arc<ItemRoot>,
    compound: NbtCompound,
}

impl NbtItem {
    pub fn new(bridge: Arc<ObjectBridge>, item: &ItemStack) -> Self {
        let root = Arc::new(ItemRoot::new(bridge, item));
        let compound = NbtCompound::root(root.clone());
        Self { root, compound }
    }

    /// The item with every edit so far applied.
    pub fn item(&self) -> ItemStack {
        self.root.item()
    }
}

impl Deref for NbtItem {
    type Target = NbtCompound;

    fn deref(&self) -> &NbtCompound {
        &self.compound
    }
}

/// Tag of a live entity. Edits apply to the entity in place.
pub struct NbtEntity {
    entity: EntityId,
    compound: NbtCompound,
}

impl NbtEntity {
    pub fn new(bridge: Arc<ObjectBridge>, entity: EntityId) -> Self {
        let compound = NbtCompound::root(Arc::new(EntityRoot::new(bridge, entity)));
        Self { entity, compound }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

impl Deref for NbtEntity {
    type Target = NbtCompound;

    fn deref(&self) -> &NbtCompound {
        &self.compound
    }
}
