//! Roots a compound tree hangs off: an item snapshot or a live entity.
//!
//! Opening a root may copy native objects (an item is copied out of its
//! stable form, an entity's data is saved into a fresh compound). Those
//! copies belong to the opened root and are released when it is dropped.

use std::sync::Arc;

use parking_lot::Mutex;

use remain_kernel::host::{EntityId, ItemStack, NativeRef, NativeValue, StableObject};
use remain_kernel::{HostError, RemainError};

use crate::bridge::{expect_ref, family, fields, ObjectBridge, OpaqueHandle};

/// Native objects created for one operation.
pub struct Scratch<'a> {
    bridge: &'a ObjectBridge,
    natives: Vec<NativeRef>,
}

impl<'a> Scratch<'a> {
    fn new(bridge: &'a ObjectBridge) -> Self {
        Self {
            bridge,
            natives: Vec::new(),
        }
    }

    fn hold(&mut self, native: NativeRef) {
        self.natives.push(native);
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        for native in self.natives.drain(..) {
            self.bridge.release(native);
        }
    }
}

/// Root compound opened for reading; `compound` is `None` when the object
/// carries no tag.
pub struct ReadRoot<'a> {
    pub compound: Option<OpaqueHandle>,
    _scratch: Scratch<'a>,
}

/// Native root compound opened for writing, plus the object that owns it.
pub struct WriteRoot<'a> {
    pub owner: OpaqueHandle,
    pub compound: OpaqueHandle,
    scratch: Scratch<'a>,
}

pub trait RootStore: Send + Sync {
    fn bridge(&self) -> &ObjectBridge;

    fn read_root(&self) -> Result<ReadRoot<'_>, RemainError>;

    /// Root compound for writing, created when absent.
    fn write_root(&self) -> Result<WriteRoot<'_>, RemainError>;

    /// Publish a mutated root so the owning object reflects it.
    fn commit(&self, root: WriteRoot<'_>) -> Result<(), RemainError>;

    fn describe(&self) -> String;
}

// ── Items ──────────────────────────────────────────────────────────

/// Item root. Works on a private snapshot; every commit re-materializes
/// the snapshot synchronously. Concurrent writers race: last commit wins.
pub struct ItemRoot {
    bridge: Arc<ObjectBridge>,
    snapshot: Mutex<ItemStack>,
}

impl ItemRoot {
    pub fn new(bridge: Arc<ObjectBridge>, item: &ItemStack) -> Self {
        Self {
            bridge,
            snapshot: Mutex::new(item.clone()),
        }
    }

    /// The materialized item as of the last commit.
    pub fn item(&self) -> ItemStack {
        self.snapshot.lock().clone()
    }

    /// Native copy of the snapshot plus its tag, if any. The copy is held
    /// by `scratch` and owns the tag tree.
    fn open(&self, scratch: &mut Scratch<'_>) -> Result<(OpaqueHandle, Option<OpaqueHandle>), RemainError> {
        let item = self.snapshot.lock().clone();
        let owner = self.bridge.resolve(&StableObject::Item(item))?;
        scratch.hold(owner.native);
        let tag = self.bridge.read_field(&owner, &fields::ITEM_TAG, &[])?;
        let compound = match expect_ref(tag, &owner.shape, &fields::ITEM_TAG)? {
            Some(native) => Some(self.bridge.handle_for(native)?),
            None => None,
        };
        Ok((owner, compound))
    }
}

impl RootStore for ItemRoot {
    fn bridge(&self) -> &ObjectBridge {
        &self.bridge
    }

    fn read_root(&self) -> Result<ReadRoot<'_>, RemainError> {
        let mut scratch = Scratch::new(&self.bridge);
        let (_, compound) = self.open(&mut scratch)?;
        Ok(ReadRoot {
            compound,
            _scratch: scratch,
        })
    }

    fn write_root(&self) -> Result<WriteRoot<'_>, RemainError> {
        let mut scratch = Scratch::new(&self.bridge);
        let (owner, compound) = self.open(&mut scratch)?;
        let compound = match compound {
            Some(compound) => compound,
            None => {
                let fresh = self.bridge.instantiate(family::COMPOUND)?;
                // Owned by the item copy once committed.
                scratch.hold(fresh.native);
                fresh
            }
        };
        Ok(WriteRoot {
            owner,
            compound,
            scratch,
        })
    }

    fn commit(&self, root: WriteRoot<'_>) -> Result<(), RemainError> {
        self.bridge
            .write_field(&root.owner, &fields::ITEM_TAG, &[NativeValue::Ref(root.compound.native)])?;
        match self.bridge.materialize(&root.owner)? {
            StableObject::Item(item) => {
                *self.snapshot.lock() = item;
                Ok(())
            }
            other => Err(RemainError::Host(HostError::Failed(format!(
                "native item materialized as {}",
                other.describe()
            )))),
        }
    }

    fn describe(&self) -> String {
        StableObject::Item(self.snapshot.lock().clone()).describe()
    }
}

// ── Entities ───────────────────────────────────────────────────────

/// Entity root. The entity is mutated in place: the tag is saved into a
/// fresh compound, edited, and loaded back.
pub struct EntityRoot {
    bridge: Arc<ObjectBridge>,
    entity: EntityId,
}

impl EntityRoot {
    pub fn new(bridge: Arc<ObjectBridge>, entity: EntityId) -> Self {
        Self { bridge, entity }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    fn saved(&self) -> Result<WriteRoot<'_>, RemainError> {
        let mut scratch = Scratch::new(&self.bridge);
        let owner = self.bridge.resolve(&StableObject::Entity(self.entity))?;
        let compound = self.bridge.instantiate(family::COMPOUND)?;
        scratch.hold(compound.native);
        self.bridge
            .read_field(&owner, &fields::ENTITY_TAG, &[NativeValue::Ref(compound.native)])?;
        Ok(WriteRoot {
            owner,
            compound,
            scratch,
        })
    }
}

impl RootStore for EntityRoot {
    fn bridge(&self) -> &ObjectBridge {
        &self.bridge
    }

    fn read_root(&self) -> Result<ReadRoot<'_>, RemainError> {
        let root = self.saved()?;
        Ok(ReadRoot {
            compound: Some(root.compound),
            _scratch: root.scratch,
        })
    }

    fn write_root(&self) -> Result<WriteRoot<'_>, RemainError> {
        self.saved()
    }

    /// The host copies the compound on load, so the saved one is released afterwards.
    fn commit(&self, root: WriteRoot<'_>) -> Result<(), RemainError> {
        self.bridge
            .write_field(&root.owner, &fields::ENTITY_TAG, &[NativeValue::Ref(root.compound.native)])
    }

    fn describe(&self) -> String {
        self.entity.to_string()
    }
}
