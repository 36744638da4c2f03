//! Opaque Object Bridge — the only code that talks to native objects.
//!
//! A `FieldSpec` names an accessor/mutator pair by its candidate member
//! names (modern name first, obfuscated legacy names after). The bridge
//! resolves the first candidate the native shape has, once per shape, and
//! caches the answer in a `ShapeCache`.

use std::sync::Arc;

use tracing::trace;

use remain_kernel::host::{Host, HostError, MemberId, NativeRef, NativeValue, ShapeId, StableObject};
use remain_kernel::{HostVersion, RemainError};

use crate::shape_cache::{Access, ShapeCache};

// ---------------------------------------------------------------------------
// Field specs
// ---------------------------------------------------------------------------

/// One side of a field: candidate member names and their arity.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    pub candidates: &'static [&'static str],
    pub arity: usize,
}

impl Member {
    pub const NONE: Member = Member {
        candidates: &[],
        arity: 0,
    };

    pub const fn new(candidates: &'static [&'static str], arity: usize) -> Self {
        Self { candidates, arity }
    }
}

/// Named accessor/mutator pair on a native shape.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub read: Member,
    pub write: Member,
}

/// Native shape families the bridge can construct.
pub mod family {
    pub const COMPOUND: &str = "NBTTagCompound";
    pub const LIST: &str = "NBTTagList";
}

/// Field specs of the native tag structures.
pub mod fields {
    use super::{FieldSpec, Member};

    pub const STRING: FieldSpec = FieldSpec {
        name: "string",
        read: Member::new(&["getString"], 1),
        write: Member::new(&["setString"], 2),
    };
    pub const INT: FieldSpec = FieldSpec {
        name: "int",
        read: Member::new(&["getInt"], 1),
        write: Member::new(&["setInt"], 2),
    };
    pub const DOUBLE: FieldSpec = FieldSpec {
        name: "double",
        read: Member::new(&["getDouble"], 1),
        write: Member::new(&["setDouble"], 2),
    };
    pub const HAS_KEY: FieldSpec = FieldSpec {
        name: "has_key",
        read: Member::new(&["hasKey"], 1),
        write: Member::NONE,
    };
    pub const KEYS: FieldSpec = FieldSpec {
        name: "keys",
        read: Member::new(&["getKeys", "c"], 0),
        write: Member::NONE,
    };
    pub const REMOVE: FieldSpec = FieldSpec {
        name: "remove",
        read: Member::NONE,
        write: Member::new(&["remove"], 1),
    };
    /// Type id of the value under a key, 0 when absent.
    pub const TYPE_OF: FieldSpec = FieldSpec {
        name: "type_of",
        read: Member::new(&["getTypeId", "d"], 1),
        write: Member::NONE,
    };
    pub const COMPOUND: FieldSpec = FieldSpec {
        name: "compound",
        read: Member::new(&["getCompound"], 1),
        write: Member::new(&["set"], 2),
    };
    pub const LIST: FieldSpec = FieldSpec {
        name: "list",
        read: Member::new(&["getList"], 1),
        write: Member::new(&["set"], 2),
    };
    /// Element access on a native list; the mutator appends.
    pub const LIST_ELEMENT: FieldSpec = FieldSpec {
        name: "list_element",
        read: Member::new(&["get"], 1),
        write: Member::new(&["add"], 1),
    };
    pub const LIST_SIZE: FieldSpec = FieldSpec {
        name: "list_size",
        read: Member::new(&["size"], 0),
        write: Member::NONE,
    };
    /// Root tag of a native item; null when the item carries none.
    pub const ITEM_TAG: FieldSpec = FieldSpec {
        name: "item_tag",
        read: Member::new(&["getTag"], 0),
        write: Member::new(&["setTag"], 1),
    };
    /// Entity persistence: the accessor fills the compound it is given.
    pub const ENTITY_TAG: FieldSpec = FieldSpec {
        name: "entity_tag",
        read: Member::new(&["save", "c"], 1),
        write: Member::new(&["load", "f"], 1),
    };
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Reference to a native object plus its shape. Valid for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueHandle {
    pub shape: ShapeId,
    pub native: NativeRef,
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

pub struct ObjectBridge {
    host: Arc<dyn Host>,
    version: HostVersion,
    cache: ShapeCache,
}

impl ObjectBridge {
    pub fn new(host: Arc<dyn Host>, version: HostVersion) -> Self {
        Self {
            host,
            version,
            cache: ShapeCache::new(),
        }
    }

    pub fn version(&self) -> HostVersion {
        self.version
    }

    pub fn cache(&self) -> &ShapeCache {
        &self.cache
    }

    /// Map a stable object to its native counterpart.
    pub fn resolve(&self, object: &StableObject) -> Result<OpaqueHandle, RemainError> {
        match self.host.native_handle(object) {
            Ok((shape, native)) => Ok(OpaqueHandle { shape, native }),
            Err(err) if err.is_absence() => Err(RemainError::IncompatibleHost {
                object: object.describe(),
                version: self.version,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Handle for a native reference returned by another field.
    pub fn handle_for(&self, native: NativeRef) -> Result<OpaqueHandle, RemainError> {
        let shape = self.host.shape_of(native)?;
        Ok(OpaqueHandle { shape, native })
    }

    /// Construct a fresh native object of the given family.
    pub fn instantiate(&self, family: &str) -> Result<OpaqueHandle, RemainError> {
        let (shape, native) = self.host.instantiate(family)?;
        Ok(OpaqueHandle { shape, native })
    }

    /// Hand a per-operation copy back to the host.
    pub fn release(&self, native: NativeRef) {
        trace!(native = native.0, "native released");
        self.host.release(native);
    }

    /// Publish a native object back to the stable surface.
    pub fn materialize(&self, handle: &OpaqueHandle) -> Result<StableObject, RemainError> {
        Ok(self.host.materialize(handle.native)?)
    }

    pub fn read_field(
        &self,
        handle: &OpaqueHandle,
        field: &FieldSpec,
        args: &[NativeValue],
    ) -> Result<NativeValue, RemainError> {
        let member = self.member(&handle.shape, field, Access::Read)?;
        self.invoke(handle, field, member, args)
    }

    pub fn write_field(
        &self,
        handle: &OpaqueHandle,
        field: &FieldSpec,
        args: &[NativeValue],
    ) -> Result<(), RemainError> {
        let member = self.member(&handle.shape, field, Access::Write)?;
        self.invoke(handle, field, member, args).map(|_| ())
    }

    fn invoke(
        &self,
        handle: &OpaqueHandle,
        field: &FieldSpec,
        member: MemberId,
        args: &[NativeValue],
    ) -> Result<NativeValue, RemainError> {
        match self.host.invoke(handle.native, member, args) {
            Ok(value) => Ok(value),
            Err(err) if err.is_absence() => Err(unavailable(&handle.shape, field)),
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve (or recall) the member implementing one side of `field`.
    fn member(&self, shape: &ShapeId, field: &FieldSpec, access: Access) -> Result<MemberId, RemainError> {
        if let Some(cached) = self.cache.get(shape, field.name, access) {
            return cached.ok_or_else(|| unavailable(shape, field));
        }

        let side = match access {
            Access::Read => field.read,
            Access::Write => field.write,
        };
        let mut found = None;
        for name in side.candidates {
            match self.host.lookup_member(shape, name, side.arity) {
                Ok(member) => {
                    found = Some(member);
                    break;
                }
                Err(err) if err.is_absence() => continue,
                Err(err) => return Err(err.into()),
            }
        }

        trace!(shape = %shape, field = field.name, ?access, found = found.is_some(), "member resolved");
        self.cache.insert(shape, field.name, access, found);
        found.ok_or_else(|| unavailable(shape, field))
    }
}

fn unavailable(shape: &ShapeId, field: &FieldSpec) -> RemainError {
    RemainError::FieldUnavailable {
        shape: shape.to_string(),
        field: field.name,
    }
}

/// Unwrap a native reference, treating anything else as a shape mismatch.
pub fn expect_ref(value: NativeValue, shape: &ShapeId, field: &FieldSpec) -> Result<Option<NativeRef>, RemainError> {
    match value {
        NativeValue::Ref(native) => Ok(Some(native)),
        NativeValue::Null => Ok(None),
        other => Err(RemainError::Host(HostError::Failed(format!(
            "{} on {} returned {:?}, expected a reference",
            field.name, shape, other
        )))),
    }
}
