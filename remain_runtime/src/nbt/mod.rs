//! Tagged compound model (NBT-style) over native objects.
//!
//! Reads are lenient: a missing key, a missing root tag or a bridge
//! failure yields the documented default. Writes go straight through to
//! the native structure and are published before the setter returns.

mod compound;
mod item;
mod root;

pub use compound::{NbtCompound, NbtList, NbtListCompound};
pub use item::{NbtEntity, NbtItem};
pub use root::{EntityRoot, ItemRoot, ReadRoot, RootStore, Scratch, WriteRoot};

use serde::{Deserialize, Serialize};

/// Discriminant of a stored value, with its native type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Int,
    Double,
    String,
    List,
    Compound,
}

impl TagKind {
    pub fn wire_id(self) -> i32 {
        match self {
            TagKind::Int => 3,
            TagKind::Double => 6,
            TagKind::String => 8,
            TagKind::List => 9,
            TagKind::Compound => 10,
        }
    }

    /// `None` for absent (0) and for kinds this model does not expose.
    pub fn from_wire(id: i32) -> Option<Self> {
        match id {
            3 => Some(TagKind::Int),
            6 => Some(TagKind::Double),
            8 => Some(TagKind::String),
            9 => Some(TagKind::List),
            10 => Some(TagKind::Compound),
            _ => None,
        }
    }
}

/// A value read from a compound.
#[derive(Debug, Clone)]
pub enum Tag {
    String(String),
    Int(i32),
    Double(f64),
    Compound(NbtCompound),
    List(NbtList),
}

impl Tag {
    pub fn kind(&self) -> TagKind {
        match self {
            Tag::String(_) => TagKind::String,
            Tag::Int(_) => TagKind::Int,
            Tag::Double(_) => TagKind::Double,
            Tag::Compound(_) => TagKind::Compound,
            Tag::List(_) => TagKind::List,
        }
    }
}
