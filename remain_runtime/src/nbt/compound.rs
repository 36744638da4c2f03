//! Path-addressed compound over a root store.
//!
//! A compound does not hold native references between calls. It holds the
//! path from its root, and every call re-walks that path: reads open the
//! root read-only, writes open it for writing and commit it before
//! returning.
//!
//! Two method families:
//!   - `try_*` return the bridge error as-is
//!   - the plain names are lenient: on error they log and return the
//!     documented default (`""`, `0`, `0.0`, `false`, empty set) or do nothing

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use remain_kernel::host::NativeValue;
use remain_kernel::{HostError, RemainError};

use super::root::RootStore;
use super::{Tag, TagKind};
use crate::bridge::{expect_ref, family, fields, FieldSpec, ObjectBridge, OpaqueHandle};

/// One step from a compound to a nested compound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Child(String),
    Element { list: String, index: usize },
}

#[derive(Clone)]
pub struct NbtCompound {
    store: Arc<dyn RootStore>,
    path: Vec<Segment>,
}

impl fmt::Debug for NbtCompound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NbtCompound")
            .field("root", &self.store.describe())
            .field("path", &self.path)
            .finish()
    }
}

impl NbtCompound {
    pub(crate) fn root(store: Arc<dyn RootStore>) -> Self {
        Self {
            store,
            path: Vec::new(),
        }
    }

    fn descend(&self, segment: Segment) -> Self {
        let mut path = self.path.clone();
        path.push(segment);
        Self {
            store: Arc::clone(&self.store),
            path,
        }
    }

    fn bridge(&self) -> &ObjectBridge {
        self.store.bridge()
    }

    // ── Strings ────────────────────────────────────────────────────

    pub fn get_string(&self, key: &str) -> String {
        self.lenient("get_string", key, self.try_get_string(key))
    }

    pub fn try_get_string(&self, key: &str) -> Result<String, RemainError> {
        match self.read_value(&fields::STRING, key)? {
            Some(NativeValue::Str(s)) => Ok(s),
            Some(NativeValue::Null) | None => Ok(String::new()),
            Some(other) => Err(unexpected(&fields::STRING, other)),
        }
    }

    /// An empty value removes the key.
    pub fn set_string(&self, key: &str, value: &str) {
        self.lenient("set_string", key, self.try_set_string(key, value))
    }

    pub fn try_set_string(&self, key: &str, value: &str) -> Result<(), RemainError> {
        if value.is_empty() {
            return self.try_remove(key);
        }
        self.write_value(&fields::STRING, key, NativeValue::Str(value.to_string()))
    }

    // ── Numbers ────────────────────────────────────────────────────

    pub fn get_int(&self, key: &str) -> i32 {
        self.lenient("get_int", key, self.try_get_int(key))
    }

    pub fn try_get_int(&self, key: &str) -> Result<i32, RemainError> {
        match self.read_value(&fields::INT, key)? {
            Some(NativeValue::Int(n)) => Ok(n),
            Some(NativeValue::Null) | None => Ok(0),
            Some(other) => Err(unexpected(&fields::INT, other)),
        }
    }

    pub fn set_int(&self, key: &str, value: i32) {
        self.lenient("set_int", key, self.try_set_int(key, value))
    }

    pub fn try_set_int(&self, key: &str, value: i32) -> Result<(), RemainError> {
        self.write_value(&fields::INT, key, NativeValue::Int(value))
    }

    pub fn get_double(&self, key: &str) -> f64 {
        self.lenient("get_double", key, self.try_get_double(key))
    }

    pub fn try_get_double(&self, key: &str) -> Result<f64, RemainError> {
        match self.read_value(&fields::DOUBLE, key)? {
            Some(NativeValue::Double(d)) => Ok(d),
            Some(NativeValue::Null) | None => Ok(0.0),
            Some(other) => Err(unexpected(&fields::DOUBLE, other)),
        }
    }

    pub fn set_double(&self, key: &str, value: f64) {
        self.lenient("set_double", key, self.try_set_double(key, value))
    }

    pub fn try_set_double(&self, key: &str, value: f64) -> Result<(), RemainError> {
        self.write_value(&fields::DOUBLE, key, NativeValue::Double(value))
    }

    // ── Keys ───────────────────────────────────────────────────────

    pub fn has_key(&self, key: &str) -> bool {
        self.lenient("has_key", key, self.try_has_key(key))
    }

    pub fn try_has_key(&self, key: &str) -> Result<bool, RemainError> {
        match self.read_value(&fields::HAS_KEY, key)? {
            Some(NativeValue::Bool(b)) => Ok(b),
            None => Ok(false),
            Some(other) => Err(unexpected(&fields::HAS_KEY, other)),
        }
    }

    /// Keys of this compound. Iteration order carries no meaning.
    pub fn keys(&self) -> BTreeSet<String> {
        self.lenient("keys", "", self.try_keys())
    }

    pub fn try_keys(&self) -> Result<BTreeSet<String>, RemainError> {
        match self.read(|bridge, target| bridge.read_field(target, &fields::KEYS, &[]))? {
            Some(NativeValue::Keys(keys)) => Ok(keys),
            Some(NativeValue::Null) | None => Ok(BTreeSet::new()),
            Some(other) => Err(unexpected(&fields::KEYS, other)),
        }
    }

    pub fn remove(&self, key: &str) {
        self.lenient("remove", key, self.try_remove(key))
    }

    /// Removing an absent key leaves the root untouched.
    pub fn try_remove(&self, key: &str) -> Result<(), RemainError> {
        if !self.try_has_key(key)? {
            return Ok(());
        }
        self.write(|bridge, target| bridge.write_field(target, &fields::REMOVE, &[key_arg(key)]))
    }

    /// Kind of the value stored under `key`, if any.
    pub fn kind(&self, key: &str) -> Option<TagKind> {
        self.lenient("kind", key, self.try_kind(key))
    }

    pub fn try_kind(&self, key: &str) -> Result<Option<TagKind>, RemainError> {
        Ok(self.read(|bridge, target| type_of(bridge, target, key))?.flatten())
    }

    /// Typed value under `key`. Nested values come back as handles.
    pub fn get(&self, key: &str) -> Option<Tag> {
        match self.kind(key)? {
            TagKind::String => Some(Tag::String(self.get_string(key))),
            TagKind::Int => Some(Tag::Int(self.get_int(key))),
            TagKind::Double => Some(Tag::Double(self.get_double(key))),
            TagKind::Compound => Some(Tag::Compound(self.compound(key))),
            TagKind::List => Some(Tag::List(self.list(key))),
        }
    }

    // ── Nesting ────────────────────────────────────────────────────

    /// Handle to the nested compound under `key`. Created on first write.
    /// Writes fail when `key` already holds a value of another kind.
    pub fn compound(&self, key: &str) -> NbtCompound {
        self.descend(Segment::Child(key.to_string()))
    }

    /// Like `compound`, but creates the nested compound now.
    pub fn add_compound(&self, key: &str) -> NbtCompound {
        let child = self.compound(key);
        child.lenient("add_compound", key, child.write(|_, _| Ok(())));
        child
    }

    /// List of compounds under `key`. Appending fails when `key` already
    /// holds a value of another kind.
    pub fn list(&self, key: &str) -> NbtList {
        NbtList {
            owner: self.clone(),
            key: key.to_string(),
        }
    }

    // ── Plumbing ───────────────────────────────────────────────────

    fn lenient<T: Default>(&self, op: &'static str, key: &str, result: Result<T, RemainError>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                warn!(op, key, root = %self.store.describe(), error = %err, "compound access degraded");
                T::default()
            }
        }
    }

    fn read_value(&self, field: &FieldSpec, key: &str) -> Result<Option<NativeValue>, RemainError> {
        self.read(|bridge, target| bridge.read_field(target, field, &[key_arg(key)]))
    }

    fn write_value(&self, field: &FieldSpec, key: &str, value: NativeValue) -> Result<(), RemainError> {
        self.write(|bridge, target| bridge.write_field(target, field, &[key_arg(key), value]))
    }

    /// Walk the path read-only and apply `view`. `None` when any step is missing.
    fn read<T, F>(&self, view: F) -> Result<Option<T>, RemainError>
    where
        F: FnOnce(&ObjectBridge, &OpaqueHandle) -> Result<T, RemainError>,
    {
        let root = self.store.read_root()?;
        let Some(mut current) = root.compound.clone() else {
            return Ok(None);
        };
        for segment in &self.path {
            match step(self.bridge(), &current, segment, false)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        view(self.bridge(), &current).map(Some)
    }

    /// Walk the path creating missing compounds, apply `edit`, commit the root.
    fn write<F>(&self, edit: F) -> Result<(), RemainError>
    where
        F: FnOnce(&ObjectBridge, &OpaqueHandle) -> Result<(), RemainError>,
    {
        let bridge = self.bridge();
        let root = self.store.write_root()?;
        let mut current = root.compound.clone();
        for segment in &self.path {
            current = step(bridge, &current, segment, true)?.ok_or_else(|| {
                RemainError::Host(HostError::Failed(format!(
                    "list element {:?} no longer exists on {}",
                    segment,
                    self.store.describe()
                )))
            })?;
        }
        edit(bridge, &current)?;
        self.store.commit(root)
    }
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

/// Ordered list of compounds stored under a key of its owner.
#[derive(Debug, Clone)]
pub struct NbtList {
    owner: NbtCompound,
    key: String,
}

/// Compound living inside a list.
pub type NbtListCompound = NbtCompound;

impl NbtList {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.owner.lenient("list_len", &self.key, self.try_len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn try_len(&self) -> Result<usize, RemainError> {
        let len = self.owner.read(|bridge, owner| match existing_list(bridge, owner, &self.key)? {
            Some(list) => list_size(bridge, &list),
            None => Ok(0),
        })?;
        Ok(len.unwrap_or(0))
    }

    /// Element `index`, if it exists.
    pub fn get(&self, index: usize) -> Option<NbtListCompound> {
        (index < self.len()).then(|| self.element(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = NbtListCompound> + '_ {
        (0..self.len()).map(move |index| self.element(index))
    }

    /// Append an empty compound and return a writable handle to it.
    pub fn add_compound(&self) -> NbtListCompound {
        match self.try_add_compound() {
            Ok(element) => element,
            Err(err) => {
                warn!(key = %self.key, error = %err, "list append degraded");
                // Points past the end; reads give defaults, writes are no-ops.
                self.element(usize::MAX)
            }
        }
    }

    pub fn try_add_compound(&self) -> Result<NbtListCompound, RemainError> {
        let mut index = 0;
        let key = self.key.clone();
        self.owner.write(|bridge, owner| {
            let list = match type_of(bridge, owner, &key)? {
                Some(TagKind::List) => fetch(bridge, owner, &fields::LIST, &key)?,
                None => {
                    let fresh = bridge.instantiate(family::LIST)?;
                    bridge.write_field(owner, &fields::LIST, &[key_arg(&key), NativeValue::Ref(fresh.native)])?;
                    fetch(bridge, owner, &fields::LIST, &key)?
                }
                Some(found) => return Err(occupied(&key, found, TagKind::List)),
            };
            let element = bridge.instantiate(family::COMPOUND)?;
            bridge.write_field(&list, &fields::LIST_ELEMENT, &[NativeValue::Ref(element.native)])?;
            index = list_size(bridge, &list)?.saturating_sub(1);
            Ok(())
        })?;
        Ok(self.element(index))
    }

    fn element(&self, index: usize) -> NbtListCompound {
        self.owner.descend(Segment::Element {
            list: self.key.clone(),
            index,
        })
    }
}

// ---------------------------------------------------------------------------
// Native helpers
// ---------------------------------------------------------------------------

fn key_arg(key: &str) -> NativeValue {
    NativeValue::Str(key.to_string())
}

fn unexpected(field: &FieldSpec, value: NativeValue) -> RemainError {
    RemainError::Host(HostError::Failed(format!(
        "{} returned unexpected {:?}",
        field.name, value
    )))
}

fn occupied(key: &str, found: TagKind, wanted: TagKind) -> RemainError {
    RemainError::Host(HostError::Failed(format!(
        "'{}' holds a {:?} value, not a {:?}",
        key, found, wanted
    )))
}

fn type_of(bridge: &ObjectBridge, compound: &OpaqueHandle, key: &str) -> Result<Option<TagKind>, RemainError> {
    match bridge.read_field(compound, &fields::TYPE_OF, &[key_arg(key)])? {
        NativeValue::Int(id) => Ok(TagKind::from_wire(id)),
        other => Err(unexpected(&fields::TYPE_OF, other)),
    }
}

/// Read a reference-valued field and wrap it in a handle.
fn fetch(bridge: &ObjectBridge, owner: &OpaqueHandle, field: &FieldSpec, key: &str) -> Result<OpaqueHandle, RemainError> {
    let value = bridge.read_field(owner, field, &[key_arg(key)])?;
    match expect_ref(value, &owner.shape, field)? {
        Some(native) => bridge.handle_for(native),
        None => Err(RemainError::Host(HostError::Failed(format!(
            "{} '{}' is null on {}",
            field.name, key, owner.shape
        )))),
    }
}

fn existing_list(bridge: &ObjectBridge, owner: &OpaqueHandle, key: &str) -> Result<Option<OpaqueHandle>, RemainError> {
    if type_of(bridge, owner, key)? != Some(TagKind::List) {
        return Ok(None);
    }
    fetch(bridge, owner, &fields::LIST, key).map(Some)
}

fn list_size(bridge: &ObjectBridge, list: &OpaqueHandle) -> Result<usize, RemainError> {
    match bridge.read_field(list, &fields::LIST_SIZE, &[])? {
        NativeValue::Int(n) => Ok(usize::try_from(n).unwrap_or(0)),
        other => Err(unexpected(&fields::LIST_SIZE, other)),
    }
}

/// One path step. With `create`, a missing child compound is added and a
/// value of another kind under the key is an error; list elements are
/// never created here.
fn step(
    bridge: &ObjectBridge,
    current: &OpaqueHandle,
    segment: &Segment,
    create: bool,
) -> Result<Option<OpaqueHandle>, RemainError> {
    match segment {
        Segment::Child(key) => {
            match type_of(bridge, current, key)? {
                Some(TagKind::Compound) => {}
                None if create => {
                    let fresh = bridge.instantiate(family::COMPOUND)?;
                    bridge.write_field(current, &fields::COMPOUND, &[key_arg(key), NativeValue::Ref(fresh.native)])?;
                }
                Some(found) if create => return Err(occupied(key, found, TagKind::Compound)),
                _ => return Ok(None),
            }
            fetch(bridge, current, &fields::COMPOUND, key).map(Some)
        }
        Segment::Element { list, index } => {
            let Some(list) = existing_list(bridge, current, list)? else {
                return Ok(None);
            };
            if *index >= list_size(bridge, &list)? {
                return Ok(None);
            }
            let index = i32::try_from(*index).map_err(|_| {
                RemainError::Host(HostError::Failed(format!("list index {} out of range", index)))
            })?;
            let value = bridge.read_field(&list, &fields::LIST_ELEMENT, &[NativeValue::Int(index)])?;
            match expect_ref(value, &list.shape, &fields::LIST_ELEMENT)? {
                Some(native) => bridge.handle_for(native).map(Some),
                None => Ok(None),
            }
        }
    }
}
