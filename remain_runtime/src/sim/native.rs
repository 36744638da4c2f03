//! Native object arena of the simulated host.
//!
//! Objects live in an arena keyed by `NativeRef`. Items cross the stable
//! boundary as value copies (their tag tree is serialized into the item's
//! native blob); entities are shared by reference.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use remain_kernel::host::{
    EntityId, HostError, ItemStack, MemberId, NativeBlob, NativeRef, NativeValue, ShapeId, StableObject,
};

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stored {
    Str(String),
    Int(i32),
    Double(f64),
    Compound(NativeRef),
    List(NativeRef),
}

impl Stored {
    fn type_id(&self) -> i32 {
        match self {
            Stored::Int(_) => 3,
            Stored::Double(_) => 6,
            Stored::Str(_) => 8,
            Stored::List(_) => 9,
            Stored::Compound(_) => 10,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Object {
    Compound(BTreeMap<String, Stored>),
    List(Vec<NativeRef>),
    Item {
        material: String,
        amount: u32,
        data: u8,
        display_name: Option<String>,
        lore: Vec<String>,
        tag: Option<NativeRef>,
    },
    Entity {
        id: EntityId,
        class: &'static str,
        data: NativeRef,
    },
}

/// Serialized tag tree carried inside an item's native blob.
/// Doubles travel as their bit pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TreeValue {
    Str(String),
    Int(i32),
    Double(u64),
    Compound(BTreeMap<String, TreeValue>),
    List(Vec<BTreeMap<String, TreeValue>>),
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ShapeKind {
    Compound,
    List,
    Item,
    Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    GetString,
    SetString,
    GetInt,
    SetInt,
    GetDouble,
    SetDouble,
    HasKey,
    Keys,
    Remove,
    TypeOf,
    GetCompound,
    GetList,
    Set,
    ListGet,
    ListAdd,
    ListSize,
    GetTag,
    SetTag,
    Save,
    Load,
}

/// (shape, member name, arity) for every member the profile exposes.
fn member_table(modern: bool) -> Vec<(ShapeKind, &'static str, usize, MemberKind)> {
    use MemberKind::*;
    use ShapeKind as S;

    let (keys, type_of, save, load) = if modern {
        ("getKeys", "getTypeId", "save", "load")
    } else {
        ("c", "d", "c", "f")
    };

    vec![
        (S::Compound, "getString", 1, GetString),
        (S::Compound, "setString", 2, SetString),
        (S::Compound, "getInt", 1, GetInt),
        (S::Compound, "setInt", 2, SetInt),
        (S::Compound, "getDouble", 1, GetDouble),
        (S::Compound, "setDouble", 2, SetDouble),
        (S::Compound, "hasKey", 1, HasKey),
        (S::Compound, keys, 0, Keys),
        (S::Compound, "remove", 1, Remove),
        (S::Compound, type_of, 1, TypeOf),
        (S::Compound, "getCompound", 1, GetCompound),
        (S::Compound, "getList", 1, GetList),
        (S::Compound, "set", 2, Set),
        (S::List, "get", 1, ListGet),
        (S::List, "add", 1, ListAdd),
        (S::List, "size", 0, ListSize),
        (S::Item, "getTag", 0, GetTag),
        (S::Item, "setTag", 1, SetTag),
        (S::Entity, save, 1, Save),
        (S::Entity, load, 1, Load),
    ]
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Arena plus member table. Guarded by the host's mutex.
pub(crate) struct NativeWorld {
    nms: &'static str,
    objects: HashMap<NativeRef, Object>,
    next: u64,
    entities: HashMap<EntityId, NativeRef>,
    members: Vec<(ShapeKind, &'static str, usize, MemberKind)>,
}

impl NativeWorld {
    pub(crate) fn new(nms: &'static str, modern: bool) -> Self {
        Self {
            nms,
            objects: HashMap::new(),
            next: 1,
            entities: HashMap::new(),
            members: member_table(modern),
        }
    }

    pub(crate) fn live_objects(&self) -> usize {
        self.objects.len()
    }

    fn alloc(&mut self, object: Object) -> NativeRef {
        let native = NativeRef(self.next);
        self.next += 1;
        self.objects.insert(native, object);
        native
    }

    /// Free `native` and everything it owns. Entities stay; unknown
    /// references are ignored.
    pub(crate) fn release(&mut self, native: NativeRef) {
        if matches!(self.objects.get(&native), Some(Object::Entity { .. }) | None) {
            return;
        }
        let Some(object) = self.objects.remove(&native) else {
            return;
        };
        match object {
            Object::Compound(entries) => {
                for value in entries.into_values() {
                    if let Stored::Compound(child) | Stored::List(child) = value {
                        self.release(child);
                    }
                }
            }
            Object::List(elements) => {
                for element in elements {
                    self.release(element);
                }
            }
            Object::Item { tag: Some(tag), .. } => self.release(tag),
            Object::Item { tag: None, .. } | Object::Entity { .. } => {}
        }
    }

    fn object(&self, native: NativeRef) -> Result<&Object, HostError> {
        self.objects
            .get(&native)
            .ok_or_else(|| HostError::Failed(format!("dangling native reference {}", native.0)))
    }

    fn object_mut(&mut self, native: NativeRef) -> Result<&mut Object, HostError> {
        self.objects
            .get_mut(&native)
            .ok_or_else(|| HostError::Failed(format!("dangling native reference {}", native.0)))
    }

    fn shape_name(&self, class: &str) -> ShapeId {
        ShapeId(format!("net.minecraft.server.{}.{}", self.nms, class))
    }

    pub(crate) fn spawn_entity(&mut self, id: EntityId, class: &'static str) {
        let data = self.alloc(Object::Compound(BTreeMap::new()));
        let native = self.alloc(Object::Entity { id, class, data });
        self.entities.insert(id, native);
    }

    // ── Stable boundary ────────────────────────────────────────────

    pub(crate) fn native_handle(&mut self, object: &StableObject) -> Result<(ShapeId, NativeRef), HostError> {
        let native = match object {
            StableObject::Entity(id) => *self
                .entities
                .get(id)
                .ok_or_else(|| HostError::UnsupportedOperation(format!("no native entity for {}", id)))?,
            StableObject::Item(item) => {
                let tag = match item.native_blob() {
                    Some(blob) => {
                        let tree: BTreeMap<String, TreeValue> = serde_json::from_slice(blob.as_bytes())
                            .map_err(|e| HostError::Failed(format!("corrupt item tag: {}", e)))?;
                        Some(self.import(&tree))
                    }
                    None => None,
                };
                self.alloc(Object::Item {
                    material: item.material.clone(),
                    amount: item.amount,
                    data: item.data,
                    display_name: item.display_name.clone(),
                    lore: item.lore.clone(),
                    tag,
                })
            }
        };
        Ok((self.shape_of(native)?, native))
    }

    pub(crate) fn materialize(&self, native: NativeRef) -> Result<StableObject, HostError> {
        match self.object(native)? {
            Object::Item {
                material,
                amount,
                data,
                display_name,
                lore,
                tag,
            } => {
                let blob = match tag {
                    Some(tag) => {
                        let tree = self.export(*tag)?;
                        let bytes = serde_json::to_vec(&tree)
                            .map_err(|e| HostError::Failed(format!("cannot encode item tag: {}", e)))?;
                        Some(NativeBlob::new(bytes))
                    }
                    None => None,
                };
                let mut item = ItemStack::new(material, *amount)
                    .with_data(*data)
                    .with_lore(lore)
                    .with_native_blob(blob);
                item.display_name = display_name.clone();
                Ok(StableObject::Item(item))
            }
            Object::Entity { id, .. } => Ok(StableObject::Entity(*id)),
            _ => Err(HostError::UnsupportedOperation(format!(
                "native {} has no stable counterpart",
                native.0
            ))),
        }
    }

    pub(crate) fn instantiate(&mut self, family: &str) -> Result<(ShapeId, NativeRef), HostError> {
        let object = match family {
            "NBTTagCompound" => Object::Compound(BTreeMap::new()),
            "NBTTagList" => Object::List(Vec::new()),
            other => return Err(HostError::MissingType(other.to_string())),
        };
        let native = self.alloc(object);
        Ok((self.shape_of(native)?, native))
    }

    pub(crate) fn shape_of(&self, native: NativeRef) -> Result<ShapeId, HostError> {
        let class = match self.object(native)? {
            Object::Compound(_) => "NBTTagCompound",
            Object::List(_) => "NBTTagList",
            Object::Item { .. } => "ItemStack",
            Object::Entity { class, .. } => class,
        };
        Ok(self.shape_name(class))
    }

    // ── Members ────────────────────────────────────────────────────

    fn kind_of_shape(&self, shape: &ShapeId) -> Option<ShapeKind> {
        let prefix = format!("net.minecraft.server.{}.", self.nms);
        let class = shape.0.strip_prefix(&prefix)?;
        match class {
            "NBTTagCompound" => Some(ShapeKind::Compound),
            "NBTTagList" => Some(ShapeKind::List),
            "ItemStack" => Some(ShapeKind::Item),
            c if c.starts_with("Entity") => Some(ShapeKind::Entity),
            _ => None,
        }
    }

    pub(crate) fn lookup_member(&self, shape: &ShapeId, name: &str, arity: usize) -> Result<MemberId, HostError> {
        let kind = self
            .kind_of_shape(shape)
            .ok_or_else(|| HostError::MissingType(shape.to_string()))?;
        self.members
            .iter()
            .position(|(k, n, a, _)| *k == kind && *n == name && *a == arity)
            .map(|index| MemberId(index as u32))
            .ok_or_else(|| HostError::MissingSymbol(format!("{}#{}/{}", shape, name, arity)))
    }

    pub(crate) fn invoke(
        &mut self,
        target: NativeRef,
        member: MemberId,
        args: &[NativeValue],
    ) -> Result<NativeValue, HostError> {
        let (_, name, arity, kind) = *self
            .members
            .get(member.0 as usize)
            .ok_or_else(|| HostError::MissingSymbol(format!("member #{}", member.0)))?;
        if args.len() != arity {
            return Err(HostError::Failed(format!(
                "{} expects {} arguments, got {}",
                name,
                arity,
                args.len()
            )));
        }

        use MemberKind::*;
        match kind {
            GetString => Ok(match self.entry(target, args)? {
                Some(Stored::Str(s)) => NativeValue::Str(s),
                _ => NativeValue::Str(String::new()),
            }),
            GetInt => Ok(match self.entry(target, args)? {
                Some(Stored::Int(n)) => NativeValue::Int(n),
                _ => NativeValue::Int(0),
            }),
            GetDouble => Ok(match self.entry(target, args)? {
                Some(Stored::Double(d)) => NativeValue::Double(d),
                _ => NativeValue::Double(0.0),
            }),
            SetString => {
                let value = Stored::Str(string_arg(args, 1)?.to_string());
                self.put(target, args, value)
            }
            SetInt => match args[1] {
                NativeValue::Int(n) => self.put(target, args, Stored::Int(n)),
                _ => Err(bad_args(name)),
            },
            SetDouble => match args[1] {
                NativeValue::Double(d) => self.put(target, args, Stored::Double(d)),
                _ => Err(bad_args(name)),
            },
            HasKey => Ok(NativeValue::Bool(self.entry(target, args)?.is_some())),
            TypeOf => Ok(NativeValue::Int(
                self.entry(target, args)?.map_or(0, |stored| stored.type_id()),
            )),
            Keys => Ok(NativeValue::Keys(
                self.compound(target)?.keys().cloned().collect::<BTreeSet<_>>(),
            )),
            Remove => {
                let key = string_arg(args, 0)?.to_string();
                let removed = self.compound_mut(target)?.remove(&key);
                if let Some(Stored::Compound(child) | Stored::List(child)) = removed {
                    self.release(child);
                }
                Ok(NativeValue::Null)
            }
            GetCompound => match self.entry(target, args)? {
                Some(Stored::Compound(native)) => Ok(NativeValue::Ref(native)),
                // Detached empty compound, like the real host.
                _ => Ok(NativeValue::Ref(self.alloc(Object::Compound(BTreeMap::new())))),
            },
            GetList => match self.entry(target, args)? {
                Some(Stored::List(native)) => Ok(NativeValue::Ref(native)),
                _ => Ok(NativeValue::Ref(self.alloc(Object::List(Vec::new())))),
            },
            Set => {
                let value = match args[1] {
                    NativeValue::Ref(native) => match self.object(native)? {
                        Object::Compound(_) => Stored::Compound(native),
                        Object::List(_) => Stored::List(native),
                        _ => return Err(bad_args(name)),
                    },
                    _ => return Err(bad_args(name)),
                };
                self.put(target, args, value)
            }
            ListGet => {
                let index = match args[0] {
                    NativeValue::Int(i) => i,
                    _ => return Err(bad_args(name)),
                };
                let found = usize::try_from(index)
                    .ok()
                    .and_then(|i| self.list(target).ok()?.get(i).copied());
                match found {
                    Some(native) => Ok(NativeValue::Ref(native)),
                    None => Ok(NativeValue::Ref(self.alloc(Object::Compound(BTreeMap::new())))),
                }
            }
            ListAdd => match args[0] {
                NativeValue::Ref(native) => {
                    match self.object_mut(target)? {
                        Object::List(items) => items.push(native),
                        _ => return Err(bad_args(name)),
                    }
                    Ok(NativeValue::Null)
                }
                _ => Err(bad_args(name)),
            },
            ListSize => Ok(NativeValue::Int(self.list(target)?.len() as i32)),
            GetTag => match self.object(target)? {
                Object::Item { tag: Some(tag), .. } => Ok(NativeValue::Ref(*tag)),
                Object::Item { tag: None, .. } => Ok(NativeValue::Null),
                _ => Err(bad_args(name)),
            },
            SetTag => {
                let new_tag = match args[0] {
                    NativeValue::Ref(native) => Some(native),
                    NativeValue::Null => None,
                    _ => return Err(bad_args(name)),
                };
                let previous = match self.object_mut(target)? {
                    Object::Item { tag, .. } => std::mem::replace(tag, new_tag),
                    _ => return Err(bad_args(name)),
                };
                if let Some(old) = previous.filter(|old| Some(*old) != new_tag) {
                    self.release(old);
                }
                Ok(NativeValue::Null)
            }
            Save => {
                let into = ref_arg(args, 0, name)?;
                let data = self.entity_data(target)?;
                let copy = self.compound(data)?.clone();
                let copy = self.deep_copy_entries(&copy)?;
                *self.compound_mut(into)? = copy;
                Ok(NativeValue::Ref(into))
            }
            Load => {
                let from = ref_arg(args, 0, name)?;
                self.entity_data(target)?;
                let source = self.compound(from)?.clone();
                let copy = self.deep_copy_entries(&source)?;
                let data = self.alloc(Object::Compound(copy));
                let previous = match self.object_mut(target)? {
                    Object::Entity { data: slot, .. } => std::mem::replace(slot, data),
                    _ => return Err(bad_args(name)),
                };
                self.release(previous);
                Ok(NativeValue::Null)
            }
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn compound(&self, native: NativeRef) -> Result<&BTreeMap<String, Stored>, HostError> {
        match self.object(native)? {
            Object::Compound(map) => Ok(map),
            _ => Err(HostError::Failed(format!("native {} is not a compound", native.0))),
        }
    }

    fn compound_mut(&mut self, native: NativeRef) -> Result<&mut BTreeMap<String, Stored>, HostError> {
        match self.object_mut(native)? {
            Object::Compound(map) => Ok(map),
            _ => Err(HostError::Failed(format!("native {} is not a compound", native.0))),
        }
    }

    fn list(&self, native: NativeRef) -> Result<&Vec<NativeRef>, HostError> {
        match self.object(native)? {
            Object::List(items) => Ok(items),
            _ => Err(HostError::Failed(format!("native {} is not a list", native.0))),
        }
    }

    fn entity_data(&self, native: NativeRef) -> Result<NativeRef, HostError> {
        match self.object(native)? {
            Object::Entity { data, .. } => Ok(*data),
            _ => Err(HostError::Failed(format!("native {} is not an entity", native.0))),
        }
    }

    fn entry(&self, target: NativeRef, args: &[NativeValue]) -> Result<Option<Stored>, HostError> {
        let key = string_arg(args, 0)?;
        Ok(self.compound(target)?.get(key).cloned())
    }

    fn put(&mut self, target: NativeRef, args: &[NativeValue], value: Stored) -> Result<NativeValue, HostError> {
        let key = string_arg(args, 0)?.to_string();
        let kept = match &value {
            Stored::Compound(native) | Stored::List(native) => Some(*native),
            _ => None,
        };
        let replaced = self.compound_mut(target)?.insert(key, value);
        if let Some(Stored::Compound(old) | Stored::List(old)) = replaced {
            if Some(old) != kept {
                self.release(old);
            }
        }
        Ok(NativeValue::Null)
    }

    fn deep_copy_entries(&mut self, entries: &BTreeMap<String, Stored>) -> Result<BTreeMap<String, Stored>, HostError> {
        let mut tree = BTreeMap::new();
        for (key, value) in entries {
            tree.insert(key.clone(), self.export_value(value)?);
        }
        let mut copy = BTreeMap::new();
        for (key, value) in &tree {
            copy.insert(key.clone(), self.import_value(value));
        }
        Ok(copy)
    }

    // ── Blob encoding ──────────────────────────────────────────────

    fn export(&self, compound: NativeRef) -> Result<BTreeMap<String, TreeValue>, HostError> {
        let mut tree = BTreeMap::new();
        for (key, value) in self.compound(compound)? {
            tree.insert(key.clone(), self.export_value(value)?);
        }
        Ok(tree)
    }

    fn export_value(&self, value: &Stored) -> Result<TreeValue, HostError> {
        Ok(match value {
            Stored::Str(s) => TreeValue::Str(s.clone()),
            Stored::Int(n) => TreeValue::Int(*n),
            Stored::Double(d) => TreeValue::Double(d.to_bits()),
            Stored::Compound(native) => TreeValue::Compound(self.export(*native)?),
            Stored::List(native) => TreeValue::List(
                self.list(*native)?
                    .iter()
                    .map(|element| self.export(*element))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    fn import(&mut self, tree: &BTreeMap<String, TreeValue>) -> NativeRef {
        let entries = tree
            .iter()
            .map(|(key, value)| (key.clone(), self.import_value(value)))
            .collect();
        self.alloc(Object::Compound(entries))
    }

    fn import_value(&mut self, value: &TreeValue) -> Stored {
        match value {
            TreeValue::Str(s) => Stored::Str(s.clone()),
            TreeValue::Int(n) => Stored::Int(*n),
            TreeValue::Double(bits) => Stored::Double(f64::from_bits(*bits)),
            TreeValue::Compound(tree) => Stored::Compound(self.import(tree)),
            TreeValue::List(elements) => {
                let items = elements.iter().map(|tree| self.import(tree)).collect();
                Stored::List(self.alloc(Object::List(items)))
            }
        }
    }
}

fn bad_args(member: &str) -> HostError {
    HostError::Failed(format!("bad arguments for {}", member))
}

fn string_arg(args: &[NativeValue], index: usize) -> Result<&str, HostError> {
    match args.get(index) {
        Some(NativeValue::Str(s)) => Ok(s),
        _ => Err(HostError::Failed(format!("argument {} must be a string", index))),
    }
}

fn ref_arg(args: &[NativeValue], index: usize, member: &str) -> Result<NativeRef, HostError> {
    match args.get(index) {
        Some(NativeValue::Ref(native)) => Ok(*native),
        _ => Err(bad_args(member)),
    }
}
