//! Host boundary — everything the kernel consumes from the live platform.
//!
//! Four narrow traits:
//!   - `Introspect`    symbol/type existence checks (probing only)
//!   - `ServerApi`     stable-surface calls that may vanish between releases
//!   - `PacketChannel` raw packet transmission keyed by a channel name
//!   - `NativeAccess`  opaque native objects for the object bridge
//!
//! Every `ServerApi` / `PacketChannel` method has a default body that
//! reports `UnsupportedOperation`, so an adapter only implements what its
//! host actually has.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Errors ─────────────────────────────────────────────────────────

/// What the host raises. The first three variants are *absence* signals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("missing symbol: {0}")]
    MissingSymbol(String),
    #[error("missing type: {0}")]
    MissingType(String),
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("host failure: {0}")]
    Failed(String),
}

impl HostError {
    /// True for the documented "not there on this host" signals.
    pub fn is_absence(&self) -> bool {
        !matches!(self, HostError::Failed(_))
    }

    pub fn unsupported(what: &str) -> Self {
        HostError::UnsupportedOperation(what.to_string())
    }
}

// ── Stable-surface value types ─────────────────────────────────────

/// Identifier of a host entity. Players are entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Block coordinates in the default world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Host-owned serialized form of an item's native tag. Opaque to the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeBlob(Vec<u8>);

impl NativeBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Value-like item representation. Cloning yields an independent copy.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub material: String,
    pub amount: u32,
    /// Legacy data value (durability or variant). Always 0 on flattened hosts.
    pub data: u8,
    pub display_name: Option<String>,
    pub lore: Vec<String>,
    native: Option<NativeBlob>,
}

impl ItemStack {
    pub fn new(material: &str, amount: u32) -> Self {
        Self {
            material: material.to_string(),
            amount,
            data: 0,
            display_name: None,
            lore: Vec::new(),
            native: None,
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    pub fn with_lore<S: AsRef<str>>(mut self, lines: &[S]) -> Self {
        self.lore = lines.iter().map(|l| l.as_ref().to_string()).collect();
        self
    }

    pub fn with_data(mut self, data: u8) -> Self {
        self.data = data;
        self
    }

    /// True when the item carries display metadata (a non-empty name or lore).
    pub fn has_meta(&self) -> bool {
        self.display_name.as_deref().map_or(false, |n| !n.is_empty()) || !self.lore.is_empty()
    }

    /// Native tag data, for host adapters only.
    pub fn native_blob(&self) -> Option<&NativeBlob> {
        self.native.as_ref()
    }

    /// Replace the native tag data. Host adapters call this when materializing.
    pub fn with_native_blob(mut self, blob: Option<NativeBlob>) -> Self {
        self.native = blob;
        self
    }
}

/// An object from the stable surface that the bridge can map to a native one.
#[derive(Debug, Clone, PartialEq)]
pub enum StableObject {
    Entity(EntityId),
    Item(ItemStack),
}

impl StableObject {
    pub fn describe(&self) -> String {
        match self {
            StableObject::Entity(id) => id.to_string(),
            StableObject::Item(item) => format!("item {}x{}", item.amount, item.material),
        }
    }
}

/// Title plus its fade-in / stay / fade-out timing, in ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleDisplay {
    pub title: String,
    pub subtitle: String,
    pub fade_in: u32,
    pub stay: u32,
    pub fade_out: u32,
}

impl TitleDisplay {
    pub fn new(title: &str, subtitle: &str) -> Self {
        Self {
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            fade_in: 10,
            stay: 70,
            fade_out: 20,
        }
    }

    pub fn timed(mut self, fade_in: u32, stay: u32, fade_out: u32) -> Self {
        self.fade_in = fade_in;
        self.stay = stay;
        self.fade_out = fade_out;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarColor {
    Pink,
    Blue,
    Red,
    Green,
    Yellow,
    #[default]
    Purple,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarStyle {
    #[default]
    Solid,
    Segmented6,
    Segmented10,
    Segmented12,
    Segmented20,
}

/// Boss bar contents. `progress` is clamped to `0.0..=1.0` by the strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossBarDisplay {
    pub message: String,
    pub progress: f32,
    pub color: BarColor,
    pub style: BarStyle,
}

/// Entity attribute with a base value, as exposed by the attribute API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Attribute {
    GenericMaxHealth,
    GenericFollowRange,
    GenericKnockbackResistance,
    GenericMovementSpeed,
    GenericFlyingSpeed,
    GenericAttackDamage,
    GenericAttackSpeed,
    GenericArmor,
    GenericArmorToughness,
    GenericLuck,
    HorseJumpStrength,
    ZombieSpawnReinforcements,
}

impl Attribute {
    /// Name the host's attribute registry knows it by.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::GenericMaxHealth => "GENERIC_MAX_HEALTH",
            Attribute::GenericFollowRange => "GENERIC_FOLLOW_RANGE",
            Attribute::GenericKnockbackResistance => "GENERIC_KNOCKBACK_RESISTANCE",
            Attribute::GenericMovementSpeed => "GENERIC_MOVEMENT_SPEED",
            Attribute::GenericFlyingSpeed => "GENERIC_FLYING_SPEED",
            Attribute::GenericAttackDamage => "GENERIC_ATTACK_DAMAGE",
            Attribute::GenericAttackSpeed => "GENERIC_ATTACK_SPEED",
            Attribute::GenericArmor => "GENERIC_ARMOR",
            Attribute::GenericArmorToughness => "GENERIC_ARMOR_TOUGHNESS",
            Attribute::GenericLuck => "GENERIC_LUCK",
            Attribute::HorseJumpStrength => "HORSE_JUMP_STRENGTH",
            Attribute::ZombieSpawnReinforcements => "ZOMBIE_SPAWN_REINFORCEMENTS",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a chat component is rendered on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPosition {
    Chat,
    System,
    ActionBar,
}

impl ChatPosition {
    /// Position byte used by the chat packet.
    pub fn wire_id(self) -> u32 {
        match self {
            ChatPosition::Chat => 0,
            ChatPosition::System => 1,
            ChatPosition::ActionBar => 2,
        }
    }
}

// ── Introspection ──────────────────────────────────────────────────

/// Signature of a method as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub owner: String,
    pub name: String,
    pub params: Vec<String>,
    pub returns: String,
}

/// Symbol existence checks. Only the probe runner calls these.
pub trait Introspect {
    /// Raw version string, e.g. `"1.8.8-R0.1-SNAPSHOT"`.
    fn version_string(&self) -> Result<String, HostError>;

    /// `Ok(())` if the named type is loadable, `MissingType` otherwise.
    fn find_type(&self, name: &str) -> Result<(), HostError>;

    /// Look up a method by owner, name and parameter type names.
    fn find_method(&self, owner: &str, name: &str, params: &[&str]) -> Result<MethodSig, HostError>;
}

// ── Stable surface ─────────────────────────────────────────────────

/// Calls into the host's public API. Any of them may be missing at call
/// time even when the matching capability probed positive.
pub trait ServerApi {
    fn send_message(&self, _player: EntityId, _text: &str) -> Result<(), HostError> {
        Err(HostError::unsupported("send_message"))
    }

    fn send_title(&self, _player: EntityId, _title: &TitleDisplay) -> Result<(), HostError> {
        Err(HostError::unsupported("send_title"))
    }

    fn reset_title(&self, _player: EntityId) -> Result<(), HostError> {
        Err(HostError::unsupported("reset_title"))
    }

    /// Send a JSON chat component at the given position.
    fn send_component(&self, _player: EntityId, _position: ChatPosition, _json: &str) -> Result<(), HostError> {
        Err(HostError::unsupported("send_component"))
    }

    fn set_player_list(&self, _player: EntityId, _header: &str, _footer: &str) -> Result<(), HostError> {
        Err(HostError::unsupported("set_player_list"))
    }

    fn show_boss_bar(&self, _player: EntityId, _bar: &BossBarDisplay) -> Result<(), HostError> {
        Err(HostError::unsupported("show_boss_bar"))
    }

    /// Online players through the collection-returning accessor.
    fn online_players_collection(&self) -> Result<Vec<EntityId>, HostError> {
        Err(HostError::unsupported("online_players_collection"))
    }

    /// Online players through the legacy array-returning accessor.
    fn online_players_array(&self) -> Result<Vec<EntityId>, HostError> {
        Err(HostError::unsupported("online_players_array"))
    }

    fn health_double(&self, _entity: EntityId) -> Result<f64, HostError> {
        Err(HostError::unsupported("health_double"))
    }

    fn health_int(&self, _entity: EntityId) -> Result<i32, HostError> {
        Err(HostError::unsupported("health_int"))
    }

    fn block_type(&self, _pos: BlockPos) -> Result<String, HostError> {
        Err(HostError::unsupported("block_type"))
    }

    /// Rich block-data path: convert (material, legacy data) and apply.
    fn set_block_data(&self, _pos: BlockPos, _material: &str, _data: u8, _physics: bool) -> Result<(), HostError> {
        Err(HostError::unsupported("set_block_data"))
    }

    /// Legacy numeric id for a material name.
    fn material_id(&self, _material: &str) -> Result<u16, HostError> {
        Err(HostError::unsupported("material_id"))
    }

    /// Legacy path: numeric type id plus data byte.
    fn set_type_id_and_data(&self, _pos: BlockPos, _type_id: u16, _data: u8, _physics: bool) -> Result<(), HostError> {
        Err(HostError::unsupported("set_type_id_and_data"))
    }

    /// Legacy data-byte setter that leaves the type alone.
    fn set_legacy_data(&self, _pos: BlockPos, _data: u8) -> Result<(), HostError> {
        Err(HostError::unsupported("set_legacy_data"))
    }

    /// Spawn a falling block from a material and legacy data value (rich block-data path).
    fn spawn_falling_block(&self, _pos: BlockPos, _material: &str, _data: u8) -> Result<EntityId, HostError> {
        Err(HostError::unsupported("spawn_falling_block"))
    }

    /// Legacy path: spawn a falling block from a numeric type id plus data byte.
    fn spawn_falling_block_id(&self, _pos: BlockPos, _type_id: u16, _data: u8) -> Result<EntityId, HostError> {
        Err(HostError::unsupported("spawn_falling_block_id"))
    }

    /// Base value of an attribute; `None` when the entity has no such attribute.
    fn attribute_base(&self, _entity: EntityId, _attribute: Attribute) -> Result<Option<f64>, HostError> {
        Err(HostError::unsupported("attribute_base"))
    }

    fn set_attribute_base(&self, _entity: EntityId, _attribute: Attribute, _value: f64) -> Result<(), HostError> {
        Err(HostError::unsupported("set_attribute_base"))
    }

    /// Pre-attribute max-health accessor.
    fn max_health(&self, _entity: EntityId) -> Result<f64, HostError> {
        Err(HostError::unsupported("max_health"))
    }

    fn set_max_health(&self, _entity: EntityId, _value: f64) -> Result<(), HostError> {
        Err(HostError::unsupported("set_max_health"))
    }

    fn respawn(&self, _player: EntityId) -> Result<(), HostError> {
        Err(HostError::unsupported("respawn"))
    }

    fn load_advancement(&self, _key: &str, _json: &str) -> Result<(), HostError> {
        Err(HostError::unsupported("load_advancement"))
    }

    fn grant_advancement(&self, _player: EntityId, _key: &str) -> Result<(), HostError> {
        Err(HostError::unsupported("grant_advancement"))
    }

    fn revoke_advancement(&self, _player: EntityId, _key: &str) -> Result<(), HostError> {
        Err(HostError::unsupported("revoke_advancement"))
    }

    fn remove_advancement(&self, _key: &str) -> Result<(), HostError> {
        Err(HostError::unsupported("remove_advancement"))
    }
}

/// Packet transmission keyed by a named channel.
pub trait PacketChannel {
    fn send_packet(&self, _player: EntityId, channel: &str, _payload: &[u8]) -> Result<(), HostError> {
        Err(HostError::MissingType(channel.to_string()))
    }
}

// ── Native objects ─────────────────────────────────────────────────

/// Ownership-neutral reference to a host-native object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeRef(pub u64);

/// Runtime shape identifier of a native object (its concrete class).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeId(pub String);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-resolved member of a native shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberId(pub u32);

/// Values crossing the native boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(String),
    Ref(NativeRef),
    Keys(BTreeSet<String>),
}

/// Access to native objects. Member lookup is the slow introspective step;
/// callers cache its result per shape.
pub trait NativeAccess {
    /// Map a stable object to its native counterpart. Items are copied;
    /// entities are returned by reference.
    fn native_handle(&self, _object: &StableObject) -> Result<(ShapeId, NativeRef), HostError> {
        Err(HostError::unsupported("native_handle"))
    }

    /// Publish a native object back as a stable one.
    fn materialize(&self, _native: NativeRef) -> Result<StableObject, HostError> {
        Err(HostError::unsupported("materialize"))
    }

    /// Construct a fresh native object of the named shape family.
    fn instantiate(&self, shape: &str) -> Result<(ShapeId, NativeRef), HostError> {
        Err(HostError::MissingType(shape.to_string()))
    }

    fn shape_of(&self, _native: NativeRef) -> Result<ShapeId, HostError> {
        Err(HostError::unsupported("shape_of"))
    }

    fn lookup_member(&self, shape: &ShapeId, name: &str, _arity: usize) -> Result<MemberId, HostError> {
        Err(HostError::MissingSymbol(format!("{}#{}", shape, name)))
    }

    fn invoke(&self, _target: NativeRef, _member: MemberId, _args: &[NativeValue]) -> Result<NativeValue, HostError> {
        Err(HostError::unsupported("invoke"))
    }

    /// Drop a per-operation copy and every native object it owns.
    /// Unknown or already released references are ignored; hosts that
    /// collect garbage themselves keep the default.
    fn release(&self, _native: NativeRef) {}
}

/// The full host surface the dispatch engine and bridge work against.
pub trait Host: Introspect + ServerApi + PacketChannel + NativeAccess + Send + Sync {}

impl<T> Host for T where T: Introspect + ServerApi + PacketChannel + NativeAccess + Send + Sync {}
