/// Remain Kernel — Capability Flags and Registry
///
/// Pure data. Written once by the probe runner, read-only afterwards.
/// Flags never probed read as "not supported".

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RemainError;
use crate::version::HostVersion;

// ── Flags ──────────────────────────────────────────────────────────

/// One fact about what the running host supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityFlag {
    /// Online-player accessor shape (collection vs array).
    PlayersAccessor,
    /// Health accessor return type (double vs int).
    HealthAccessor,
    /// Block data model (rich object vs legacy id + data byte).
    BlockDataModel,
    TitleApi,
    TimedTitleApi,
    ParticleApi,
    ScoreboardEntryApi,
    BookEvent,
    InventoryLocation,
    ScoreboardTags,
    SpawnEggMeta,
    Advancements,
    /// Per-entity attribute instances (max health, speed, ...).
    AttributeApi,
    ProtocolLib,
    ChatMessageTypeApi,
    BossBarApi,
    PlayerListHeaderApi,
    SpigotRespawn,
    LegacyDataSetter,
    TitlePackets,
    ChatPacketPosition,
    TabListPackets,
    BossEntityPackets,
}

impl CapabilityFlag {
    pub const ALL: [CapabilityFlag; 23] = [
        CapabilityFlag::PlayersAccessor,
        CapabilityFlag::HealthAccessor,
        CapabilityFlag::BlockDataModel,
        CapabilityFlag::TitleApi,
        CapabilityFlag::TimedTitleApi,
        CapabilityFlag::ParticleApi,
        CapabilityFlag::ScoreboardEntryApi,
        CapabilityFlag::BookEvent,
        CapabilityFlag::InventoryLocation,
        CapabilityFlag::ScoreboardTags,
        CapabilityFlag::SpawnEggMeta,
        CapabilityFlag::Advancements,
        CapabilityFlag::AttributeApi,
        CapabilityFlag::ProtocolLib,
        CapabilityFlag::ChatMessageTypeApi,
        CapabilityFlag::BossBarApi,
        CapabilityFlag::PlayerListHeaderApi,
        CapabilityFlag::SpigotRespawn,
        CapabilityFlag::LegacyDataSetter,
        CapabilityFlag::TitlePackets,
        CapabilityFlag::ChatPacketPosition,
        CapabilityFlag::TabListPackets,
        CapabilityFlag::BossEntityPackets,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CapabilityFlag::PlayersAccessor => "players_accessor",
            CapabilityFlag::HealthAccessor => "health_accessor",
            CapabilityFlag::BlockDataModel => "block_data_model",
            CapabilityFlag::TitleApi => "title_api",
            CapabilityFlag::TimedTitleApi => "timed_title_api",
            CapabilityFlag::ParticleApi => "particle_api",
            CapabilityFlag::ScoreboardEntryApi => "scoreboard_entry_api",
            CapabilityFlag::BookEvent => "book_event",
            CapabilityFlag::InventoryLocation => "inventory_location",
            CapabilityFlag::ScoreboardTags => "scoreboard_tags",
            CapabilityFlag::SpawnEggMeta => "spawn_egg_meta",
            CapabilityFlag::Advancements => "advancements",
            CapabilityFlag::AttributeApi => "attribute_api",
            CapabilityFlag::ProtocolLib => "protocol_lib",
            CapabilityFlag::ChatMessageTypeApi => "chat_message_type_api",
            CapabilityFlag::BossBarApi => "boss_bar_api",
            CapabilityFlag::PlayerListHeaderApi => "player_list_header_api",
            CapabilityFlag::SpigotRespawn => "spigot_respawn",
            CapabilityFlag::LegacyDataSetter => "legacy_data_setter",
            CapabilityFlag::TitlePackets => "title_packets",
            CapabilityFlag::ChatPacketPosition => "chat_packet_position",
            CapabilityFlag::TabListPackets => "tab_list_packets",
            CapabilityFlag::BossEntityPackets => "boss_entity_packets",
        }
    }
}

impl fmt::Display for CapabilityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Values ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayersAccessor {
    Collection,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthAccessor {
    Double,
    Int,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockDataModel {
    Rich,
    LegacyPair,
}

/// Boolean or small-enum value of a capability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityValue {
    Supported(bool),
    Players(PlayersAccessor),
    Health(HealthAccessor),
    BlockData(BlockDataModel),
}

impl fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CapabilityValue::Supported(true) => "true",
            CapabilityValue::Supported(false) => "false",
            CapabilityValue::Players(PlayersAccessor::Collection) => "collection",
            CapabilityValue::Players(PlayersAccessor::Array) => "array",
            CapabilityValue::Health(HealthAccessor::Double) => "double",
            CapabilityValue::Health(HealthAccessor::Int) => "int",
            CapabilityValue::BlockData(BlockDataModel::Rich) => "rich",
            CapabilityValue::BlockData(BlockDataModel::LegacyPair) => "legacy_pair",
        };
        f.write_str(s)
    }
}

// ── Registry ───────────────────────────────────────────────────────

/// Frozen capability facts for one host process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityRegistry {
    version: HostVersion,
    values: BTreeMap<CapabilityFlag, CapabilityValue>,
}

impl CapabilityRegistry {
    /// Build a registry directly, e.g. to simulate a host in tests.
    pub fn from_values(
        version: HostVersion,
        values: impl IntoIterator<Item = (CapabilityFlag, CapabilityValue)>,
    ) -> Result<Self, RemainError> {
        let mut builder = RegistryBuilder::new(version);
        for (flag, value) in values {
            builder.record(flag, value)?;
        }
        Ok(builder.freeze())
    }

    pub fn version(&self) -> HostVersion {
        self.version
    }

    pub fn get(&self, flag: CapabilityFlag) -> Option<CapabilityValue> {
        self.values.get(&flag).copied()
    }

    /// True only for boolean flags probed positive.
    pub fn supports(&self, flag: CapabilityFlag) -> bool {
        self.get(flag) == Some(CapabilityValue::Supported(true))
    }

    pub fn players_accessor(&self) -> Option<PlayersAccessor> {
        match self.get(CapabilityFlag::PlayersAccessor) {
            Some(CapabilityValue::Players(p)) => Some(p),
            _ => None,
        }
    }

    pub fn health_accessor(&self) -> Option<HealthAccessor> {
        match self.get(CapabilityFlag::HealthAccessor) {
            Some(CapabilityValue::Health(h)) => Some(h),
            _ => None,
        }
    }

    pub fn block_data_model(&self) -> Option<BlockDataModel> {
        match self.get(CapabilityFlag::BlockDataModel) {
            Some(CapabilityValue::BlockData(b)) => Some(b),
            _ => None,
        }
    }

    /// Iterate recorded flags in stable (declaration) order.
    pub fn iter(&self) -> impl Iterator<Item = (CapabilityFlag, CapabilityValue)> + '_ {
        self.values.iter().map(|(f, v)| (*f, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Write-once accumulator used during startup probing.
#[derive(Debug)]
pub struct RegistryBuilder {
    version: HostVersion,
    values: BTreeMap<CapabilityFlag, CapabilityValue>,
}

impl RegistryBuilder {
    pub fn new(version: HostVersion) -> Self {
        Self {
            version,
            values: BTreeMap::new(),
        }
    }

    /// Record a flag. Every flag gets exactly one value.
    pub fn record(&mut self, flag: CapabilityFlag, value: CapabilityValue) -> Result<(), RemainError> {
        if self.values.contains_key(&flag) {
            return Err(RemainError::DuplicateCapability(flag));
        }
        self.values.insert(flag, value);
        Ok(())
    }

    pub fn freeze(self) -> CapabilityRegistry {
        CapabilityRegistry {
            version: self.version,
            values: self.values,
        }
    }
}
