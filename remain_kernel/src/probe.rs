/// Remain Kernel — Probe Runner
///
/// Populates the CapabilityRegistry exactly once at startup.
///
/// Order:
///   1. Version probe (parse the host version string): fatal on failure
///      or when the version is below `HostVersion::BASELINE`
///   2. Baseline probes (types/methods every host has): fatal on absence
///   3. Optional probes: absence records a negative flag
///
/// Probes are independent: a caught absence never stops later probes.
/// An unexpected host error (`HostError::Failed`) is fatal in every probe
/// except `Tolerant` ones.

use tracing::{debug, info};

use crate::capability::{
    BlockDataModel, CapabilityFlag, CapabilityRegistry, CapabilityValue, HealthAccessor,
    PlayersAccessor, RegistryBuilder,
};
use crate::error::RemainError;
use crate::host::{HostError, Introspect};
use crate::version::HostVersion;

/// Fully qualified names the probes look for. Host adapters resolve the
/// `net.minecraft.server.` prefix to their versioned package.
pub mod symbols {
    pub const BUKKIT: &str = "org.bukkit.Bukkit";
    pub const SOUND: &str = "org.bukkit.Sound";
    pub const PLAYER: &str = "org.bukkit.entity.Player";
    pub const PLAYER_SPIGOT: &str = "org.bukkit.entity.Player$Spigot";
    pub const LIVING_ENTITY: &str = "org.bukkit.entity.LivingEntity";
    pub const ENTITY: &str = "org.bukkit.entity.Entity";
    pub const WORLD: &str = "org.bukkit.World";
    pub const PARTICLE: &str = "org.bukkit.Particle";
    pub const LOCATION: &str = "org.bukkit.Location";
    pub const OBJECTIVE: &str = "org.bukkit.scoreboard.Objective";
    pub const BOOK_EVENT: &str = "org.bukkit.event.player.PlayerEditBookEvent";
    pub const INVENTORY: &str = "org.bukkit.inventory.Inventory";
    pub const SPAWN_EGG_META: &str = "org.bukkit.inventory.meta.SpawnEggMeta";
    pub const ADVANCEMENT: &str = "org.bukkit.advancement.Advancement";
    pub const NAMESPACED_KEY: &str = "org.bukkit.NamespacedKey";
    pub const ATTRIBUTE: &str = "org.bukkit.attribute.Attribute";
    pub const BOSS_BAR: &str = "org.bukkit.boss.BossBar";
    pub const BLOCK: &str = "org.bukkit.block.Block";
    pub const BLOCK_DATA: &str = "org.bukkit.block.data.BlockData";
    pub const COMPONENT_SERIALIZER: &str = "net.md_5.bungee.chat.ComponentSerializer";
    pub const CHAT_MESSAGE_TYPE: &str = "net.md_5.bungee.api.ChatMessageType";
    pub const BASE_COMPONENT: &str = "net.md_5.bungee.api.chat.BaseComponent";
    pub const PROTOCOL_LIB: &str = "com.comphenix.protocol.wrappers.WrappedChatComponent";
    pub const TITLE_PACKET: &str = "net.minecraft.server.PacketPlayOutTitle";
    pub const CHAT_PACKET: &str = "net.minecraft.server.PacketPlayOutChat";
    pub const TAB_LIST_PACKET: &str = "net.minecraft.server.PacketPlayOutPlayerListHeaderFooter";
    pub const BOSS_ENTITY_PACKET: &str = "net.minecraft.server.PacketPlayOutSpawnEntityLiving";
    pub const CHAT_BASE_COMPONENT: &str = "net.minecraft.server.IChatBaseComponent";

    pub const STRING: &str = "java.lang.String";
    pub const COLLECTION: &str = "java.util.Collection";
    pub const VOID: &str = "void";
    pub const INT: &str = "int";
    pub const BYTE: &str = "byte";
    pub const DOUBLE: &str = "double";
}

use symbols as sym;

// ---------------------------------------------------------------------------
// Probe table
// ---------------------------------------------------------------------------

/// How a probe's failure is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Absence means the host is below baseline: fatal.
    Baseline,
    /// Absence records `absent`; unexpected errors are fatal.
    Optional,
    /// Any failure records `absent` (third-party plugins that may be broken).
    Tolerant,
}

pub type ProbeFn = fn(&dyn Introspect, HostVersion) -> Result<CapabilityValue, HostError>;

/// One introspective check against the live host.
#[derive(Clone, Copy)]
pub struct Probe {
    pub name: &'static str,
    pub kind: ProbeKind,
    /// Flag populated by this probe; `None` for pure baseline gates.
    pub flag: Option<CapabilityFlag>,
    /// Value recorded when the probe reports absence.
    pub absent: CapabilityValue,
    pub check: ProbeFn,
}

impl Probe {
    const fn optional(name: &'static str, flag: CapabilityFlag, check: ProbeFn) -> Self {
        Self {
            name,
            kind: ProbeKind::Optional,
            flag: Some(flag),
            absent: CapabilityValue::Supported(false),
            check,
        }
    }
}

/// The standard probe set, baseline gates first.
pub fn default_probes() -> Vec<Probe> {
    vec![
        Probe {
            name: "sound_type",
            kind: ProbeKind::Baseline,
            flag: None,
            absent: CapabilityValue::Supported(false),
            check: probe_sound_type,
        },
        Probe {
            name: "bungee_chat",
            kind: ProbeKind::Baseline,
            flag: None,
            absent: CapabilityValue::Supported(false),
            check: probe_bungee_chat,
        },
        Probe {
            name: "players_accessor",
            kind: ProbeKind::Baseline,
            flag: Some(CapabilityFlag::PlayersAccessor),
            absent: CapabilityValue::Players(PlayersAccessor::Array),
            check: probe_players_accessor,
        },
        Probe {
            name: "health_accessor",
            kind: ProbeKind::Baseline,
            flag: Some(CapabilityFlag::HealthAccessor),
            absent: CapabilityValue::Health(HealthAccessor::Int),
            check: probe_health_accessor,
        },
        Probe {
            name: "block_data_model",
            kind: ProbeKind::Optional,
            flag: Some(CapabilityFlag::BlockDataModel),
            absent: CapabilityValue::BlockData(BlockDataModel::LegacyPair),
            check: probe_block_data_model,
        },
        Probe::optional("title_api", CapabilityFlag::TitleApi, probe_title_api),
        Probe::optional("timed_title_api", CapabilityFlag::TimedTitleApi, probe_timed_title_api),
        Probe::optional("particle_api", CapabilityFlag::ParticleApi, probe_particle_api),
        Probe::optional("scoreboard_entry_api", CapabilityFlag::ScoreboardEntryApi, probe_scoreboard_entry_api),
        Probe::optional("book_event", CapabilityFlag::BookEvent, probe_book_event),
        Probe::optional("inventory_location", CapabilityFlag::InventoryLocation, probe_inventory_location),
        Probe::optional("scoreboard_tags", CapabilityFlag::ScoreboardTags, probe_scoreboard_tags),
        Probe::optional("spawn_egg_meta", CapabilityFlag::SpawnEggMeta, probe_spawn_egg_meta),
        Probe::optional("advancements", CapabilityFlag::Advancements, probe_advancements),
        Probe::optional("attribute_api", CapabilityFlag::AttributeApi, probe_attribute_api),
        Probe {
            name: "protocol_lib",
            kind: ProbeKind::Tolerant,
            flag: Some(CapabilityFlag::ProtocolLib),
            absent: CapabilityValue::Supported(false),
            check: probe_protocol_lib,
        },
        Probe::optional("chat_message_type_api", CapabilityFlag::ChatMessageTypeApi, probe_chat_message_type),
        Probe::optional("boss_bar_api", CapabilityFlag::BossBarApi, probe_boss_bar_api),
        Probe::optional("player_list_header_api", CapabilityFlag::PlayerListHeaderApi, probe_player_list_header),
        Probe::optional("spigot_respawn", CapabilityFlag::SpigotRespawn, probe_spigot_respawn),
        Probe::optional("legacy_data_setter", CapabilityFlag::LegacyDataSetter, probe_legacy_data_setter),
        Probe::optional("title_packets", CapabilityFlag::TitlePackets, probe_title_packets),
        Probe::optional("chat_packet_position", CapabilityFlag::ChatPacketPosition, probe_chat_packet_position),
        Probe::optional("tab_list_packets", CapabilityFlag::TabListPackets, probe_tab_list_packets),
        Probe::optional("boss_entity_packets", CapabilityFlag::BossEntityPackets, probe_boss_entity_packets),
    ]
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Executes a probe table against a host.
pub struct ProbeRunner {
    probes: Vec<Probe>,
}

impl ProbeRunner {
    pub fn new(probes: Vec<Probe>) -> Self {
        Self { probes }
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Run every probe and freeze the result.
    pub fn run(&self, host: &dyn Introspect) -> Result<CapabilityRegistry, RemainError> {
        let version = probe_version(host)?;
        let mut builder = RegistryBuilder::new(version);
        let mut negatives = 0usize;

        for probe in &self.probes {
            let value = match (probe.check)(host, version) {
                Ok(value) => value,
                Err(err) => match probe.kind {
                    ProbeKind::Baseline if err.is_absence() => {
                        return Err(RemainError::ProbeFatal {
                            probe: probe.name,
                            reason: err.to_string(),
                        });
                    }
                    ProbeKind::Tolerant => probe.absent,
                    _ if err.is_absence() => probe.absent,
                    _ => {
                        return Err(RemainError::ProbeFatal {
                            probe: probe.name,
                            reason: format!("unexpected host error: {}", err),
                        });
                    }
                },
            };

            if value == CapabilityValue::Supported(false) {
                negatives += 1;
            }
            debug!(probe = probe.name, value = %value, "probe finished");

            if let Some(flag) = probe.flag {
                builder.record(flag, value)?;
            }
        }

        let registry = builder.freeze();
        info!(
            version = %version,
            flags = registry.len(),
            negatives,
            "host capabilities probed"
        );
        Ok(registry)
    }
}

/// Probe the host with the default table. Call once at startup.
pub fn probe_all(host: &dyn Introspect) -> Result<CapabilityRegistry, RemainError> {
    ProbeRunner::new(default_probes()).run(host)
}

/// Gates everything else; always runs first.
fn probe_version(host: &dyn Introspect) -> Result<HostVersion, RemainError> {
    let raw = host.version_string().map_err(|e| RemainError::ProbeFatal {
        probe: "version",
        reason: e.to_string(),
    })?;
    let version = HostVersion::parse(&raw).ok_or_else(|| RemainError::ProbeFatal {
        probe: "version",
        reason: format!("unparseable host version {:?}", raw),
    })?;
    if !version.at_least(HostVersion::BASELINE) {
        return Err(RemainError::ProbeFatal {
            probe: "version",
            reason: format!("host {} is older than {}", version, HostVersion::BASELINE),
        });
    }
    Ok(version)
}

// ---------------------------------------------------------------------------
// Individual probes (private)
// ---------------------------------------------------------------------------

fn supported() -> Result<CapabilityValue, HostError> {
    Ok(CapabilityValue::Supported(true))
}

fn probe_sound_type(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::SOUND)?;
    supported()
}

fn probe_bungee_chat(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::COMPONENT_SERIALIZER)?;
    supported()
}

fn probe_players_accessor(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    let sig = host.find_method(sym::BUKKIT, "getOnlinePlayers", &[])?;
    let accessor = if sig.returns == sym::COLLECTION {
        PlayersAccessor::Collection
    } else {
        PlayersAccessor::Array
    };
    Ok(CapabilityValue::Players(accessor))
}

fn probe_health_accessor(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    let sig = host.find_method(sym::LIVING_ENTITY, "getHealth", &[])?;
    let accessor = if sig.returns == sym::DOUBLE {
        HealthAccessor::Double
    } else {
        HealthAccessor::Int
    };
    Ok(CapabilityValue::Health(accessor))
}

fn probe_block_data_model(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::BLOCK_DATA)?;
    Ok(CapabilityValue::BlockData(BlockDataModel::Rich))
}

fn probe_title_api(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    let sig = host.find_method(sym::PLAYER, "resetTitle", &[])?;
    Ok(CapabilityValue::Supported(sig.returns == sym::VOID))
}

fn probe_timed_title_api(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_method(
        sym::PLAYER,
        "sendTitle",
        &[sym::STRING, sym::STRING, sym::INT, sym::INT, sym::INT],
    )?;
    supported()
}

fn probe_particle_api(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_method(sym::WORLD, "spawnParticle", &[sym::PARTICLE, sym::LOCATION, sym::INT])?;
    supported()
}

fn probe_scoreboard_entry_api(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_method(sym::OBJECTIVE, "getScore", &[sym::STRING])?;
    supported()
}

fn probe_book_event(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::BOOK_EVENT)?;
    supported()
}

fn probe_inventory_location(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_method(sym::INVENTORY, "getLocation", &[])?;
    supported()
}

fn probe_scoreboard_tags(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_method(sym::ENTITY, "getScoreboardTags", &[])?;
    supported()
}

fn probe_spawn_egg_meta(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::SPAWN_EGG_META)?;
    supported()
}

fn probe_advancements(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::ADVANCEMENT)?;
    host.find_type(sym::NAMESPACED_KEY)?;
    supported()
}

fn probe_attribute_api(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::ATTRIBUTE)?;
    host.find_method(sym::LIVING_ENTITY, "getAttribute", &[sym::ATTRIBUTE])?;
    supported()
}

fn probe_protocol_lib(host: &dyn Introspect, version: HostVersion) -> Result<CapabilityValue, HostError> {
    if !version.newer_than(6) {
        return Ok(CapabilityValue::Supported(false));
    }
    host.find_type(sym::PROTOCOL_LIB)?;
    supported()
}

fn probe_chat_message_type(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::CHAT_MESSAGE_TYPE)?;
    host.find_method(sym::PLAYER_SPIGOT, "sendMessage", &[sym::CHAT_MESSAGE_TYPE, sym::BASE_COMPONENT])?;
    supported()
}

fn probe_boss_bar_api(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::BOSS_BAR)?;
    supported()
}

fn probe_player_list_header(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_method(sym::PLAYER, "setPlayerListHeaderFooter", &[sym::STRING, sym::STRING])?;
    supported()
}

fn probe_spigot_respawn(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_method(sym::PLAYER_SPIGOT, "respawn", &[])?;
    supported()
}

fn probe_legacy_data_setter(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_method(sym::BLOCK, "setData", &[sym::BYTE])?;
    supported()
}

fn probe_title_packets(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::TITLE_PACKET)?;
    supported()
}

fn probe_chat_packet_position(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_method(sym::CHAT_PACKET, "<init>", &[sym::CHAT_BASE_COMPONENT, sym::BYTE])?;
    supported()
}

fn probe_tab_list_packets(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::TAB_LIST_PACKET)?;
    supported()
}

fn probe_boss_entity_packets(host: &dyn Introspect, _: HostVersion) -> Result<CapabilityValue, HostError> {
    host.find_type(sym::BOSS_ENTITY_PACKET)?;
    supported()
}
