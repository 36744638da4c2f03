//! Hand-written packet payloads for the legacy (packet-level) strategies.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//! Each payload travels over the host channel named by its `CHANNEL_*`
//! constant; the host adapter translates it into the native packet.

use prost::Message;

pub const CHANNEL_TITLE: &str = "PacketPlayOutTitle";
pub const CHANNEL_CHAT: &str = "PacketPlayOutChat";
pub const CHANNEL_TAB_LIST: &str = "PacketPlayOutPlayerListHeaderFooter";
pub const CHANNEL_BOSS_ENTITY: &str = "PacketPlayOutSpawnEntityLiving";
pub const CHANNEL_CLIENT_COMMAND: &str = "PacketPlayInClientCommand";

/// Health of the fake boss entity at full progress.
pub const BOSS_MAX_HEALTH: f32 = 300.0;

// ── Title ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum TitleAction {
    Title = 0,
    Subtitle = 1,
    Times = 2,
    Reset = 3,
}

#[derive(Clone, PartialEq, Message)]
pub struct TitlePacket {
    #[prost(enumeration = "TitleAction", tag = "1")]
    pub action: i32,
    /// JSON chat component; empty for `Times` and `Reset`.
    #[prost(string, tag = "2")]
    pub component: String,
    #[prost(uint32, tag = "3")]
    pub fade_in: u32,
    #[prost(uint32, tag = "4")]
    pub stay: u32,
    #[prost(uint32, tag = "5")]
    pub fade_out: u32,
}

impl TitlePacket {
    pub fn reset() -> Self {
        Self {
            action: TitleAction::Reset as i32,
            ..Default::default()
        }
    }

    pub fn times(fade_in: u32, stay: u32, fade_out: u32) -> Self {
        Self {
            action: TitleAction::Times as i32,
            fade_in,
            stay,
            fade_out,
            ..Default::default()
        }
    }

    pub fn text(action: TitleAction, component: String) -> Self {
        Self {
            action: action as i32,
            component,
            ..Default::default()
        }
    }
}

// ── Chat ───────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ChatPacket {
    #[prost(string, tag = "1")]
    pub component: String,
    /// 0 chat, 1 system, 2 action bar.
    #[prost(uint32, tag = "2")]
    pub position: u32,
}

// ── Tab list ───────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct TabListPacket {
    #[prost(string, tag = "1")]
    pub header: String,
    #[prost(string, optional, tag = "2")]
    pub footer: Option<String>,
}

// ── Boss entity (pre boss-bar API) ─────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct BossEntityPacket {
    #[prost(int32, tag = "1")]
    pub entity_id: i32,
    #[prost(string, tag = "2")]
    pub custom_name: String,
    #[prost(float, tag = "3")]
    pub health: f32,
}

// ── Client command ─────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ClientCommand {
    PerformRespawn = 0,
    RequestStats = 1,
}

#[derive(Clone, PartialEq, Message)]
pub struct ClientCommandPacket {
    #[prost(enumeration = "ClientCommand", tag = "1")]
    pub command: i32,
}
