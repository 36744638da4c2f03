/// Remain Kernel — Operation Definitions
///
/// Operations are pure data: which logical capability the caller wants,
/// plus its arguments. They contain zero dispatch logic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::{Attribute, BlockPos, BossBarDisplay, EntityId, TitleDisplay};

/// Logical capability a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    SendTitle,
    ResetTitle,
    SendActionBar,
    SendTablist,
    SendBossBar,
    SetBlockTypeAndData,
    SetBlockData,
    SpawnFallingBlock,
    GetHealth,
    GetAttribute,
    SetAttribute,
    OnlinePlayers,
    Respawn,
    SendToast,
}

impl OperationKind {
    pub const ALL: [OperationKind; 14] = [
        OperationKind::SendTitle,
        OperationKind::ResetTitle,
        OperationKind::SendActionBar,
        OperationKind::SendTablist,
        OperationKind::SendBossBar,
        OperationKind::SetBlockTypeAndData,
        OperationKind::SetBlockData,
        OperationKind::SpawnFallingBlock,
        OperationKind::GetHealth,
        OperationKind::GetAttribute,
        OperationKind::SetAttribute,
        OperationKind::OnlinePlayers,
        OperationKind::Respawn,
        OperationKind::SendToast,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::SendTitle => "send_title",
            OperationKind::ResetTitle => "reset_title",
            OperationKind::SendActionBar => "send_action_bar",
            OperationKind::SendTablist => "send_tablist",
            OperationKind::SendBossBar => "send_boss_bar",
            OperationKind::SetBlockTypeAndData => "set_block_type_and_data",
            OperationKind::SetBlockData => "set_block_data",
            OperationKind::SpawnFallingBlock => "spawn_falling_block",
            OperationKind::GetHealth => "get_health",
            OperationKind::GetAttribute => "get_attribute",
            OperationKind::SetAttribute => "set_attribute",
            OperationKind::OnlinePlayers => "online_players",
            OperationKind::Respawn => "respawn",
            OperationKind::SendToast => "send_toast",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A request: operation kind plus arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    SendTitle {
        player: EntityId,
        title: TitleDisplay,
        /// Skip the native API even when available (it may drop timings).
        force_packets: bool,
    },
    ResetTitle {
        player: EntityId,
    },
    SendActionBar {
        player: EntityId,
        text: String,
    },
    SendTablist {
        player: EntityId,
        header: String,
        footer: Option<String>,
    },
    SendBossBar {
        player: EntityId,
        bar: BossBarDisplay,
    },
    SetBlockTypeAndData {
        pos: BlockPos,
        material: String,
        data: u8,
        physics: bool,
    },
    SetBlockData {
        pos: BlockPos,
        data: u8,
    },
    SpawnFallingBlock {
        pos: BlockPos,
        material: String,
        data: u8,
    },
    GetHealth {
        entity: EntityId,
    },
    GetAttribute {
        entity: EntityId,
        attribute: Attribute,
    },
    SetAttribute {
        entity: EntityId,
        attribute: Attribute,
        value: f64,
    },
    OnlinePlayers,
    Respawn {
        player: EntityId,
    },
    SendToast {
        player: EntityId,
        key: String,
        message: String,
        icon: String,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::SendTitle { .. } => OperationKind::SendTitle,
            Operation::ResetTitle { .. } => OperationKind::ResetTitle,
            Operation::SendActionBar { .. } => OperationKind::SendActionBar,
            Operation::SendTablist { .. } => OperationKind::SendTablist,
            Operation::SendBossBar { .. } => OperationKind::SendBossBar,
            Operation::SetBlockTypeAndData { .. } => OperationKind::SetBlockTypeAndData,
            Operation::SetBlockData { .. } => OperationKind::SetBlockData,
            Operation::SpawnFallingBlock { .. } => OperationKind::SpawnFallingBlock,
            Operation::GetHealth { .. } => OperationKind::GetHealth,
            Operation::GetAttribute { .. } => OperationKind::GetAttribute,
            Operation::SetAttribute { .. } => OperationKind::SetAttribute,
            Operation::OnlinePlayers => OperationKind::OnlinePlayers,
            Operation::Respawn { .. } => OperationKind::Respawn,
            Operation::SendToast { .. } => OperationKind::SendToast,
        }
    }
}

/// What a successful strategy produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done,
    /// Nothing to do (e.g. an empty toast message).
    Skipped,
    Health(i32),
    /// Attribute base value; `None` when the entity lacks the attribute.
    Attribute(Option<f64>),
    Players(Vec<EntityId>),
    Spawned(EntityId),
}
