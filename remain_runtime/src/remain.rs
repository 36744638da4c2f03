//! Remain facade: one probed host, its dispatch engine and object bridge.
//!
//! Startup order:
//!   1. probe the host once (fatal below baseline)
//!   2. freeze the registry and precompute dispatch plans
//!   3. hand out operation calls and tag views until shutdown
//!
//! Everything here is `&self`; share a `Remain` behind an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use remain_kernel::capability::BlockDataModel;
use remain_kernel::host::{Attribute, BlockPos, BossBarDisplay, EntityId, Host, ItemStack, TitleDisplay};
use remain_kernel::text::strip_colors;
use remain_kernel::{
    probe_all, CapabilityFlag, CapabilityRegistry, DispatchEngine, Dispatched, HostError, Operation, OperationKind,
    Outcome, RemainError,
};

use crate::bridge::ObjectBridge;
use crate::config::{Namespace, RemainConfig};
use crate::nbt::{NbtEntity, NbtItem};

pub struct Remain<H: Host + 'static> {
    host: Arc<H>,
    config: RemainConfig,
    namespace: Namespace,
    registry: Arc<CapabilityRegistry>,
    engine: DispatchEngine,
    bridge: Arc<ObjectBridge>,
    toasts: AtomicU64,
}

impl<H: Host + 'static> Remain<H> {
    /// Probe `host` and build the dispatch engine. Call once at startup.
    pub fn bootstrap(host: Arc<H>, config: RemainConfig) -> Result<Self, RemainError> {
        let namespace = config.namespace()?;
        let registry = Arc::new(probe_all(host.as_ref())?);
        let engine = DispatchEngine::new(Arc::clone(&registry));
        let native: Arc<dyn Host> = host.clone();
        let bridge = Arc::new(ObjectBridge::new(native, registry.version()));

        info!(namespace = %namespace, version = %registry.version(), "remain ready");
        Ok(Self {
            host,
            config,
            namespace,
            registry,
            engine,
            bridge,
            toasts: AtomicU64::new(0),
        })
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn config(&self) -> &RemainConfig {
        &self.config
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &DispatchEngine {
        &self.engine
    }

    pub fn bridge(&self) -> &Arc<ObjectBridge> {
        &self.bridge
    }

    /// Dispatch a raw operation.
    pub fn execute(&self, op: &Operation) -> Result<Dispatched, RemainError> {
        self.engine.execute(self.host.as_ref(), op)
    }

    fn run(&self, op: Operation) -> Result<Outcome, RemainError> {
        self.execute(&op).map(|d| d.outcome)
    }

    // ── Display ────────────────────────────────────────────────────

    /// Send a title, honouring the configured packet preference.
    pub fn send_title(&self, player: EntityId, title: TitleDisplay) -> Result<(), RemainError> {
        self.send_title_with(player, title, self.config.force_packet_titles)
    }

    pub fn send_title_with(&self, player: EntityId, title: TitleDisplay, force_packets: bool) -> Result<(), RemainError> {
        self.run(Operation::SendTitle {
            player,
            title,
            force_packets,
        })
        .map(|_| ())
    }

    pub fn reset_title(&self, player: EntityId) -> Result<(), RemainError> {
        self.run(Operation::ResetTitle { player }).map(|_| ())
    }

    pub fn send_action_bar(&self, player: EntityId, text: &str) -> Result<(), RemainError> {
        self.run(Operation::SendActionBar {
            player,
            text: text.to_string(),
        })
        .map(|_| ())
    }

    pub fn send_tablist(&self, player: EntityId, header: &str, footer: Option<&str>) -> Result<(), RemainError> {
        self.run(Operation::SendTablist {
            player,
            header: header.to_string(),
            footer: footer.map(str::to_string),
        })
        .map(|_| ())
    }

    /// Boss bar with default colour and style.
    pub fn send_boss_bar(&self, player: EntityId, message: &str, progress: f32) -> Result<(), RemainError> {
        self.send_boss_bar_styled(
            player,
            BossBarDisplay {
                message: message.to_string(),
                progress,
                color: Default::default(),
                style: Default::default(),
            },
        )
    }

    pub fn send_boss_bar_styled(&self, player: EntityId, bar: BossBarDisplay) -> Result<(), RemainError> {
        self.run(Operation::SendBossBar { player, bar }).map(|_| ())
    }

    /// Show a one-off toast. Returns the advancement key used, or `None`
    /// when the message is empty and nothing was sent.
    pub fn send_toast(&self, player: EntityId, message: &str, icon: &str) -> Result<Option<String>, RemainError> {
        let n = self.toasts.fetch_add(1, Ordering::Relaxed);
        let key = format!("{}:toast_{}", self.namespace.as_str().to_ascii_lowercase(), n);
        let outcome = self.run(Operation::SendToast {
            player,
            key: key.clone(),
            message: message.to_string(),
            icon: icon.to_string(),
        })?;
        Ok(match outcome {
            Outcome::Skipped => None,
            _ => Some(key),
        })
    }

    /// Revoke a toast from `player` and unload its advancement.
    pub fn clear_toast(&self, player: EntityId, key: &str) -> Result<(), RemainError> {
        if !self.registry.supports(CapabilityFlag::Advancements) {
            return Err(RemainError::Unsupported {
                operation: OperationKind::SendToast,
                version: self.registry.version(),
            });
        }
        self.host.revoke_advancement(player, key)?;
        self.host.remove_advancement(key)?;
        debug!(key, "toast cleared");
        Ok(())
    }

    // ── World ──────────────────────────────────────────────────────

    pub fn set_block_type_and_data(
        &self,
        pos: BlockPos,
        material: &str,
        data: u8,
        physics: bool,
    ) -> Result<(), RemainError> {
        self.run(Operation::SetBlockTypeAndData {
            pos,
            material: material.to_string(),
            data,
            physics,
        })
        .map(|_| ())
    }

    pub fn set_block_data(&self, pos: BlockPos, data: u8) -> Result<(), RemainError> {
        self.run(Operation::SetBlockData { pos, data }).map(|_| ())
    }

    /// Spawn a falling block of `material` with legacy data value `data`.
    pub fn spawn_falling_block(&self, pos: BlockPos, material: &str, data: u8) -> Result<EntityId, RemainError> {
        let op = Operation::SpawnFallingBlock {
            pos,
            material: material.to_string(),
            data,
        };
        match self.run(op)? {
            Outcome::Spawned(entity) => Ok(entity),
            other => Err(unexpected(OperationKind::SpawnFallingBlock, other)),
        }
    }

    // ── Entities ───────────────────────────────────────────────────

    /// Base value of `attribute`; `None` when the entity has no such
    /// attribute. Before the attribute API only max health is reachable.
    pub fn attribute(&self, entity: EntityId, attribute: Attribute) -> Result<Option<f64>, RemainError> {
        match self.run(Operation::GetAttribute { entity, attribute })? {
            Outcome::Attribute(value) => Ok(value),
            other => Err(unexpected(OperationKind::GetAttribute, other)),
        }
    }

    pub fn set_attribute(&self, entity: EntityId, attribute: Attribute, value: f64) -> Result<(), RemainError> {
        self.run(Operation::SetAttribute {
            entity,
            attribute,
            value,
        })
        .map(|_| ())
    }

    /// Health as an integer, whatever the host's accessor type.
    pub fn health(&self, entity: EntityId) -> Result<i32, RemainError> {
        match self.run(Operation::GetHealth { entity })? {
            Outcome::Health(health) => Ok(health),
            other => Err(unexpected(OperationKind::GetHealth, other)),
        }
    }

    pub fn online_players(&self) -> Result<Vec<EntityId>, RemainError> {
        match self.run(Operation::OnlinePlayers)? {
            Outcome::Players(players) => Ok(players),
            other => Err(unexpected(OperationKind::OnlinePlayers, other)),
        }
    }

    pub fn respawn(&self, player: EntityId) -> Result<(), RemainError> {
        self.run(Operation::Respawn { player }).map(|_| ())
    }

    // ── Tags ───────────────────────────────────────────────────────

    /// Tag view over a private copy of `item`.
    pub fn nbt_item(&self, item: &ItemStack) -> NbtItem {
        NbtItem::new(Arc::clone(&self.bridge), item)
    }

    /// Tag view over a live entity.
    pub fn nbt_entity(&self, entity: EntityId) -> NbtEntity {
        NbtEntity::new(Arc::clone(&self.bridge), entity)
    }

    /// Same material and metadata presence, same data value on legacy
    /// hosts (bows excepted), same display name ignoring colour and case,
    /// same lore, and the same `<namespace>` and `<namespace>_Item` tags.
    /// A missing display name equals an empty one.
    pub fn is_similar(&self, a: &ItemStack, b: &ItemStack) -> bool {
        if a.material != b.material || a.has_meta() != b.has_meta() {
            return false;
        }
        let legacy = self.registry.block_data_model() == Some(BlockDataModel::LegacyPair);
        if legacy && a.data != b.data && a.material != "BOW" {
            return false;
        }
        if display_key(a) != display_key(b) || a.lore != b.lore {
            return false;
        }

        let (a, b) = (self.nbt_item(a), self.nbt_item(b));
        [self.namespace.as_str().to_string(), self.namespace.key("Item")]
            .iter()
            .all(|key| match (a.has_key(key), b.has_key(key)) {
                (false, false) => true,
                (true, true) => a.get_string(key) == b.get_string(key),
                _ => false,
            })
    }
}

fn display_key(item: &ItemStack) -> String {
    strip_colors(item.display_name.as_deref().unwrap_or_default()).to_lowercase()
}

fn unexpected(operation: OperationKind, outcome: Outcome) -> RemainError {
    RemainError::Host(HostError::Failed(format!(
        "{} produced unexpected outcome {:?}",
        operation, outcome
    )))
}
