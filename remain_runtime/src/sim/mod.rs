//! In-process simulated host.
//!
//! `SimHost` answers introspection from a [`Profile`], keeps per-player
//! display state, decodes packet payloads into that same state, and runs
//! a small native object arena for the tag model. It is what the
//! `remain-probe` binary and the integration tests drive.
//!
//! Faults can be injected per call site with [`SimHost::fail_next`]; the
//! next call of that name returns the given error once.

mod native;
pub mod profile;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use prost::Message;
use tracing::trace;

use remain_kernel::host::{
    Attribute, BlockPos, BossBarDisplay, ChatPosition, EntityId, HostError, Introspect, MemberId, MethodSig, NativeAccess,
    NativeRef, NativeValue, PacketChannel, ServerApi, ShapeId, StableObject, TitleDisplay,
};
use remain_kernel::packets::{
    BossEntityPacket, ChatPacket, ClientCommand, ClientCommandPacket, TabListPacket, TitleAction, TitlePacket,
    BOSS_MAX_HEALTH, CHANNEL_BOSS_ENTITY, CHANNEL_CHAT, CHANNEL_CLIENT_COMMAND, CHANNEL_TAB_LIST, CHANNEL_TITLE,
};
use remain_kernel::text::component_text;

use native::NativeWorld;
pub use profile::{profile, Features, Profile, PROFILES};
use profile::Symbols;

/// What one player has been shown so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerView {
    pub chat: Vec<String>,
    pub action_bars: Vec<String>,
    pub title: Option<TitleDisplay>,
    pub title_resets: usize,
    /// (header, footer)
    pub tab_list: Option<(String, String)>,
    pub boss_bar: Option<BossBarDisplay>,
    pub respawns: usize,
    /// Advancement keys granted to the player, in order.
    pub toasts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockState {
    pub material: String,
    pub data: u8,
}

/// Numeric ids of the pre-flattening block registry.
const LEGACY_MATERIALS: [(&str, u16); 8] = [
    ("AIR", 0),
    ("STONE", 1),
    ("GRASS", 2),
    ("DIRT", 3),
    ("COBBLESTONE", 4),
    ("WOOL", 35),
    ("GOLD_BLOCK", 41),
    ("IRON_BLOCK", 42),
];

struct Player {
    view: PlayerView,
    /// Title being assembled from packets.
    pending: TitleDisplay,
}

#[derive(Default)]
struct World {
    next_entity: u64,
    players: BTreeMap<EntityId, Player>,
    health: HashMap<EntityId, f64>,
    /// Base values of each living entity's attribute instances.
    attributes: HashMap<EntityId, BTreeMap<Attribute, f64>>,
    blocks: BTreeMap<BlockPos, BlockState>,
    falling_blocks: BTreeMap<EntityId, BlockState>,
    advancements: BTreeMap<String, String>,
}

pub struct SimHost {
    profile: &'static Profile,
    symbols: Symbols,
    world: Mutex<World>,
    native: Mutex<NativeWorld>,
    faults: Mutex<HashMap<String, HostError>>,
    member_lookups: AtomicUsize,
}

impl SimHost {
    pub fn new(profile: &'static Profile) -> Self {
        Self {
            profile,
            symbols: Symbols::for_profile(profile),
            world: Mutex::new(World {
                next_entity: 1,
                ..World::default()
            }),
            native: Mutex::new(NativeWorld::new(profile.nms, profile.features.modern_tag_names)),
            faults: Mutex::new(HashMap::new()),
            member_lookups: AtomicUsize::new(0),
        }
    }

    pub fn from_profile_name(name: &str) -> Option<Self> {
        profile(name).map(Self::new)
    }

    pub fn profile(&self) -> &'static Profile {
        self.profile
    }

    fn features(&self) -> Features {
        self.profile.features
    }

    // ── Setup ──────────────────────────────────────────────────────

    pub fn add_player(&self, health: f64) -> EntityId {
        let id = self.spawn(
            "EntityPlayer",
            Some(health),
            &[
                (Attribute::GenericMaxHealth, 20.0),
                (Attribute::GenericMovementSpeed, 0.1),
                (Attribute::GenericAttackDamage, 1.0),
            ],
        );
        self.world.lock().players.insert(
            id,
            Player {
                view: PlayerView::default(),
                pending: TitleDisplay::new("", ""),
            },
        );
        id
    }

    /// A non-player living entity.
    pub fn spawn_entity(&self) -> EntityId {
        self.spawn(
            "EntityZombie",
            Some(20.0),
            &[
                (Attribute::GenericMaxHealth, 20.0),
                (Attribute::GenericMovementSpeed, 0.23),
                (Attribute::GenericFollowRange, 35.0),
                (Attribute::ZombieSpawnReinforcements, 0.0),
            ],
        )
    }

    /// `health` is `None` for entities that are not living.
    fn spawn(&self, class: &'static str, health: Option<f64>, attributes: &[(Attribute, f64)]) -> EntityId {
        let id = {
            let mut world = self.world.lock();
            let id = EntityId(world.next_entity);
            world.next_entity += 1;
            if let Some(health) = health {
                world.health.insert(id, health);
                world.attributes.insert(id, attributes.iter().copied().collect());
            }
            id
        };
        self.native.lock().spawn_entity(id, class);
        id
    }

    pub fn place_block(&self, pos: BlockPos, material: &str) {
        self.world.lock().blocks.insert(
            pos,
            BlockState {
                material: material.to_string(),
                data: 0,
            },
        );
    }

    /// Make the next call named `op` fail with `err`.
    ///
    /// `op` is a trait method name (`send_title`, `invoke`, `lookup_member`,
    /// `find_type`, ...) or a packet channel name.
    pub fn fail_next(&self, op: &str, err: HostError) {
        self.faults.lock().insert(op.to_string(), err);
    }

    // ── Inspection ─────────────────────────────────────────────────

    pub fn view(&self, player: EntityId) -> PlayerView {
        self.world
            .lock()
            .players
            .get(&player)
            .map(|p| p.view.clone())
            .unwrap_or_default()
    }

    pub fn block(&self, pos: BlockPos) -> Option<BlockState> {
        self.world.lock().blocks.get(&pos).cloned()
    }

    /// Block carried by a spawned falling block entity.
    pub fn falling_block(&self, entity: EntityId) -> Option<BlockState> {
        self.world.lock().falling_blocks.get(&entity).cloned()
    }

    /// Loaded advancement JSON by key.
    pub fn advancement(&self, key: &str) -> Option<String> {
        self.world.lock().advancements.get(key).cloned()
    }

    /// How many slow member lookups the bridge has performed.
    pub fn member_lookups(&self) -> usize {
        self.member_lookups.load(Ordering::SeqCst)
    }

    pub fn live_native_objects(&self) -> usize {
        self.native.lock().live_objects()
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn fault(&self, op: &str) -> Result<(), HostError> {
        match self.faults.lock().remove(op) {
            Some(err) => {
                trace!(op, error = %err, "injected fault");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn gate(&self, present: bool, op: &str) -> Result<(), HostError> {
        self.fault(op)?;
        if present {
            Ok(())
        } else {
            Err(HostError::unsupported(op))
        }
    }

    fn with_player<T>(&self, player: EntityId, edit: impl FnOnce(&mut Player) -> T) -> Result<T, HostError> {
        let mut world = self.world.lock();
        let state = world
            .players
            .get_mut(&player)
            .ok_or_else(|| HostError::Failed(format!("no such player {}", player)))?;
        Ok(edit(state))
    }

    fn health_of(&self, entity: EntityId) -> Result<f64, HostError> {
        self.world
            .lock()
            .health
            .get(&entity)
            .copied()
            .ok_or_else(|| HostError::Failed(format!("no such entity {}", entity)))
    }

    fn with_attributes<T>(
        &self,
        entity: EntityId,
        edit: impl FnOnce(&mut BTreeMap<Attribute, f64>) -> Result<T, HostError>,
    ) -> Result<T, HostError> {
        let mut world = self.world.lock();
        let attributes = world
            .attributes
            .get_mut(&entity)
            .ok_or_else(|| HostError::Failed(format!("{} is not a living entity", entity)))?;
        edit(attributes)
    }

    fn spawn_falling(&self, pos: BlockPos, block: BlockState) -> EntityId {
        trace!(?pos, material = %block.material, data = block.data, "falling block");
        let id = self.spawn("EntityFallingBlock", None, &[]);
        self.world.lock().falling_blocks.insert(id, block);
        id
    }

    fn apply_title_packet(&self, player: EntityId, packet: TitlePacket) -> Result<(), HostError> {
        let action = TitleAction::try_from(packet.action)
            .map_err(|_| HostError::Failed(format!("unknown title action {}", packet.action)))?;
        self.with_player(player, |p| match action {
            TitleAction::Reset => {
                p.view.title = None;
                p.view.title_resets += 1;
                p.pending = TitleDisplay::new("", "");
            }
            TitleAction::Times => {
                p.pending = p.pending.clone().timed(packet.fade_in, packet.stay, packet.fade_out);
            }
            TitleAction::Title => {
                p.pending.title = component_text(&packet.component);
                p.view.title = Some(p.pending.clone());
            }
            TitleAction::Subtitle => {
                p.pending.subtitle = component_text(&packet.component);
                p.view.title = Some(p.pending.clone());
            }
        })
    }
}

fn legacy_material(type_id: u16) -> Result<String, HostError> {
    LEGACY_MATERIALS
        .iter()
        .find(|(_, id)| *id == type_id)
        .map(|(name, _)| name.to_string())
        .ok_or_else(|| HostError::Failed(format!("unknown type id {}", type_id)))
}

fn decode<M: Message + Default>(channel: &str, payload: &[u8]) -> Result<M, HostError> {
    M::decode(payload).map_err(|e| HostError::Failed(format!("malformed {} payload: {}", channel, e)))
}

// ---------------------------------------------------------------------------
// Introspection
// ---------------------------------------------------------------------------

impl Introspect for SimHost {
    fn version_string(&self) -> Result<String, HostError> {
        self.fault("version_string")?;
        Ok(self.profile.version.to_string())
    }

    fn find_type(&self, name: &str) -> Result<(), HostError> {
        self.fault("find_type")?;
        if self.symbols.has_type(name) {
            Ok(())
        } else {
            Err(HostError::MissingType(name.to_string()))
        }
    }

    fn find_method(&self, owner: &str, name: &str, params: &[&str]) -> Result<MethodSig, HostError> {
        self.fault("find_method")?;
        let returns = self
            .symbols
            .method(owner, name, params)
            .ok_or_else(|| HostError::MissingSymbol(format!("{}#{}({})", owner, name, params.join(", "))))?;
        Ok(MethodSig {
            owner: owner.to_string(),
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            returns: returns.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Stable surface
// ---------------------------------------------------------------------------

impl ServerApi for SimHost {
    fn send_message(&self, player: EntityId, text: &str) -> Result<(), HostError> {
        self.fault("send_message")?;
        self.with_player(player, |p| p.view.chat.push(text.to_string()))
    }

    fn send_title(&self, player: EntityId, title: &TitleDisplay) -> Result<(), HostError> {
        self.gate(self.features().timed_title_api, "send_title")?;
        self.with_player(player, |p| p.view.title = Some(title.clone()))
    }

    fn reset_title(&self, player: EntityId) -> Result<(), HostError> {
        self.gate(self.features().title_api, "reset_title")?;
        self.with_player(player, |p| {
            p.view.title = None;
            p.view.title_resets += 1;
        })
    }

    fn send_component(&self, player: EntityId, position: ChatPosition, json: &str) -> Result<(), HostError> {
        self.gate(self.features().chat_message_type, "send_component")?;
        let text = component_text(json);
        self.with_player(player, |p| match position {
            ChatPosition::ActionBar => p.view.action_bars.push(text),
            ChatPosition::Chat | ChatPosition::System => p.view.chat.push(text),
        })
    }

    fn set_player_list(&self, player: EntityId, header: &str, footer: &str) -> Result<(), HostError> {
        self.gate(self.features().player_list_api, "set_player_list")?;
        self.with_player(player, |p| {
            p.view.tab_list = Some((header.to_string(), footer.to_string()))
        })
    }

    fn show_boss_bar(&self, player: EntityId, bar: &BossBarDisplay) -> Result<(), HostError> {
        self.gate(self.features().boss_bar_api, "show_boss_bar")?;
        self.with_player(player, |p| p.view.boss_bar = Some(bar.clone()))
    }

    fn online_players_collection(&self) -> Result<Vec<EntityId>, HostError> {
        self.gate(self.features().players_collection, "online_players_collection")?;
        Ok(self.world.lock().players.keys().copied().collect())
    }

    fn online_players_array(&self) -> Result<Vec<EntityId>, HostError> {
        self.gate(!self.features().players_collection, "online_players_array")?;
        Ok(self.world.lock().players.keys().copied().collect())
    }

    fn health_double(&self, entity: EntityId) -> Result<f64, HostError> {
        self.gate(self.features().health_double, "health_double")?;
        self.health_of(entity)
    }

    fn health_int(&self, entity: EntityId) -> Result<i32, HostError> {
        self.gate(!self.features().health_double, "health_int")?;
        Ok(self.health_of(entity)? as i32)
    }

    fn block_type(&self, pos: BlockPos) -> Result<String, HostError> {
        self.fault("block_type")?;
        Ok(self
            .world
            .lock()
            .blocks
            .get(&pos)
            .map_or_else(|| "AIR".to_string(), |b| b.material.clone()))
    }

    fn set_block_data(&self, pos: BlockPos, material: &str, data: u8, _physics: bool) -> Result<(), HostError> {
        self.gate(self.features().rich_block_data, "set_block_data")?;
        self.world.lock().blocks.insert(
            pos,
            BlockState {
                material: material.to_string(),
                data,
            },
        );
        Ok(())
    }

    fn material_id(&self, material: &str) -> Result<u16, HostError> {
        self.gate(!self.features().rich_block_data, "material_id")?;
        LEGACY_MATERIALS
            .iter()
            .find(|(name, _)| *name == material)
            .map(|(_, id)| *id)
            .ok_or_else(|| HostError::Failed(format!("material {} has no legacy id", material)))
    }

    fn set_type_id_and_data(&self, pos: BlockPos, type_id: u16, data: u8, _physics: bool) -> Result<(), HostError> {
        self.gate(!self.features().rich_block_data, "set_type_id_and_data")?;
        let material = legacy_material(type_id)?;
        self.world.lock().blocks.insert(pos, BlockState { material, data });
        Ok(())
    }

    fn spawn_falling_block(&self, pos: BlockPos, material: &str, data: u8) -> Result<EntityId, HostError> {
        self.gate(self.features().rich_block_data, "spawn_falling_block")?;
        let block = BlockState {
            material: material.to_string(),
            data,
        };
        Ok(self.spawn_falling(pos, block))
    }

    fn spawn_falling_block_id(&self, pos: BlockPos, type_id: u16, data: u8) -> Result<EntityId, HostError> {
        self.gate(!self.features().rich_block_data, "spawn_falling_block_id")?;
        let material = legacy_material(type_id)?;
        Ok(self.spawn_falling(pos, BlockState { material, data }))
    }

    fn attribute_base(&self, entity: EntityId, attribute: Attribute) -> Result<Option<f64>, HostError> {
        self.gate(self.features().attributes, "attribute_base")?;
        self.with_attributes(entity, |attributes| Ok(attributes.get(&attribute).copied()))
    }

    fn set_attribute_base(&self, entity: EntityId, attribute: Attribute, value: f64) -> Result<(), HostError> {
        self.gate(self.features().attributes, "set_attribute_base")?;
        self.with_attributes(entity, |attributes| match attributes.get_mut(&attribute) {
            Some(base) => {
                *base = value;
                Ok(())
            }
            None => Err(HostError::Failed(format!("{} has no {} instance", entity, attribute))),
        })
    }

    fn max_health(&self, entity: EntityId) -> Result<f64, HostError> {
        self.fault("max_health")?;
        self.with_attributes(entity, |attributes| {
            Ok(attributes.get(&Attribute::GenericMaxHealth).copied().unwrap_or(20.0))
        })
    }

    fn set_max_health(&self, entity: EntityId, value: f64) -> Result<(), HostError> {
        self.fault("set_max_health")?;
        self.with_attributes(entity, |attributes| {
            attributes.insert(Attribute::GenericMaxHealth, value);
            Ok(())
        })
    }

    fn set_legacy_data(&self, pos: BlockPos, data: u8) -> Result<(), HostError> {
        self.gate(self.features().legacy_data_setter, "set_legacy_data")?;
        self.world
            .lock()
            .blocks
            .entry(pos)
            .or_insert_with(|| BlockState {
                material: "AIR".to_string(),
                data: 0,
            })
            .data = data;
        Ok(())
    }

    fn respawn(&self, player: EntityId) -> Result<(), HostError> {
        self.gate(self.features().spigot_respawn, "respawn")?;
        self.with_player(player, |p| p.view.respawns += 1)
    }

    fn load_advancement(&self, key: &str, json: &str) -> Result<(), HostError> {
        self.gate(self.features().advancements, "load_advancement")?;
        let mut world = self.world.lock();
        if world.advancements.contains_key(key) {
            return Err(HostError::Failed(format!("advancement {} already loaded", key)));
        }
        world.advancements.insert(key.to_string(), json.to_string());
        Ok(())
    }

    fn grant_advancement(&self, player: EntityId, key: &str) -> Result<(), HostError> {
        self.gate(self.features().advancements, "grant_advancement")?;
        if !self.world.lock().advancements.contains_key(key) {
            return Err(HostError::Failed(format!("advancement {} not loaded", key)));
        }
        self.with_player(player, |p| p.view.toasts.push(key.to_string()))
    }

    fn revoke_advancement(&self, player: EntityId, key: &str) -> Result<(), HostError> {
        self.gate(self.features().advancements, "revoke_advancement")?;
        self.with_player(player, |p| p.view.toasts.retain(|k| k != key))
    }

    fn remove_advancement(&self, key: &str) -> Result<(), HostError> {
        self.gate(self.features().advancements, "remove_advancement")?;
        self.world.lock().advancements.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Packets
// ---------------------------------------------------------------------------

impl PacketChannel for SimHost {
    fn send_packet(&self, player: EntityId, channel: &str, payload: &[u8]) -> Result<(), HostError> {
        self.fault(channel)?;
        let f = self.features();
        let present = match channel {
            CHANNEL_TITLE => f.title_packets,
            CHANNEL_CHAT => f.chat_packet_position,
            CHANNEL_TAB_LIST => f.tab_list_packets,
            CHANNEL_BOSS_ENTITY => f.boss_entity_packets,
            CHANNEL_CLIENT_COMMAND => true,
            _ => false,
        };
        if !present {
            return Err(HostError::MissingType(channel.to_string()));
        }
        trace!(%player, channel, bytes = payload.len(), "packet");

        match channel {
            CHANNEL_TITLE => self.apply_title_packet(player, decode(channel, payload)?),
            CHANNEL_CHAT => {
                let packet: ChatPacket = decode(channel, payload)?;
                let text = component_text(&packet.component);
                self.with_player(player, |p| {
                    if packet.position == ChatPosition::ActionBar.wire_id() {
                        p.view.action_bars.push(text);
                    } else {
                        p.view.chat.push(text);
                    }
                })
            }
            CHANNEL_TAB_LIST => {
                let packet: TabListPacket = decode(channel, payload)?;
                let header = component_text(&packet.header);
                let footer = packet.footer.as_deref().map(component_text).unwrap_or_default();
                self.with_player(player, |p| p.view.tab_list = Some((header, footer)))
            }
            CHANNEL_BOSS_ENTITY => {
                let packet: BossEntityPacket = decode(channel, payload)?;
                let bar = BossBarDisplay {
                    message: packet.custom_name,
                    progress: packet.health / BOSS_MAX_HEALTH,
                    color: Default::default(),
                    style: Default::default(),
                };
                self.with_player(player, |p| p.view.boss_bar = Some(bar))
            }
            _ => {
                let packet: ClientCommandPacket = decode(channel, payload)?;
                if packet.command == ClientCommand::PerformRespawn as i32 {
                    self.with_player(player, |p| p.view.respawns += 1)
                } else {
                    Ok(())
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Native objects
// ---------------------------------------------------------------------------

impl NativeAccess for SimHost {
    fn native_handle(&self, object: &StableObject) -> Result<(ShapeId, NativeRef), HostError> {
        self.fault("native_handle")?;
        self.native.lock().native_handle(object)
    }

    fn materialize(&self, native: NativeRef) -> Result<StableObject, HostError> {
        self.fault("materialize")?;
        self.native.lock().materialize(native)
    }

    fn instantiate(&self, shape: &str) -> Result<(ShapeId, NativeRef), HostError> {
        self.fault("instantiate")?;
        self.native.lock().instantiate(shape)
    }

    fn shape_of(&self, native: NativeRef) -> Result<ShapeId, HostError> {
        self.fault("shape_of")?;
        self.native.lock().shape_of(native)
    }

    fn lookup_member(&self, shape: &ShapeId, name: &str, arity: usize) -> Result<MemberId, HostError> {
        self.member_lookups.fetch_add(1, Ordering::SeqCst);
        self.fault("lookup_member")?;
        self.native.lock().lookup_member(shape, name, arity)
    }

    fn invoke(&self, target: NativeRef, member: MemberId, args: &[NativeValue]) -> Result<NativeValue, HostError> {
        self.fault("invoke")?;
        self.native.lock().invoke(target, member, args)
    }

    fn release(&self, native: NativeRef) {
        self.native.lock().release(native);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_material_ids_round_trip() {
        let host = SimHost::new(&profile::V1_8);
        let pos = BlockPos::new(0, 64, 0);
        let id = host.material_id("WOOL").unwrap();
        host.set_type_id_and_data(pos, id, 14, true).unwrap();
        assert_eq!(
            host.block(pos),
            Some(BlockState {
                material: "WOOL".to_string(),
                data: 14
            })
        );
    }

    #[test]
    fn release_frees_owned_objects_once() {
        let host = SimHost::new(&profile::V1_16);
        let before = host.live_native_objects();
        let (shape, list) = host.instantiate("NBTTagList").unwrap();
        let (_, element) = host.instantiate("NBTTagCompound").unwrap();
        let add = host.lookup_member(&shape, "add", 1).unwrap();
        host.invoke(list, add, &[NativeValue::Ref(element)]).unwrap();
        assert_eq!(host.live_native_objects(), before + 2);

        host.release(list);
        host.release(list);
        host.release(element);
        assert_eq!(host.live_native_objects(), before);
    }

    #[test]
    fn injected_fault_fires_once() {
        let host = SimHost::new(&profile::V1_16);
        let player = host.add_player(20.0);
        host.fail_next("send_message", HostError::Failed("boom".to_string()));
        assert!(host.send_message(player, "a").is_err());
        assert!(host.send_message(player, "b").is_ok());
        assert_eq!(host.view(player).chat, vec!["b".to_string()]);
    }
}
