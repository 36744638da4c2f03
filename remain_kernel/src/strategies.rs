/// Remain Kernel — Default Strategy Table
///
/// ALL per-operation implementation paths live here, ordered from the
/// modern direct API down to the legacy packet or plain-chat fallback.
/// Bodies fail before any externally visible effect whenever they can.

use std::collections::BTreeMap;

use prost::Message;
use serde_json::json;

use crate::capability::{BlockDataModel, CapabilityFlag, CapabilityValue, HealthAccessor, PlayersAccessor};
use crate::host::{Attribute, BossBarDisplay, ChatPosition, EntityId, TitleDisplay};
use crate::operation::{Operation, OperationKind, Outcome};
use crate::packets::{
    BossEntityPacket, ChatPacket, ClientCommand, ClientCommandPacket, TabListPacket, TitleAction,
    TitlePacket, BOSS_MAX_HEALTH, CHANNEL_BOSS_ENTITY, CHANNEL_CHAT, CHANNEL_CLIENT_COMMAND,
    CHANNEL_TAB_LIST, CHANNEL_TITLE,
};
use crate::strategy::{mismatch, Requirement, Strategy, StrategyContext, StrategyError};
use crate::text::{colorize, component_json};

pub type StrategyTable = BTreeMap<OperationKind, Vec<Strategy>>;

/// Entity id of the invisible entity that carries a legacy boss bar.
pub const BOSS_ENTITY_ID: i32 = 1_234_567;

/// Item shown on toast notifications unless the caller picks another.
pub const DEFAULT_TOAST_ICON: &str = "book";

const RICH: CapabilityValue = CapabilityValue::BlockData(BlockDataModel::Rich);
const LEGACY_PAIR: CapabilityValue = CapabilityValue::BlockData(BlockDataModel::LegacyPair);

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Every operation kind mapped to its strategies, most preferred first.
pub fn default_table() -> StrategyTable {
    use CapabilityFlag as F;

    let mut table = StrategyTable::new();

    table.insert(
        OperationKind::SendTitle,
        vec![
            Strategy::new("title_native", &[Requirement::supported(F::TimedTitleApi)], title_native),
            Strategy::new("title_packets", &[Requirement::supported(F::TitlePackets)], title_packets),
            Strategy::new("title_chat", &[], title_chat),
        ],
    );
    table.insert(
        OperationKind::ResetTitle,
        vec![
            Strategy::new("reset_title_native", &[Requirement::supported(F::TitleApi)], reset_title_native),
            Strategy::new("reset_title_packet", &[Requirement::supported(F::TitlePackets)], reset_title_packet),
        ],
    );
    table.insert(
        OperationKind::SendActionBar,
        vec![
            Strategy::new(
                "action_bar_message_type",
                &[Requirement::supported(F::ChatMessageTypeApi)],
                action_bar_message_type,
            ),
            Strategy::new(
                "action_bar_packet",
                &[Requirement::supported(F::ChatPacketPosition)],
                action_bar_packet,
            ),
            Strategy::new("action_bar_chat", &[], action_bar_chat),
        ],
    );
    table.insert(
        OperationKind::SendTablist,
        vec![
            Strategy::new("tablist_native", &[Requirement::supported(F::PlayerListHeaderApi)], tablist_native),
            Strategy::new("tablist_packet", &[Requirement::supported(F::TabListPackets)], tablist_packet),
        ],
    );
    table.insert(
        OperationKind::SendBossBar,
        vec![
            Strategy::new("boss_bar_native", &[Requirement::supported(F::BossBarApi)], boss_bar_native),
            Strategy::new("boss_bar_entity", &[Requirement::supported(F::BossEntityPackets)], boss_bar_entity),
        ],
    );
    table.insert(
        OperationKind::SetBlockTypeAndData,
        vec![
            Strategy::new("block_type_rich", &[Requirement::equals(F::BlockDataModel, RICH)], block_type_rich),
            Strategy::new(
                "block_type_legacy",
                &[Requirement::equals(F::BlockDataModel, LEGACY_PAIR)],
                block_type_legacy,
            ),
        ],
    );
    table.insert(
        OperationKind::SetBlockData,
        vec![
            Strategy::new("block_data_legacy", &[Requirement::supported(F::LegacyDataSetter)], block_data_legacy),
            Strategy::new("block_data_rich", &[Requirement::equals(F::BlockDataModel, RICH)], block_data_rich),
        ],
    );
    table.insert(
        OperationKind::SpawnFallingBlock,
        vec![
            Strategy::new(
                "falling_block_rich",
                &[Requirement::equals(F::BlockDataModel, RICH)],
                falling_block_rich,
            ),
            Strategy::new(
                "falling_block_legacy",
                &[Requirement::equals(F::BlockDataModel, LEGACY_PAIR)],
                falling_block_legacy,
            ),
        ],
    );
    table.insert(
        OperationKind::GetHealth,
        vec![
            Strategy::new(
                "health_double",
                &[Requirement::equals(F::HealthAccessor, CapabilityValue::Health(HealthAccessor::Double))],
                health_double,
            ),
            Strategy::new(
                "health_int",
                &[Requirement::equals(F::HealthAccessor, CapabilityValue::Health(HealthAccessor::Int))],
                health_int,
            ),
        ],
    );
    table.insert(
        OperationKind::GetAttribute,
        vec![
            Strategy::new("attribute_native", &[Requirement::supported(F::AttributeApi)], attribute_native),
            Strategy::new("attribute_max_health", &[], attribute_max_health),
        ],
    );
    table.insert(
        OperationKind::SetAttribute,
        vec![
            Strategy::new(
                "set_attribute_native",
                &[Requirement::supported(F::AttributeApi)],
                set_attribute_native,
            ),
            Strategy::new("set_attribute_max_health", &[], set_attribute_max_health),
        ],
    );
    table.insert(
        OperationKind::OnlinePlayers,
        vec![
            Strategy::new(
                "players_collection",
                &[Requirement::equals(F::PlayersAccessor, CapabilityValue::Players(PlayersAccessor::Collection))],
                players_collection,
            ),
            Strategy::new(
                "players_array",
                &[Requirement::equals(F::PlayersAccessor, CapabilityValue::Players(PlayersAccessor::Array))],
                players_array,
            ),
        ],
    );
    table.insert(
        OperationKind::Respawn,
        vec![
            Strategy::new("respawn_spigot", &[Requirement::supported(F::SpigotRespawn)], respawn_spigot),
            Strategy::new("respawn_packet", &[], respawn_packet),
        ],
    );
    table.insert(
        OperationKind::SendToast,
        vec![Strategy::new("toast_advancement", &[Requirement::supported(F::Advancements)], toast_advancement)],
    );

    table
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn send<M: Message>(ctx: &StrategyContext<'_>, player: EntityId, channel: &str, packet: &M) -> Result<(), StrategyError> {
    let mut buf = Vec::with_capacity(packet.encoded_len());
    packet.encode(&mut buf)?;
    ctx.host.send_packet(player, channel, &buf)?;
    Ok(())
}

fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Advancement definition that shows `title` as a toast and nothing else.
pub fn toast_json(title: &str, icon: &str) -> String {
    json!({
        "criteria": {
            "impossible": { "trigger": "minecraft:impossible" }
        },
        "display": {
            "icon": { "item": icon },
            "title": title,
            "description": "",
            "background": "minecraft:textures/gui/advancements/backgrounds/adventure.png",
            "frame": "goal",
            "announce_to_chat": false,
            "show_toast": true,
            "hidden": true
        }
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Titles
// ---------------------------------------------------------------------------

fn title_native(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendTitle { player, title, force_packets } = op else {
        return Err(mismatch("title_native", op));
    };
    if *force_packets {
        return Err(StrategyError::Recoverable("packet titles forced".to_string()));
    }
    let colored = TitleDisplay {
        title: colorize(&title.title),
        subtitle: colorize(&title.subtitle),
        ..title.clone()
    };
    ctx.host.send_title(*player, &colored)?;
    Ok(Outcome::Done)
}

fn title_packets(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendTitle { player, title, .. } = op else {
        return Err(mismatch("title_packets", op));
    };
    send(ctx, *player, CHANNEL_TITLE, &TitlePacket::reset())?;
    send(ctx, *player, CHANNEL_TITLE, &TitlePacket::times(title.fade_in, title.stay, title.fade_out))?;
    send(
        ctx,
        *player,
        CHANNEL_TITLE,
        &TitlePacket::text(TitleAction::Title, component_json(&title.title)),
    )?;
    send(
        ctx,
        *player,
        CHANNEL_TITLE,
        &TitlePacket::text(TitleAction::Subtitle, component_json(&title.subtitle)),
    )?;
    Ok(Outcome::Done)
}

fn title_chat(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendTitle { player, title, .. } = op else {
        return Err(mismatch("title_chat", op));
    };
    ctx.host.send_message(*player, &colorize(&title.title))?;
    ctx.host.send_message(*player, &colorize(&title.subtitle))?;
    Ok(Outcome::Done)
}

fn reset_title_native(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::ResetTitle { player } = op else {
        return Err(mismatch("reset_title_native", op));
    };
    ctx.host.reset_title(*player)?;
    Ok(Outcome::Done)
}

fn reset_title_packet(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::ResetTitle { player } = op else {
        return Err(mismatch("reset_title_packet", op));
    };
    send(ctx, *player, CHANNEL_TITLE, &TitlePacket::reset())?;
    Ok(Outcome::Done)
}

// ---------------------------------------------------------------------------
// Action bar, tab list, boss bar
// ---------------------------------------------------------------------------

fn action_bar_message_type(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendActionBar { player, text } = op else {
        return Err(mismatch("action_bar_message_type", op));
    };
    ctx.host
        .send_component(*player, ChatPosition::ActionBar, &component_json(text))?;
    Ok(Outcome::Done)
}

fn action_bar_packet(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendActionBar { player, text } = op else {
        return Err(mismatch("action_bar_packet", op));
    };
    let packet = ChatPacket {
        component: component_json(text),
        position: ChatPosition::ActionBar.wire_id(),
    };
    send(ctx, *player, CHANNEL_CHAT, &packet)?;
    Ok(Outcome::Done)
}

fn action_bar_chat(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendActionBar { player, text } = op else {
        return Err(mismatch("action_bar_chat", op));
    };
    ctx.host.send_message(*player, &colorize(text))?;
    Ok(Outcome::Done)
}

fn tablist_native(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendTablist { player, header, footer } = op else {
        return Err(mismatch("tablist_native", op));
    };
    let footer = footer.as_deref().map(colorize).unwrap_or_default();
    ctx.host.set_player_list(*player, &colorize(header), &footer)?;
    Ok(Outcome::Done)
}

fn tablist_packet(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendTablist { player, header, footer } = op else {
        return Err(mismatch("tablist_packet", op));
    };
    let packet = TabListPacket {
        header: component_json(header),
        footer: footer.as_deref().map(component_json),
    };
    send(ctx, *player, CHANNEL_TAB_LIST, &packet)?;
    Ok(Outcome::Done)
}

fn boss_bar_native(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendBossBar { player, bar } = op else {
        return Err(mismatch("boss_bar_native", op));
    };
    let bar = BossBarDisplay {
        message: colorize(&bar.message),
        progress: clamp_progress(bar.progress),
        ..bar.clone()
    };
    ctx.host.show_boss_bar(*player, &bar)?;
    Ok(Outcome::Done)
}

fn boss_bar_entity(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendBossBar { player, bar } = op else {
        return Err(mismatch("boss_bar_entity", op));
    };
    // Colour and style have no legacy equivalent.
    let packet = BossEntityPacket {
        entity_id: BOSS_ENTITY_ID,
        custom_name: colorize(&bar.message),
        health: clamp_progress(bar.progress) * BOSS_MAX_HEALTH,
    };
    send(ctx, *player, CHANNEL_BOSS_ENTITY, &packet)?;
    Ok(Outcome::Done)
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

fn block_type_rich(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SetBlockTypeAndData { pos, material, data, physics } = op else {
        return Err(mismatch("block_type_rich", op));
    };
    ctx.host.set_block_data(*pos, material, *data, *physics)?;
    Ok(Outcome::Done)
}

fn block_type_legacy(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SetBlockTypeAndData { pos, material, data, physics } = op else {
        return Err(mismatch("block_type_legacy", op));
    };
    let type_id = ctx.host.material_id(material)?;
    ctx.host.set_type_id_and_data(*pos, type_id, *data, *physics)?;
    Ok(Outcome::Done)
}

fn block_data_legacy(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SetBlockData { pos, data } = op else {
        return Err(mismatch("block_data_legacy", op));
    };
    ctx.host.set_legacy_data(*pos, *data)?;
    Ok(Outcome::Done)
}

fn block_data_rich(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SetBlockData { pos, data } = op else {
        return Err(mismatch("block_data_rich", op));
    };
    let material = ctx.host.block_type(*pos)?;
    ctx.host.set_block_data(*pos, &material, *data, true)?;
    Ok(Outcome::Done)
}

fn falling_block_rich(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SpawnFallingBlock { pos, material, data } = op else {
        return Err(mismatch("falling_block_rich", op));
    };
    Ok(Outcome::Spawned(ctx.host.spawn_falling_block(*pos, material, *data)?))
}

fn falling_block_legacy(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SpawnFallingBlock { pos, material, data } = op else {
        return Err(mismatch("falling_block_legacy", op));
    };
    let type_id = ctx.host.material_id(material)?;
    Ok(Outcome::Spawned(ctx.host.spawn_falling_block_id(*pos, type_id, *data)?))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn health_double(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::GetHealth { entity } = op else {
        return Err(mismatch("health_double", op));
    };
    let health = ctx.host.health_double(*entity)?;
    // Truncates toward zero, saturating at the i32 range.
    Ok(Outcome::Health(health as i32))
}

fn health_int(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::GetHealth { entity } = op else {
        return Err(mismatch("health_int", op));
    };
    Ok(Outcome::Health(ctx.host.health_int(*entity)?))
}

fn attribute_native(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::GetAttribute { entity, attribute } = op else {
        return Err(mismatch("attribute_native", op));
    };
    Ok(Outcome::Attribute(ctx.host.attribute_base(*entity, *attribute)?))
}

/// Hosts without attribute instances still expose max health directly.
fn attribute_max_health(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::GetAttribute { entity, attribute } = op else {
        return Err(mismatch("attribute_max_health", op));
    };
    only_max_health(*attribute)?;
    Ok(Outcome::Attribute(Some(ctx.host.max_health(*entity)?)))
}

fn set_attribute_native(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SetAttribute { entity, attribute, value } = op else {
        return Err(mismatch("set_attribute_native", op));
    };
    ctx.host.set_attribute_base(*entity, *attribute, *value)?;
    Ok(Outcome::Done)
}

fn set_attribute_max_health(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SetAttribute { entity, attribute, value } = op else {
        return Err(mismatch("set_attribute_max_health", op));
    };
    only_max_health(*attribute)?;
    ctx.host.set_max_health(*entity, *value)?;
    Ok(Outcome::Done)
}

fn only_max_health(attribute: Attribute) -> Result<(), StrategyError> {
    if attribute == Attribute::GenericMaxHealth {
        Ok(())
    } else {
        Err(StrategyError::Recoverable(format!("{} has no legacy accessor", attribute)))
    }
}

fn players_collection(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::OnlinePlayers = op else {
        return Err(mismatch("players_collection", op));
    };
    Ok(Outcome::Players(ctx.host.online_players_collection()?))
}

fn players_array(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::OnlinePlayers = op else {
        return Err(mismatch("players_array", op));
    };
    Ok(Outcome::Players(ctx.host.online_players_array()?))
}

// ---------------------------------------------------------------------------
// Respawn and toasts
// ---------------------------------------------------------------------------

fn respawn_spigot(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::Respawn { player } = op else {
        return Err(mismatch("respawn_spigot", op));
    };
    ctx.host.respawn(*player)?;
    Ok(Outcome::Done)
}

fn respawn_packet(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::Respawn { player } = op else {
        return Err(mismatch("respawn_packet", op));
    };
    let packet = ClientCommandPacket {
        command: ClientCommand::PerformRespawn as i32,
    };
    send(ctx, *player, CHANNEL_CLIENT_COMMAND, &packet)?;
    Ok(Outcome::Done)
}

fn toast_advancement(ctx: &StrategyContext<'_>, op: &Operation) -> Result<Outcome, StrategyError> {
    let Operation::SendToast { player, key, message, icon } = op else {
        return Err(mismatch("toast_advancement", op));
    };
    let title = colorize(message);
    if title.is_empty() {
        return Ok(Outcome::Skipped);
    }
    ctx.host.load_advancement(key, &toast_json(&title, icon))?;
    ctx.host.grant_advancement(*player, key)?;
    Ok(Outcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_at_least_one_strategy() {
        let table = default_table();
        for kind in OperationKind::ALL {
            assert!(
                table.get(&kind).map_or(false, |s| !s.is_empty()),
                "{} has no strategies",
                kind
            );
        }
    }

    #[test]
    fn toast_json_shape() {
        let value: serde_json::Value = serde_json::from_str(&toast_json("Hi", "book")).unwrap();
        assert_eq!(value["display"]["title"], "Hi");
        assert_eq!(value["display"]["icon"]["item"], "book");
        assert_eq!(value["criteria"]["impossible"]["trigger"], "minecraft:impossible");
    }
}
