//! Facade tests: one simulated host per profile, operations observed
//! through what the host recorded.

use std::sync::Arc;

use remain_kernel::host::{Attribute, BarColor, BarStyle, BlockPos, BossBarDisplay, HostError, ItemStack, TitleDisplay};
use remain_kernel::{Operation, OperationKind, RemainError};
use remain_runtime::sim::{profile, BlockState, SimHost};
use remain_runtime::{Remain, RemainConfig};

fn remain_with(name: &str, config: RemainConfig) -> Remain<SimHost> {
    let profile = profile::profile(name).expect("known profile");
    Remain::bootstrap(Arc::new(SimHost::new(profile)), config).expect("bootstrap")
}

fn remain_on(name: &str) -> Remain<SimHost> {
    remain_with(name, RemainConfig::default())
}

// ─────────────────────────────────────────────────────────────
// Test 1: hosts below baseline refuse to start
// ─────────────────────────────────────────────────────────────

#[test]
fn ancient_host_is_fatal() {
    let host = Arc::new(SimHost::new(&profile::ANCIENT_1_2));
    match Remain::bootstrap(host, RemainConfig::default()) {
        Err(RemainError::ProbeFatal { probe, reason }) => {
            assert_eq!(probe, "version");
            assert!(reason.contains("1.3.2"), "{}", reason);
        }
        Err(other) => panic!("expected ProbeFatal, got {:?}", other),
        Ok(_) => panic!("ancient host must not bootstrap"),
    }
}

// ─────────────────────────────────────────────────────────────
// Test 2: titles look the same on every path
// ─────────────────────────────────────────────────────────────

#[test]
fn legacy_title_matches_native_title() {
    let title = TitleDisplay::new("&aWelcome", "&7to the server").timed(5, 40, 15);

    let modern = remain_on("1.16");
    let p_modern = modern.host().add_player(20.0);
    modern.send_title(p_modern, title.clone()).expect("native title");

    let legacy = remain_on("1.8");
    assert_eq!(legacy.engine().resolve(OperationKind::SendTitle), Some("title_packets"));
    let p_legacy = legacy.host().add_player(20.0);
    legacy.send_title(p_legacy, title).expect("packet title");

    let shown = modern.host().view(p_modern).title.expect("modern title shown");
    assert_eq!(shown.title, "\u{00A7}aWelcome");
    assert_eq!((shown.fade_in, shown.stay, shown.fade_out), (5, 40, 15));
    assert_eq!(legacy.host().view(p_legacy).title, Some(shown));
}

#[test]
fn configured_packet_titles_skip_native_api() {
    let config = RemainConfig {
        force_packet_titles: true,
        ..RemainConfig::default()
    };
    let remain = remain_with("1.12", config);
    let player = remain.host().add_player(20.0);

    remain
        .send_title(player, TitleDisplay::new("Boss", "incoming"))
        .expect("title");

    let view = remain.host().view(player);
    assert_eq!(view.title_resets, 1, "packet path starts with a reset");
    assert_eq!(view.title.map(|t| t.subtitle), Some("incoming".to_string()));

    remain.reset_title(player).expect("reset");
    assert_eq!(remain.host().view(player).title, None);
}

#[test]
fn legacy_1_7_titles_fall_back_to_chat() {
    let remain = remain_on("legacy-1.7");
    let player = remain.host().add_player(20.0);

    remain
        .send_title(player, TitleDisplay::new("&6Gold", "rush"))
        .expect("chat fallback");

    let view = remain.host().view(player);
    assert_eq!(view.title, None);
    assert_eq!(view.chat, vec!["\u{00A7}6Gold".to_string(), "rush".to_string()]);
}

// ─────────────────────────────────────────────────────────────
// Test 3: action bars, tab lists, boss bars
// ─────────────────────────────────────────────────────────────

#[test]
fn action_bar_uses_best_available_path() {
    for (name, expect_bar) in [("1.16", true), ("1.8", true), ("legacy-1.7", false)] {
        let remain = remain_on(name);
        let player = remain.host().add_player(20.0);
        remain.send_action_bar(player, "&cLow health").expect("action bar");

        let view = remain.host().view(player);
        let expected = vec!["\u{00A7}cLow health".to_string()];
        if expect_bar {
            assert_eq!(view.action_bars, expected, "{}", name);
        } else {
            assert_eq!(view.chat, expected, "{}: plain chat fallback", name);
        }
    }
}

#[test]
fn tablist_is_unsupported_before_1_8() {
    let remain = remain_on("1.8");
    let player = remain.host().add_player(20.0);
    remain.send_tablist(player, "&lHeader", None).expect("tab list packet");
    assert_eq!(
        remain.host().view(player).tab_list,
        Some(("\u{00A7}lHeader".to_string(), String::new()))
    );

    let old = remain_on("legacy-1.7");
    let player = old.host().add_player(20.0);
    let err = old.send_tablist(player, "h", Some("f")).unwrap_err();
    assert_eq!(err.to_string(), "send_tablist is not supported on host 1.7.10");
}

#[test]
fn boss_bar_entity_encodes_progress_as_health() {
    let remain = remain_on("1.8");
    let player = remain.host().add_player(20.0);
    remain.send_boss_bar(player, "&5Wither", 0.5).expect("boss entity");

    let bar = remain.host().view(player).boss_bar.expect("bar shown");
    assert_eq!(bar.message, "\u{00A7}5Wither");
    assert!((bar.progress - 0.5).abs() < 1e-6);

    let modern = remain_on("1.16");
    let player = modern.host().add_player(20.0);
    let styled = BossBarDisplay {
        message: "Raid".to_string(),
        progress: 3.0,
        color: BarColor::Red,
        style: BarStyle::Segmented10,
    };
    modern.send_boss_bar_styled(player, styled).expect("native bar");
    let bar = modern.host().view(player).boss_bar.expect("bar shown");
    assert_eq!(bar.progress, 1.0, "progress is clamped");
    assert_eq!(bar.color, BarColor::Red);
}

// ─────────────────────────────────────────────────────────────
// Test 4: blocks on both data models
// ─────────────────────────────────────────────────────────────

#[test]
fn block_writes_land_on_either_model() {
    let pos = BlockPos::new(4, 70, -2);
    for name in ["1.8", "1.16"] {
        let remain = remain_on(name);
        remain.set_block_type_and_data(pos, "WOOL", 14, false).expect("type");
        remain.set_block_data(pos, 3).expect("data");
        assert_eq!(
            remain.host().block(pos),
            Some(BlockState {
                material: "WOOL".to_string(),
                data: 3
            }),
            "{}",
            name
        );
    }
}

#[test]
fn unknown_legacy_material_is_a_host_failure() {
    let remain = remain_on("1.8");
    let err = remain
        .set_block_type_and_data(BlockPos::new(0, 0, 0), "CHERRY_LOG", 0, true)
        .unwrap_err();
    assert!(matches!(err, RemainError::Host(HostError::Failed(_))), "{:?}", err);
}

// ─────────────────────────────────────────────────────────────
// Test 5: queries and respawn
// ─────────────────────────────────────────────────────────────

#[test]
fn health_and_players_across_accessors() {
    for name in ["legacy-1.7", "1.16"] {
        let remain = remain_on(name);
        let a = remain.host().add_player(19.75);
        let b = remain.host().add_player(4.0);

        assert_eq!(remain.health(a).expect("health"), 19, "{}", name);
        assert_eq!(remain.online_players().expect("players"), vec![a, b], "{}", name);
    }
}

#[test]
fn respawn_falls_back_to_client_command() {
    let remain = remain_on("1.16");
    let player = remain.host().add_player(0.0);

    remain
        .host()
        .fail_next("respawn", HostError::UnsupportedOperation("respawn".to_string()));
    let dispatched = remain.execute(&Operation::Respawn { player }).expect("respawn");
    assert_eq!(dispatched.strategy, "respawn_packet");

    remain.respawn(player).expect("spigot respawn");
    assert_eq!(remain.host().view(player).respawns, 2);
}

// ─────────────────────────────────────────────────────────────
// Test 6: toasts
// ─────────────────────────────────────────────────────────────

#[test]
fn toast_is_granted_then_cleared() {
    let remain = remain_on("1.12");
    let player = remain.host().add_player(20.0);

    let key = remain
        .send_toast(player, "&eQuest complete", "DIAMOND")
        .expect("toast")
        .expect("non-empty toast is sent");
    assert!(key.starts_with("remain:toast_"));
    assert_eq!(remain.host().view(player).toasts, vec![key.clone()]);
    let json = remain.host().advancement(&key).expect("advancement loaded");
    assert!(json.contains("Quest complete"));

    remain.clear_toast(player, &key).expect("clear");
    assert!(remain.host().view(player).toasts.is_empty());
    assert_eq!(remain.host().advancement(&key), None);

    assert_eq!(remain.send_toast(player, "", "DIAMOND").expect("empty"), None);
}

#[test]
fn toast_needs_advancements() {
    let remain = remain_on("1.8");
    let player = remain.host().add_player(20.0);
    assert!(matches!(
        remain.send_toast(player, "hi", "STONE"),
        Err(RemainError::Unsupported {
            operation: OperationKind::SendToast,
            ..
        })
    ));
    assert!(remain.clear_toast(player, "remain:toast_0").is_err());
}

// ─────────────────────────────────────────────────────────────
// Test 7: item similarity
// ─────────────────────────────────────────────────────────────

#[test]
fn similarity_checks_name_and_namespaced_tags() {
    let remain = remain_with(
        "1.16",
        RemainConfig {
            namespace: "Quests".to_string(),
            ..RemainConfig::default()
        },
    );
    let plain = ItemStack::new("PAPER", 1).with_display_name("\u{00A7}aScroll");
    let recolored = ItemStack::new("PAPER", 3).with_display_name("\u{00A7}bSCROLL");
    assert!(remain.is_similar(&plain, &recolored));
    assert!(!remain.is_similar(&plain, &ItemStack::new("BOOK", 1).with_display_name("\u{00A7}aScroll")));

    let tag = |item: &ItemStack, value: &str| {
        let nbt = remain.nbt_item(item);
        nbt.set_string("Quests_Item", value);
        nbt.item()
    };
    let tagged = tag(&plain, "scroll_of_fire");
    assert!(!remain.is_similar(&plain, &tagged), "one side untagged");
    assert!(remain.is_similar(&tagged, &tag(&recolored, "scroll_of_fire")));
    assert!(!remain.is_similar(&tagged, &tag(&recolored, "scroll_of_ice")));
}

#[test]
fn similarity_checks_lore_meta_and_raw_ampersands() {
    let remain = remain_on("1.16");
    let named = ItemStack::new("PAPER", 1).with_display_name("Scroll");

    let lored = named.clone().with_lore(&["Ancient"]);
    assert!(!remain.is_similar(&named, &lored), "lore differs");
    assert!(remain.is_similar(&lored, &named.clone().with_lore(&["Ancient"])));
    assert!(!remain.is_similar(&lored, &named.clone().with_lore(&["Modern"])));

    let bare = ItemStack::new("PAPER", 1);
    assert!(!remain.is_similar(&bare, &named), "one side has metadata");
    assert!(remain.is_similar(&bare, &ItemStack::new("PAPER", 1).with_display_name("")));

    let raw = ItemStack::new("PAPER", 1).with_display_name("R&aD");
    assert!(!remain.is_similar(&raw, &ItemStack::new("PAPER", 1).with_display_name("RD")));
    assert!(remain.is_similar(&raw, &ItemStack::new("PAPER", 1).with_display_name("\u{00A7}cr&ad")));
}

#[test]
fn legacy_similarity_compares_data_except_for_bows() {
    let legacy = remain_on("1.8");
    let red = ItemStack::new("WOOL", 1).with_data(14);
    let blue = ItemStack::new("WOOL", 1).with_data(11);
    assert!(!legacy.is_similar(&red, &blue));
    assert!(legacy.is_similar(&red, &ItemStack::new("WOOL", 2).with_data(14)));

    let fresh_bow = ItemStack::new("BOW", 1);
    let worn_bow = ItemStack::new("BOW", 1).with_data(40);
    assert!(legacy.is_similar(&fresh_bow, &worn_bow), "bow durability is ignored");

    let modern = remain_on("1.16");
    assert!(modern.is_similar(&red, &blue), "no data values after the flattening");
}

// ─────────────────────────────────────────────────────────────
// Test 7b: attributes and falling blocks
// ─────────────────────────────────────────────────────────────

#[test]
fn attributes_use_the_native_api_when_present() {
    let remain = remain_on("1.16");
    let zombie = remain.host().spawn_entity();
    assert_eq!(
        remain.engine().resolve(OperationKind::GetAttribute),
        Some("attribute_native")
    );

    assert_eq!(remain.attribute(zombie, Attribute::GenericMaxHealth).expect("get"), Some(20.0));
    remain
        .set_attribute(zombie, Attribute::GenericMaxHealth, 30.0)
        .expect("set");
    assert_eq!(remain.attribute(zombie, Attribute::GenericMaxHealth).expect("get"), Some(30.0));
    assert_eq!(remain.attribute(zombie, Attribute::HorseJumpStrength).expect("get"), None);
    assert!(remain
        .set_attribute(zombie, Attribute::HorseJumpStrength, 1.0)
        .is_err());
}

#[test]
fn legacy_attributes_reach_max_health_only() {
    let remain = remain_on("1.8");
    let player = remain.host().add_player(20.0);

    remain
        .set_attribute(player, Attribute::GenericMaxHealth, 40.0)
        .expect("legacy max health");
    assert_eq!(remain.attribute(player, Attribute::GenericMaxHealth).expect("get"), Some(40.0));

    assert!(matches!(
        remain.attribute(player, Attribute::GenericArmor),
        Err(RemainError::Unsupported {
            operation: OperationKind::GetAttribute,
            ..
        })
    ));
    assert!(matches!(
        remain.set_attribute(player, Attribute::GenericArmor, 2.0),
        Err(RemainError::Unsupported {
            operation: OperationKind::SetAttribute,
            ..
        })
    ));
}

#[test]
fn falling_blocks_spawn_on_either_model() {
    let pos = BlockPos::new(0, 80, 0);
    for (name, strategy) in [("1.16", "falling_block_rich"), ("1.8", "falling_block_legacy")] {
        let remain = remain_on(name);
        assert_eq!(
            remain.engine().resolve(OperationKind::SpawnFallingBlock),
            Some(strategy),
            "{}",
            name
        );
        let entity = remain.spawn_falling_block(pos, "WOOL", 5).expect("spawn");
        assert_eq!(
            remain.host().falling_block(entity),
            Some(BlockState {
                material: "WOOL".to_string(),
                data: 5
            }),
            "{}",
            name
        );
    }

    let legacy = remain_on("1.8");
    assert!(legacy.spawn_falling_block(pos, "CHERRY_LOG", 0).is_err());
}

// ─────────────────────────────────────────────────────────────
// Test 8: configuration
// ─────────────────────────────────────────────────────────────

#[test]
fn config_loads_and_overrides() {
    let config = RemainConfig::from_json(r#"{ "namespace": "MyPlugin", "force_packet_titles": true }"#)
        .expect("valid config");
    assert_eq!(config.namespace, "MyPlugin");
    assert!(config.force_packet_titles);
    assert!(!config.debug);

    let config = config
        .with_overrides(|name| match name {
            "REMAIN_DEBUG" => Some("yes".to_string()),
            _ => None,
        })
        .expect("overrides");
    assert!(config.debug);
    assert_eq!(config.namespace().expect("namespace").key("Item"), "MyPlugin_Item");

    assert!(RemainConfig::from_json(r#"{ "namespace": "bad space" }"#).is_err());
    assert!(RemainConfig::from_json(r#"{ "colour": true }"#).is_err());
    assert!(RemainConfig::default()
        .with_overrides(|_| Some("maybe".to_string()))
        .is_err());
}

#[test]
fn bootstrap_rejects_invalid_namespace() {
    let config = RemainConfig {
        namespace: String::new(),
        ..RemainConfig::default()
    };
    let host = Arc::new(SimHost::new(&profile::V1_16));
    assert!(matches!(Remain::bootstrap(host, config), Err(RemainError::Config(_))));
}
