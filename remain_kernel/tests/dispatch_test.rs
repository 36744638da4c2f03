/// Dispatch engine tests: strategy selection, fallthrough, and the
/// legacy title path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use prost::Message;

use remain_kernel::capability::{BlockDataModel, HealthAccessor, PlayersAccessor};
use remain_kernel::host::{
    Attribute, BlockPos, HostError, Introspect, MethodSig, NativeAccess, PacketChannel, ServerApi, TitleDisplay,
};
use remain_kernel::packets::{TitleAction, TitlePacket, CHANNEL_TITLE};
use remain_kernel::strategies::StrategyTable;
use remain_kernel::strategy::{Strategy, StrategyContext, StrategyError};
use remain_kernel::{
    CapabilityFlag, CapabilityRegistry, CapabilityValue, DispatchEngine, EntityId, HostVersion,
    Operation, OperationKind, Outcome, RemainError,
};

const PLAYER: EntityId = EntityId(7);

/// Host that records what it was asked to do. `native_titles` controls
/// whether the native title call is actually there at call time.
#[derive(Default)]
struct RecordingHost {
    native_titles: bool,
    fail_hard: bool,
    title_calls: AtomicUsize,
    shown: Mutex<Vec<TitleDisplay>>,
    packets: Mutex<Vec<(String, Vec<u8>)>>,
    chat: Mutex<Vec<String>>,
    advancements: Mutex<Vec<String>>,
}

impl Introspect for RecordingHost {
    fn version_string(&self) -> Result<String, HostError> {
        Ok("1.12.2".to_string())
    }

    fn find_type(&self, name: &str) -> Result<(), HostError> {
        Err(HostError::MissingType(name.to_string()))
    }

    fn find_method(&self, owner: &str, name: &str, _params: &[&str]) -> Result<MethodSig, HostError> {
        Err(HostError::MissingSymbol(format!("{}#{}", owner, name)))
    }
}

impl ServerApi for RecordingHost {
    fn send_message(&self, _player: EntityId, text: &str) -> Result<(), HostError> {
        self.chat.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn send_title(&self, _player: EntityId, title: &TitleDisplay) -> Result<(), HostError> {
        self.title_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_hard {
            return Err(HostError::Failed("title renderer crashed".to_string()));
        }
        if !self.native_titles {
            return Err(HostError::MissingSymbol("Player#sendTitle".to_string()));
        }
        self.shown.lock().unwrap().push(title.clone());
        Ok(())
    }

    fn health_double(&self, _entity: EntityId) -> Result<f64, HostError> {
        Ok(19.75)
    }

    fn max_health(&self, _entity: EntityId) -> Result<f64, HostError> {
        Ok(24.0)
    }

    fn load_advancement(&self, key: &str, _json: &str) -> Result<(), HostError> {
        self.advancements.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn grant_advancement(&self, _player: EntityId, _key: &str) -> Result<(), HostError> {
        Ok(())
    }
}

impl PacketChannel for RecordingHost {
    fn send_packet(&self, _player: EntityId, channel: &str, payload: &[u8]) -> Result<(), HostError> {
        self.packets
            .lock()
            .unwrap()
            .push((channel.to_string(), payload.to_vec()));
        Ok(())
    }
}

impl NativeAccess for RecordingHost {}

fn registry(flags: &[(CapabilityFlag, CapabilityValue)]) -> Arc<CapabilityRegistry> {
    let mut values = vec![
        (
            CapabilityFlag::PlayersAccessor,
            CapabilityValue::Players(PlayersAccessor::Collection),
        ),
        (
            CapabilityFlag::HealthAccessor,
            CapabilityValue::Health(HealthAccessor::Double),
        ),
        (
            CapabilityFlag::BlockDataModel,
            CapabilityValue::BlockData(BlockDataModel::LegacyPair),
        ),
    ];
    values.extend_from_slice(flags);
    Arc::new(CapabilityRegistry::from_values(HostVersion::new(1, 12, 2), values).expect("registry"))
}

fn yes(flag: CapabilityFlag) -> (CapabilityFlag, CapabilityValue) {
    (flag, CapabilityValue::Supported(true))
}

fn title_op(force_packets: bool) -> Operation {
    Operation::SendTitle {
        player: PLAYER,
        title: TitleDisplay::new("&aWelcome", "&7back").timed(5, 40, 15),
        force_packets,
    }
}

fn decoded_titles(host: &RecordingHost) -> Vec<TitlePacket> {
    host.packets
        .lock()
        .unwrap()
        .iter()
        .filter(|(channel, _)| channel == CHANNEL_TITLE)
        .map(|(_, bytes)| TitlePacket::decode(bytes.as_slice()).expect("title packet"))
        .collect()
}

// ─── Test 1: plan resolution ─────────────────────────────────────────

#[test]
fn plan_contains_only_eligible_strategies() {
    let engine = DispatchEngine::new(registry(&[yes(CapabilityFlag::TitlePackets)]));

    assert_eq!(
        engine.plan(OperationKind::SendTitle),
        vec!["title_packets", "title_chat"]
    );
    assert_eq!(engine.resolve(OperationKind::GetHealth), Some("health_double"));
    assert_eq!(engine.resolve(OperationKind::SendToast), None);
}

#[test]
fn selection_is_stable_across_calls() {
    let engine = DispatchEngine::new(registry(&[yes(CapabilityFlag::TimedTitleApi)]));
    let host = RecordingHost {
        native_titles: true,
        ..Default::default()
    };

    for _ in 0..5 {
        let dispatched = engine.execute(&host, &title_op(false)).expect("title");
        assert_eq!(dispatched.strategy, "title_native");
    }
    assert_eq!(host.title_calls.load(Ordering::SeqCst), 5);
}

// ─── Test 2: recoverable fallthrough ─────────────────────────────────

#[test]
fn failing_preferred_strategy_falls_through_exactly_once() {
    let engine = DispatchEngine::new(registry(&[
        yes(CapabilityFlag::TimedTitleApi),
        yes(CapabilityFlag::TitlePackets),
    ]));
    // Flag says yes, but the symbol is gone at call time.
    let host = RecordingHost::default();

    let dispatched = engine.execute(&host, &title_op(false)).expect("title");

    assert_eq!(dispatched.strategy, "title_packets");
    assert_eq!(
        host.title_calls.load(Ordering::SeqCst),
        1,
        "the failed native strategy must not be retried"
    );
    assert_eq!(decoded_titles(&host).len(), 4);
    assert!(host.chat.lock().unwrap().is_empty(), "chat fallback must not run");
}

static FIELD_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);
static FALLBACK_RUNS: AtomicUsize = AtomicUsize::new(0);

fn field_missing(_ctx: &StrategyContext<'_>, _op: &Operation) -> Result<Outcome, StrategyError> {
    FIELD_ATTEMPTS.fetch_add(1, Ordering::SeqCst);
    Err(RemainError::FieldUnavailable {
        shape: "EntityPlayer".to_string(),
        field: "getHealth",
    }
    .into())
}

fn fallback_health(_ctx: &StrategyContext<'_>, _op: &Operation) -> Result<Outcome, StrategyError> {
    FALLBACK_RUNS.fetch_add(1, Ordering::SeqCst);
    Ok(Outcome::Health(20))
}

#[test]
fn field_unavailable_is_recovered_silently() {
    let mut table = StrategyTable::new();
    table.insert(
        OperationKind::GetHealth,
        vec![
            Strategy::new("field_health", &[], field_missing),
            Strategy::new("fallback_health", &[], fallback_health),
        ],
    );
    let engine = DispatchEngine::with_table(registry(&[]), table);
    let host = RecordingHost::default();

    let dispatched = engine
        .execute(&host, &Operation::GetHealth { entity: PLAYER })
        .expect("FieldUnavailable must not reach the caller");

    assert_eq!(dispatched.strategy, "fallback_health");
    assert_eq!(dispatched.outcome, Outcome::Health(20));
    assert_eq!(FIELD_ATTEMPTS.load(Ordering::SeqCst), 1);
    assert_eq!(FALLBACK_RUNS.load(Ordering::SeqCst), 1);
}

// ─── Test 3: fatal and unsupported ───────────────────────────────────

#[test]
fn unexpected_host_failure_is_surfaced_without_fallthrough() {
    let engine = DispatchEngine::new(registry(&[
        yes(CapabilityFlag::TimedTitleApi),
        yes(CapabilityFlag::TitlePackets),
    ]));
    let host = RecordingHost {
        fail_hard: true,
        ..Default::default()
    };

    let err = engine.execute(&host, &title_op(false)).unwrap_err();
    assert!(matches!(err, RemainError::Host(HostError::Failed(_))), "got {:?}", err);
    assert!(decoded_titles(&host).is_empty());
}

#[test]
fn no_eligible_strategy_reports_unsupported_with_context() {
    let engine = DispatchEngine::new(registry(&[]));
    let host = RecordingHost::default();

    let err = engine
        .execute(
            &host,
            &Operation::SendTablist {
                player: PLAYER,
                header: "h".to_string(),
                footer: None,
            },
        )
        .unwrap_err();

    match err {
        RemainError::Unsupported { operation, version } => {
            assert_eq!(operation, OperationKind::SendTablist);
            assert_eq!(version, HostVersion::new(1, 12, 2));
        }
        other => panic!("expected Unsupported, got {:?}", other),
    }
    assert_eq!(
        RemainError::Unsupported {
            operation: OperationKind::SendTablist,
            version: HostVersion::new(1, 12, 2),
        }
        .to_string(),
        "send_tablist is not supported on host 1.12.2"
    );
}

// ─── Test 4: legacy title equivalence ────────────────────────────────

#[test]
fn legacy_title_route_keeps_the_timed_sequence() {
    let engine = DispatchEngine::new(registry(&[yes(CapabilityFlag::TitlePackets)]));
    let host = RecordingHost::default();

    let dispatched = engine.execute(&host, &title_op(false)).expect("title");
    assert_eq!(dispatched.strategy, "title_packets");
    assert_eq!(host.title_calls.load(Ordering::SeqCst), 0, "native path is not eligible");

    let packets = decoded_titles(&host);
    let actions: Vec<i32> = packets.iter().map(|p| p.action).collect();
    assert_eq!(
        actions,
        vec![
            TitleAction::Reset as i32,
            TitleAction::Times as i32,
            TitleAction::Title as i32,
            TitleAction::Subtitle as i32,
        ]
    );
    let times = &packets[1];
    assert_eq!((times.fade_in, times.stay, times.fade_out), (5, 40, 15));
    assert!(packets[2].component.contains("\u{00A7}aWelcome"));
    assert!(packets[3].component.contains("\u{00A7}7back"));
}

#[test]
fn forced_packets_skip_the_native_title() {
    let engine = DispatchEngine::new(registry(&[
        yes(CapabilityFlag::TimedTitleApi),
        yes(CapabilityFlag::TitlePackets),
    ]));
    let host = RecordingHost {
        native_titles: true,
        ..Default::default()
    };

    let dispatched = engine.execute(&host, &title_op(true)).expect("title");
    assert_eq!(dispatched.strategy, "title_packets");
    assert_eq!(host.title_calls.load(Ordering::SeqCst), 0);
    assert!(host.shown.lock().unwrap().is_empty());
}

// ─── Test 5: queries and toasts ──────────────────────────────────────

#[test]
fn health_is_truncated_to_int() {
    let engine = DispatchEngine::new(registry(&[]));
    let host = RecordingHost::default();

    let dispatched = engine
        .execute(&host, &Operation::GetHealth { entity: PLAYER })
        .expect("health");
    assert_eq!(dispatched.outcome, Outcome::Health(19));
}

#[test]
fn attributes_without_the_api_reach_max_health_only() {
    let engine = DispatchEngine::new(registry(&[]));
    let host = RecordingHost::default();
    assert_eq!(engine.plan(OperationKind::GetAttribute), vec!["attribute_max_health"]);

    let max = engine
        .execute(
            &host,
            &Operation::GetAttribute {
                entity: PLAYER,
                attribute: Attribute::GenericMaxHealth,
            },
        )
        .expect("max health");
    assert_eq!(max.outcome, Outcome::Attribute(Some(24.0)));

    let err = engine
        .execute(
            &host,
            &Operation::GetAttribute {
                entity: PLAYER,
                attribute: Attribute::GenericArmor,
            },
        )
        .unwrap_err();
    assert!(
        matches!(
            err,
            RemainError::Unsupported {
                operation: OperationKind::GetAttribute,
                ..
            }
        ),
        "got {:?}",
        err
    );
}

#[test]
fn empty_toast_is_skipped_without_touching_the_host() {
    let engine = DispatchEngine::new(registry(&[yes(CapabilityFlag::Advancements)]));
    let host = RecordingHost::default();

    let op = |message: &str| Operation::SendToast {
        player: PLAYER,
        key: "remain_toast_1".to_string(),
        message: message.to_string(),
        icon: "book".to_string(),
    };

    let skipped = engine.execute(&host, &op("")).expect("toast");
    assert_eq!(skipped.outcome, Outcome::Skipped);
    assert!(host.advancements.lock().unwrap().is_empty());

    let shown = engine.execute(&host, &op("&6Level up")).expect("toast");
    assert_eq!(shown.outcome, Outcome::Done);
    assert_eq!(*host.advancements.lock().unwrap(), vec!["remain_toast_1".to_string()]);
}

#[test]
fn legacy_block_path_needs_a_material_id() {
    let engine = DispatchEngine::new(registry(&[]));
    let host = RecordingHost::default();

    // The recording host has no legacy id table, so the only eligible
    // strategy falls through and the operation is unsupported.
    let err = engine
        .execute(
            &host,
            &Operation::SetBlockTypeAndData {
                pos: BlockPos::new(0, 64, 0),
                material: "STONE".to_string(),
                data: 1,
                physics: true,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RemainError::Unsupported {
            operation: OperationKind::SetBlockTypeAndData,
            ..
        }
    ));
}
