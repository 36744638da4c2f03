//! Object bridge and drift tests.

use std::sync::{Arc, Barrier};
use std::thread;

use remain_kernel::host::{EntityId, Host, HostError, ItemStack, NativeValue, StableObject};
use remain_kernel::{probe_all, CapabilityFlag, CapabilityValue, HostVersion, RemainError};
use remain_runtime::bridge::{family, fields, FieldSpec, Member, ObjectBridge};
use remain_runtime::drift::{compare_registries, verify_probe_determinism};
use remain_runtime::sim::{profile, SimHost};
use remain_runtime::{Remain, RemainConfig};

const BOGUS: FieldSpec = FieldSpec {
    name: "bogus",
    read: Member::new(&["getBogus", "zz"], 1),
    write: Member::NONE,
};

fn bridge_on(profile: &'static profile::Profile) -> (Arc<SimHost>, ObjectBridge) {
    let host = Arc::new(SimHost::new(profile));
    let version = HostVersion::parse(profile.version).expect("profile version");
    let native: Arc<dyn Host> = host.clone();
    (host, ObjectBridge::new(native, version))
}

// ─────────────────────────────────────────────────────────────
// Test 1: member lookups happen once per shape and field
// ─────────────────────────────────────────────────────────────

#[test]
fn member_lookup_is_cached_per_shape() {
    let host = Arc::new(SimHost::new(&profile::V1_16));
    let remain = Remain::bootstrap(Arc::clone(&host), RemainConfig::default()).expect("bootstrap");
    let nbt = remain.nbt_item(&ItemStack::new("STONE", 1));

    nbt.set_string("a", "1");
    let after_first = host.member_lookups();
    assert!(after_first > 0);

    nbt.set_string("b", "2");
    nbt.set_string("c", "3");
    assert_eq!(host.member_lookups(), after_first, "second write must hit the cache");
    assert_eq!(nbt.get_string("b"), "2");
}

#[test]
fn obfuscated_names_resolve_after_modern_miss() {
    let (host, bridge) = bridge_on(&profile::V1_8);
    let compound = bridge.instantiate(family::COMPOUND).expect("compound");

    let keys = bridge.read_field(&compound, &fields::KEYS, &[]).expect("keys");
    assert_eq!(keys, NativeValue::Keys(Default::default()));
    assert_eq!(host.member_lookups(), 2, "getKeys misses, c hits");

    bridge.read_field(&compound, &fields::KEYS, &[]).expect("keys again");
    assert_eq!(host.member_lookups(), 2);
    assert_eq!(bridge.cache().len(), 1);
}

#[test]
fn concurrent_cache_population_settles_on_one_entry() {
    let (host, bridge) = bridge_on(&profile::V1_16);
    let compound = bridge.instantiate(family::COMPOUND).expect("compound");
    let key = NativeValue::Str("k".to_string());
    bridge
        .write_field(&compound, &fields::INT, &[key.clone(), NativeValue::Int(7)])
        .expect("seed");

    let entries_before = bridge.cache().len();
    let lookups_before = host.member_lookups();
    let barrier = Barrier::new(2);
    let reads: Vec<NativeValue> = thread::scope(|scope| {
        let workers: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    bridge.read_field(&compound, &fields::INT, &[key.clone()]).expect("read")
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().expect("worker")).collect()
    });

    assert_eq!(reads, vec![NativeValue::Int(7), NativeValue::Int(7)]);
    assert_eq!(bridge.cache().len(), entries_before + 1, "one entry for the shared shape");
    assert!(host.member_lookups() - lookups_before <= 2, "at most one lookup per racing reader");

    bridge.read_field(&compound, &fields::INT, &[key]).expect("cached read");
    assert_eq!(bridge.cache().len(), entries_before + 1);
}

// ─────────────────────────────────────────────────────────────
// Test 2: absence classification
// ─────────────────────────────────────────────────────────────

#[test]
fn missing_member_is_field_unavailable_and_cached() {
    let (host, bridge) = bridge_on(&profile::V1_16);
    let compound = bridge.instantiate(family::COMPOUND).expect("compound");

    for _ in 0..2 {
        match bridge.read_field(&compound, &BOGUS, &[NativeValue::Str("k".to_string())]) {
            Err(RemainError::FieldUnavailable { field, shape }) => {
                assert_eq!(field, "bogus");
                assert!(shape.ends_with("NBTTagCompound"), "{}", shape);
            }
            other => panic!("expected FieldUnavailable, got {:?}", other),
        }
    }
    assert_eq!(host.member_lookups(), 2, "negative result is cached too");
}

#[test]
fn absence_during_invoke_is_field_unavailable() {
    let (host, bridge) = bridge_on(&profile::V1_16);
    let compound = bridge.instantiate(family::COMPOUND).expect("compound");

    host.fail_next("invoke", HostError::MissingSymbol("getInt".to_string()));
    let err = bridge
        .read_field(&compound, &fields::INT, &[NativeValue::Str("k".to_string())])
        .unwrap_err();
    assert!(matches!(err, RemainError::FieldUnavailable { field: "int", .. }), "{:?}", err);
}

#[test]
fn unknown_entity_is_incompatible_host() {
    let (_, bridge) = bridge_on(&profile::V1_12);
    match bridge.resolve(&StableObject::Entity(EntityId(404))) {
        Err(RemainError::IncompatibleHost { object, version }) => {
            assert_eq!(object, "entity#404");
            assert_eq!(version, HostVersion::new(1, 12, 2));
        }
        other => panic!("expected IncompatibleHost, got {:?}", other),
    }
}

// ─────────────────────────────────────────────────────────────
// Test 3: probe determinism and drift between hosts
// ─────────────────────────────────────────────────────────────

#[test]
fn probing_is_deterministic_per_profile() {
    for p in [&profile::LEGACY_1_7, &profile::V1_8, &profile::V1_12, &profile::V1_16] {
        let host = SimHost::new(p);
        let first = verify_probe_determinism(&host).expect("deterministic");
        let second = verify_probe_determinism(&host).expect("deterministic");
        assert_eq!(first, second, "{}", p.name);
        assert_eq!(first.len(), 64);
    }
}

#[test]
fn drift_from_1_8_to_1_16() {
    let old = probe_all(&SimHost::new(&profile::V1_8)).expect("1.8");
    let new = probe_all(&SimHost::new(&profile::V1_16)).expect("1.16");

    let drift = compare_registries(&old, &new);
    assert!(drift.gained.contains(&CapabilityFlag::TitleApi));
    assert!(drift.gained.contains(&CapabilityFlag::PlayerListHeaderApi));
    assert!(drift.lost.contains(&CapabilityFlag::LegacyDataSetter));
    assert!(drift
        .changed
        .iter()
        .any(|c| c.flag == CapabilityFlag::BlockDataModel && c.after.to_string() == "rich"));
    assert_ne!(drift.fingerprint_a, drift.fingerprint_b);

    let rendered = drift.render();
    assert!(rendered.starts_with("1.8.8 -> 1.16.5"));
    assert!(rendered.contains("+ title_api"));
    assert!(rendered.contains("- legacy_data_setter"));

    assert!(compare_registries(&new, &new).is_empty());
    assert_eq!(new.get(CapabilityFlag::TitleApi), Some(CapabilityValue::Supported(true)));
}
