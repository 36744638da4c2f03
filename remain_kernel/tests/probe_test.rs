/// Probe runner tests: idempotence, failure isolation, baseline gating,
/// and registry fingerprint stability.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use remain_kernel::capability::{BlockDataModel, HealthAccessor, PlayersAccessor};
use remain_kernel::hashing::canonical_hash;
use remain_kernel::host::{HostError, Introspect, MethodSig};
use remain_kernel::probe::{default_probes, symbols, ProbeRunner};
use remain_kernel::{probe_all, CapabilityFlag, CapabilityValue, HostVersion, RemainError};

/// Introspection-only host backed by plain symbol tables.
struct FakeIntrospect {
    version: String,
    types: BTreeSet<String>,
    /// (owner, name, params) -> return type
    methods: BTreeMap<(String, String, Vec<String>), String>,
    /// Types whose lookup raises an unexpected error.
    broken: BTreeSet<String>,
    lookups: AtomicUsize,
}

impl FakeIntrospect {
    fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            types: BTreeSet::new(),
            methods: BTreeMap::new(),
            broken: BTreeSet::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    fn with_type(mut self, name: &str) -> Self {
        self.types.insert(name.to_string());
        self
    }

    fn with_method(mut self, owner: &str, name: &str, params: &[&str], returns: &str) -> Self {
        self.methods.insert(
            (
                owner.to_string(),
                name.to_string(),
                params.iter().map(|p| p.to_string()).collect(),
            ),
            returns.to_string(),
        );
        self
    }

    fn with_broken_type(mut self, name: &str) -> Self {
        self.broken.insert(name.to_string());
        self
    }

    /// Smallest host that passes every baseline probe.
    fn baseline(version: &str) -> Self {
        Self::new(version)
            .with_type(symbols::SOUND)
            .with_type(symbols::COMPONENT_SERIALIZER)
            .with_method(symbols::BUKKIT, "getOnlinePlayers", &[], "org.bukkit.entity.Player[]")
            .with_method(symbols::LIVING_ENTITY, "getHealth", &[], symbols::INT)
    }
}

impl Introspect for FakeIntrospect {
    fn version_string(&self) -> Result<String, HostError> {
        Ok(self.version.clone())
    }

    fn find_type(&self, name: &str) -> Result<(), HostError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.broken.contains(name) {
            return Err(HostError::Failed(format!("linkage error loading {}", name)));
        }
        if self.types.contains(name) {
            Ok(())
        } else {
            Err(HostError::MissingType(name.to_string()))
        }
    }

    fn find_method(&self, owner: &str, name: &str, params: &[&str]) -> Result<MethodSig, HostError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let key = (
            owner.to_string(),
            name.to_string(),
            params.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        );
        match self.methods.get(&key) {
            Some(returns) => Ok(MethodSig {
                owner: owner.to_string(),
                name: name.to_string(),
                params: key.2.clone(),
                returns: returns.clone(),
            }),
            None => Err(HostError::MissingSymbol(format!("{}#{}", owner, name))),
        }
    }
}

fn modern_host() -> FakeIntrospect {
    FakeIntrospect::new("1.16.5-R0.1-SNAPSHOT")
        .with_type(symbols::SOUND)
        .with_type(symbols::COMPONENT_SERIALIZER)
        .with_type(symbols::BLOCK_DATA)
        .with_type(symbols::BOSS_BAR)
        .with_type(symbols::CHAT_MESSAGE_TYPE)
        .with_type(symbols::ADVANCEMENT)
        .with_type(symbols::NAMESPACED_KEY)
        .with_type(symbols::ATTRIBUTE)
        .with_method(symbols::BUKKIT, "getOnlinePlayers", &[], symbols::COLLECTION)
        .with_method(symbols::LIVING_ENTITY, "getHealth", &[], symbols::DOUBLE)
        .with_method(symbols::PLAYER, "resetTitle", &[], symbols::VOID)
        .with_method(
            symbols::PLAYER,
            "sendTitle",
            &[symbols::STRING, symbols::STRING, symbols::INT, symbols::INT, symbols::INT],
            symbols::VOID,
        )
}

// ─── Test 1: idempotence ─────────────────────────────────────────────

#[test]
fn probing_twice_yields_identical_registries() {
    let host = modern_host();
    let first = probe_all(&host).expect("probe 1");
    let second = probe_all(&host).expect("probe 2");

    assert_eq!(first, second, "probing the same host must be idempotent");
    assert_eq!(canonical_hash(&first), canonical_hash(&second));
}

#[test]
fn every_flag_gets_exactly_one_value() {
    let registry = probe_all(&modern_host()).expect("probe");
    for flag in CapabilityFlag::ALL {
        assert!(registry.get(flag).is_some(), "flag {} was never recorded", flag);
    }
    assert_eq!(registry.len(), CapabilityFlag::ALL.len());
}

// ─── Test 2: typed values ────────────────────────────────────────────

#[test]
fn modern_host_values() {
    let registry = probe_all(&modern_host()).expect("probe");

    assert_eq!(registry.version(), HostVersion::new(1, 16, 5));
    assert_eq!(registry.players_accessor(), Some(PlayersAccessor::Collection));
    assert_eq!(registry.health_accessor(), Some(HealthAccessor::Double));
    assert_eq!(registry.block_data_model(), Some(BlockDataModel::Rich));
    assert!(registry.supports(CapabilityFlag::TitleApi));
    assert!(registry.supports(CapabilityFlag::TimedTitleApi));
    assert!(registry.supports(CapabilityFlag::Advancements));
    assert!(!registry.supports(CapabilityFlag::TitlePackets));
    assert!(!registry.supports(CapabilityFlag::ProtocolLib));
    assert!(!registry.supports(CapabilityFlag::AttributeApi), "Attribute type alone is not enough");
}

#[test]
fn legacy_host_values() {
    let registry = probe_all(&FakeIntrospect::baseline("1.7.10")).expect("probe");

    assert_eq!(registry.players_accessor(), Some(PlayersAccessor::Array));
    assert_eq!(registry.health_accessor(), Some(HealthAccessor::Int));
    assert_eq!(registry.block_data_model(), Some(BlockDataModel::LegacyPair));
    assert_eq!(
        registry.get(CapabilityFlag::TitleApi),
        Some(CapabilityValue::Supported(false))
    );
}

// ─── Test 3: failure isolation ───────────────────────────────────────

#[test]
fn absent_probe_does_not_stop_later_probes() {
    // Everything between the baseline and the last probe is absent; the
    // last probe must still run and record a positive value.
    let host = FakeIntrospect::baseline("1.8.8").with_type(symbols::BOSS_ENTITY_PACKET);
    let registry = probe_all(&host).expect("probe");

    assert!(!registry.supports(CapabilityFlag::TitleApi));
    assert!(registry.supports(CapabilityFlag::BossEntityPackets));
    assert!(
        host.lookups.load(Ordering::SeqCst) >= default_probes().len(),
        "every probe should have performed at least one lookup"
    );
}

#[test]
fn tolerant_probe_swallows_unexpected_errors() {
    let host = FakeIntrospect::baseline("1.12.2").with_broken_type(symbols::PROTOCOL_LIB);
    let registry = probe_all(&host).expect("broken third-party plugin must not abort startup");
    assert!(!registry.supports(CapabilityFlag::ProtocolLib));
}

#[test]
fn unexpected_error_in_optional_probe_is_fatal() {
    let host = FakeIntrospect::baseline("1.12.2").with_broken_type(symbols::BOSS_BAR);
    match probe_all(&host) {
        Err(RemainError::ProbeFatal { probe, .. }) => assert_eq!(probe, "boss_bar_api"),
        other => panic!("expected ProbeFatal, got {:?}", other),
    }
}

// ─── Test 4: baseline gating ─────────────────────────────────────────

#[test]
fn missing_baseline_type_is_fatal() {
    let host = FakeIntrospect::new("1.3.2")
        .with_type(symbols::COMPONENT_SERIALIZER)
        .with_method(symbols::BUKKIT, "getOnlinePlayers", &[], "org.bukkit.entity.Player[]")
        .with_method(symbols::LIVING_ENTITY, "getHealth", &[], symbols::INT);

    match probe_all(&host) {
        Err(RemainError::ProbeFatal { probe, .. }) => assert_eq!(probe, "sound_type"),
        other => panic!("expected ProbeFatal, got {:?}", other),
    }
}

#[test]
fn version_below_baseline_is_fatal_before_any_lookup() {
    let host = FakeIntrospect::baseline("1.2.5");
    match probe_all(&host) {
        Err(RemainError::ProbeFatal { probe, reason }) => {
            assert_eq!(probe, "version");
            assert!(reason.contains("1.3.2"), "{}", reason);
        }
        other => panic!("expected ProbeFatal, got {:?}", other),
    }
    assert_eq!(host.lookups.load(Ordering::SeqCst), 0, "no symbol lookups below baseline");
}

#[test]
fn unparseable_version_is_fatal() {
    let host = FakeIntrospect::baseline("unknown build");
    assert!(matches!(
        probe_all(&host),
        Err(RemainError::ProbeFatal { probe: "version", .. })
    ));
}

// ─── Test 5: order independence ──────────────────────────────────────

#[test]
fn probe_order_does_not_change_the_registry() {
    let host = modern_host();
    let forward = ProbeRunner::new(default_probes()).run(&host).expect("forward");

    let mut reversed = default_probes();
    reversed.reverse();
    let backward = ProbeRunner::new(reversed).run(&host).expect("backward");

    assert_eq!(forward, backward, "optional probes must not depend on each other");
}
