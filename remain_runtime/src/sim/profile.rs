//! Host profiles for the simulated host: which surface each release has.

use std::collections::{BTreeMap, BTreeSet};

use remain_kernel::probe::symbols as sym;

/// What one simulated release exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub sound: bool,
    pub bungee_chat: bool,
    pub players_collection: bool,
    pub health_double: bool,
    pub rich_block_data: bool,
    pub title_api: bool,
    pub timed_title_api: bool,
    pub particles: bool,
    pub scoreboard_entries: bool,
    pub book_event: bool,
    pub inventory_location: bool,
    pub scoreboard_tags: bool,
    pub spawn_egg_meta: bool,
    pub advancements: bool,
    pub attributes: bool,
    pub chat_message_type: bool,
    pub boss_bar_api: bool,
    pub player_list_api: bool,
    pub spigot_respawn: bool,
    pub legacy_data_setter: bool,
    pub title_packets: bool,
    pub chat_packet_position: bool,
    pub tab_list_packets: bool,
    pub boss_entity_packets: bool,
    /// `getKeys`/`save`/`load` instead of the obfuscated `c`/`c`/`f`.
    pub modern_tag_names: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    pub version: &'static str,
    /// Versioned native package, e.g. `v1_8_R3`.
    pub nms: &'static str,
    pub features: Features,
}

const NONE: Features = Features {
    sound: false,
    bungee_chat: false,
    players_collection: false,
    health_double: false,
    rich_block_data: false,
    title_api: false,
    timed_title_api: false,
    particles: false,
    scoreboard_entries: false,
    book_event: false,
    inventory_location: false,
    scoreboard_tags: false,
    spawn_egg_meta: false,
    advancements: false,
    attributes: false,
    chat_message_type: false,
    boss_bar_api: false,
    player_list_api: false,
    spigot_respawn: false,
    legacy_data_setter: false,
    title_packets: false,
    chat_packet_position: false,
    tab_list_packets: false,
    boss_entity_packets: false,
    modern_tag_names: false,
};

pub const ANCIENT_1_2: Profile = Profile {
    name: "ancient-1.2",
    version: "1.2.5-R4.0",
    nms: "v1_2_R1",
    features: NONE,
};

pub const LEGACY_1_7: Profile = Profile {
    name: "legacy-1.7",
    version: "1.7.10-R0.1-SNAPSHOT",
    nms: "v1_7_R4",
    features: Features {
        sound: true,
        bungee_chat: true,
        health_double: true,
        book_event: true,
        spigot_respawn: true,
        legacy_data_setter: true,
        boss_entity_packets: true,
        ..NONE
    },
};

pub const V1_8: Profile = Profile {
    name: "1.8",
    version: "1.8.8-R0.1-SNAPSHOT",
    nms: "v1_8_R3",
    features: Features {
        players_collection: true,
        scoreboard_entries: true,
        title_packets: true,
        chat_packet_position: true,
        tab_list_packets: true,
        ..LEGACY_1_7.features
    },
};

pub const V1_12: Profile = Profile {
    name: "1.12",
    version: "1.12.2-R0.1-SNAPSHOT",
    nms: "v1_12_R1",
    features: Features {
        title_api: true,
        timed_title_api: true,
        particles: true,
        inventory_location: true,
        scoreboard_tags: true,
        spawn_egg_meta: true,
        advancements: true,
        attributes: true,
        chat_message_type: true,
        boss_bar_api: true,
        ..V1_8.features
    },
};

pub const V1_16: Profile = Profile {
    name: "1.16",
    version: "1.16.5-R0.1-SNAPSHOT",
    nms: "v1_16_R3",
    features: Features {
        rich_block_data: true,
        player_list_api: true,
        legacy_data_setter: false,
        modern_tag_names: true,
        ..V1_12.features
    },
};

pub const PROFILES: [Profile; 5] = [ANCIENT_1_2, LEGACY_1_7, V1_8, V1_12, V1_16];

pub fn profile(name: &str) -> Option<&'static Profile> {
    PROFILES.iter().find(|p| p.name == name)
}

// ---------------------------------------------------------------------------
// Symbol tables
// ---------------------------------------------------------------------------

type MethodKey = (String, String, Vec<String>);

/// Types and method signatures a profile answers introspection with.
#[derive(Debug, Default)]
pub(crate) struct Symbols {
    types: BTreeSet<String>,
    methods: BTreeMap<MethodKey, String>,
}

impl Symbols {
    pub(crate) fn for_profile(profile: &Profile) -> Self {
        let f = profile.features;
        let mut s = Symbols::default();

        for ty in [
            sym::BUKKIT,
            sym::PLAYER,
            sym::LIVING_ENTITY,
            sym::ENTITY,
            sym::WORLD,
            sym::LOCATION,
            sym::BLOCK,
            sym::INVENTORY,
            sym::OBJECTIVE,
            sym::CHAT_PACKET,
            sym::CHAT_BASE_COMPONENT,
        ] {
            s.add_type(ty);
        }

        s.add_type_if(f.sound, sym::SOUND);
        s.add_type_if(f.bungee_chat, sym::COMPONENT_SERIALIZER);
        s.add_type_if(f.particles, sym::PARTICLE);
        s.add_type_if(f.book_event, sym::BOOK_EVENT);
        s.add_type_if(f.spawn_egg_meta, sym::SPAWN_EGG_META);
        s.add_type_if(f.advancements, sym::ADVANCEMENT);
        s.add_type_if(f.advancements, sym::NAMESPACED_KEY);
        s.add_type_if(f.attributes, sym::ATTRIBUTE);
        s.add_type_if(f.boss_bar_api, sym::BOSS_BAR);
        s.add_type_if(f.rich_block_data, sym::BLOCK_DATA);
        s.add_type_if(f.chat_message_type, sym::CHAT_MESSAGE_TYPE);
        s.add_type_if(f.chat_message_type || f.spigot_respawn, sym::PLAYER_SPIGOT);
        s.add_type_if(f.title_packets, sym::TITLE_PACKET);
        s.add_type_if(f.tab_list_packets, sym::TAB_LIST_PACKET);
        s.add_type_if(f.boss_entity_packets, sym::BOSS_ENTITY_PACKET);

        let players = if f.players_collection {
            sym::COLLECTION
        } else {
            "org.bukkit.entity.Player[]"
        };
        s.add_method(sym::BUKKIT, "getOnlinePlayers", &[], players);
        let health = if f.health_double { sym::DOUBLE } else { sym::INT };
        s.add_method(sym::LIVING_ENTITY, "getHealth", &[], health);

        if f.title_api {
            s.add_method(sym::PLAYER, "resetTitle", &[], sym::VOID);
        }
        if f.timed_title_api {
            s.add_method(
                sym::PLAYER,
                "sendTitle",
                &[sym::STRING, sym::STRING, sym::INT, sym::INT, sym::INT],
                sym::VOID,
            );
        }
        if f.particles {
            s.add_method(sym::WORLD, "spawnParticle", &[sym::PARTICLE, sym::LOCATION, sym::INT], sym::VOID);
        }
        if f.scoreboard_entries {
            s.add_method(sym::OBJECTIVE, "getScore", &[sym::STRING], "org.bukkit.scoreboard.Score");
        }
        if f.inventory_location {
            s.add_method(sym::INVENTORY, "getLocation", &[], sym::LOCATION);
        }
        if f.scoreboard_tags {
            s.add_method(sym::ENTITY, "getScoreboardTags", &[], "java.util.Set");
        }
        if f.attributes {
            s.add_method(
                sym::LIVING_ENTITY,
                "getAttribute",
                &[sym::ATTRIBUTE],
                "org.bukkit.attribute.AttributeInstance",
            );
        }
        if f.chat_message_type {
            s.add_method(
                sym::PLAYER_SPIGOT,
                "sendMessage",
                &[sym::CHAT_MESSAGE_TYPE, sym::BASE_COMPONENT],
                sym::VOID,
            );
        }
        if f.player_list_api {
            s.add_method(sym::PLAYER, "setPlayerListHeaderFooter", &[sym::STRING, sym::STRING], sym::VOID);
        }
        if f.spigot_respawn {
            s.add_method(sym::PLAYER_SPIGOT, "respawn", &[], sym::VOID);
        }
        if f.legacy_data_setter {
            s.add_method(sym::BLOCK, "setData", &[sym::BYTE], sym::VOID);
        }
        if f.chat_packet_position {
            s.add_method(sym::CHAT_PACKET, "<init>", &[sym::CHAT_BASE_COMPONENT, sym::BYTE], sym::VOID);
        }

        s
    }

    fn add_type(&mut self, name: &str) {
        self.types.insert(name.to_string());
    }

    fn add_type_if(&mut self, present: bool, name: &str) {
        if present {
            self.add_type(name);
        }
    }

    fn add_method(&mut self, owner: &str, name: &str, params: &[&str], returns: &str) {
        self.methods.insert(
            (
                owner.to_string(),
                name.to_string(),
                params.iter().map(|p| p.to_string()).collect(),
            ),
            returns.to_string(),
        );
    }

    pub(crate) fn has_type(&self, name: &str) -> bool {
        self.types.contains(name)
    }

    pub(crate) fn method(&self, owner: &str, name: &str, params: &[&str]) -> Option<&str> {
        let key = (
            owner.to_string(),
            name.to_string(),
            params.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        );
        self.methods.get(&key).map(String::as_str)
    }
}
