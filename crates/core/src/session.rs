//! The replay session aggregate: header metadata plus the ordered entries.

use crate::entry::LogEntry;
use crate::settings::Settings;
use crate::types::{PLAYER_MAX, VersionTriple};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapInfo {
    pub description: String,
    pub path: String,
    pub uid: u32,
}

/// Live game state a session header is synthesized from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveSnapshot {
    pub local_player: usize,
    pub player_names: [String; PLAYER_MAX],
    pub settings: Settings,
    pub map: MapInfo,
    pub engine: VersionTriple,
    pub protocol: VersionTriple,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionHeader {
    pub comments: [String; 3],
    pub date: String,
    pub map: MapInfo,
    pub local_player: usize,
    pub player_names: [String; PLAYER_MAX],
    pub settings: Settings,
    pub engine: VersionTriple,
    pub protocol: VersionTriple,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Compatibility {
    pub engine_matches: bool,
    pub protocol_matches: bool,
}

impl Compatibility {
    pub fn is_exact(self) -> bool {
        self.engine_matches && self.protocol_matches
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplaySession {
    pub header: SessionHeader,
    entries: Vec<LogEntry>,
}

impl ReplaySession {
    pub fn new(header: SessionHeader) -> Self {
        Self { header, entries: Vec::new() }
    }

    /// Start a fresh session from the running game.
    pub fn from_live(snapshot: LiveSnapshot, date: String) -> Self {
        let LiveSnapshot { local_player, player_names, settings, map, engine, protocol } = snapshot;
        Self::new(SessionHeader {
            comments: [
                format!("Generated by replay_core version {}", env!("CARGO_PKG_VERSION")),
                "Deterministic command log; one JSON record per line".to_string(),
                String::new(),
            ],
            date,
            map,
            local_player,
            player_names,
            settings,
            engine,
            protocol,
        })
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_cycle(&self) -> Option<u64> {
        self.entries.last().map(|entry| entry.cycle)
    }

    /// Append at the tail. Callers guarantee cycles never go backwards.
    pub fn push(&mut self, mut entry: LogEntry) {
        entry.normalize();
        debug_assert!(
            self.last_cycle().is_none_or(|last| last <= entry.cycle),
            "replay entries must be appended in cycle order"
        );
        self.entries.push(entry);
    }

    pub fn is_multiplayer(&self) -> bool {
        self.header.settings.is_multiplayer()
    }

    pub fn compatibility(&self, engine: VersionTriple, protocol: VersionTriple) -> Compatibility {
        Compatibility {
            engine_matches: self.header.engine == engine,
            protocol_matches: self.header.protocol == protocol,
        }
    }
}
