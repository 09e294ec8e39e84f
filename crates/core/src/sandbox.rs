//! Deterministic in-memory host for exercising record and playback without
//! an engine. Used by the test suites and the command-line tools.
//!
//! The sync seed is a ChaCha8 stream mixed with an xxh3 digest of every
//! command the world receives, so two worlds built from the same seed stay
//! in sync exactly as long as they see the same commands on the same cycles.

use std::hash::Hasher;

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{Rng, SeedableRng};
use xxhash_rust::xxh3::{Xxh3, xxh3_64};

use crate::command::SimCommand;
use crate::host::{GameState, Launcher, Simulation, UnitRegistry};
use crate::session::{LiveSnapshot, MapInfo};
use crate::settings::Settings;
use crate::types::{UnitSlot, VersionTriple};

pub const SANDBOX_ENGINE: VersionTriple = VersionTriple::new(2, 4, 1);
pub const SANDBOX_PROTOCOL: VersionTriple = VersionTriple::new(1, 0, 0);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SandboxUnit {
    pub slot: UnitSlot,
    pub type_ident: String,
}

/// Start-up calls received through [`Launcher`], in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LaunchEvent {
    CleanPlayers,
    ConfigureNetwork { local_player: usize },
    ApplySettings { map_path: String },
    RevealMap(bool),
    StartMap(String),
}

#[derive(Debug)]
pub struct SandboxWorld {
    cycle: u64,
    rng: ChaCha8Rng,
    seed: u32,
    units: Vec<Option<SandboxUnit>>,
    live: LiveSnapshot,
    sent: Vec<(u64, SimCommand<SandboxUnit>)>,
    notifications: Vec<String>,
    chat_sounds: usize,
    launches: Vec<LaunchEvent>,
    applied_settings: Option<Settings>,
    reveal_map: bool,
    map_error: Option<String>,
}

impl SandboxWorld {
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let sync_seed = rng.next_u32();
        let live = LiveSnapshot {
            map: MapInfo {
                description: "Sandbox".to_string(),
                path: "maps/sandbox.smp".to_string(),
                uid: (seed as u32) ^ 0x5a5a_5a5a,
            },
            engine: SANDBOX_ENGINE,
            protocol: SANDBOX_PROTOCOL,
            ..LiveSnapshot::default()
        };
        Self {
            cycle: 0,
            rng,
            seed: sync_seed,
            units: Vec::new(),
            live,
            sent: Vec::new(),
            notifications: Vec::new(),
            chat_sounds: 0,
            launches: Vec::new(),
            applied_settings: None,
            reveal_map: false,
            map_error: None,
        }
    }

    /// Add a unit in the next free slot.
    pub fn spawn(&mut self, type_ident: &str) -> SandboxUnit {
        let unit = SandboxUnit {
            slot: UnitSlot(self.units.len() as u32),
            type_ident: type_ident.to_string(),
        };
        self.units.push(Some(unit.clone()));
        unit
    }

    /// Remove a unit; its slot is never reused.
    pub fn remove_unit(&mut self, slot: UnitSlot) -> Option<SandboxUnit> {
        self.units.get_mut(slot.0 as usize).and_then(Option::take)
    }

    pub fn units(&self) -> impl Iterator<Item = &SandboxUnit> {
        self.units.iter().flatten()
    }

    /// Run one simulation cycle.
    pub fn step(&mut self) {
        self.cycle += 1;
        self.seed = self.seed.rotate_left(5) ^ self.rng.next_u32();
    }

    pub fn step_to(&mut self, cycle: u64) {
        while self.cycle < cycle {
            self.step();
        }
    }

    /// Knock the sync seed off course, as a non-deterministic bug would.
    pub fn perturb(&mut self) {
        self.seed = self.seed.wrapping_add(0x9e37_79b9);
    }

    pub fn live_mut(&mut self) -> &mut LiveSnapshot {
        &mut self.live
    }

    pub fn sent(&self) -> &[(u64, SimCommand<SandboxUnit>)] {
        &self.sent
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    pub fn chat_sounds(&self) -> usize {
        self.chat_sounds
    }

    pub fn launches(&self) -> &[LaunchEvent] {
        &self.launches
    }

    pub fn applied_settings(&self) -> Option<&Settings> {
        self.applied_settings.as_ref()
    }

    pub fn reveal_map(&self) -> bool {
        self.reveal_map
    }

    /// Make the next [`Launcher::start_map`] call fail with `message`.
    pub fn fail_map_start(&mut self, message: &str) {
        self.map_error = Some(message.to_string());
    }

    /// Digest of everything the simulation has done so far.
    pub fn state_hash(&self) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.write_u64(self.cycle);
        hasher.write_u32(self.seed);
        hasher.write_u64(self.sent.len() as u64);
        for (cycle, command) in &self.sent {
            hasher.write_u64(*cycle);
            hasher.write(format!("{command:?}").as_bytes());
        }
        hasher.finish()
    }
}

impl UnitRegistry for SandboxWorld {
    type Unit = SandboxUnit;

    fn resolve_unit(&self, slot: UnitSlot) -> Option<SandboxUnit> {
        self.units.get(slot.0 as usize).cloned().flatten()
    }

    fn unit_slot(&self, unit: &SandboxUnit) -> UnitSlot {
        unit.slot
    }

    fn unit_type_ident(&self, unit: &SandboxUnit) -> String {
        unit.type_ident.clone()
    }
}

impl GameState for SandboxWorld {
    fn current_cycle(&self) -> u64 {
        self.cycle
    }

    fn sync_seed(&self) -> u32 {
        self.seed
    }

    fn snapshot(&self) -> LiveSnapshot {
        self.live.clone()
    }
}

impl Simulation for SandboxWorld {
    fn send(&mut self, command: SimCommand<SandboxUnit>) {
        let digest = xxh3_64(format!("{command:?}").as_bytes());
        self.seed ^= digest as u32 ^ self.rng.next_u32();
        self.sent.push((self.cycle, command));
    }

    fn notify(&mut self, text: &str) {
        self.notifications.push(text.to_string());
    }

    fn play_chat_sound(&mut self) {
        self.chat_sounds += 1;
    }

    fn set_player_name(&mut self, player: usize, name: &str) {
        if let Some(slot) = self.live.player_names.get_mut(player) {
            *slot = name.to_string();
        }
    }
}

impl Launcher for SandboxWorld {
    fn clean_players(&mut self) {
        self.launches.push(LaunchEvent::CleanPlayers);
        self.live.player_names = Default::default();
    }

    fn configure_replay_network(&mut self, local_player: usize) {
        self.launches.push(LaunchEvent::ConfigureNetwork { local_player });
        self.live.local_player = local_player;
    }

    fn apply_settings(&mut self, settings: &Settings, map_path: &str) {
        self.launches.push(LaunchEvent::ApplySettings { map_path: map_path.to_string() });
        self.live.settings = settings.clone();
        self.live.map.path = map_path.to_string();
        self.applied_settings = Some(settings.clone());
    }

    fn set_reveal_map(&mut self, reveal: bool) {
        self.launches.push(LaunchEvent::RevealMap(reveal));
        self.reveal_map = reveal;
    }

    fn start_map(&mut self, map_path: &str) -> Result<(), String> {
        self.launches.push(LaunchEvent::StartMap(map_path.to_string()));
        match self.map_error.take() {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }

    fn engine_version(&self) -> VersionTriple {
        self.live.engine
    }

    fn protocol_version(&self) -> VersionTriple {
        self.live.protocol
    }
}
