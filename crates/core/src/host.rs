//! Engine-side collaborators the replay subsystem drives.
//!
//! The engine implements these once; recording, playback and the
//! controller only ever see the traits.

use std::fmt;

use crate::command::SimCommand;
use crate::session::LiveSnapshot;
use crate::settings::Settings;
use crate::types::{UnitSlot, VersionTriple};

/// Lookup between stable unit slots and live unit handles.
pub trait UnitRegistry {
    type Unit: Clone + fmt::Debug;

    fn resolve_unit(&self, slot: UnitSlot) -> Option<Self::Unit>;
    fn unit_slot(&self, unit: &Self::Unit) -> UnitSlot;
    fn unit_type_ident(&self, unit: &Self::Unit) -> String;
}

/// Read access to the running game, as needed while recording.
pub trait GameState: UnitRegistry {
    fn current_cycle(&self) -> u64;
    /// Current state of the deterministic sync random generator.
    fn sync_seed(&self) -> u32;
    fn snapshot(&self) -> LiveSnapshot;
}

/// The simulation as seen by playback.
pub trait Simulation: GameState {
    fn send(&mut self, command: SimCommand<Self::Unit>);
    /// One-line in-game message to the local viewer.
    fn notify(&mut self, text: &str);
    fn play_chat_sound(&mut self);
    fn set_player_name(&mut self, player: usize, name: &str);
}

/// Game start-up hooks used when a replay is launched.
pub trait Launcher {
    fn clean_players(&mut self);
    /// Rebuild a two-party spectator network around the recorded local player.
    fn configure_replay_network(&mut self, local_player: usize);
    fn apply_settings(&mut self, settings: &Settings, map_path: &str);
    fn set_reveal_map(&mut self, reveal: bool);
    fn start_map(&mut self, map_path: &str) -> Result<(), String>;
    fn engine_version(&self) -> VersionTriple;
    fn protocol_version(&self) -> VersionTriple;
}
