//! Replay lifecycle: one owner for the active session, the live recorder
//! and the playback cursor.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::ReplayConfig;
use crate::error::ReplayError;
use crate::host::{GameState, Launcher, Simulation};
use crate::log_file::{self, load_session_from_file};
use crate::player::{Player, StepOutcome};
use crate::recorder::{CommandArgs, Recorder};
use crate::session::ReplaySession;
use crate::types::ReplayMode;

pub struct ReplayController {
    config: ReplayConfig,
    session: Option<ReplaySession>,
    recorder: Recorder,
    player: Player,
    mode: ReplayMode,
    recording_enabled: bool,
    disabled_for_replay: bool,
    observing: bool,
    reveal_map: bool,
}

impl ReplayController {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            recording_enabled: config.record_commands,
            player: Player::new(config.sync_check),
            config,
            session: None,
            recorder: Recorder::new(),
            mode: ReplayMode::None,
            disabled_for_replay: false,
            observing: false,
            reveal_map: false,
        }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&ReplaySession> {
        self.session.as_ref()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn mode(&self) -> ReplayMode {
        self.mode
    }

    /// A replay (single or multiplayer) is being watched.
    pub fn is_replay_game(&self) -> bool {
        self.mode != ReplayMode::None
    }

    /// The local viewer is a passive spectator of a running replay.
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn reveal_map(&self) -> bool {
        self.reveal_map
    }

    /// Recording switch, as set by the administrator for live games.
    pub fn set_recording_enabled(&mut self, enabled: bool) {
        self.recording_enabled = enabled;
    }

    /// Whether the next command issued would be recorded.
    pub fn is_recording(&self) -> bool {
        self.recording_enabled && !self.disabled_for_replay && !self.recorder.has_failed()
    }

    pub fn last_log_path(&self) -> Option<&Path> {
        self.recorder.last_log_path()
    }

    // -- recording --

    /// Open the live log and write its header before any command is issued.
    pub fn begin_recording<G: GameState>(&mut self, game: &G) {
        if self.is_recording() {
            self.recorder.record(&mut self.session, game, &self.config, None);
        }
    }

    /// Record one issued command.
    pub fn record<G: GameState>(&mut self, game: &G, command: CommandArgs<'_, G::Unit>) {
        if self.is_recording() {
            self.recorder.record(&mut self.session, game, &self.config, Some(command));
        }
    }

    // -- playback --

    /// Load the log at `path` and launch its map as a replay.
    pub fn start<L: Launcher>(
        &mut self,
        launcher: &mut L,
        path: &Path,
        reveal_map: bool,
    ) -> Result<(), ReplayError> {
        if self.session.is_some() {
            return Err(ReplayError::SessionActive);
        }
        self.player.reset();
        let session = load_session_from_file(path)?;

        let compatibility =
            session.compatibility(launcher.engine_version(), launcher.protocol_version());
        if !compatibility.engine_matches {
            warn!(
                recorded = %session.header.engine,
                running = %launcher.engine_version(),
                "replay was recorded with a different engine version"
            );
        }
        if !compatibility.protocol_matches {
            warn!(
                recorded = %session.header.protocol,
                running = %launcher.protocol_version(),
                "replay was recorded with a different network protocol"
            );
        }

        launcher.clean_players();
        self.mode = if session.is_multiplayer() {
            launcher.configure_replay_network(session.header.local_player);
            ReplayMode::MultiPlayer
        } else {
            ReplayMode::SinglePlayer
        };
        launcher.apply_settings(&session.header.settings, &session.header.map.path);
        self.disabled_for_replay = true;
        self.reveal_map = reveal_map;
        launcher.set_reveal_map(reveal_map);
        self.observing = true;

        let map_path = session.header.map.path.clone();
        info!(
            path = %path.display(),
            map = %map_path,
            entries = session.len(),
            mode = ?self.mode,
            "starting replay"
        );
        self.session = Some(session);
        self.player.load();

        if let Err(message) = launcher.start_map(&map_path) {
            self.clean();
            return Err(ReplayError::MapStart { path: map_path, message });
        }
        Ok(())
    }

    /// Install a session restored from a save game and keep recording on top
    /// of it. Recorded settings are not applied.
    pub fn restore_session(&mut self, session: ReplaySession) {
        self.end_log();
        info!(entries = session.len(), "replay session restored");
        self.session = Some(session);
        self.mode = ReplayMode::None;
        self.observing = false;
        self.disabled_for_replay = false;
        self.recording_enabled = self.config.record_commands;
    }

    /// Write the active session, header and entries, to `writer`.
    /// Does nothing when no session is active.
    pub fn save_replay_list<W: Write>(&self, writer: W) -> Result<(), ReplayError> {
        match &self.session {
            Some(session) => log_file::write_session(writer, session),
            None => Ok(()),
        }
    }

    /// Copy the last written live log to `name` inside the logs directory.
    pub fn save(&self, name: &str) -> Result<PathBuf, ReplayError> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(ReplayError::InvalidFileName(name.to_string()));
        }
        let source = self.recorder.last_log_path().ok_or(ReplayError::NoLogWritten)?;
        let destination = self.config.logs_dir().join(name);
        if destination != source {
            fs::copy(source, &destination)
                .map_err(|err| ReplayError::Copy { path: destination.clone(), source: err })?;
        }
        info!(from = %source.display(), to = %destination.display(), "replay saved");
        Ok(destination)
    }

    /// Step playback for the current cycle, whatever the replay mode.
    pub fn advance<S: Simulation>(&mut self, sim: &mut S) -> StepOutcome {
        let Some(session) = &self.session else {
            return StepOutcome::Inactive;
        };
        let outcome = self.player.advance(session, sim);
        if outcome.ended() {
            self.observing = false;
        }
        outcome
    }

    pub fn advance_single_player<S: Simulation>(&mut self, sim: &mut S) -> StepOutcome {
        if self.mode != ReplayMode::SinglePlayer {
            return StepOutcome::Inactive;
        }
        self.advance(sim)
    }

    pub fn advance_multi_player<S: Simulation>(&mut self, sim: &mut S) -> StepOutcome {
        if self.mode != ReplayMode::MultiPlayer {
            return StepOutcome::Inactive;
        }
        self.advance(sim)
    }

    // -- teardown --

    /// End of a game: close the log and drop the session and cursor.
    /// Mode and recording flags are left alone.
    pub fn end_log(&mut self) {
        self.recorder.close();
        self.session = None;
        self.player.reset();
    }

    /// Full reset. Safe to call in any state.
    pub fn clean(&mut self) {
        self.end_log();
        self.mode = ReplayMode::None;
        self.recording_enabled = self.config.record_commands;
        self.disabled_for_replay = false;
        self.observing = false;
        self.reveal_map = false;
    }
}
