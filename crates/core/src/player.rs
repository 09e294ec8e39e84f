//! Playback of a loaded session, one simulation cycle at a time.
//!
//! The player walks the session's entries with a cursor. Each call to
//! [`Player::advance`] dispatches every entry recorded for the current
//! cycle, in log order, and checks the recorded sync seed against the live
//! one before each dispatch.

use tracing::{debug, error, info, warn};

use crate::command::{self, Dispatch, DispatchError};
use crate::config::SyncCheckMode;
use crate::entry::LogEntry;
use crate::host::Simulation;
use crate::session::ReplaySession;

pub const END_OF_REPLAY: &str = "End of replay";
pub const OUT_OF_SYNC: &str = "Replay got out of sync !";
pub const NO_SYNC_INFO: &str = "No sync info for this replay !";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// No session loaded.
    #[default]
    Idle,
    /// Session loaded; names not applied and cursor not placed yet.
    Initializing,
    Stepping { cursor: usize },
    /// Cursor ran off the end, or playback was aborted on a desync.
    Exhausted,
}

/// What one [`Player::advance`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Inactive,
    /// Next entry belongs to another cycle; nothing was touched.
    Waiting { next_cycle: u64 },
    Dispatched { count: usize },
    /// The last entry was dispatched in this call (or there were none).
    Finished { dispatched: usize },
    /// Strict sync check failed; `cycle` is the entry that was not applied.
    Desynced { cycle: u64, dispatched: usize },
    Exhausted,
}

impl StepOutcome {
    /// Playback ended during this call.
    pub fn ended(self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Desynced { .. })
    }
}

#[derive(Debug)]
pub struct Player {
    state: PlaybackState,
    sync_check: SyncCheckMode,
    desyncs: u64,
}

impl Player {
    pub fn new(sync_check: SyncCheckMode) -> Self {
        Self { state: PlaybackState::Idle, sync_check, desyncs: 0 }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Index of the next entry to dispatch, if stepping.
    pub fn cursor(&self) -> Option<usize> {
        match self.state {
            PlaybackState::Stepping { cursor } => Some(cursor),
            _ => None,
        }
    }

    /// Sync mismatches seen since the session was loaded.
    pub fn desync_count(&self) -> u64 {
        self.desyncs
    }

    pub fn sync_check(&self) -> SyncCheckMode {
        self.sync_check
    }

    pub fn set_sync_check(&mut self, sync_check: SyncCheckMode) {
        self.sync_check = sync_check;
    }

    /// Arm playback for a freshly installed session.
    pub fn load(&mut self) {
        debug_assert_eq!(self.state, PlaybackState::Idle, "replay loaded over an active playback");
        self.state = PlaybackState::Initializing;
        self.desyncs = 0;
    }

    pub fn reset(&mut self) {
        self.state = PlaybackState::Idle;
        self.desyncs = 0;
    }

    /// Step playback for the simulation's current cycle.
    pub fn advance<S: Simulation>(&mut self, session: &ReplaySession, sim: &mut S) -> StepOutcome {
        let mut cursor = match self.state {
            PlaybackState::Idle => return StepOutcome::Inactive,
            PlaybackState::Exhausted => return StepOutcome::Exhausted,
            PlaybackState::Stepping { cursor } => cursor,
            PlaybackState::Initializing => {
                for (player, name) in session.header.player_names.iter().enumerate() {
                    if !name.is_empty() {
                        sim.set_player_name(player, name);
                    }
                }
                info!(entries = session.len(), "replay playback started");
                0
            }
        };

        let entries = session.entries();
        let now = sim.current_cycle();
        let mut dispatched = 0;
        while let Some(entry) = entries.get(cursor) {
            if entry.cycle != now {
                break;
            }
            if !self.check_sync(entry, sim) {
                self.state = PlaybackState::Exhausted;
                return StepOutcome::Desynced { cycle: entry.cycle, dispatched };
            }
            dispatch(entry, sim);
            dispatched += 1;
            cursor += 1;
        }

        match entries.get(cursor) {
            None => {
                self.state = PlaybackState::Exhausted;
                info!(desyncs = self.desyncs, "replay playback finished");
                sim.notify(END_OF_REPLAY);
                StepOutcome::Finished { dispatched }
            }
            Some(next) => {
                self.state = PlaybackState::Stepping { cursor };
                if dispatched == 0 {
                    StepOutcome::Waiting { next_cycle: next.cycle }
                } else {
                    StepOutcome::Dispatched { count: dispatched }
                }
            }
        }
    }

    /// Returns `false` when playback must stop before `entry`.
    fn check_sync<S: Simulation>(&mut self, entry: &LogEntry, sim: &mut S) -> bool {
        let live = sim.sync_seed();
        if live == entry.sync_seed {
            return true;
        }
        self.desyncs += 1;
        match self.sync_check {
            SyncCheckMode::Strict => {
                error!(
                    cycle = entry.cycle,
                    recorded = entry.sync_seed,
                    live,
                    "replay out of sync; remaining entries dropped"
                );
                sim.notify(OUT_OF_SYNC);
                false
            }
            SyncCheckMode::Diagnostic => {
                if entry.sync_seed == 0 {
                    sim.notify(NO_SYNC_INFO);
                } else {
                    warn!(
                        cycle = entry.cycle,
                        action = %entry.action,
                        unit = ?entry.unit,
                        unit_ident = %entry.unit_ident,
                        recorded = format_args!("{:#010x}", entry.sync_seed),
                        live = format_args!("{live:#010x}"),
                        "replay out of sync"
                    );
                    sim.notify(&format!("Replay got out of sync ({}) !", entry.cycle));
                }
                true
            }
        }
    }
}

fn dispatch<S: Simulation>(entry: &LogEntry, sim: &mut S) {
    if let Some(slot) = entry.unit
        && !entry.unit_ident.is_empty()
        && let Some(unit) = sim.resolve_unit(slot)
    {
        let live_ident = sim.unit_type_ident(&unit);
        if live_ident != entry.unit_ident {
            warn!(
                cycle = entry.cycle,
                %slot,
                recorded = %entry.unit_ident,
                live = %live_ident,
                "replay unit type differs from recording"
            );
        }
    }

    match command::resolve(entry, &*sim) {
        Ok(Dispatch::Send(command)) => {
            debug!(cycle = entry.cycle, action = %entry.action, "replaying command");
            sim.send(command);
        }
        Ok(Dispatch::Chat(text)) => {
            sim.notify(&text);
            sim.play_chat_sound();
        }
        Err(DispatchError::UnknownAction(tag)) => {
            warn!(cycle = entry.cycle, action = %tag, "invalid action in replay; skipped");
        }
        Err(err) => {
            warn!(cycle = entry.cycle, %err, "replay entry skipped");
        }
    }
}

#[cfg(test)]
mod tests;
