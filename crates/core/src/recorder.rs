//! Live command recording.
//!
//! Every issued command becomes a [`LogEntry`] appended to the active
//! session and mirrored to an append-only log file. The session and the
//! file are created lazily on the first call of a game.

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use tracing::{debug, error, info};

use crate::config::ReplayConfig;
use crate::entry::{Action, LogEntry};
use crate::error::ReplayError;
use crate::host::GameState;
use crate::log_file::LogWriter;
use crate::session::ReplaySession;
use crate::types::Pos;

/// Arguments of one issued command, borrowed from the caller.
#[derive(Debug)]
pub struct CommandArgs<'a, U> {
    action: Action,
    unit: Option<&'a U>,
    flush: i32,
    pos: Option<Pos>,
    dest: Option<&'a U>,
    value: Option<&'a str>,
    num: Option<i32>,
}

impl<'a, U> CommandArgs<'a, U> {
    pub fn new(action: Action) -> Self {
        Self { action, unit: None, flush: 0, pos: None, dest: None, value: None, num: None }
    }

    pub fn unit(mut self, unit: &'a U) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn flush(mut self, flush: i32) -> Self {
        self.flush = flush;
        self
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.pos = Pos::from_raw(x, y);
        self
    }

    pub fn target(mut self, dest: &'a U) -> Self {
        self.dest = Some(dest);
        self
    }

    pub fn value(mut self, value: &'a str) -> Self {
        self.value = Some(value);
        self
    }

    pub fn num(mut self, num: i32) -> Self {
        self.num = Some(num);
        self
    }

    fn into_entry<G: GameState<Unit = U>>(self, game: &G) -> LogEntry {
        LogEntry {
            cycle: game.current_cycle(),
            unit: self.unit.map(|unit| game.unit_slot(unit)),
            unit_ident: self.unit.map(|unit| game.unit_type_ident(unit)).unwrap_or_default(),
            action: self.action,
            flush: self.flush,
            pos: self.pos,
            dest: self.dest.map(|dest| game.unit_slot(dest)),
            value: self.value.filter(|value| !value.is_empty()).map(str::to_string),
            num: self.num.filter(|num| *num >= 0),
            sync_seed: game.sync_seed(),
        }
    }
}

/// Owns the live log file. The session itself is owned by the caller.
#[derive(Default)]
pub struct Recorder {
    log: Option<LogWriter>,
    log_path: Option<PathBuf>,
    last_log_path: Option<PathBuf>,
    failed: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one command, or only make sure the log is open when `command`
    /// is `None`.
    ///
    /// Never fails: an I/O error disables recording for the rest of the run.
    pub fn record<G: GameState>(
        &mut self,
        session: &mut Option<ReplaySession>,
        game: &G,
        config: &ReplayConfig,
        command: Option<CommandArgs<'_, G::Unit>>,
    ) {
        if self.failed {
            return;
        }
        if self.log.is_none() {
            // The session only comes into being once its log file is open.
            let opened = match session.as_ref() {
                Some(existing) => self.open(existing, config),
                None => {
                    let fresh = ReplaySession::from_live(game.snapshot(), local_date());
                    let opened = self.open(&fresh, config);
                    if opened.is_ok() {
                        *session = Some(fresh);
                    }
                    opened
                }
            };
            if let Err(err) = opened {
                error!(%err, "can't open replay log; recording disabled for this run");
                self.failed = true;
                return;
            }
        }

        let Some(command) = command else {
            return;
        };
        let session =
            session.get_or_insert_with(|| ReplaySession::from_live(game.snapshot(), local_date()));
        let entry = command.into_entry(game);
        debug!(cycle = entry.cycle, action = %entry.action, "recording command");
        let appended = match &mut self.log {
            Some(log) => log.append(&entry),
            None => Ok(()),
        };
        session.push(entry);
        if let Err(err) = appended {
            error!(
                %err,
                path = ?self.log_path,
                "can't write replay log; recording disabled for this run"
            );
            self.log = None;
            self.failed = true;
        }
    }

    fn open(&mut self, session: &ReplaySession, config: &ReplayConfig) -> Result<(), ReplayError> {
        let path = unique_log_path(
            &config.logs_dir(),
            &config.log_prefix,
            session.header.local_player,
            Utc::now().timestamp(),
        );
        let mut log = LogWriter::create(&path)?;
        log.write_session(session)?;
        info!(path = %path.display(), entries = session.len(), "replay log opened");
        self.log = Some(log);
        self.log_path = Some(path.clone());
        self.last_log_path = Some(path);
        Ok(())
    }

    /// Close the current log file. The next recorded command opens a new one.
    pub fn close(&mut self) {
        if self.log.take().is_some() {
            debug!(path = ?self.log_path, "replay log closed");
        }
        self.log_path = None;
    }

    pub fn is_open(&self) -> bool {
        self.log.is_some()
    }

    /// Whether an I/O failure has turned recording off for this run.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// The most recently opened log file, kept after it is closed.
    pub fn last_log_path(&self) -> Option<&Path> {
        self.last_log_path.as_deref()
    }
}

fn local_date() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `{prefix}_{player}_{timestamp}.log`, with a counter appended when a log
/// from the same second already exists.
fn unique_log_path(dir: &Path, prefix: &str, local_player: usize, timestamp: i64) -> PathBuf {
    let base = format!("{prefix}_{local_player}_{timestamp}");
    let mut path = dir.join(format!("{base}.log"));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(format!("{base}_{counter}.log"));
        counter += 1;
    }
    path
}
