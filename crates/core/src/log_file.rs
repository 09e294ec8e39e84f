//! File-backed replay log in line-delimited JSON.
//!
//! The file format is line-delimited JSON:
//! - Line 1: session header (comments, map, local player, one tuple per
//!   player slot, flattened settings, engine and protocol versions).
//! - Lines 2+: one record per recorded command, in recording order.
//!
//! Optional record fields are left out while they hold their sentinel
//! (`-1` or empty). Loading is strict: unknown keys, wrong-length arrays,
//! missing required keys, and cycles that go backwards reject the file.
//! The live recorder flushes after every record so the file survives crashes.

use std::array;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::entry::{Action, LogEntry};
use crate::error::ReplayError;
use crate::session::{MapInfo, ReplaySession, SessionHeader};
use crate::settings::{NetGameType, PlayerPreset, PlayerType, Settings};
use crate::types::{PLAYER_MAX, Pos, UnitSlot, VersionTriple};

// ---------------------------------------------------------------------------
// File format structs
// ---------------------------------------------------------------------------

/// One element of the header's `Players` array.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default, rename_all = "PascalCase")]
struct FilePlayer {
    name: String,
    #[serde(rename = "AIScript")]
    ai_script: String,
    player_color: i32,
    race: i32,
    team: i32,
    #[serde(rename = "Type")]
    player_type: i32,
}

impl Default for FilePlayer {
    fn default() -> Self {
        Self::from_slot("", &PlayerPreset::default())
    }
}

impl FilePlayer {
    fn from_slot(name: &str, preset: &PlayerPreset) -> Self {
        Self {
            name: name.to_string(),
            ai_script: preset.ai_script.clone(),
            player_color: preset.player_color,
            race: preset.race,
            team: preset.team,
            player_type: preset.player_type.code(),
        }
    }
}

/// First line of the log. Field order is the on-disk key order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default, rename_all = "PascalCase")]
struct FileHeader {
    comment1: String,
    comment2: String,
    comment3: String,
    date: String,
    map: String,
    map_path: String,
    map_id: u32,
    local_player: i64,
    players: [FilePlayer; PLAYER_MAX],
    net_game_type: i32,
    game_type: i32,
    difficulty: i32,
    resources: i32,
    num_units: i32,
    opponents: i32,
    reveal_map: i32,
    no_fog_of_war: i32,
    engine: [i32; 3],
    network: [i32; 3],
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::from_header(&SessionHeader::default())
    }
}

impl FileHeader {
    fn from_header(header: &SessionHeader) -> Self {
        let [comment1, comment2, comment3] = header.comments.clone();
        let settings = &header.settings;
        Self {
            comment1,
            comment2,
            comment3,
            date: header.date.clone(),
            map: header.map.description.clone(),
            map_path: header.map.path.clone(),
            map_id: header.map.uid,
            local_player: header.local_player as i64,
            players: array::from_fn(|slot| {
                FilePlayer::from_slot(&header.player_names[slot], &settings.presets[slot])
            }),
            net_game_type: settings.net_game_type.code(),
            game_type: settings.game_type,
            difficulty: settings.difficulty,
            resources: settings.resources,
            num_units: settings.num_units,
            opponents: settings.opponents,
            reveal_map: settings.reveal_map,
            no_fog_of_war: i32::from(settings.no_fog_of_war),
            engine: header.engine.to_array(),
            network: header.protocol.to_array(),
        }
    }

    fn into_header(self) -> Result<SessionHeader, String> {
        let local_player = usize::try_from(self.local_player)
            .ok()
            .filter(|player| *player < PLAYER_MAX)
            .ok_or_else(|| format!("LocalPlayer {} is not a player slot", self.local_player))?;
        let net_game_type = NetGameType::from_code(self.net_game_type)
            .ok_or_else(|| format!("unknown NetGameType {}", self.net_game_type))?;

        let mut player_names: [String; PLAYER_MAX] = Default::default();
        let mut presets: [PlayerPreset; PLAYER_MAX] = Default::default();
        for (slot, player) in self.players.into_iter().enumerate() {
            let player_type = PlayerType::from_code(player.player_type)
                .ok_or_else(|| format!("player {slot} has unknown Type {}", player.player_type))?;
            player_names[slot] = player.name;
            presets[slot] = PlayerPreset {
                ai_script: player.ai_script,
                player_color: player.player_color,
                race: player.race,
                team: player.team,
                player_type,
            };
        }

        Ok(SessionHeader {
            comments: [self.comment1, self.comment2, self.comment3],
            date: self.date,
            map: MapInfo { description: self.map, path: self.map_path, uid: self.map_id },
            local_player,
            player_names,
            settings: Settings {
                net_game_type,
                game_type: self.game_type,
                difficulty: self.difficulty,
                resources: self.resources,
                num_units: self.num_units,
                opponents: self.opponents,
                reveal_map: self.reveal_map,
                no_fog_of_war: self.no_fog_of_war != 0,
                presets,
            },
            engine: VersionTriple::from_array(self.engine),
            protocol: VersionTriple::from_array(self.network),
        })
    }
}

fn no_unit() -> i64 {
    -1
}

fn no_coord() -> i32 {
    -1
}

/// Record line as read back. Missing optional keys keep their sentinels.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
struct FileRecord {
    game_cycle: u64,
    #[serde(default = "no_unit")]
    unit_number: i64,
    #[serde(default)]
    unit_ident: String,
    action: String,
    #[serde(default)]
    flush: i32,
    #[serde(default = "no_coord")]
    pos_x: i32,
    #[serde(default = "no_coord")]
    pos_y: i32,
    #[serde(default = "no_unit")]
    dest_unit_number: i64,
    #[serde(default)]
    value: String,
    #[serde(default = "no_coord")]
    num: i32,
    #[serde(default)]
    sync_rand_seed: i64,
}

impl FileRecord {
    fn into_entry(self) -> Result<LogEntry, String> {
        Ok(LogEntry {
            cycle: self.game_cycle,
            unit: UnitSlot::from_raw(self.unit_number)?,
            unit_ident: self.unit_ident,
            action: Action::from_tag(&self.action),
            flush: self.flush,
            pos: Pos::from_raw(self.pos_x, self.pos_y),
            dest: UnitSlot::from_raw(self.dest_unit_number)?,
            value: Some(self.value).filter(|value| !value.is_empty()),
            num: (self.num >= 0).then_some(self.num),
            sync_seed: seed_from_raw(self.sync_rand_seed)?,
        })
    }
}

/// Seeds are written signed; accept either reading of the 32 bits.
fn seed_from_raw(raw: i64) -> Result<u32, String> {
    if let Ok(signed) = i32::try_from(raw) {
        return Ok(signed as u32);
    }
    u32::try_from(raw).map_err(|_| format!("SyncRandSeed {raw} does not fit in 32 bits"))
}

/// Record line as written, with the fixed key order and sentinel omission.
struct EntryLine<'a>(&'a LogEntry);

impl Serialize for EntryLine<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entry = self.0;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("GameCycle", &entry.cycle)?;
        if let Some(unit) = entry.unit {
            map.serialize_entry("UnitNumber", &unit.0)?;
        }
        if !entry.unit_ident.is_empty() {
            map.serialize_entry("UnitIdent", &entry.unit_ident)?;
        }
        map.serialize_entry("Action", entry.action.tag())?;
        map.serialize_entry("Flush", &entry.flush)?;
        if let Some(pos) = entry.pos.filter(|pos| pos.x >= 0 || pos.y >= 0) {
            map.serialize_entry("PosX", &pos.x)?;
            map.serialize_entry("PosY", &pos.y)?;
        }
        if let Some(dest) = entry.dest {
            map.serialize_entry("DestUnitNumber", &dest.0)?;
        }
        if let Some(value) = entry.value.as_deref().filter(|value| !value.is_empty()) {
            map.serialize_entry("Value", value)?;
        }
        if let Some(num) = entry.num.filter(|num| *num >= 0) {
            map.serialize_entry("Num", &num)?;
        }
        map.serialize_entry("SyncRandSeed", &(entry.sync_seed as i32))?;
        map.end()
    }
}

/// Render one entry exactly as it appears on its log line.
pub fn entry_to_line(entry: &LogEntry) -> Result<String, ReplayError> {
    Ok(serde_json::to_string(&EntryLine(entry))?)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Writes a session header and appends entries, flushing after each line.
///
/// Generic over the sink so save games can embed a session in their own
/// stream; live recording uses a buffered file.
pub struct LogWriter<W: Write = BufWriter<File>> {
    writer: W,
    entries_written: u64,
}

impl LogWriter<BufWriter<File>> {
    /// Create (or truncate) a log file, creating parent directories.
    pub fn create(path: &Path) -> Result<Self, ReplayError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> LogWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, entries_written: 0 }
    }

    /// Write the header line followed by every entry already in the session.
    pub fn write_session(&mut self, session: &ReplaySession) -> Result<(), ReplayError> {
        let header_json = serde_json::to_string(&FileHeader::from_header(&session.header))?;
        writeln!(self.writer, "{header_json}")?;
        for entry in session.entries() {
            self.write_entry(entry)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Append one entry and flush immediately.
    pub fn append(&mut self, entry: &LogEntry) -> Result<(), ReplayError> {
        self.write_entry(entry)?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_entry(&mut self, entry: &LogEntry) -> Result<(), ReplayError> {
        let line = entry_to_line(entry)?;
        writeln!(self.writer, "{line}")?;
        self.entries_written += 1;
        Ok(())
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Write a whole session to `writer`.
pub fn write_session<W: Write>(writer: W, session: &ReplaySession) -> Result<(), ReplayError> {
    LogWriter::new(writer).write_session(session)
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load and validate a replay log file.
pub fn load_session_from_file(path: &Path) -> Result<ReplaySession, ReplayError> {
    let content = fs::read_to_string(path)?;
    parse_session(&content)
}

/// Parse a complete log. Stops at the first invalid or incomplete line.
pub fn parse_session(content: &str) -> Result<ReplaySession, ReplayError> {
    if content.is_empty() {
        return Err(ReplayError::EmptyFile);
    }
    let has_trailing_newline = content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Err(ReplayError::EmptyFile);
    }
    if !has_trailing_newline {
        return Err(ReplayError::IncompleteLine { line: lines.len() });
    }

    // --- header (line 1) ---
    let header: FileHeader = serde_json::from_str(lines[0])
        .map_err(|e| ReplayError::InvalidHeader { line: 1, message: e.to_string() })?;
    let header = header
        .into_header()
        .map_err(|message| ReplayError::InvalidHeader { line: 1, message })?;
    let mut session = ReplaySession::new(header);

    // --- entries (lines 2+) ---
    for (line_index, line) in lines.iter().skip(1).enumerate() {
        let line_number = line_index + 2; // 1-indexed; header is line 1
        let invalid = |message: String| ReplayError::InvalidRecord { line: line_number, message };

        if line.is_empty() {
            return Err(invalid("empty line".to_string()));
        }

        let record: FileRecord = serde_json::from_str(line).map_err(|e| invalid(e.to_string()))?;
        let entry = record.into_entry().map_err(invalid)?;

        if let Some(previous) = session.last_cycle()
            && entry.cycle < previous
        {
            return Err(invalid(format!(
                "GameCycle {} is earlier than the previous entry's {previous}",
                entry.cycle
            )));
        }

        session.push(entry);
    }

    Ok(session)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
