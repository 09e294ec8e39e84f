use std::fmt;

use crate::types::{Pos, UnitSlot};

/// Command tag of a recorded entry, resolved once when the entry is built
/// or parsed. Tags outside the dispatch table survive as `Unknown` so the
/// log still round-trips; playback logs and skips them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Stop,
    StandGround,
    Defend,
    Follow,
    Move,
    Repair,
    AutoRepair,
    Attack,
    AttackGround,
    Patrol,
    Board,
    Unload,
    Build,
    Explore,
    Dismiss,
    ResourceLoc,
    Resource,
    Return,
    Train,
    CancelTrain,
    UpgradeTo,
    CancelUpgradeTo,
    Research,
    CancelResearch,
    SpellCast,
    AutoSpellCast,
    Diplomacy,
    SharedVision,
    Input,
    Chat,
    Quit,
    Unknown(String),
}

impl Action {
    /// Every tag the dispatcher understands, in vocabulary order.
    pub const KNOWN: [Action; 31] = [
        Action::Stop,
        Action::StandGround,
        Action::Defend,
        Action::Follow,
        Action::Move,
        Action::Repair,
        Action::AutoRepair,
        Action::Attack,
        Action::AttackGround,
        Action::Patrol,
        Action::Board,
        Action::Unload,
        Action::Build,
        Action::Explore,
        Action::Dismiss,
        Action::ResourceLoc,
        Action::Resource,
        Action::Return,
        Action::Train,
        Action::CancelTrain,
        Action::UpgradeTo,
        Action::CancelUpgradeTo,
        Action::Research,
        Action::CancelResearch,
        Action::SpellCast,
        Action::AutoSpellCast,
        Action::Diplomacy,
        Action::SharedVision,
        Action::Input,
        Action::Chat,
        Action::Quit,
    ];

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "stop" => Self::Stop,
            "stand-ground" => Self::StandGround,
            "defend" => Self::Defend,
            "follow" => Self::Follow,
            "move" => Self::Move,
            "repair" => Self::Repair,
            "auto-repair" => Self::AutoRepair,
            "attack" => Self::Attack,
            "attack-ground" => Self::AttackGround,
            "patrol" => Self::Patrol,
            "board" => Self::Board,
            "unload" => Self::Unload,
            "build" => Self::Build,
            "explore" => Self::Explore,
            "dismiss" => Self::Dismiss,
            "resource-loc" => Self::ResourceLoc,
            "resource" => Self::Resource,
            "return" => Self::Return,
            "train" => Self::Train,
            "cancel-train" => Self::CancelTrain,
            "upgrade-to" => Self::UpgradeTo,
            "cancel-upgrade-to" => Self::CancelUpgradeTo,
            "research" => Self::Research,
            "cancel-research" => Self::CancelResearch,
            "spell-cast" => Self::SpellCast,
            "auto-spell-cast" => Self::AutoSpellCast,
            "diplomacy" => Self::Diplomacy,
            "shared-vision" => Self::SharedVision,
            "input" => Self::Input,
            "chat" => Self::Chat,
            "quit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::StandGround => "stand-ground",
            Self::Defend => "defend",
            Self::Follow => "follow",
            Self::Move => "move",
            Self::Repair => "repair",
            Self::AutoRepair => "auto-repair",
            Self::Attack => "attack",
            Self::AttackGround => "attack-ground",
            Self::Patrol => "patrol",
            Self::Board => "board",
            Self::Unload => "unload",
            Self::Build => "build",
            Self::Explore => "explore",
            Self::Dismiss => "dismiss",
            Self::ResourceLoc => "resource-loc",
            Self::Resource => "resource",
            Self::Return => "return",
            Self::Train => "train",
            Self::CancelTrain => "cancel-train",
            Self::UpgradeTo => "upgrade-to",
            Self::CancelUpgradeTo => "cancel-upgrade-to",
            Self::Research => "research",
            Self::CancelResearch => "cancel-research",
            Self::SpellCast => "spell-cast",
            Self::AutoSpellCast => "auto-spell-cast",
            Self::Diplomacy => "diplomacy",
            Self::SharedVision => "shared-vision",
            Self::Input => "input",
            Self::Chat => "chat",
            Self::Quit => "quit",
            Self::Unknown(tag) => tag,
        }
    }

    /// Global actions are not issued to a unit.
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            Self::Diplomacy | Self::SharedVision | Self::Input | Self::Chat | Self::Quit
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One recorded command. Optional arguments hold `None` where the log
/// format uses a `-1` or empty-string sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub cycle: u64,
    pub unit: Option<UnitSlot>,
    /// Type identifier of the acting unit, kept for readability and cross-checks.
    pub unit_ident: String,
    pub action: Action,
    pub flush: i32,
    pub pos: Option<Pos>,
    pub dest: Option<UnitSlot>,
    pub value: Option<String>,
    pub num: Option<i32>,
    /// Sync random state right after the command was generated.
    pub sync_seed: u32,
}

impl LogEntry {
    pub fn new(cycle: u64, action: Action, sync_seed: u32) -> Self {
        Self {
            cycle,
            unit: None,
            unit_ident: String::new(),
            action,
            flush: 0,
            pos: None,
            dest: None,
            value: None,
            num: None,
            sync_seed,
        }
    }

    /// Position as forwarded to the simulation, sentinel coordinates included.
    pub fn position(&self) -> Pos {
        self.pos.unwrap_or(Pos::NONE)
    }

    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    pub fn num_or_sentinel(&self) -> i32 {
        self.num.unwrap_or(-1)
    }

    /// Fold optional arguments holding a sentinel value into `None`, so the
    /// entry reads back from its log line exactly as it was written.
    pub fn normalize(&mut self) {
        self.pos = self.pos.and_then(|pos| Pos::from_raw(pos.x, pos.y));
        self.value = self.value.take().filter(|value| !value.is_empty());
        self.num = self.num.filter(|num| *num >= 0);
    }
}
