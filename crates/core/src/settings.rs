//! Game settings snapshot captured when a session starts.
//!
//! Playback reapplies this snapshot before the map loads, which is what
//! makes the replayed game start from the same initial conditions.

use crate::types::PLAYER_MAX;

/// Preset value meaning "use whatever the map declares".
pub const MAP_DEFAULT: i32 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NetGameType {
    #[default]
    Unset,
    SinglePlayer,
    MultiPlayer,
}

impl NetGameType {
    pub fn code(self) -> i32 {
        match self {
            Self::Unset => 0,
            Self::SinglePlayer => 1,
            Self::MultiPlayer => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Unset),
            1 => Some(Self::SinglePlayer),
            2 => Some(Self::MultiPlayer),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlayerType {
    #[default]
    MapDefault,
    Neutral,
    Nobody,
    Computer,
    Person,
    RescuePassive,
    RescueActive,
}

impl PlayerType {
    pub fn code(self) -> i32 {
        match self {
            Self::MapDefault => 0,
            Self::Neutral => 2,
            Self::Nobody => 3,
            Self::Computer => 4,
            Self::Person => 5,
            Self::RescuePassive => 6,
            Self::RescueActive => 7,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::MapDefault),
            2 => Some(Self::Neutral),
            3 => Some(Self::Nobody),
            4 => Some(Self::Computer),
            5 => Some(Self::Person),
            6 => Some(Self::RescuePassive),
            7 => Some(Self::RescueActive),
            _ => None,
        }
    }
}

/// Per-slot presets. Team is the preset team, not the team the engine
/// derived at game creation, so that playback derives it the same way again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerPreset {
    pub ai_script: String,
    pub player_color: i32,
    pub race: i32,
    pub team: i32,
    pub player_type: PlayerType,
}

impl Default for PlayerPreset {
    fn default() -> Self {
        Self {
            ai_script: String::new(),
            player_color: MAP_DEFAULT,
            race: MAP_DEFAULT,
            team: MAP_DEFAULT,
            player_type: PlayerType::MapDefault,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub net_game_type: NetGameType,
    pub game_type: i32,
    pub difficulty: i32,
    pub resources: i32,
    pub num_units: i32,
    pub opponents: i32,
    pub reveal_map: i32,
    pub no_fog_of_war: bool,
    pub presets: [PlayerPreset; PLAYER_MAX],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            net_game_type: NetGameType::Unset,
            game_type: MAP_DEFAULT,
            difficulty: MAP_DEFAULT,
            resources: MAP_DEFAULT,
            num_units: MAP_DEFAULT,
            opponents: MAP_DEFAULT,
            reveal_map: 0,
            no_fog_of_war: false,
            presets: Default::default(),
        }
    }
}

impl Settings {
    pub fn is_multiplayer(&self) -> bool {
        self.net_game_type == NetGameType::MultiPlayer
    }
}
