use std::fmt;

/// Number of player slots the engine reserves, whether or not they are in use.
pub const PLAYER_MAX: usize = 16;

/// Stable, index-based handle to a unit in the engine's unit table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitSlot(pub u32);

impl UnitSlot {
    /// Interpret a persisted slot number; `-1` is the "no unit" sentinel.
    pub fn from_raw(raw: i64) -> Result<Option<Self>, String> {
        match raw {
            -1 => Ok(None),
            _ => u32::try_from(raw)
                .map(|slot| Some(Self(slot)))
                .map_err(|_| format!("unit slot {raw} is out of range")),
        }
    }
}

impl fmt::Display for UnitSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    /// Coordinates forwarded to the simulation when an entry carries none.
    pub const NONE: Pos = Pos { x: -1, y: -1 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `None` unless at least one coordinate is non-negative.
    pub fn from_raw(x: i32, y: i32) -> Option<Self> {
        if x < 0 && y < 0 { None } else { Some(Self { x, y }) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct VersionTriple {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl VersionTriple {
    pub const fn new(major: i32, minor: i32, patch: i32) -> Self {
        Self { major, minor, patch }
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.major, self.minor, self.patch]
    }

    pub fn from_array([major, minor, patch]: [i32; 3]) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiplomacyState {
    Allied,
    Neutral,
    Enemy,
    Crazy,
}

impl DiplomacyState {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "allied" => Some(Self::Allied),
            "neutral" => Some(Self::Neutral),
            "enemy" => Some(Self::Enemy),
            "crazy" => Some(Self::Crazy),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allied => "allied",
            Self::Neutral => "neutral",
            Self::Enemy => "enemy",
            Self::Crazy => "crazy",
        }
    }
}

/// Which playback driver is active, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReplayMode {
    #[default]
    None,
    SinglePlayer,
    MultiPlayer,
}
