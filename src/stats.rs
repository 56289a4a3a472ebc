use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! stat_names {
    ($($variant:ident => $key:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum StatName {
            $($variant),+
        }

        impl StatName {
            pub const ALL: &'static [StatName] = &[$(StatName::$variant),+];
            pub const COUNT: usize = StatName::ALL.len();

            pub fn key(self) -> &'static str {
                match self {
                    $(StatName::$variant => $key),+
                }
            }

            pub fn from_key(raw: &str) -> Option<Self> {
                match raw.trim() {
                    $($key => Some(StatName::$variant),)+
                    // Older snapshots and configs carry the misspelled key.
                    "agrression" => Some(StatName::Aggression),
                    _ => None,
                }
            }
        }
    };
}

stat_names! {
    // Pace
    Pac => "pac",
    Acceleration => "acceleration",
    SprintSpeed => "sprintSpeed",
    // Shooting
    Sho => "sho",
    Positioning => "positioning",
    ShotPower => "shotPower",
    LongShots => "longShots",
    Volleys => "volleys",
    Penalties => "penalties",
    // Passing
    Pas => "pas",
    Vision => "vision",
    Crossing => "crossing",
    FreeKickAccuracy => "freeKickAccuracy",
    ShortPassing => "shortPassing",
    LongPassing => "longPassing",
    Curve => "curve",
    // Dribbling
    Dri => "dri",
    Agility => "agility",
    Balance => "balance",
    Reactions => "reactions",
    BallControl => "ballControl",
    Dribbling => "dribbling",
    Composure => "composure",
    // Defending
    Def => "def",
    Interceptions => "interceptions",
    HeadingAccuracy => "headingAccuracy",
    DefensiveAwareness => "defensiveAwareness",
    StandingTackle => "standingTackle",
    SlidingTackle => "slidingTackle",
    // Physical
    Phy => "phy",
    Jumping => "jumping",
    Stamina => "stamina",
    Strength => "strength",
    Aggression => "aggression",
    // Goalkeeping
    Gol => "gol",
    GkDiving => "gkDiving",
    GkHandling => "gkHandling",
    GkKicking => "gkKicking",
    GkPositioning => "gkPositioning",
    GkReflexes => "gkReflexes",
}

impl StatName {
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StatName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatName::from_key(s).ok_or_else(|| format!("unknown statistic `{s}`"))
    }
}

impl Serialize for StatName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for StatName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    Gk,
    Cb,
    Lb,
    Rb,
    Cdm,
    Cm,
    Cam,
    Lw,
    Lm,
    Rw,
    Rm,
    St,
}

pub const ALL_POSITIONS: [Position; 12] = [
    Position::Gk,
    Position::Cb,
    Position::Lb,
    Position::Rb,
    Position::Cdm,
    Position::Cm,
    Position::Cam,
    Position::Lw,
    Position::Lm,
    Position::Rw,
    Position::Rm,
    Position::St,
];

impl Position {
    pub fn short_label(self) -> &'static str {
        match self {
            Position::Gk => "GK",
            Position::Cb => "CB",
            Position::Lb => "LB",
            Position::Rb => "RB",
            Position::Cdm => "CDM",
            Position::Cm => "CM",
            Position::Cam => "CAM",
            Position::Lw => "LW",
            Position::Lm => "LM",
            Position::Rw => "RW",
            Position::Rm => "RM",
            Position::St => "ST",
        }
    }

    pub fn from_short_label(raw: &str) -> Option<Self> {
        let label = raw.trim();
        ALL_POSITIONS
            .iter()
            .copied()
            .find(|p| p.short_label().eq_ignore_ascii_case(label))
    }

    pub fn is_goalkeeper(self) -> bool {
        self == Position::Gk
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_label())
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::from_short_label(s).ok_or_else(|| format!("unknown position `{s}`"))
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.short_label())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub const OVERALL_RATING_KEY: &str = "overallRating";

/// The statistic a fit predicts: the card's overall rating or one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Overall,
    Stat(StatName),
}

impl Target {
    pub fn key(self) -> &'static str {
        match self {
            Target::Overall => OVERALL_RATING_KEY,
            Target::Stat(stat) => stat.key(),
        }
    }

    pub fn label(self) -> String {
        match self {
            Target::Overall => "Overall Rating".to_string(),
            Target::Stat(stat) => stat.key().to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == OVERALL_RATING_KEY || trimmed.eq_ignore_ascii_case("overall") {
            return Ok(Target::Overall);
        }
        StatName::from_key(trimmed)
            .map(Target::Stat)
            .ok_or_else(|| format!("unknown target `{s}`"))
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
