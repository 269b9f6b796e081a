//! Core data models shared by the simulation.
//! Positions live on the ground plane (x, z); the height axis is a rendering concern.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub z: f64,
}

impl Vec2 {
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn distance(self, other: Vec2) -> f64 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    /// Unit vector, or zero when the vector is degenerate.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len < 1e-9 { Vec2::default() } else { Vec2::new(self.x / len, self.z / len) }
    }

    /// Left-hand perpendicular on the ground plane.
    pub fn perpendicular(self) -> Vec2 {
        Vec2::new(-self.z, self.x)
    }

    pub fn scale(self, k: f64) -> Vec2 {
        Vec2::new(self.x * k, self.z * k)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.z - rhs.z)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BloonId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TowerId(pub u64);

/// The eight timed bloon powers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbilityKind {
    Shield,
    Speed,
    Camo,
    Phase,
    Fire,
    Mirror,
    Rubber,
    Split,
}

impl AbilityKind {
    pub const ALL: [AbilityKind; 8] = [
        AbilityKind::Shield,
        AbilityKind::Speed,
        AbilityKind::Camo,
        AbilityKind::Phase,
        AbilityKind::Fire,
        AbilityKind::Mirror,
        AbilityKind::Rubber,
        AbilityKind::Split,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            AbilityKind::Shield => "Shield",
            AbilityKind::Speed => "Speed Boost",
            AbilityKind::Camo => "Camo",
            AbilityKind::Phase => "Phase",
            AbilityKind::Fire => "Fire Trail",
            AbilityKind::Mirror => "Mirror",
            AbilityKind::Rubber => "Rubber",
            AbilityKind::Split => "Splitter",
        }
    }
}

impl fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    Basic,
    /// Targets the furthest-progressed bloon with a delayed piercing beam.
    Sniper,
    /// Slows every bloon in range; sees camo.
    Freeze,
    /// Chains hits from the nearest bloon to its neighbours.
    Tesla,
}

impl TowerKind {
    pub fn label(self) -> &'static str {
        match self {
            TowerKind::Basic => "Basic",
            TowerKind::Sniper => "Sniper",
            TowerKind::Freeze => "Freeze",
            TowerKind::Tesla => "Tesla",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    Desert,
    Fog,
    Storm,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Desert, Theme::Fog, Theme::Storm];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Desert => "Desert",
            Theme::Fog => "Fog",
            Theme::Storm => "Storm",
        }
    }

    pub fn multipliers(self) -> ThemeMultipliers {
        match self {
            // Heat slows bloons and distorts tower sight.
            Theme::Desert => ThemeMultipliers { bloon_speed: 0.8, tower_range: 0.8, tower_cooldown: 1.2 },
            Theme::Fog => ThemeMultipliers { bloon_speed: 1.0, tower_range: 0.6, tower_cooldown: 0.9 },
            Theme::Storm => ThemeMultipliers { bloon_speed: 1.1, tower_range: 0.8, tower_cooldown: 1.2 },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThemeMultipliers {
    pub bloon_speed: f64,
    pub tower_range: f64,
    pub tower_cooldown: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    LevelComplete,
    PerfectClear,
    SelectingUpgrade,
    GameOver,
}

/// Result of a single tower hit landing on a bloon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitOutcome {
    /// Inside the spawn grace window; nothing happens.
    Ignored,
    /// Shield consumed.
    Blocked,
    PhasedThrough,
    /// Projectile reflected at the attacking tower.
    Bounced(TowerId),
    Mirrored(Vec2),
    Split(Vec2),
    /// Toughness tier lost, bloon survives.
    Damaged { hits_left: u8 },
    Destroyed,
}
