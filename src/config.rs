//! Tunable game constants. Defaults reproduce the shipped balance; any subset can be
//! overridden from JSON (missing keys fall back to defaults).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AbilityKind, TowerKind, Vec2};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid game config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid game config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub bloon: BloonConfig,
    pub abilities: AbilityTable,
    pub towers: TowerTable,
    pub level: LevelConfig,
    pub scoring: ScoringConfig,
    /// Milliseconds between bloon spawns.
    pub spawn_interval_ms: u64,
    /// Bloons available to spawn at the start of every level.
    pub bloons_per_level: u32,
    pub notification_lifetime_ms: u64,
    /// How long the perfect-clear celebration runs before upgrades are offered.
    pub perfect_clear_animation_ms: u64,
    /// How many upgrades are offered after a perfect clear.
    pub upgrade_choice_count: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            bloon: BloonConfig::default(),
            abilities: AbilityTable::default(),
            towers: TowerTable::default(),
            level: LevelConfig::default(),
            scoring: ScoringConfig::default(),
            spawn_interval_ms: 2000,
            bloons_per_level: 25,
            notification_lifetime_ms: 5000,
            perfect_clear_animation_ms: 3000,
            upgrade_choice_count: 3,
        }
    }
}

impl GameConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: GameConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.level;
        if l.min_step <= 0.0 || l.max_step < l.min_step {
            return Err(ConfigError::Invalid(format!("step range [{}, {}] is empty", l.min_step, l.max_step)));
        }
        if l.bounds_min.x >= l.bounds_max.x || l.bounds_min.z >= l.bounds_max.z {
            return Err(ConfigError::Invalid("placement bounds are empty".into()));
        }
        if self.spawn_interval_ms == 0 {
            return Err(ConfigError::Invalid("spawn_interval_ms must be positive".into()));
        }
        if self.bloon.base_speed <= 0.0 {
            return Err(ConfigError::Invalid("bloon.base_speed must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloonConfig {
    /// Units per second before theme and upgrade multipliers.
    pub base_speed: f64,
    /// Distance at which a waypoint counts as reached.
    pub waypoint_epsilon: f64,
    /// Hits that fully pop a bloon without upgrades.
    pub hits_to_pop: u8,
    /// Window after spawning during which hits are ignored.
    pub spawn_grace_ms: u64,
    pub speed_boost: f64,
    pub split_speed_bonus: f64,
    /// Sideways offset of mirror/split clones from the parent.
    pub clone_offset: f64,
    pub fire_trail_interval_ms: u64,
    pub fire_trail_lifetime_ms: u64,
    pub fire_scorch_radius: f64,
    pub fire_scorch_disable_ms: u64,
    pub bounce_disable_ms: u64,
    /// Distance from the bloon at which a click registers.
    pub click_radius: f64,
}

impl Default for BloonConfig {
    fn default() -> Self {
        Self {
            base_speed: 1.8,
            waypoint_epsilon: 0.1,
            hits_to_pop: 1,
            spawn_grace_ms: 300,
            speed_boost: 5.0,
            split_speed_bonus: 1.2,
            clone_offset: 0.5,
            fire_trail_interval_ms: 200,
            fire_trail_lifetime_ms: 3000,
            fire_scorch_radius: 1.5,
            fire_scorch_disable_ms: 1000,
            bounce_disable_ms: 2000,
            click_radius: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilitySpec {
    pub duration_ms: u64,
    pub cooldown_ms: u64,
}

/// Base duration/cooldown per ability, indexed by `AbilityKind::index`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityTable(pub [AbilitySpec; 8]);

impl Default for AbilityTable {
    fn default() -> Self {
        let spec = |duration_ms, cooldown_ms| AbilitySpec { duration_ms, cooldown_ms };
        AbilityTable([
            spec(3000, 5000),  // shield
            spec(2000, 3000),  // speed
            spec(3000, 6000),  // camo
            spec(2000, 8000),  // phase
            spec(4000, 10000), // fire
            spec(5000, 12000), // mirror
            spec(4000, 8000),  // rubber
            spec(8000, 10000), // split
        ])
    }
}

impl AbilityTable {
    pub fn get(&self, kind: AbilityKind) -> AbilitySpec {
        self.0[kind.index()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerStats {
    pub range: f64,
    pub cooldown_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerTable {
    pub basic: TowerStats,
    pub sniper: TowerStats,
    pub freeze: TowerStats,
    pub tesla: TowerStats,
    pub projectile_speed: f64,
    pub projectile_hit_radius: f64,
    /// Basic projectiles are dropped after this multiple of the tower range.
    pub projectile_max_travel_factor: f64,
    pub projectile_lifetime_ms: u64,
    pub sniper_beam_delay_ms: u64,
    pub freeze_slow_factor: f64,
    pub freeze_slow_ms: u64,
    pub tesla_chain_targets: usize,
    pub tesla_chain_range: f64,
}

impl Default for TowerTable {
    fn default() -> Self {
        Self {
            basic: TowerStats { range: 8.0, cooldown_ms: 1000 },
            sniper: TowerStats { range: 20.0, cooldown_ms: 2000 },
            freeze: TowerStats { range: 6.0, cooldown_ms: 1500 },
            tesla: TowerStats { range: 10.0, cooldown_ms: 800 },
            projectile_speed: 30.0,
            projectile_hit_radius: 0.5,
            projectile_max_travel_factor: 1.5,
            projectile_lifetime_ms: 5000,
            sniper_beam_delay_ms: 600,
            freeze_slow_factor: 0.5,
            freeze_slow_ms: 3000,
            tesla_chain_targets: 3,
            tesla_chain_range: 4.0,
        }
    }
}

impl TowerTable {
    pub fn stats(&self, kind: TowerKind) -> TowerStats {
        match kind {
            TowerKind::Basic => self.basic,
            TowerKind::Sniper => self.sniper,
            TowerKind::Freeze => self.freeze,
            TowerKind::Tesla => self.tesla,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub path_start: Vec2,
    pub path_end: Vec2,
    pub min_step: f64,
    pub max_step: f64,
    pub bounds_min: Vec2,
    pub bounds_max: Vec2,
    pub min_dist_from_path: f64,
    pub min_dist_between_towers: f64,
    pub max_towers: usize,
    pub max_bloons_required: u32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            path_start: Vec2::new(-14.0, -14.0),
            path_end: Vec2::new(14.0, 14.0),
            min_step: 4.0,
            max_step: 8.0,
            bounds_min: Vec2::new(-14.0, -14.0),
            bounds_max: Vec2::new(14.0, 14.0),
            min_dist_from_path: 3.0,
            min_dist_between_towers: 4.0,
            max_towers: 10,
            max_bloons_required: 25,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub per_level: u64,
    pub perfect_clear_bonus: u64,
    pub per_remaining_bloon: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { per_level: 100, perfect_clear_bonus: 200, per_remaining_bloon: 50 }
    }
}
