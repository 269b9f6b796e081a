//! Level generation: the bloon path, tower layout and environmental theme.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LevelConfig;
use crate::model::{Theme, TowerKind, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerPlacement {
    pub kind: TowerKind,
    pub position: Vec2,
}

/// Everything the presentation needs to build a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    pub level: u32,
    pub theme: Theme,
    pub path_waypoints: Vec<Vec2>,
    pub tower_placements: Vec<TowerPlacement>,
    pub bloons_required: u32,
}

impl LevelDescriptor {
    pub fn create<R: Rng + ?Sized>(rng: &mut R, cfg: &LevelConfig, level: u32) -> Self {
        let theme = select_theme(rng, level);
        let path_waypoints = generate_path(rng, cfg, path_complexity(level));
        let tower_placements = place_towers(rng, &path_waypoints, tower_count(cfg, level), level, cfg);
        let bloons_required = bloons_required(cfg, level);
        debug!(
            level,
            theme = theme.name(),
            waypoints = path_waypoints.len(),
            towers = tower_placements.len(),
            bloons_required,
            "level created"
        );
        Self { level, theme, path_waypoints, tower_placements, bloons_required }
    }
}

pub fn path_complexity(level: u32) -> f64 {
    (5.0 + 0.3 * level as f64).min(10.0)
}

pub fn tower_count(cfg: &LevelConfig, level: u32) -> usize {
    (3 + (level / 2) as usize).min(cfg.max_towers)
}

pub fn bloons_required(cfg: &LevelConfig, level: u32) -> u32 {
    ((2.0 + 1.5 * level as f64).floor() as u32).min(cfg.max_bloons_required)
}

/// Walks from `path_start` to `path_end` one axis at a time. Higher complexity means
/// noisier axis choices; the final waypoint is always exactly `path_end`.
pub fn generate_path<R: Rng + ?Sized>(rng: &mut R, cfg: &LevelConfig, complexity: f64) -> Vec<Vec2> {
    let start = cfg.path_start;
    let end = cfg.path_end;
    let mut points = vec![start];
    let mut cur = start;

    let budget = ((5.0 + complexity / 2.0).floor() as usize).max(3);
    let noise = complexity.clamp(0.0, 10.0) * 0.2;
    let mut segments = 0;

    while (cur.x < end.x || cur.z < end.z) && segments < budget {
        let dx = end.x - cur.x;
        let dz = end.z - cur.z;
        let x_bias = (dx / 5.0).max(0.0) + (rng.gen_range(0.0..1.0) - 0.5) * noise;
        let z_bias = (dz / 5.0).max(0.0) + (rng.gen_range(0.0..1.0) - 0.5) * noise;

        let mut step = rng.gen_range(cfg.min_step..=cfg.max_step);
        let remaining = (budget - segments) as f64;
        if remaining <= 3.0 {
            step = step.max(dx / remaining).max(dz / remaining);
        }

        let along_x = if x_bias > z_bias { cur.x < end.x } else { cur.z >= end.z };
        if along_x {
            cur.x = end.x.min(cur.x + step);
        } else {
            cur.z = end.z.min(cur.z + step);
        }
        points.push(cur);
        segments += 1;
    }

    if cur != end || points.len() < 2 {
        points.push(end);
    }
    points
}

/// Relative draw weights per variant, zero for variants still locked at `level`.
pub fn variant_weights(level: u32) -> [(TowerKind, f64); 4] {
    let l = level as f64;
    [
        (TowerKind::Basic, (0.7 - 0.02 * l).max(0.05)),
        (TowerKind::Sniper, if level >= 6 { 0.1 + 0.005 * l } else { 0.0 }),
        (TowerKind::Freeze, if level >= 8 { 0.1 + 0.003 * l } else { 0.0 }),
        (TowerKind::Tesla, if level >= 10 { 0.1 } else { 0.0 }),
    ]
}

fn pick_variant<R: Rng + ?Sized>(rng: &mut R, level: u32) -> TowerKind {
    let weights = variant_weights(level);
    match WeightedIndex::new(weights.iter().map(|(_, w)| *w)) {
        Ok(dist) => weights[dist.sample(rng)].0,
        Err(_) => TowerKind::Basic,
    }
}

/// Rejection-samples up to `count` placements in `10 × count` attempts. Running out of
/// attempts yields a sparser level, never an error.
pub fn place_towers<R: Rng + ?Sized>(
    rng: &mut R,
    path: &[Vec2],
    count: usize,
    level: u32,
    cfg: &LevelConfig,
) -> Vec<TowerPlacement> {
    let mut placed: Vec<TowerPlacement> = Vec::with_capacity(count);
    let max_attempts = count * 10;
    let mut attempts = 0;

    while placed.len() < count && attempts < max_attempts {
        attempts += 1;
        let pos = Vec2::new(
            rng.gen_range(cfg.bounds_min.x..=cfg.bounds_max.x),
            rng.gen_range(cfg.bounds_min.z..=cfg.bounds_max.z),
        );
        if path.iter().any(|p| p.distance(pos) < cfg.min_dist_from_path) {
            continue;
        }
        if placed.iter().any(|t| t.position.distance(pos) < cfg.min_dist_between_towers) {
            continue;
        }
        placed.push(TowerPlacement { kind: pick_variant(rng, level), position: pos });
    }

    if placed.len() < count {
        warn!(requested = count, placed = placed.len(), attempts, "tower placement ran out of attempts");
    }
    placed
}

/// Storm on every fifth level, otherwise uniform.
pub fn select_theme<R: Rng + ?Sized>(rng: &mut R, level: u32) -> Theme {
    if level % 5 == 0 {
        return Theme::Storm;
    }
    Theme::ALL[rng.gen_range(0..Theme::ALL.len())]
}

/// Per-level environmental state. Only storms have anything to update.
#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    pub theme: Theme,
    next_flash_at: Option<u64>,
}

const FLASH_MIN_MS: u64 = 5000;
const FLASH_MAX_MS: u64 = 15000;

impl Environment {
    pub fn new<R: Rng + ?Sized>(rng: &mut R, theme: Theme, now: u64) -> Self {
        let next_flash_at = (theme == Theme::Storm).then(|| now + rng.gen_range(FLASH_MIN_MS..=FLASH_MAX_MS));
        Self { theme, next_flash_at }
    }

    /// Returns true when a lightning flash should play this tick.
    pub fn update<R: Rng + ?Sized>(&mut self, rng: &mut R, now: u64) -> bool {
        match self.next_flash_at {
            Some(at) if now >= at => {
                self.next_flash_at = Some(now + rng.gen_range(FLASH_MIN_MS..=FLASH_MAX_MS));
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn path_ends_exactly_at_corner_for_every_complexity() {
        let cfg = LevelConfig::default();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            for complexity in 1..=10 {
                let c = complexity as f64;
                let path = generate_path(&mut rng, &cfg, c);
                assert_eq!(path.first(), Some(&cfg.path_start));
                assert_eq!(path.last(), Some(&cfg.path_end));
                let budget = ((5.0 + c / 2.0).floor() as usize).max(3);
                assert!(path.len() >= 2 && path.len() <= budget + 2, "len {}", path.len());
                for w in path.windows(2) {
                    assert!(w[1].x >= w[0].x && w[1].z >= w[0].z);
                    assert!(w[1] != w[0]);
                }
            }
        }
    }

    #[test]
    fn placements_respect_clearances() {
        let cfg = LevelConfig::default();
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let path = generate_path(&mut rng, &cfg, 7.0);
            let towers = place_towers(&mut rng, &path, 10, 12, &cfg);
            assert!(towers.len() <= 10);
            for (i, t) in towers.iter().enumerate() {
                assert!(path.iter().all(|p| p.distance(t.position) >= cfg.min_dist_from_path));
                for other in &towers[i + 1..] {
                    assert!(other.position.distance(t.position) >= cfg.min_dist_between_towers);
                }
                assert!(t.position.x >= cfg.bounds_min.x && t.position.x <= cfg.bounds_max.x);
            }
        }
    }

    #[test]
    fn cramped_bounds_degrade_to_fewer_towers() {
        let cfg = LevelConfig {
            bounds_min: Vec2::new(0.0, 0.0),
            bounds_max: Vec2::new(1.0, 1.0),
            ..LevelConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let towers = place_towers(&mut rng, &[Vec2::new(50.0, 50.0)], 5, 1, &cfg);
        assert_eq!(towers.len(), 1);
    }

    #[test]
    fn early_levels_only_have_basic_towers() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            assert_eq!(pick_variant(&mut rng, 5), TowerKind::Basic);
        }
        let w = variant_weights(10);
        assert!(w.iter().all(|(_, weight)| *weight > 0.0));
        assert!(variant_weights(60)[0].1 > 0.0);
    }

    #[test]
    fn level_scaling() {
        let cfg = LevelConfig::default();
        assert_eq!(bloons_required(&cfg, 1), 3);
        assert_eq!(bloons_required(&cfg, 2), 5);
        assert_eq!(bloons_required(&cfg, 40), 25);
        assert_eq!(tower_count(&cfg, 1), 3);
        assert_eq!(tower_count(&cfg, 30), 10);
        assert!((path_complexity(1) - 5.3).abs() < 1e-9);
        assert_eq!(path_complexity(50), 10.0);
    }

    #[test]
    fn every_fifth_level_is_stormy() {
        let mut rng = StdRng::seed_from_u64(2);
        for level in [5, 10, 15, 20] {
            assert_eq!(select_theme(&mut rng, level), Theme::Storm);
        }
        let d = LevelDescriptor::create(&mut rng, &LevelConfig::default(), 5);
        assert_eq!(d.theme, Theme::Storm);
        assert_eq!(d.bloons_required, 9);
    }

    #[test]
    fn storm_flashes_within_window() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut env = Environment::new(&mut rng, Theme::Storm, 0);
        assert!(!env.update(&mut rng, FLASH_MIN_MS - 1));
        let flashed = (FLASH_MIN_MS..=FLASH_MAX_MS).step_by(16).any(|t| env.update(&mut rng, t));
        assert!(flashed);

        let mut calm = Environment::new(&mut rng, Theme::Fog, 0);
        assert!(!calm.update(&mut rng, 1_000_000));
    }
}
