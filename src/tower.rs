//! Stationary attackers: per-variant targeting, firing cadence and in-flight shots.

use tracing::trace;

use crate::bloon::Bloon;
use crate::config::TowerTable;
use crate::level::TowerPlacement;
use crate::model::{BloonId, ThemeMultipliers, TowerId, TowerKind, Vec2};

/// What a tower produced when it fired this tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Shot {
    /// Basic: travels on a fixed heading and hits on contact.
    Projectile(Projectile),
    /// Sniper: resolves against the target after a short delay.
    Beam(Beam),
    /// Freeze: slows everything in range right away.
    Slow { tower: TowerId, targets: Vec<BloonId>, factor: f64, until: u64 },
    /// Tesla: immediate hits, resolved in order.
    Chain { tower: TowerId, targets: Vec<BloonId> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tower {
    pub id: TowerId,
    pub kind: TowerKind,
    pub position: Vec2,
    pub range: f64,
    pub shot_cooldown_ms: u64,
    pub last_shot_at: Option<u64>,
    pub disabled: bool,
    pub disabled_until: u64,
    cfg: TowerTable,
}

impl Tower {
    /// Theme multipliers are baked in once here.
    pub fn new(id: TowerId, placement: &TowerPlacement, cfg: &TowerTable, theme: ThemeMultipliers) -> Self {
        let stats = cfg.stats(placement.kind);
        Self {
            id,
            kind: placement.kind,
            position: placement.position,
            range: stats.range * theme.tower_range,
            shot_cooldown_ms: (stats.cooldown_ms as f64 * theme.tower_cooldown).round() as u64,
            last_shot_at: None,
            disabled: false,
            disabled_until: 0,
            cfg: *cfg,
        }
    }

    /// Re-entrant: never shortens an active disable.
    pub fn disable(&mut self, duration_ms: u64, now: u64) {
        self.disabled = true;
        self.disabled_until = self.disabled_until.max(now + duration_ms);
    }

    pub fn is_disabled(&self, now: u64) -> bool {
        self.disabled && now < self.disabled_until
    }

    pub fn update(&mut self, bloons: &[Bloon], now: u64) -> Option<Shot> {
        if self.disabled {
            if now < self.disabled_until {
                return None;
            }
            self.disabled = false;
        }
        let targets = self.select_targets(bloons);
        let first = *targets.first()?;
        if let Some(last) = self.last_shot_at {
            if now.saturating_sub(last) <= self.shot_cooldown_ms {
                return None;
            }
        }
        self.last_shot_at = Some(now);

        let shot = match self.kind {
            TowerKind::Basic => {
                let aim = bloons.iter().find(|b| b.id == first).map_or(self.position, |b| b.position);
                Shot::Projectile(Projectile {
                    tower: self.id,
                    target: first,
                    origin: self.position,
                    position: self.position,
                    heading: (aim - self.position).normalized(),
                    max_travel: self.range * self.cfg.projectile_max_travel_factor,
                    expires_at: now + self.cfg.projectile_lifetime_ms,
                })
            }
            TowerKind::Sniper => Shot::Beam(Beam {
                tower: self.id,
                target: first,
                resolves_at: now + self.cfg.sniper_beam_delay_ms,
            }),
            TowerKind::Freeze => Shot::Slow {
                tower: self.id,
                targets,
                factor: self.cfg.freeze_slow_factor,
                until: now + self.cfg.freeze_slow_ms,
            },
            TowerKind::Tesla => Shot::Chain { tower: self.id, targets },
        };
        Some(shot)
    }

    fn can_see(&self, bloon: &Bloon) -> bool {
        if bloon.is_disposed() || bloon.is_ghost() {
            return false;
        }
        self.kind == TowerKind::Freeze || !bloon.is_camo()
    }

    fn in_range(&self, bloon: &Bloon) -> bool {
        self.position.distance(bloon.position) <= self.range
    }

    pub fn select_targets(&self, bloons: &[Bloon]) -> Vec<BloonId> {
        let visible = bloons.iter().filter(|b| self.can_see(b) && self.in_range(b));
        match self.kind {
            TowerKind::Basic => self.nearest(visible).map(|b| vec![b.id]).unwrap_or_default(),
            TowerKind::Sniper => visible
                .fold(None::<&Bloon>, |best, b| match best {
                    Some(cur) if cur.path_index >= b.path_index => Some(cur),
                    _ => Some(b),
                })
                .map(|b| vec![b.id])
                .unwrap_or_default(),
            TowerKind::Freeze => visible.map(|b| b.id).collect(),
            TowerKind::Tesla => {
                let Some(primary) = self.nearest(visible) else {
                    return Vec::new();
                };
                let mut chain = vec![primary.id];
                for b in bloons {
                    if chain.len() >= self.cfg.tesla_chain_targets {
                        break;
                    }
                    if b.id != primary.id
                        && self.can_see(b)
                        && primary.position.distance(b.position) <= self.cfg.tesla_chain_range
                    {
                        chain.push(b.id);
                    }
                }
                chain
            }
        }
    }

    fn nearest<'a>(&self, bloons: impl Iterator<Item = &'a Bloon>) -> Option<&'a Bloon> {
        bloons.min_by(|a, b| {
            let da = self.position.distance(a.position);
            let db = self.position.distance(b.position);
            da.total_cmp(&db)
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProjectileStep {
    Flying,
    Hit(BloonId),
    /// Out of range, out of time, or its target is gone.
    Dropped,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub tower: TowerId,
    pub target: BloonId,
    pub origin: Vec2,
    pub position: Vec2,
    pub heading: Vec2,
    pub max_travel: f64,
    pub expires_at: u64,
}

impl Projectile {
    pub fn advance(&mut self, bloons: &[Bloon], now: u64, dt_ms: u64, cfg: &TowerTable) -> ProjectileStep {
        if now >= self.expires_at {
            return ProjectileStep::Dropped;
        }
        let Some(target) = bloons.iter().find(|b| b.id == self.target && !b.is_disposed()) else {
            trace!(target = self.target.0, "projectile target gone");
            return ProjectileStep::Dropped;
        };
        // Sub-steps no longer than the hit radius so fast shots can't tunnel.
        let mut remaining = cfg.projectile_speed * dt_ms as f64 / 1000.0;
        let max_step = cfg.projectile_hit_radius.max(0.05);
        loop {
            if self.position.distance(target.position) < cfg.projectile_hit_radius {
                return ProjectileStep::Hit(self.target);
            }
            if self.origin.distance(self.position) > self.max_travel {
                return ProjectileStep::Dropped;
            }
            if remaining <= 0.0 {
                return ProjectileStep::Flying;
            }
            let step = remaining.min(max_step);
            self.position = self.position + self.heading.scale(step);
            remaining -= step;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Beam {
    pub tower: TowerId,
    pub target: BloonId,
    pub resolves_at: u64,
}
