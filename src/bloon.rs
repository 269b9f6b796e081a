//! The player-controlled agent: path following, timed abilities and hit resolution.

use std::rc::Rc;

use tracing::trace;

use crate::config::BloonConfig;
use crate::model::{AbilityKind, BloonId, HitOutcome, TowerId, Vec2};
use crate::modifiers::{AreaDisable, BloonProfile};
use crate::timers::Timers;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BloonTimer {
    AbilityExpires(AbilityKind),
    SlowExpires,
    DropFireNode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Alive,
    Escaped,
    Destroyed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireNode {
    pub position: Vec2,
    pub expires_at: u64,
}

#[derive(Clone, Debug)]
pub struct Bloon {
    pub id: BloonId,
    /// Mirror/split offspring. Clones never count toward level totals.
    pub is_clone: bool,
    pub position: Vec2,
    path: Rc<[Vec2]>,
    /// Last waypoint reached; the bloon heads for `path[path_index + 1]`.
    pub path_index: usize,
    /// Units per second with theme and upgrade multipliers already applied.
    pub base_speed: f64,
    speed_boost: f64,
    slow_factor: Option<f64>,
    abilities: [bool; 8],
    pub has_split: bool,
    pub has_mirrored: bool,
    pub hits_to_pop: u8,
    pub hits_taken: u8,
    pub spawned_at: u64,
    pub untargetable_when_phased: bool,
    pub jamming: Option<AreaDisable>,
    pub shield_aura: Option<f64>,
    pub escape_explosion: Option<AreaDisable>,
    pub fire_trail: Vec<FireNode>,
    pub fire_trail_lifetime_ms: u64,
    lifecycle: Lifecycle,
    disposed: bool,
    timers: Timers<BloonTimer>,
    cfg: BloonConfig,
}

impl Bloon {
    pub fn spawn(id: BloonId, path: Rc<[Vec2]>, cfg: &BloonConfig, profile: &BloonProfile, now: u64) -> Self {
        let start = path.first().copied().unwrap_or_default();
        let mut bloon = Self {
            id,
            is_clone: false,
            position: start,
            path,
            path_index: 0,
            base_speed: cfg.base_speed * profile.speed_multiplier,
            speed_boost: 1.0,
            slow_factor: None,
            abilities: [false; 8],
            has_split: false,
            has_mirrored: false,
            hits_to_pop: cfg.hits_to_pop.max(1).saturating_add(profile.extra_toughness),
            hits_taken: 0,
            spawned_at: now,
            untargetable_when_phased: profile.phase_untargetable,
            jamming: profile.jamming,
            shield_aura: profile.shield_aura,
            escape_explosion: profile.escape_explosion,
            fire_trail: Vec::new(),
            fire_trail_lifetime_ms: cfg.fire_trail_lifetime_ms,
            lifecycle: Lifecycle::Alive,
            disposed: false,
            timers: Timers::default(),
            cfg: *cfg,
        };
        if let Some(camo_ms) = profile.auto_camo_ms {
            bloon.activate_ability(AbilityKind::Camo, camo_ms, now);
        }
        bloon
    }

    /// Offspring placed `offset` away from the parent on the same path segment. Clones
    /// never mirror or split again.
    pub fn spawn_clone(id: BloonId, parent: &Bloon, offset: Vec2, speed_factor: f64, now: u64) -> Self {
        Self {
            id,
            is_clone: true,
            position: parent.position + offset,
            path: Rc::clone(&parent.path),
            path_index: parent.path_index,
            base_speed: parent.base_speed * speed_factor,
            speed_boost: 1.0,
            slow_factor: None,
            abilities: [false; 8],
            has_split: true,
            has_mirrored: true,
            hits_to_pop: parent.hits_to_pop,
            hits_taken: 0,
            spawned_at: now,
            untargetable_when_phased: parent.untargetable_when_phased,
            jamming: parent.jamming,
            shield_aura: parent.shield_aura,
            escape_explosion: parent.escape_explosion,
            fire_trail: Vec::new(),
            fire_trail_lifetime_ms: parent.fire_trail_lifetime_ms,
            lifecycle: Lifecycle::Alive,
            disposed: false,
            timers: Timers::default(),
            cfg: parent.cfg,
        }
    }

    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_active(&self, kind: AbilityKind) -> bool {
        self.abilities[kind.index()]
    }

    pub fn active_abilities(&self) -> impl Iterator<Item = AbilityKind> + '_ {
        AbilityKind::ALL.into_iter().filter(|k| self.is_active(*k))
    }

    pub fn is_camo(&self) -> bool {
        self.is_active(AbilityKind::Camo)
    }

    /// Phased with the untargetable upgrade: invisible to every tower.
    pub fn is_ghost(&self) -> bool {
        self.untargetable_when_phased && self.is_active(AbilityKind::Phase)
    }

    pub fn is_slowed(&self) -> bool {
        self.slow_factor.is_some()
    }

    pub fn speed(&self) -> f64 {
        self.base_speed * self.speed_boost * self.slow_factor.unwrap_or(1.0)
    }

    pub fn has_reached_end(&self) -> bool {
        self.path_index + 1 >= self.path.len()
    }

    pub fn in_spawn_grace(&self, now: u64) -> bool {
        now < self.spawned_at + self.cfg.spawn_grace_ms
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn update(&mut self, now: u64, dt_ms: u64) {
        if self.disposed {
            return;
        }
        for timer in self.timers.take_due(now) {
            match timer {
                BloonTimer::AbilityExpires(kind) => self.expire(kind),
                BloonTimer::SlowExpires => self.slow_factor = None,
                BloonTimer::DropFireNode => {
                    if self.is_active(AbilityKind::Fire) {
                        self.fire_trail.push(FireNode {
                            position: self.position,
                            expires_at: now + self.fire_trail_lifetime_ms,
                        });
                        self.timers.schedule(now + self.cfg.fire_trail_interval_ms, BloonTimer::DropFireNode);
                    }
                }
            }
        }
        self.fire_trail.retain(|n| n.expires_at > now);

        let mut remaining = self.speed() * dt_ms as f64 / 1000.0;
        while remaining > 0.0 && !self.has_reached_end() {
            let target = self.path[self.path_index + 1];
            let dist = self.position.distance(target);
            if dist <= remaining || dist < self.cfg.waypoint_epsilon {
                self.position = target;
                self.path_index += 1;
                remaining -= dist;
                continue;
            }
            self.position = self.position + (target - self.position).normalized().scale(remaining);
            remaining = 0.0;
            if self.position.distance(target) < self.cfg.waypoint_epsilon {
                self.position = target;
                self.path_index += 1;
            }
        }
    }

    /// Returns false when the ability is already running or the bloon is gone.
    pub fn activate_ability(&mut self, kind: AbilityKind, duration_ms: u64, now: u64) -> bool {
        if self.disposed || self.is_active(kind) {
            return false;
        }
        self.abilities[kind.index()] = true;
        self.timers.cancel(&BloonTimer::AbilityExpires(kind));
        match kind {
            AbilityKind::Speed => self.speed_boost = self.cfg.speed_boost,
            AbilityKind::Fire => {
                self.timers.cancel(&BloonTimer::DropFireNode);
                self.timers.schedule(now + self.cfg.fire_trail_interval_ms, BloonTimer::DropFireNode);
            }
            AbilityKind::Shield => self.slow_factor = None,
            AbilityKind::Camo
            | AbilityKind::Phase
            | AbilityKind::Mirror
            | AbilityKind::Rubber
            | AbilityKind::Split => {}
        }
        self.timers.schedule(now + duration_ms, BloonTimer::AbilityExpires(kind));
        true
    }

    fn expire(&mut self, kind: AbilityKind) {
        self.abilities[kind.index()] = false;
        match kind {
            AbilityKind::Speed => self.speed_boost = 1.0,
            // Nodes already dropped burn out on their own.
            AbilityKind::Fire => self.timers.cancel(&BloonTimer::DropFireNode),
            _ => {}
        }
    }

    /// Resolves one tower hit. `None` when the bloon is already gone.
    pub fn on_hit(&mut self, tower: TowerId, now: u64) -> Option<HitOutcome> {
        if self.disposed {
            trace!(bloon = self.id.0, "hit on disposed bloon ignored");
            return None;
        }
        if self.in_spawn_grace(now) {
            return Some(HitOutcome::Ignored);
        }
        if self.is_active(AbilityKind::Shield) {
            self.abilities[AbilityKind::Shield.index()] = false;
            self.timers.cancel(&BloonTimer::AbilityExpires(AbilityKind::Shield));
            return Some(HitOutcome::Blocked);
        }
        if self.is_active(AbilityKind::Phase) {
            return Some(HitOutcome::PhasedThrough);
        }
        if self.is_active(AbilityKind::Rubber) {
            return Some(HitOutcome::Bounced(tower));
        }
        if self.is_active(AbilityKind::Mirror) && !self.has_mirrored {
            self.has_mirrored = true;
            return Some(HitOutcome::Mirrored(self.position));
        }
        if self.is_active(AbilityKind::Split) && !self.has_split {
            self.has_split = true;
            return Some(HitOutcome::Split(self.position));
        }
        self.hits_taken = self.hits_taken.saturating_add(1);
        if self.hits_taken < self.hits_to_pop {
            return Some(HitOutcome::Damaged { hits_left: self.hits_to_pop - self.hits_taken });
        }
        self.lifecycle = Lifecycle::Destroyed;
        self.dispose();
        Some(HitOutcome::Destroyed)
    }

    /// Freeze slow. Shields shrug it off.
    pub fn apply_slow(&mut self, factor: f64, until: u64) -> bool {
        if self.disposed || self.is_active(AbilityKind::Shield) {
            return false;
        }
        self.slow_factor = Some(factor);
        self.timers.cancel(&BloonTimer::SlowExpires);
        self.timers.schedule(until, BloonTimer::SlowExpires);
        true
    }

    /// True only the first time; the bloon is disposed afterwards.
    pub fn escape(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Alive || self.disposed {
            return false;
        }
        self.lifecycle = Lifecycle::Escaped;
        self.dispose();
        true
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.timers.clear();
        self.fire_trail.clear();
        self.abilities = [false; 8];
    }
}
