//! Authoritative game state: spawning, combat orchestration, level progression and
//! player intents. Everything mutates through `&mut Game`; counters only change while
//! the event queue is drained.

use std::collections::BTreeMap;
use std::mem;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::{debug, trace};

use crate::bloon::Bloon;
use crate::config::GameConfig;
use crate::level::{Environment, LevelDescriptor};
use crate::model::{AbilityKind, BloonId, GameStatus, HitOutcome, Theme, TowerId, Vec2};
use crate::modifiers::{
    AreaDisable, BloonProfile, additional_bloons, resolve_cooldown, resolve_duration, retry_attempts, roll_fusion,
};
use crate::presentation::{EffectKind, EffectParams, Presentation, VisualHandle, VisualKind, VisualQueue};
use crate::tower::{Beam, Projectile, ProjectileStep, Shot, Tower};
use crate::upgrades::{UpgradeId, UpgradeState, offer_choices, upgrade_def};

/// Outcomes reported by bloons and towers during a tick.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Escaped { bloon: BloonId, is_clone: bool, position: Vec2, explosion: Option<AreaDisable> },
    Hit { bloon: BloonId, tower: TowerId, is_clone: bool, position: Vec2, outcome: HitOutcome },
}

/// A player intent that doesn't fit the current state. The game is left untouched.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum IntentError {
    #[error("cannot {action} while {status:?}")]
    InvalidState { action: &'static str, status: GameStatus },
    #[error("{ability} is recharging ({remaining_ms} ms left)")]
    OnCooldown { ability: AbilityKind, remaining_ms: u64 },
    #[error("no ability selected")]
    NoAbilitySelected,
    #[error("bloon {0:?} is not in play")]
    UnknownBloon(BloonId),
    #[error("no bloon under the cursor")]
    NoBloonAt,
    #[error("upgrade {0:?} was not offered")]
    UpgradeNotOffered(UpgradeId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub expires_at: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActiveModifier {
    pub id: UpgradeId,
    pub name: &'static str,
    pub icon: &'static str,
    /// `None` for permanent upgrades.
    pub levels_left: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusEffects {
    pub active: Vec<ActiveModifier>,
    pub notifications: Vec<Notification>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Cooldown {
    ready_at: u64,
    total_ms: u64,
}

#[derive(Clone, Debug)]
pub struct Game {
    cfg: Rc<GameConfig>,
    pub status: GameStatus,
    pub current_level: u32,
    pub score: u64,
    /// Bloons still waiting to spawn this level.
    pub total_bloons: u32,
    pub bloons_active: u32,
    pub bloons_escaped: u32,
    pub bloons_destroyed: u32,
    pub bloons_required: u32,
    pub upgrades: UpgradeState,
    pub upgrade_choices: Vec<UpgradeId>,
    pub status_effects: StatusEffects,
    pub selected_ability: Option<AbilityKind>,
    pub retries_remaining: u32,
    /// Message of the most recently rejected intent, for UI feedback.
    pub last_rejection: Option<String>,
    pub visuals: VisualQueue,
    level: LevelDescriptor,
    path: Rc<[Vec2]>,
    environment: Environment,
    bloons: Vec<Bloon>,
    towers: Vec<Tower>,
    projectiles: Vec<(Projectile, VisualHandle)>,
    beams: Vec<Beam>,
    events: Vec<GameEvent>,
    cooldowns: [Cooldown; 8],
    bloon_visuals: BTreeMap<BloonId, VisualHandle>,
    tower_visuals: BTreeMap<TowerId, VisualHandle>,
    clock_ms: u64,
    last_spawn_at: Option<u64>,
    clear_started_at: Option<u64>,
    next_bloon_id: u64,
    next_tower_id: u64,
    next_notification_id: u64,
    /// Bumped on every level reset so events from a discarded level are dropped.
    level_epoch: u64,
    rng: StdRng,
}

impl Game {
    pub fn new(cfg: GameConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let environment = Environment::new(&mut rng, Theme::Desert, 0);
        let mut game = Self {
            cfg: Rc::new(cfg),
            status: GameStatus::Playing,
            current_level: 1,
            score: 0,
            total_bloons: 0,
            bloons_active: 0,
            bloons_escaped: 0,
            bloons_destroyed: 0,
            bloons_required: 0,
            upgrades: UpgradeState::default(),
            upgrade_choices: Vec::new(),
            status_effects: StatusEffects::default(),
            selected_ability: None,
            retries_remaining: 0,
            last_rejection: None,
            visuals: VisualQueue::default(),
            level: LevelDescriptor {
                level: 0,
                theme: Theme::Desert,
                path_waypoints: Vec::new(),
                tower_placements: Vec::new(),
                bloons_required: 0,
            },
            path: Rc::from(Vec::new()),
            environment,
            bloons: Vec::new(),
            towers: Vec::new(),
            projectiles: Vec::new(),
            beams: Vec::new(),
            events: Vec::new(),
            cooldowns: [Cooldown::default(); 8],
            bloon_visuals: BTreeMap::new(),
            tower_visuals: BTreeMap::new(),
            clock_ms: 0,
            last_spawn_at: None,
            clear_started_at: None,
            next_bloon_id: 0,
            next_tower_id: 0,
            next_notification_id: 0,
            level_epoch: 0,
            rng,
        };
        game.reset_level(1);
        game
    }

    pub fn config(&self) -> &GameConfig {
        &self.cfg
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn level(&self) -> &LevelDescriptor {
        &self.level
    }

    pub fn theme(&self) -> Theme {
        self.environment.theme
    }

    pub fn bloons(&self) -> &[Bloon] {
        &self.bloons
    }

    pub fn towers(&self) -> &[Tower] {
        &self.towers
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter().map(|(p, _)| p)
    }

    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    pub fn cooldown_remaining(&self, kind: AbilityKind) -> u64 {
        self.cooldowns[kind.index()].ready_at.saturating_sub(self.clock_ms)
    }

    /// 0.0 when ready, 1.0 right after activation.
    pub fn cooldown_fraction(&self, kind: AbilityKind) -> f64 {
        let cd = self.cooldowns[kind.index()];
        if cd.total_ms == 0 {
            return 0.0;
        }
        self.cooldown_remaining(kind) as f64 / cd.total_ms as f64
    }

    fn bloon_position(&self, id: BloonId) -> Option<Vec2> {
        self.bloons.iter().find(|b| b.id == id && !b.is_disposed()).map(|b| b.position)
    }

    // ---- level lifecycle ---------------------------------------------------------

    fn reset_level(&mut self, level: u32) {
        self.level_epoch += 1;
        for bloon in &mut self.bloons {
            bloon.dispose();
        }
        for (_, handle) in mem::take(&mut self.bloon_visuals) {
            self.visuals.destroy_visual(handle);
        }
        for (_, handle) in mem::take(&mut self.tower_visuals) {
            self.visuals.destroy_visual(handle);
        }
        for (_, handle) in mem::take(&mut self.projectiles) {
            self.visuals.destroy_visual(handle);
        }
        self.bloons.clear();
        self.towers.clear();
        self.beams.clear();
        self.events.clear();

        let descriptor = LevelDescriptor::create(&mut self.rng, &self.cfg.level, level);
        let theme = descriptor.theme.multipliers();
        for placement in &descriptor.tower_placements {
            self.next_tower_id += 1;
            let tower = Tower::new(TowerId(self.next_tower_id), placement, &self.cfg.towers, theme);
            let handle = self.visuals.create_visual(VisualKind::Tower(tower.kind), tower.position);
            self.tower_visuals.insert(tower.id, handle);
            self.towers.push(tower);
        }
        self.path = Rc::from(descriptor.path_waypoints.clone());
        self.environment = Environment::new(&mut self.rng, descriptor.theme, self.clock_ms);

        self.current_level = level;
        self.bloons_required = descriptor.bloons_required;
        self.total_bloons = self.cfg.bloons_per_level + additional_bloons(&self.upgrades.permanent_effects());
        self.bloons_active = 0;
        self.bloons_escaped = 0;
        self.bloons_destroyed = 0;
        self.last_spawn_at = None;
        self.clear_started_at = None;
        self.upgrade_choices.clear();
        self.selected_ability = None;
        self.cooldowns = [Cooldown::default(); 8];
        self.status = GameStatus::Playing;
        self.level = descriptor;
        self.refresh_status_effects();
        debug!(
            level,
            theme = self.environment.theme.name(),
            required = self.bloons_required,
            towers = self.towers.len(),
            "level started"
        );
    }

    fn complete_level(&mut self) {
        let perfect = self.bloons_escaped == self.bloons_required && self.bloons_destroyed == 0;
        self.score += u64::from(self.current_level) * self.cfg.scoring.per_level;
        if perfect {
            self.score += self.cfg.scoring.perfect_clear_bonus;
        }
        for id in self.upgrades.tick_level() {
            if let Some(def) = upgrade_def(id) {
                self.notify(format!("{} wore off", def.name));
            }
        }
        self.refresh_status_effects();

        if perfect {
            self.status = GameStatus::PerfectClear;
            self.clear_started_at = Some(self.clock_ms);
            self.upgrade_choices = offer_choices(&mut self.rng, self.current_level, self.cfg.upgrade_choice_count);
            self.notify("Perfect clear!");
            self.visuals.play_effect(EffectKind::Celebration, self.cfg.level.path_end, EffectParams::default());
        } else {
            self.status = GameStatus::LevelComplete;
        }
        debug!(
            level = self.current_level,
            escaped = self.bloons_escaped,
            destroyed = self.bloons_destroyed,
            perfect,
            score = self.score,
            "level cleared"
        );
    }

    fn fail_level(&mut self) {
        if self.retries_remaining > 0 {
            self.retries_remaining -= 1;
            let level = self.current_level;
            self.reset_level(level);
            self.notify(format!("Retry used! {} left", self.retries_remaining));
            debug!(level, "retrying level");
            return;
        }
        self.score += u64::from(self.total_bloons) * self.cfg.scoring.per_remaining_bloon;
        self.status = GameStatus::GameOver;
        debug!(level = self.current_level, score = self.score, "game over");
    }

    fn enter_upgrade_selection(&mut self) {
        self.clear_started_at = None;
        self.status = if self.upgrade_choices.is_empty() {
            GameStatus::LevelComplete
        } else {
            GameStatus::SelectingUpgrade
        };
    }

    /// Quota still reachable by everything that could yet escape, clones included.
    fn quota_unreachable(&self) -> bool {
        let live_clones = self.bloons.iter().filter(|b| b.is_clone && !b.is_disposed()).count() as u32;
        let possible = self.total_bloons + self.bloons_active + live_clones;
        possible < self.bloons_required.saturating_sub(self.bloons_escaped)
    }

    // ---- tick --------------------------------------------------------------------

    /// Advances the simulation by `dt_ms` of logical time.
    pub fn tick(&mut self, dt_ms: u64) {
        self.visuals.begin_frame();
        self.clock_ms += dt_ms;
        let now = self.clock_ms;

        if self.status == GameStatus::Playing {
            self.spawn_check(now);
            self.update_bloons(now, dt_ms);
            self.drain_events();
            if self.status == GameStatus::Playing {
                self.update_projectiles(now, dt_ms);
                self.update_beams(now);
                self.update_towers(now);
                self.scorch_towers(now);
                self.drain_events();
            }
            if self.status == GameStatus::Playing && self.environment.update(&mut self.rng, now) {
                self.visuals.play_effect(EffectKind::Lightning, Vec2::default(), EffectParams::default());
            }
            self.bloons.retain(|b| !b.is_disposed());
        }

        self.status_effects.notifications.retain(|n| n.expires_at > now);
        for cd in &mut self.cooldowns {
            if cd.ready_at <= now {
                cd.total_ms = 0;
            }
        }
        if self.status == GameStatus::PerfectClear
            && self.clear_started_at.is_some_and(|t| now >= t + self.cfg.perfect_clear_animation_ms)
        {
            self.enter_upgrade_selection();
        }
    }

    fn spawn_check(&mut self, now: u64) {
        if self.total_bloons == 0 {
            return;
        }
        let due = self.last_spawn_at.is_none_or(|t| now.saturating_sub(t) >= self.cfg.spawn_interval_ms);
        if due {
            self.spawn_bloon(now);
            self.last_spawn_at = Some(now);
        }
    }

    fn spawn_bloon(&mut self, now: u64) -> BloonId {
        let effects = self.upgrades.active_effects();
        let mut profile = BloonProfile::resolve(&effects);
        profile.speed_multiplier *= self.environment.theme.multipliers().bloon_speed;

        self.next_bloon_id += 1;
        let id = BloonId(self.next_bloon_id);
        let mut bloon = Bloon::spawn(id, Rc::clone(&self.path), &self.cfg.bloon, &profile, now);
        bloon.fire_trail_lifetime_ms =
            resolve_duration(AbilityKind::Fire, self.cfg.bloon.fire_trail_lifetime_ms, &effects);
        let handle = self.visuals.create_visual(VisualKind::Bloon { clone: false }, bloon.position);
        self.bloon_visuals.insert(id, handle);
        self.bloons.push(bloon);

        self.total_bloons -= 1;
        self.bloons_active += 1;
        id
    }

    fn update_bloons(&mut self, now: u64, dt_ms: u64) {
        for bloon in &mut self.bloons {
            if bloon.is_disposed() {
                continue;
            }
            bloon.update(now, dt_ms);
            if let Some(handle) = self.bloon_visuals.get(&bloon.id) {
                self.visuals.move_visual(*handle, bloon.position);
            }
            if bloon.has_reached_end() && bloon.escape() {
                self.events.push(GameEvent::Escaped {
                    bloon: bloon.id,
                    is_clone: bloon.is_clone,
                    position: bloon.position,
                    explosion: bloon.escape_explosion,
                });
            }
        }
    }

    fn update_projectiles(&mut self, now: u64, dt_ms: u64) {
        let mut hits = Vec::new();
        let bloons = &self.bloons;
        let visuals = &mut self.visuals;
        let cfg = &self.cfg.towers;
        self.projectiles.retain_mut(|(p, handle)| match p.advance(bloons, now, dt_ms, cfg) {
            ProjectileStep::Flying => {
                visuals.move_visual(*handle, p.position);
                true
            }
            ProjectileStep::Hit(target) => {
                hits.push((p.tower, target));
                visuals.destroy_visual(*handle);
                false
            }
            ProjectileStep::Dropped => {
                visuals.destroy_visual(*handle);
                false
            }
        });
        for (tower, bloon) in hits {
            self.resolve_hit(tower, bloon, now);
        }
    }

    fn update_beams(&mut self, now: u64) {
        let (due, pending): (Vec<Beam>, Vec<Beam>) =
            mem::take(&mut self.beams).into_iter().partition(|b| b.resolves_at <= now);
        self.beams = pending;
        for beam in due {
            self.resolve_hit(beam.tower, beam.target, now);
        }
    }

    fn update_towers(&mut self, now: u64) {
        for i in 0..self.towers.len() {
            let Some(shot) = self.towers[i].update(&self.bloons, now) else {
                continue;
            };
            let origin = self.towers[i].position;
            match shot {
                Shot::Projectile(p) => {
                    let handle = self.visuals.create_visual(VisualKind::Projectile, p.position);
                    self.projectiles.push((p, handle));
                }
                Shot::Beam(beam) => {
                    let to = self.bloon_position(beam.target);
                    self.visuals.play_effect(EffectKind::SniperBeam, origin, EffectParams { radius: 0.0, to });
                    self.beams.push(beam);
                }
                Shot::Slow { targets, factor, until, .. } => {
                    let radius = self.towers[i].range;
                    self.visuals.play_effect(EffectKind::FreezeWave, origin, EffectParams { radius, to: None });
                    for id in targets {
                        if let Some(bloon) = self.bloons.iter_mut().find(|b| b.id == id) {
                            bloon.apply_slow(factor, until);
                        }
                    }
                }
                Shot::Chain { tower, targets } => {
                    let mut from = origin;
                    for id in targets {
                        if let Some(to) = self.bloon_position(id) {
                            self.visuals.play_effect(EffectKind::TeslaArc, from, EffectParams { radius: 0.0, to: Some(to) });
                            from = to;
                        }
                        self.resolve_hit(tower, id, now);
                    }
                }
            }
        }
    }

    /// Towers near a live fire-trail node are knocked out briefly.
    fn scorch_towers(&mut self, now: u64) {
        let nodes: Vec<Vec2> = self.bloons.iter().flat_map(|b| b.fire_trail.iter().map(|n| n.position)).collect();
        if nodes.is_empty() {
            return;
        }
        let radius = self.cfg.bloon.fire_scorch_radius;
        let disable_ms = self.cfg.bloon.fire_scorch_disable_ms;
        for tower in &mut self.towers {
            if nodes.iter().any(|n| n.distance(tower.position) <= radius) {
                if !tower.is_disabled(now) {
                    self.visuals.play_effect(EffectKind::Scorch, tower.position, EffectParams::default());
                }
                tower.disable(disable_ms, now);
            }
        }
    }

    fn resolve_hit(&mut self, tower: TowerId, bloon_id: BloonId, now: u64) {
        let Some(bloon) = self.bloons.iter_mut().find(|b| b.id == bloon_id) else {
            trace!(bloon = bloon_id.0, "hit target no longer exists");
            return;
        };
        let Some(outcome) = bloon.on_hit(tower, now) else {
            return;
        };
        self.events.push(GameEvent::Hit {
            bloon: bloon.id,
            tower,
            is_clone: bloon.is_clone,
            position: bloon.position,
            outcome,
        });
    }

    // ---- events ------------------------------------------------------------------

    fn drain_events(&mut self) {
        let events = mem::take(&mut self.events);
        if !events.is_empty() {
            self.process_events(events);
        }
    }

    /// Applies one batch of events, checking for game over after each one and for
    /// level completion once the batch is done.
    pub fn process_events(&mut self, events: Vec<GameEvent>) {
        let epoch = self.level_epoch;
        for event in events {
            if self.level_epoch != epoch {
                trace!("dropping events from a discarded level");
                break;
            }
            match event {
                GameEvent::Escaped { bloon, is_clone, position, explosion } => {
                    self.bloons_escaped += 1;
                    if !is_clone {
                        self.bloons_active = self.bloons_active.saturating_sub(1);
                    }
                    self.drop_visual(bloon);
                    if let Some(blast) = explosion {
                        self.disable_towers_near(position, blast.radius, blast.disable_ms);
                        self.visuals.play_effect(
                            EffectKind::Explosion,
                            position,
                            EffectParams { radius: blast.radius, to: None },
                        );
                    }
                }
                GameEvent::Hit { bloon, tower, is_clone, position, outcome } => {
                    self.apply_hit(bloon, tower, is_clone, position, outcome);
                }
            }
            if self.status == GameStatus::Playing
                && self.bloons_escaped < self.bloons_required
                && self.quota_unreachable()
            {
                self.fail_level();
            }
        }
        if self.status == GameStatus::Playing
            && self.level_epoch == epoch
            && self.bloons_escaped >= self.bloons_required
        {
            self.complete_level();
        }
    }

    fn apply_hit(&mut self, bloon: BloonId, tower: TowerId, is_clone: bool, position: Vec2, outcome: HitOutcome) {
        match outcome {
            HitOutcome::Ignored => {}
            HitOutcome::Damaged { hits_left } => {
                trace!(bloon = bloon.0, hits_left, "bloon damaged");
                self.visuals.play_effect(EffectKind::Pop, position, EffectParams { radius: 0.5, to: None });
            }
            HitOutcome::Blocked => {
                self.notify("Shield broken!");
                self.visuals.play_effect(EffectKind::ShieldBreak, position, EffectParams::default());
            }
            HitOutcome::PhasedThrough => {
                self.notify("Phased through!");
                self.visuals.play_effect(EffectKind::Phase, position, EffectParams::default());
            }
            HitOutcome::Bounced(target) => self.bounce(bloon, target),
            HitOutcome::Mirrored(at) => {
                self.spawn_clones(bloon, 1.0);
                self.notify("Mirror images!");
                self.visuals.play_effect(EffectKind::Mirror, at, EffectParams::default());
            }
            HitOutcome::Split(at) => {
                self.spawn_clones(bloon, self.cfg.bloon.split_speed_bonus);
                self.notify("Bloon split!");
                self.visuals.play_effect(EffectKind::Split, at, EffectParams::default());
            }
            HitOutcome::Destroyed => {
                if is_clone {
                    self.notify("Clone destroyed");
                } else {
                    self.bloons_active = self.bloons_active.saturating_sub(1);
                    self.bloons_destroyed += 1;
                }
                self.drop_visual(bloon);
                self.visuals.play_effect(EffectKind::Pop, position, EffectParams { radius: 1.0, to: None });
                trace!(bloon = bloon.0, tower = tower.0, "bloon popped");
            }
        }
    }

    fn bounce(&mut self, bloon: BloonId, tower: TowerId) {
        let now = self.clock_ms;
        let bounce_ms = self.cfg.bloon.bounce_disable_ms;
        let jamming = self.bloons.iter().find(|b| b.id == bloon).and_then(|b| b.jamming);
        let Some(at) = self.towers.iter_mut().find(|t| t.id == tower).map(|t| {
            t.disable(bounce_ms, now);
            t.position
        }) else {
            trace!(tower = tower.0, "bounce target tower is gone");
            return;
        };
        self.visuals.play_effect(EffectKind::Bounce, at, EffectParams::default());
        if let Some(jam) = jamming {
            self.disable_towers_near(at, jam.radius, jam.disable_ms);
            self.visuals.play_effect(EffectKind::Jamming, at, EffectParams { radius: jam.radius, to: None });
        }
        self.notify("Bounced! Tower disabled");
    }

    fn disable_towers_near(&mut self, center: Vec2, radius: f64, disable_ms: u64) {
        let now = self.clock_ms;
        for tower in &mut self.towers {
            if tower.position.distance(center) <= radius {
                tower.disable(disable_ms, now);
            }
        }
    }

    /// Two clones either side of the parent, perpendicular to its heading.
    fn spawn_clones(&mut self, parent: BloonId, speed_factor: f64) {
        let now = self.clock_ms;
        let Some(parent) = self.bloons.iter().find(|b| b.id == parent).cloned() else {
            return;
        };
        let path = parent.path();
        let i = parent.path_index.min(path.len().saturating_sub(2));
        let heading = match (path.get(i), path.get(i + 1)) {
            (Some(a), Some(b)) => (*b - *a).normalized(),
            _ => Vec2::new(1.0, 0.0),
        };
        let side = heading.perpendicular().scale(self.cfg.bloon.clone_offset);
        for offset in [side, side.scale(-1.0)] {
            self.next_bloon_id += 1;
            let clone = Bloon::spawn_clone(BloonId(self.next_bloon_id), &parent, offset, speed_factor, now);
            let handle = self.visuals.create_visual(VisualKind::Bloon { clone: true }, clone.position);
            self.bloon_visuals.insert(clone.id, handle);
            self.bloons.push(clone);
        }
    }

    fn drop_visual(&mut self, bloon: BloonId) {
        if let Some(handle) = self.bloon_visuals.remove(&bloon) {
            self.visuals.destroy_visual(handle);
        }
    }

    fn notify(&mut self, message: impl Into<String>) {
        self.next_notification_id += 1;
        self.status_effects.notifications.push(Notification {
            id: self.next_notification_id,
            message: message.into(),
            expires_at: self.clock_ms + self.cfg.notification_lifetime_ms,
        });
    }

    fn refresh_status_effects(&mut self) {
        let permanent = self.upgrades.permanent.iter().map(|id| (*id, None));
        let temporary = self.upgrades.temporary.iter().map(|(id, left)| (*id, Some(*left)));
        self.status_effects.active = permanent
            .chain(temporary)
            .filter_map(|(id, levels_left)| {
                upgrade_def(id).map(|d| ActiveModifier { id, name: d.name, icon: d.icon, levels_left })
            })
            .collect();
    }

    // ---- intents -----------------------------------------------------------------

    fn require(&self, status: GameStatus, action: &'static str) -> Result<(), IntentError> {
        if self.status == status {
            Ok(())
        } else {
            Err(IntentError::InvalidState { action, status: self.status })
        }
    }

    fn require_ready(&self, kind: AbilityKind) -> Result<(), IntentError> {
        match self.cooldown_remaining(kind) {
            0 => Ok(()),
            remaining_ms => Err(IntentError::OnCooldown { ability: kind, remaining_ms }),
        }
    }

    pub fn select_ability(&mut self, kind: AbilityKind) -> Result<(), IntentError> {
        self.require(GameStatus::Playing, "select an ability")?;
        self.require_ready(kind)?;
        self.selected_ability = Some(kind);
        Ok(())
    }

    /// Activates the selected ability on `id`. `Ok(false)` when it was already active
    /// on that bloon; nothing is spent in that case.
    pub fn bloon_clicked(&mut self, id: BloonId) -> Result<bool, IntentError> {
        self.require(GameStatus::Playing, "activate an ability")?;
        let kind = self.selected_ability.ok_or(IntentError::NoAbilitySelected)?;
        self.require_ready(kind)?;
        let idx = self
            .bloons
            .iter()
            .position(|b| b.id == id && !b.is_disposed())
            .ok_or(IntentError::UnknownBloon(id))?;

        let now = self.clock_ms;
        let effects = self.upgrades.active_effects();
        let spec = self.cfg.abilities.get(kind);
        let duration = resolve_duration(kind, spec.duration_ms, &effects);
        if !self.bloons[idx].activate_ability(kind, duration, now) {
            return Ok(false);
        }
        let cooldown = resolve_cooldown(kind, spec.cooldown_ms, &effects);
        self.cooldowns[kind.index()] = Cooldown { ready_at: now + cooldown, total_ms: cooldown };
        self.selected_ability = None;
        self.notify(format!("{} activated!", kind.label()));

        if kind == AbilityKind::Shield {
            if let Some(radius) = self.bloons[idx].shield_aura {
                let center = self.bloons[idx].position;
                for other in &mut self.bloons {
                    if other.id != id && !other.is_disposed() && other.position.distance(center) <= radius {
                        other.activate_ability(AbilityKind::Shield, duration, now);
                    }
                }
            }
        }

        if roll_fusion(&mut self.rng, &effects) {
            let bloon = &self.bloons[idx];
            let candidates: Vec<AbilityKind> = AbilityKind::ALL
                .into_iter()
                .filter(|k| *k != kind && self.cooldown_remaining(*k) == 0 && !bloon.is_active(*k))
                .collect();
            if let Some(&second) = candidates.choose(&mut self.rng) {
                let d = resolve_duration(second, self.cfg.abilities.get(second).duration_ms, &effects);
                self.bloons[idx].activate_ability(second, d, now);
                self.notify(format!("Fusion! {} + {}", kind.label(), second.label()));
            }
        }
        Ok(true)
    }

    /// Clicks the nearest live bloon within the click radius of `at`.
    pub fn click_at(&mut self, at: Vec2) -> Result<bool, IntentError> {
        self.require(GameStatus::Playing, "activate an ability")?;
        let radius = self.cfg.bloon.click_radius;
        let id = self
            .bloons
            .iter()
            .filter(|b| !b.is_disposed())
            .map(|b| (b.id, b.position.distance(at)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
            .ok_or(IntentError::NoBloonAt)?;
        self.bloon_clicked(id)
    }

    pub fn finish_clear_animation(&mut self) -> Result<(), IntentError> {
        self.require(GameStatus::PerfectClear, "finish the clear animation")?;
        self.enter_upgrade_selection();
        Ok(())
    }

    pub fn select_upgrade(&mut self, id: UpgradeId) -> Result<(), IntentError> {
        self.require(GameStatus::SelectingUpgrade, "select an upgrade")?;
        if !self.upgrade_choices.contains(&id) {
            return Err(IntentError::UpgradeNotOffered(id));
        }
        let def = upgrade_def(id).ok_or(IntentError::UpgradeNotOffered(id))?;
        self.upgrades.apply(def);
        self.total_bloons += additional_bloons(def.effects);
        self.upgrade_choices.clear();
        self.refresh_status_effects();
        self.notify(format!("Upgrade activated: {}", def.name));
        self.status = GameStatus::LevelComplete;
        debug!(upgrade = ?id, "upgrade selected");
        Ok(())
    }

    pub fn request_continue(&mut self) -> Result<(), IntentError> {
        self.require(GameStatus::LevelComplete, "continue")?;
        self.retries_remaining = retry_attempts(&self.upgrades.active_effects());
        let next = self.current_level + 1;
        self.reset_level(next);
        Ok(())
    }

    pub fn request_restart(&mut self) -> Result<(), IntentError> {
        self.require(GameStatus::GameOver, "restart")?;
        self.upgrades = UpgradeState::default();
        self.score = 0;
        self.retries_remaining = 0;
        self.last_rejection = None;
        self.status_effects = StatusEffects::default();
        self.reset_level(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::TowerPlacement;
    use crate::model::TowerKind;
    use crate::upgrades::UPGRADE_DEFS;

    fn quiet_config() -> GameConfig {
        let mut cfg = GameConfig::default();
        cfg.level.max_towers = 0;
        cfg
    }

    fn quiet_game() -> Game {
        Game::new(quiet_config(), 11)
    }

    fn escaped(id: u64, is_clone: bool) -> GameEvent {
        GameEvent::Escaped { bloon: BloonId(id), is_clone, position: Vec2::default(), explosion: None }
    }

    fn destroyed(id: u64, is_clone: bool) -> GameEvent {
        GameEvent::Hit {
            bloon: BloonId(id),
            tower: TowerId(1),
            is_clone,
            position: Vec2::default(),
            outcome: HitOutcome::Destroyed,
        }
    }

    fn add_tower(game: &mut Game, kind: TowerKind, at: Vec2) -> TowerId {
        game.next_tower_id += 1;
        let id = TowerId(game.next_tower_id);
        let placement = TowerPlacement { kind, position: at };
        let neutral = crate::model::ThemeMultipliers { bloon_speed: 1.0, tower_range: 1.0, tower_cooldown: 1.0 };
        let table = game.cfg.towers;
        game.towers.push(Tower::new(id, &placement, &table, neutral));
        id
    }

    #[test]
    fn new_game_starts_level_one() {
        let game = quiet_game();
        assert_eq!(game.status, GameStatus::Playing);
        assert_eq!(game.current_level, 1);
        assert_eq!(game.bloons_required, 3);
        assert_eq!(game.total_bloons, 25);
        assert!(game.towers().is_empty());
        assert_eq!(game.level().path_waypoints.last(), Some(&Vec2::new(14.0, 14.0)));
    }

    #[test]
    fn exact_quota_is_perfect_and_overshoot_is_not() {
        let mut game = quiet_game();
        game.bloons_required = 5;
        game.bloons_active = 6;
        game.total_bloons = 0;
        game.process_events((1..=5).map(|i| escaped(i, false)).collect());
        assert_eq!(game.status, GameStatus::PerfectClear);
        assert_eq!(game.score, 300);
        assert_eq!(game.upgrade_choices.len(), 3);

        let mut game = quiet_game();
        game.bloons_required = 5;
        game.bloons_active = 6;
        game.total_bloons = 0;
        game.process_events((1..=6).map(|i| escaped(i, false)).collect());
        assert_eq!(game.status, GameStatus::LevelComplete);
        assert_eq!(game.score, 100);
    }

    #[test]
    fn destruction_spoils_a_perfect_clear() {
        let mut game = quiet_game();
        game.bloons_required = 2;
        game.bloons_active = 3;
        game.total_bloons = 5;
        game.process_events(vec![destroyed(1, false), escaped(2, false), escaped(3, false)]);
        assert_eq!(game.status, GameStatus::LevelComplete);
    }

    #[test]
    fn unreachable_quota_ends_the_run() {
        let mut game = quiet_game();
        game.total_bloons = 0;
        game.bloons_active = 2;
        game.bloons_required = 5;
        game.bloons_escaped = 2;
        game.process_events(vec![destroyed(1, false)]);
        assert_eq!(game.status, GameStatus::GameOver);
        assert_eq!(game.bloons_destroyed, 1);
        assert_eq!(game.score, 0);
    }

    #[test]
    fn game_over_pays_consolation_per_unspawned_bloon() {
        let mut game = quiet_game();
        game.total_bloons = 1;
        game.bloons_active = 1;
        game.bloons_required = 5;
        game.bloons_escaped = 2;
        game.process_events(vec![destroyed(1, false)]);
        assert_eq!(game.status, GameStatus::GameOver);
        assert_eq!(game.score, 50);
    }

    #[test]
    fn clones_count_toward_escapes_only() {
        let mut game = quiet_game();
        game.bloons_required = 3;
        game.bloons_active = 1;
        game.total_bloons = 10;
        game.process_events(vec![escaped(9, true), destroyed(10, true)]);
        assert_eq!(game.bloons_escaped, 1);
        assert_eq!(game.bloons_active, 1);
        assert_eq!(game.bloons_destroyed, 0);
        assert_eq!(game.total_bloons, 10);
        assert!(game.status_effects.notifications.iter().any(|n| n.message == "Clone destroyed"));
    }

    #[test]
    fn retry_restarts_the_level_instead_of_ending() {
        let mut game = quiet_game();
        game.retries_remaining = 1;
        game.total_bloons = 0;
        game.bloons_active = 1;
        game.bloons_required = 3;
        game.process_events(vec![destroyed(1, false), escaped(2, false)]);
        assert_eq!(game.status, GameStatus::Playing);
        assert_eq!(game.current_level, 1);
        assert_eq!(game.retries_remaining, 0);
        assert_eq!(game.total_bloons, 25);
        assert_eq!(game.bloons_destroyed, 0);
        assert_eq!(game.bloons_escaped, 0, "events from the failed attempt are dropped");
    }

    #[test]
    fn first_spawn_is_immediate_then_every_interval() {
        let mut game = quiet_game();
        game.tick(16);
        assert_eq!(game.bloons_active, 1);
        assert_eq!(game.total_bloons, 24);
        for _ in 0..124 {
            game.tick(16);
        }
        assert_eq!(game.clock_ms(), 2000);
        assert_eq!(game.bloons_active, 1);
        game.tick(16);
        assert_eq!(game.bloons_active, 2);
    }

    #[test]
    fn perfect_clear_advances_to_upgrade_selection() {
        let mut game = quiet_game();
        game.bloons_required = 1;
        game.bloons_active = 1;
        game.process_events(vec![escaped(1, false)]);
        assert_eq!(game.status, GameStatus::PerfectClear);
        game.tick(2999);
        assert_eq!(game.status, GameStatus::PerfectClear);
        game.tick(1);
        assert_eq!(game.status, GameStatus::SelectingUpgrade);
    }

    #[test]
    fn intents_rejected_from_wrong_state_leave_game_untouched() {
        let mut game = quiet_game();
        let before = (game.status, game.score, game.current_level);
        assert!(matches!(
            game.select_upgrade(UpgradeId::ExtraRetry),
            Err(IntentError::InvalidState { status: GameStatus::Playing, .. })
        ));
        assert!(game.request_continue().is_err());
        assert!(game.request_restart().is_err());
        assert!(game.finish_clear_animation().is_err());
        assert_eq!(before, (game.status, game.score, game.current_level));
    }

    #[test]
    fn upgrade_selection_flow() {
        let mut game = quiet_game();
        game.bloons_required = 1;
        game.bloons_active = 1;
        game.process_events(vec![escaped(1, false)]);
        game.finish_clear_animation().unwrap();
        assert_eq!(game.status, GameStatus::SelectingUpgrade);

        let offered = game.upgrade_choices.clone();
        let not_offered = UPGRADE_DEFS.iter().map(|d| d.id).find(|id| !offered.contains(id)).unwrap();
        assert_eq!(game.select_upgrade(not_offered), Err(IntentError::UpgradeNotOffered(not_offered)));

        let pick = offered[0];
        game.select_upgrade(pick).unwrap();
        assert_eq!(game.status, GameStatus::LevelComplete);
        assert_eq!(game.upgrades.history, vec![pick]);
        assert!(game.status_effects.active.iter().any(|m| m.id == pick));

        game.request_continue().unwrap();
        assert_eq!(game.current_level, 2);
        assert_eq!(game.status, GameStatus::Playing);
        assert_eq!(game.bloons_required, 5);
    }

    #[test]
    fn reinforcements_apply_now_and_at_every_reset() {
        let mut game = quiet_game();
        game.status = GameStatus::SelectingUpgrade;
        game.upgrade_choices = vec![UpgradeId::BloonReinforcement];
        let before = game.total_bloons;
        game.select_upgrade(UpgradeId::BloonReinforcement).unwrap();
        assert_eq!(game.total_bloons, before + 3);
        game.request_continue().unwrap();
        assert_eq!(game.total_bloons, 28);
    }

    #[test]
    fn temporary_upgrades_tick_down_on_completion() {
        let mut game = quiet_game();
        game.upgrades.apply(upgrade_def(UpgradeId::Overcharge).unwrap());
        game.bloons_required = 1;
        game.bloons_active = 2;
        game.process_events(vec![escaped(1, false), escaped(2, false)]);
        assert_eq!(game.upgrades.temporary.get(&UpgradeId::Overcharge), Some(&1));
    }

    #[test]
    fn ability_click_spends_resolved_cooldown() {
        let mut game = quiet_game();
        game.upgrades.apply(upgrade_def(UpgradeId::SpeedBurst).unwrap());
        game.tick(16);
        let id = game.bloons()[0].id;

        assert_eq!(game.bloon_clicked(id), Err(IntentError::NoAbilitySelected));
        game.select_ability(AbilityKind::Speed).unwrap();
        assert_eq!(game.bloon_clicked(id), Ok(true));
        assert!(game.bloons()[0].is_active(AbilityKind::Speed));
        assert_eq!(game.selected_ability, None);
        // 3000 base - 2000 flat, floored at 500.
        assert_eq!(game.cooldown_remaining(AbilityKind::Speed), 1000);
        assert!(matches!(
            game.select_ability(AbilityKind::Speed),
            Err(IntentError::OnCooldown { remaining_ms: 1000, .. })
        ));

        game.tick(1000);
        assert_eq!(game.cooldown_remaining(AbilityKind::Speed), 0);
        assert_eq!(game.cooldown_fraction(AbilityKind::Speed), 0.0);
        game.select_ability(AbilityKind::Speed).unwrap();
    }

    #[test]
    fn reactivating_a_running_ability_is_a_free_noop() {
        let mut game = quiet_game();
        game.tick(16);
        let id = game.bloons()[0].id;
        game.select_ability(AbilityKind::Camo).unwrap();
        assert_eq!(game.bloon_clicked(id), Ok(true));
        game.cooldowns = [Cooldown::default(); 8];
        game.select_ability(AbilityKind::Camo).unwrap();
        assert_eq!(game.bloon_clicked(id), Ok(false));
        assert_eq!(game.cooldown_remaining(AbilityKind::Camo), 0);
    }

    #[test]
    fn click_at_finds_bloon_under_cursor() {
        let mut game = quiet_game();
        game.tick(16);
        let at = game.bloons()[0].position;
        game.select_ability(AbilityKind::Shield).unwrap();
        assert_eq!(game.click_at(Vec2::new(100.0, 100.0)), Err(IntentError::NoBloonAt));
        assert_eq!(game.click_at(at + Vec2::new(0.5, 0.0)), Ok(true));
        assert!(game.bloons()[0].is_active(AbilityKind::Shield));
    }

    #[test]
    fn fusion_adds_a_second_ready_ability() {
        let mut game = quiet_game();
        game.upgrades.apply(upgrade_def(UpgradeId::AbilityFusion).unwrap());
        game.total_bloons = 100;
        let mut fused = false;
        // 25% per click; a fixed seed makes this deterministic.
        for _ in 0..64 {
            game.cooldowns = [Cooldown::default(); 8];
            let id = game.spawn_bloon(game.clock_ms);
            game.select_ability(AbilityKind::Mirror).unwrap();
            assert_eq!(game.bloon_clicked(id), Ok(true));
            let bloon = game.bloons.iter().find(|b| b.id == id).unwrap();
            if bloon.active_abilities().count() == 2 {
                fused = true;
                break;
            }
        }
        assert!(fused);
        assert!(game.status_effects.notifications.iter().any(|n| n.message.starts_with("Fusion!")));
        assert_eq!(game.cooldown_remaining(AbilityKind::Mirror), 12_000);
    }

    #[test]
    fn shield_aura_covers_neighbours() {
        let mut game = quiet_game();
        game.upgrades.apply(upgrade_def(UpgradeId::ProtectiveAura).unwrap());
        let a = game.spawn_bloon(0);
        let b = game.spawn_bloon(0);
        game.select_ability(AbilityKind::Shield).unwrap();
        game.bloon_clicked(a).unwrap();
        assert!(game.bloons.iter().find(|x| x.id == b).unwrap().is_active(AbilityKind::Shield));
    }

    #[test]
    fn bounce_disables_tower_and_jams_neighbours() {
        let mut game = quiet_game();
        game.upgrades.apply(upgrade_def(UpgradeId::TowerJamming).unwrap());
        let bloon = game.spawn_bloon(0);
        let hit = add_tower(&mut game, TowerKind::Basic, Vec2::new(0.0, 0.0));
        let near = add_tower(&mut game, TowerKind::Basic, Vec2::new(2.0, 0.0));
        let far = add_tower(&mut game, TowerKind::Basic, Vec2::new(10.0, 0.0));
        game.process_events(vec![GameEvent::Hit {
            bloon,
            tower: hit,
            is_clone: false,
            position: Vec2::default(),
            outcome: HitOutcome::Bounced(hit),
        }]);
        let until = |id: TowerId| game.towers.iter().find(|t| t.id == id).map(|t| t.disabled_until);
        assert_eq!(until(hit), Some(5000));
        assert_eq!(until(near), Some(5000));
        assert_eq!(until(far), Some(0));
    }

    #[test]
    fn freeze_slows_every_bloon_in_range() {
        let mut game = quiet_game();
        let start = game.cfg.level.path_start;
        let a = game.spawn_bloon(0);
        let b = game.spawn_bloon(0);
        let far = game.spawn_bloon(0);
        game.bloons.iter_mut().find(|x| x.id == far).unwrap().position = start + Vec2::new(20.0, 0.0);
        add_tower(&mut game, TowerKind::Freeze, start);
        game.clock_ms = 1000;
        game.update_towers(1000);
        game.drain_events();

        let slowed = |id: BloonId| game.bloons.iter().find(|x| x.id == id).unwrap().is_slowed();
        assert!(slowed(a));
        assert!(slowed(b));
        assert!(!slowed(far));
        assert_eq!(game.bloons_destroyed, 0);
        assert_eq!(game.bloons_active, 3);
    }

    #[test]
    fn tesla_chain_pops_every_linked_bloon() {
        let mut game = quiet_game();
        let start = game.cfg.level.path_start;
        game.spawn_bloon(0);
        game.spawn_bloon(0);
        add_tower(&mut game, TowerKind::Tesla, start);
        game.clock_ms = 1000;
        game.update_towers(1000);
        game.drain_events();

        assert_eq!(game.bloons_destroyed, 2);
        assert_eq!(game.bloons_active, 0);
        assert!(game.bloons.iter().all(|b| b.is_disposed()));
        assert_eq!(game.status, GameStatus::Playing);
    }

    #[test]
    fn sniper_beam_resolves_after_its_delay() {
        let mut game = quiet_game();
        let start = game.cfg.level.path_start;
        let target = game.spawn_bloon(0);
        add_tower(&mut game, TowerKind::Sniper, start);
        game.clock_ms = 1000;
        game.update_towers(1000);
        assert_eq!(game.beams().len(), 1);
        assert_eq!(game.beams()[0].target, target);

        game.update_beams(1599);
        game.drain_events();
        assert_eq!(game.beams().len(), 1);
        assert_eq!(game.bloons_destroyed, 0);

        game.update_beams(1600);
        game.drain_events();
        assert!(game.beams().is_empty());
        assert_eq!(game.bloons_destroyed, 1);
        assert_eq!(game.bloons_active, 0);
    }

    #[test]
    fn sniper_beam_on_a_departed_bloon_is_skipped() {
        let mut game = quiet_game();
        let start = game.cfg.level.path_start;
        let target = game.spawn_bloon(0);
        add_tower(&mut game, TowerKind::Sniper, start);
        game.clock_ms = 1000;
        game.update_towers(1000);
        assert_eq!(game.beams().len(), 1);

        assert!(game.bloons.iter_mut().find(|b| b.id == target).unwrap().escape());
        game.bloons.retain(|b| !b.is_disposed());
        game.update_beams(1600);
        assert!(game.events.is_empty());
        game.drain_events();
        assert!(game.beams().is_empty());
        assert_eq!(game.bloons_destroyed, 0);
        assert_eq!(game.status, GameStatus::Playing);
    }

    #[test]
    fn escape_explosion_disables_towers_in_radius() {
        let mut game = quiet_game();
        let near = add_tower(&mut game, TowerKind::Sniper, Vec2::new(13.0, 13.0));
        let far = add_tower(&mut game, TowerKind::Sniper, Vec2::new(0.0, 0.0));
        game.bloons_active = 1;
        game.process_events(vec![GameEvent::Escaped {
            bloon: BloonId(1),
            is_clone: false,
            position: Vec2::new(14.0, 14.0),
            explosion: Some(AreaDisable { radius: 4.0, disable_ms: 3000 }),
        }]);
        assert!(game.towers.iter().find(|t| t.id == near).unwrap().is_disabled(0));
        assert!(!game.towers.iter().find(|t| t.id == far).unwrap().is_disabled(0));
    }

    #[test]
    fn mirror_spawns_two_offset_clones() {
        let mut game = quiet_game();
        let parent = game.spawn_bloon(0);
        let at = game.bloon_position(parent).unwrap();
        game.process_events(vec![GameEvent::Hit {
            bloon: parent,
            tower: TowerId(1),
            is_clone: false,
            position: at,
            outcome: HitOutcome::Mirrored(at),
        }]);
        let clones: Vec<&Bloon> = game.bloons.iter().filter(|b| b.is_clone).collect();
        assert_eq!(clones.len(), 2);
        for c in &clones {
            assert!((c.position.distance(at) - 0.5).abs() < 1e-9);
            assert_eq!(c.path_index, 0);
        }
        assert_eq!(game.bloons_active, 1);
    }

    #[test]
    fn scorched_towers_are_disabled() {
        let mut game = quiet_game();
        let id = game.spawn_bloon(0);
        let start = game.bloon_position(id).unwrap();
        let tower = add_tower(&mut game, TowerKind::Basic, start + Vec2::new(1.0, 0.0));
        game.bloons[0].activate_ability(AbilityKind::Fire, 4000, 0);
        game.bloons[0].fire_trail.push(crate::bloon::FireNode { position: start, expires_at: 10_000 });
        game.scorch_towers(100);
        let t = game.towers.iter().find(|t| t.id == tower).unwrap();
        assert!(t.is_disabled(100));
        assert_eq!(t.disabled_until, 1100);
    }

    #[test]
    fn notifications_expire() {
        let mut game = quiet_game();
        game.notify("hello");
        game.tick(4999);
        assert_eq!(game.status_effects.notifications.len(), 1);
        game.tick(1);
        assert!(game.status_effects.notifications.is_empty());
    }

    #[test]
    fn restart_resets_the_run() {
        let mut game = quiet_game();
        game.upgrades.apply(upgrade_def(UpgradeId::GhostMode).unwrap());
        game.score = 900;
        game.status = GameStatus::GameOver;
        game.request_restart().unwrap();
        assert_eq!(game.status, GameStatus::Playing);
        assert_eq!(game.score, 0);
        assert_eq!(game.current_level, 1);
        assert!(game.upgrades.history.is_empty());
        assert!(game.status_effects.active.is_empty());
    }
}
