//! Upgrade catalog and the run's upgrade bookkeeping.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::model::AbilityKind;
use crate::modifiers::Effect;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UpgradeId {
    SpeedBurst,
    ProtectiveAura,
    PathShortcut,
    BloonReinforcement,
    BurnoutMode,
    Overcharge,
    ThickSkin,
    GhostMode,
    TowerJamming,
    AbilityFusion,
    PermanentCamo,
    BloonDetonation,
    ExtraRetry,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Early,
    Mid,
    Late,
    End,
}

impl Tier {
    pub fn for_level(level: u32) -> Tier {
        match level {
            0..=5 => Tier::Early,
            6..=10 => Tier::Mid,
            11..=15 => Tier::Late,
            _ => Tier::End,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeKind {
    Permanent,
    /// Expires after this many completed levels.
    Temporary { levels: u32 },
}

#[derive(Debug)]
pub struct UpgradeDef {
    pub id: UpgradeId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub tier: Tier,
    pub kind: UpgradeKind,
    pub effects: &'static [Effect],
}

pub static UPGRADE_DEFS: &[UpgradeDef] = &[
    UpgradeDef {
        id: UpgradeId::SpeedBurst,
        name: "Speed Burst",
        description: "Speed ability lasts 50% longer and recharges 2 seconds faster",
        icon: "⚡",
        tier: Tier::Early,
        kind: UpgradeKind::Permanent,
        effects: &[
            Effect::AbilityDuration { ability: AbilityKind::Speed, multiplier: 1.5 },
            Effect::AbilityCooldown { ability: AbilityKind::Speed, reduction_ms: 2000 },
        ],
    },
    UpgradeDef {
        id: UpgradeId::ProtectiveAura,
        name: "Protective Aura",
        description: "Shield also protects nearby bloons",
        icon: "🛡️",
        tier: Tier::Early,
        kind: UpgradeKind::Permanent,
        effects: &[Effect::ShieldAura { radius: 2.0 }],
    },
    UpgradeDef {
        id: UpgradeId::PathShortcut,
        name: "Path Shortcut",
        description: "Bloons move 20% faster for the next 3 levels",
        icon: "🔄",
        tier: Tier::Early,
        kind: UpgradeKind::Temporary { levels: 3 },
        effects: &[Effect::BloonSpeed(1.2)],
    },
    UpgradeDef {
        id: UpgradeId::BloonReinforcement,
        name: "Bloon Reinforcement",
        description: "Start each level with 3 additional bloons",
        icon: "➕",
        tier: Tier::Mid,
        kind: UpgradeKind::Permanent,
        effects: &[Effect::AdditionalBloons(3)],
    },
    UpgradeDef {
        id: UpgradeId::BurnoutMode,
        name: "Burnout Mode",
        description: "Fire trails last twice as long",
        icon: "🔥",
        tier: Tier::Mid,
        kind: UpgradeKind::Permanent,
        effects: &[Effect::AbilityDuration { ability: AbilityKind::Fire, multiplier: 2.0 }],
    },
    UpgradeDef {
        id: UpgradeId::Overcharge,
        name: "Overcharge",
        description: "All abilities recharge 30% faster for the next 2 levels",
        icon: "⚡",
        tier: Tier::Mid,
        kind: UpgradeKind::Temporary { levels: 2 },
        effects: &[Effect::GlobalCooldownReduction(0.3)],
    },
    UpgradeDef {
        id: UpgradeId::ThickSkin,
        name: "Thick Skin",
        description: "Bloons survive one extra hit for the next 2 levels",
        icon: "🎈",
        tier: Tier::Mid,
        kind: UpgradeKind::Temporary { levels: 2 },
        effects: &[Effect::ExtraToughness(1)],
    },
    UpgradeDef {
        id: UpgradeId::GhostMode,
        name: "Ghost Mode",
        description: "Phased bloons cannot be targeted at all",
        icon: "👻",
        tier: Tier::Late,
        kind: UpgradeKind::Permanent,
        effects: &[Effect::PhaseUntargetable],
    },
    UpgradeDef {
        id: UpgradeId::TowerJamming,
        name: "Tower Jamming",
        description: "Towers near a rubber bounce are disabled for 5 seconds",
        icon: "🔇",
        tier: Tier::Late,
        kind: UpgradeKind::Permanent,
        effects: &[Effect::TowerJamming { radius: 3.0, disable_ms: 5000 }],
    },
    UpgradeDef {
        id: UpgradeId::AbilityFusion,
        name: "Ability Fusion",
        description: "For the next 2 levels, abilities have a 25% chance to trigger a second one",
        icon: "🔮",
        tier: Tier::Late,
        kind: UpgradeKind::Temporary { levels: 2 },
        effects: &[Effect::FusionChance(0.25)],
    },
    UpgradeDef {
        id: UpgradeId::PermanentCamo,
        name: "Permanent Camo",
        description: "Bloons spawn with 3 seconds of camo",
        icon: "🥷",
        tier: Tier::End,
        kind: UpgradeKind::Permanent,
        effects: &[Effect::AutoCamo { duration_ms: 3000 }],
    },
    UpgradeDef {
        id: UpgradeId::BloonDetonation,
        name: "Bloon Detonation",
        description: "Escaping bloons explode and disable nearby towers",
        icon: "💥",
        tier: Tier::End,
        kind: UpgradeKind::Permanent,
        effects: &[Effect::EscapeExplosion { radius: 4.0, disable_ms: 3000 }],
    },
    UpgradeDef {
        id: UpgradeId::ExtraRetry,
        name: "Extra Retry",
        description: "Retry a failed level once",
        icon: "🔁",
        tier: Tier::End,
        kind: UpgradeKind::Permanent,
        effects: &[Effect::RetryAttempts(1)],
    },
];

pub fn upgrade_def(id: UpgradeId) -> Option<&'static UpgradeDef> {
    UPGRADE_DEFS.iter().find(|d| d.id == id)
}

pub fn tier_upgrades(tier: Tier) -> impl Iterator<Item = &'static UpgradeDef> {
    UPGRADE_DEFS.iter().filter(move |d| d.tier == tier)
}

/// Random distinct offer from the tier matching `level`.
pub fn offer_choices<R: Rng + ?Sized>(rng: &mut R, level: u32, count: usize) -> Vec<UpgradeId> {
    let pool: Vec<UpgradeId> = tier_upgrades(Tier::for_level(level)).map(|d| d.id).collect();
    pool.choose_multiple(rng, count).copied().collect()
}

/// Everything the player picked this run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradeState {
    pub history: Vec<UpgradeId>,
    /// Owned permanent upgrades. Picking one again changes nothing.
    pub permanent: BTreeSet<UpgradeId>,
    /// Remaining levels per temporary upgrade; entries at zero are removed.
    pub temporary: BTreeMap<UpgradeId, u32>,
}

impl UpgradeState {
    pub fn apply(&mut self, def: &UpgradeDef) {
        self.history.push(def.id);
        match def.kind {
            UpgradeKind::Permanent => {
                self.permanent.insert(def.id);
            }
            // Picking the same temporary again refreshes its duration.
            UpgradeKind::Temporary { levels } => {
                self.temporary.insert(def.id, levels);
            }
        }
    }

    /// Called once per completed level.
    pub fn tick_level(&mut self) -> Vec<UpgradeId> {
        let mut expired = Vec::new();
        for (id, remaining) in self.temporary.iter_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                expired.push(*id);
            }
        }
        self.temporary.retain(|_, remaining| *remaining > 0);
        expired
    }

    /// Merged effect list of every upgrade currently in force.
    pub fn active_effects(&self) -> Vec<Effect> {
        let mut effects = self.permanent_effects();
        effects.extend(
            self.temporary
                .iter()
                .filter(|(_, remaining)| **remaining > 0)
                .flat_map(|(id, _)| upgrade_def(*id).map(|d| d.effects).unwrap_or(&[]).iter().copied()),
        );
        effects
    }

    pub fn permanent_effects(&self) -> Vec<Effect> {
        self.permanent
            .iter()
            .flat_map(|id| upgrade_def(*id).map(|d| d.effects).unwrap_or(&[]).iter().copied())
            .collect()
    }

    pub fn is_active(&self, id: UpgradeId) -> bool {
        self.permanent.contains(&id) || self.temporary.get(&id).is_some_and(|r| *r > 0)
    }
}
