//! Upgrade effects and the pure functions that fold them into concrete numbers.
//!
//! Callers pass the merged effect list of every *visible* modifier (all permanent
//! upgrades plus temporary upgrades with levels remaining); nothing here keeps state.

use rand::Rng;

use crate::model::AbilityKind;

/// Minimum ability cooldown after all reductions.
pub const ABILITY_COOLDOWN_FLOOR_MS: u64 = 500;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    AbilityDuration { ability: AbilityKind, multiplier: f64 },
    /// Flat reduction applied before any fractional reduction.
    AbilityCooldown { ability: AbilityKind, reduction_ms: u64 },
    /// Fraction in `[0, 1]` removed from every ability cooldown.
    GlobalCooldownReduction(f64),
    BloonSpeed(f64),
    /// One-shot on selection for temporary upgrades, every level for permanent ones.
    AdditionalBloons(u32),
    AutoCamo { duration_ms: u64 },
    EscapeExplosion { radius: f64, disable_ms: u64 },
    FusionChance(f64),
    /// Phased bloons drop out of every tower's target list.
    PhaseUntargetable,
    ShieldAura { radius: f64 },
    TowerJamming { radius: f64, disable_ms: u64 },
    ExtraToughness(u8),
    RetryAttempts(u32),
}

pub fn resolve_cooldown(ability: AbilityKind, base_ms: u64, effects: &[Effect]) -> u64 {
    let mut cooldown = base_ms as f64;
    for effect in effects {
        if let Effect::AbilityCooldown { ability: a, reduction_ms } = *effect {
            if a == ability {
                cooldown -= reduction_ms as f64;
            }
        }
    }
    for effect in effects {
        if let Effect::GlobalCooldownReduction(fraction) = *effect {
            cooldown *= 1.0 - fraction.clamp(0.0, 1.0);
        }
    }
    let floor = ABILITY_COOLDOWN_FLOOR_MS as f64;
    cooldown.max(floor).round() as u64
}

pub fn resolve_duration(ability: AbilityKind, base_ms: u64, effects: &[Effect]) -> u64 {
    let factor: f64 = effects
        .iter()
        .filter_map(|e| match *e {
            Effect::AbilityDuration { ability: a, multiplier } if a == ability => Some(multiplier),
            _ => None,
        })
        .product();
    (base_ms as f64 * factor).max(0.0).round() as u64
}

/// One independent draw per fusion effect; any success triggers fusion.
pub fn roll_fusion<R: Rng + ?Sized>(rng: &mut R, effects: &[Effect]) -> bool {
    let mut fused = false;
    for effect in effects {
        if let Effect::FusionChance(p) = *effect {
            fused |= rng.gen_bool(p.clamp(0.0, 1.0));
        }
    }
    fused
}

pub fn additional_bloons(effects: &[Effect]) -> u32 {
    effects
        .iter()
        .map(|e| match *e {
            Effect::AdditionalBloons(n) => n,
            _ => 0,
        })
        .sum()
}

pub fn retry_attempts(effects: &[Effect]) -> u32 {
    effects
        .iter()
        .map(|e| match *e {
            Effect::RetryAttempts(n) => n,
            _ => 0,
        })
        .sum()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaDisable {
    pub radius: f64,
    pub disable_ms: u64,
}

impl AreaDisable {
    fn widest(current: Option<AreaDisable>, radius: f64, disable_ms: u64) -> Option<AreaDisable> {
        let next = AreaDisable { radius, disable_ms };
        Some(match current {
            Some(c) => AreaDisable { radius: c.radius.max(next.radius), disable_ms: c.disable_ms.max(next.disable_ms) },
            None => next,
        })
    }
}

/// Persistent effects baked into a bloon when it spawns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloonProfile {
    pub speed_multiplier: f64,
    pub extra_toughness: u8,
    pub auto_camo_ms: Option<u64>,
    pub phase_untargetable: bool,
    pub shield_aura: Option<f64>,
    pub jamming: Option<AreaDisable>,
    pub escape_explosion: Option<AreaDisable>,
}

impl Default for BloonProfile {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            extra_toughness: 0,
            auto_camo_ms: None,
            phase_untargetable: false,
            shield_aura: None,
            jamming: None,
            escape_explosion: None,
        }
    }
}

impl BloonProfile {
    pub fn resolve(effects: &[Effect]) -> Self {
        let mut p = BloonProfile::default();
        for effect in effects {
            match *effect {
                Effect::BloonSpeed(m) => p.speed_multiplier *= m,
                Effect::ExtraToughness(n) => p.extra_toughness = p.extra_toughness.saturating_add(n),
                Effect::AutoCamo { duration_ms } => {
                    p.auto_camo_ms = Some(p.auto_camo_ms.map_or(duration_ms, |d| d.max(duration_ms)));
                }
                Effect::PhaseUntargetable => p.phase_untargetable = true,
                Effect::ShieldAura { radius } => {
                    p.shield_aura = Some(p.shield_aura.map_or(radius, |r| r.max(radius)));
                }
                Effect::TowerJamming { radius, disable_ms } => {
                    p.jamming = AreaDisable::widest(p.jamming, radius, disable_ms);
                }
                Effect::EscapeExplosion { radius, disable_ms } => {
                    p.escape_explosion = AreaDisable::widest(p.escape_explosion, radius, disable_ms);
                }
                // Resolved at activation time or by the orchestrator.
                Effect::AbilityDuration { .. }
                | Effect::AbilityCooldown { .. }
                | Effect::GlobalCooldownReduction(_)
                | Effect::AdditionalBloons(_)
                | Effect::FusionChance(_)
                | Effect::RetryAttempts(_) => {}
            }
        }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn cooldown_never_drops_below_floor() {
        let effects = vec![
            Effect::AbilityCooldown { ability: AbilityKind::Speed, reduction_ms: 2000 },
            Effect::AbilityCooldown { ability: AbilityKind::Speed, reduction_ms: 2000 },
            Effect::GlobalCooldownReduction(0.3),
            Effect::GlobalCooldownReduction(0.9),
            Effect::GlobalCooldownReduction(1.0),
        ];
        assert_eq!(resolve_cooldown(AbilityKind::Speed, 3000, &effects), ABILITY_COOLDOWN_FLOOR_MS);
        assert_eq!(resolve_cooldown(AbilityKind::Speed, 0, &[]), ABILITY_COOLDOWN_FLOOR_MS);
    }

    #[test]
    fn cooldown_subtracts_then_scales() {
        let effects = vec![
            Effect::GlobalCooldownReduction(0.5),
            Effect::AbilityCooldown { ability: AbilityKind::Camo, reduction_ms: 2000 },
            // Other abilities' reductions don't apply.
            Effect::AbilityCooldown { ability: AbilityKind::Shield, reduction_ms: 1000 },
        ];
        assert_eq!(resolve_cooldown(AbilityKind::Camo, 6000, &effects), 2000);
    }

    #[test]
    fn duration_is_order_independent_product() {
        let a = Effect::AbilityDuration { ability: AbilityKind::Fire, multiplier: 1.5 };
        let b = Effect::AbilityDuration { ability: AbilityKind::Fire, multiplier: 2.0 };
        assert_eq!(resolve_duration(AbilityKind::Fire, 1000, &[a, b]), 3000);
        assert_eq!(resolve_duration(AbilityKind::Fire, 1000, &[b, a]), 3000);
        assert_eq!(resolve_duration(AbilityKind::Shield, 1000, &[a, b]), 1000);
    }

    #[test]
    fn fusion_is_or_of_independent_draws() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(!roll_fusion(&mut rng, &[]));
        assert!(!roll_fusion(&mut rng, &[Effect::FusionChance(0.0), Effect::FusionChance(0.0)]));
        assert!(roll_fusion(&mut rng, &[Effect::FusionChance(0.0), Effect::FusionChance(1.0)]));

        // Two 50% sources fire about 75% of the time.
        let effects = [Effect::FusionChance(0.5), Effect::FusionChance(0.5)];
        let hits = (0..4000).filter(|_| roll_fusion(&mut rng, &effects)).count();
        assert!((2800..3200).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn profile_folds_spawn_effects() {
        let p = BloonProfile::resolve(&[
            Effect::BloonSpeed(1.2),
            Effect::BloonSpeed(1.5),
            Effect::AutoCamo { duration_ms: 3000 },
            Effect::PhaseUntargetable,
            Effect::TowerJamming { radius: 3.0, disable_ms: 5000 },
            Effect::ExtraToughness(1),
            Effect::RetryAttempts(1),
        ]);
        assert!((p.speed_multiplier - 1.8).abs() < 1e-9);
        assert_eq!(p.auto_camo_ms, Some(3000));
        assert!(p.phase_untargetable);
        assert_eq!(p.jamming, Some(AreaDisable { radius: 3.0, disable_ms: 5000 }));
        assert_eq!(p.extra_toughness, 1);
        assert_eq!(p.escape_explosion, None);
    }

    #[test]
    fn counts_sum_across_modifiers() {
        let effects = [Effect::AdditionalBloons(3), Effect::AdditionalBloons(2), Effect::RetryAttempts(1)];
        assert_eq!(additional_bloons(&effects), 5);
        assert_eq!(retry_attempts(&effects), 1);
    }
}
