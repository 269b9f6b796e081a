use std::collections::BTreeMap;

use bloons_revenge::bloon::Bloon;
use bloons_revenge::config::{BloonConfig, ConfigError, LevelConfig};
use bloons_revenge::level::{generate_path, place_towers};
use bloons_revenge::model::{AbilityKind, BloonId, GameStatus, HitOutcome, TowerId, Vec2};
use bloons_revenge::modifiers::BloonProfile;
use bloons_revenge::{Game, GameAction, GameConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

const FRAME_MS: u64 = 16;

fn towerless() -> GameConfig {
    let mut cfg = GameConfig::default();
    cfg.level.max_towers = 0;
    cfg
}

#[test]
fn level_one_runs_to_a_perfect_clear() {
    let mut game = Game::new(towerless(), 2024);
    assert_eq!(game.bloons_required, 3);
    let mut frames = 0;
    while game.status == GameStatus::Playing && frames < 20_000 {
        game.tick(FRAME_MS);
        frames += 1;
    }
    assert_eq!(game.status, GameStatus::PerfectClear);
    assert_eq!(game.bloons_escaped, 3);
    assert_eq!(game.bloons_destroyed, 0);
    assert_eq!(game.score, 100 + 200);
    assert_eq!(game.upgrade_choices.len(), 3);

    // Celebration, then the offer, then the next level.
    for _ in 0..200 {
        game.tick(FRAME_MS);
    }
    assert_eq!(game.status, GameStatus::SelectingUpgrade);
    let pick = game.upgrade_choices[0];
    game.apply_action(GameAction::SelectUpgrade(pick));
    game.apply_action(GameAction::Continue);
    assert_eq!(game.status, GameStatus::Playing);
    assert_eq!(game.current_level, 2);
    assert!(game.last_rejection.is_none());
}

#[test]
fn path_progress_never_goes_backwards() {
    let mut game = Game::new(GameConfig::default(), 7);
    let mut seen: BTreeMap<BloonId, usize> = BTreeMap::new();
    for _ in 0..3000 {
        game.tick(FRAME_MS);
        for b in game.bloons() {
            let last = seen.entry(b.id).or_insert(b.path_index);
            assert!(b.path_index >= *last);
            assert!(b.path_index <= b.path().len() - 1);
            *last = b.path_index;
        }
        if game.status != GameStatus::Playing {
            break;
        }
    }
}

#[test]
fn counters_stay_consistent_with_towers_firing() {
    for seed in 0..4 {
        let mut game = Game::new(GameConfig::default(), seed);
        for _ in 0..4000 {
            game.tick(FRAME_MS);
            if game.status != GameStatus::Playing {
                break;
            }
            let live_originals = game.bloons().iter().filter(|b| !b.is_clone).count() as u32;
            assert_eq!(live_originals, game.bloons_active, "seed {seed}");
        }
        if game.status == GameStatus::GameOver {
            game.apply_action(GameAction::Restart);
            assert_eq!(game.status, GameStatus::Playing);
            assert_eq!(game.current_level, 1);
        }
    }
}

#[test]
fn terminal_state_is_reached_once() {
    let path: std::rc::Rc<[Vec2]> = std::rc::Rc::from(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
    let cfg = BloonConfig::default();
    let mut b = Bloon::spawn(BloonId(1), path, &cfg, &BloonProfile::default(), 0);
    assert_eq!(b.on_hit(TowerId(1), 1000), Some(HitOutcome::Destroyed));
    assert!(!b.escape());
    assert_eq!(b.on_hit(TowerId(1), 2000), None);
    b.dispose();
    assert!(b.is_disposed());
}

#[test]
fn fresh_shield_blocks_then_pops() {
    let path: std::rc::Rc<[Vec2]> = std::rc::Rc::from(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
    let mut b = Bloon::spawn(BloonId(1), path, &BloonConfig::default(), &BloonProfile::default(), 0);
    b.activate_ability(AbilityKind::Shield, 3000, 1000);
    assert_eq!(b.on_hit(TowerId(1), 1000), Some(HitOutcome::Blocked));
    assert_eq!(b.on_hit(TowerId(1), 1001), Some(HitOutcome::Destroyed));
}

#[test]
fn generated_paths_and_layouts_hold_their_invariants() {
    let cfg = LevelConfig::default();
    for seed in 0..40 {
        let mut rng = StdRng::seed_from_u64(seed);
        for complexity in 1..=10 {
            let path = generate_path(&mut rng, &cfg, complexity as f64);
            assert_eq!(path.last(), Some(&cfg.path_end));
            assert!(path.len() >= 2 && path.len() <= 32);

            let towers = place_towers(&mut rng, &path, 8, complexity, &cfg);
            for (i, t) in towers.iter().enumerate() {
                assert!(path.iter().all(|p| p.distance(t.position) >= cfg.min_dist_from_path));
                for other in &towers[i + 1..] {
                    assert!(other.position.distance(t.position) >= cfg.min_dist_between_towers);
                }
            }
        }
    }
}

#[test]
fn config_loads_partial_json() {
    let cfg = GameConfig::from_json(r#"{ "spawn_interval_ms": 1500, "scoring": { "per_level": 150 } }"#).unwrap();
    assert_eq!(cfg.spawn_interval_ms, 1500);
    assert_eq!(cfg.scoring.per_level, 150);
    assert_eq!(cfg.scoring.perfect_clear_bonus, 200);

    assert!(matches!(GameConfig::from_json("{ nope"), Err(ConfigError::Parse(_))));
    assert!(matches!(
        GameConfig::from_json(r#"{ "spawn_interval_ms": 0 }"#),
        Err(ConfigError::Invalid(_))
    ));
}
