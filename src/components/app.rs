use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;

use bloons_revenge::game::Game;
use bloons_revenge::model::{AbilityKind, GameStatus, Theme, TowerKind, Vec2};
use bloons_revenge::presentation::{EffectKind, EffectParams};
use bloons_revenge::upgrades::UpgradeId;
use bloons_revenge::{GameAction, GameConfig};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent};
use yew::prelude::*;

use super::{
    ability_bar::{AbilityBar, AbilitySlot},
    game_over_overlay::GameOverOverlay,
    level_complete_overlay::LevelCompleteOverlay,
    stats_panel::StatsPanel,
    status_effects_hud::StatusEffectsHud,
    upgrade_modal::UpgradeModal,
};
use crate::state::Camera;
use crate::util::clog;

const FRAME_MS: u64 = 16;
const FLASH_MS: u64 = 300;

#[derive(Clone)]
struct Flash {
    kind: EffectKind,
    at: Vec2,
    params: EffectParams,
    until: u64,
}

/// Effects only live for the tick that emitted them; keep them on screen a little longer.
#[derive(Default)]
struct FlashBuffer {
    seen_clock: u64,
    flashes: Vec<Flash>,
}

fn new_seed() -> u64 {
    (js_sys::Math::random() * u64::MAX as f64) as u64
}

fn background(theme: Theme) -> &'static str {
    match theme {
        Theme::Desert => "#3b2f1e",
        Theme::Fog => "#2a2f36",
        Theme::Storm => "#1b2230",
    }
}

fn tower_color(kind: TowerKind) -> &'static str {
    match kind {
        TowerKind::Basic => "#8b949e",
        TowerKind::Sniper => "#f0883e",
        TowerKind::Freeze => "#79c0ff",
        TowerKind::Tesla => "#d2a8ff",
    }
}

fn ability_color(kind: AbilityKind) -> &'static str {
    match kind {
        AbilityKind::Shield => "#58a6ff",
        AbilityKind::Speed => "#3fb950",
        AbilityKind::Camo => "#6e7681",
        AbilityKind::Phase => "#bc8cff",
        AbilityKind::Fire => "#ff7b00",
        AbilityKind::Mirror => "#e6edf3",
        AbilityKind::Rubber => "#db61a2",
        AbilityKind::Split => "#d4af37",
    }
}

fn circle(ctx: &CanvasRenderingContext2d, x: f64, y: f64, r: f64) {
    ctx.begin_path();
    let _ = ctx.arc(x, y, r.max(0.5), 0.0, TAU);
}

fn draw(canvas: &HtmlCanvasElement, cam: &Camera, game: &Game, flashes: &[Flash]) {
    if !canvas.is_connected() {
        return;
    }
    let Some(ctx) = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
    else {
        return;
    };
    let w = canvas.width() as f64;
    let h = canvas.height() as f64;
    let now = game.clock_ms();
    ctx.set_global_alpha(1.0);
    ctx.set_fill_style_str(background(game.theme()));
    ctx.fill_rect(0.0, 0.0, w, h);

    // Path
    ctx.set_stroke_style_str("#6e5a3a");
    ctx.set_line_width(cam.zoom * 0.8);
    ctx.begin_path();
    for (i, p) in game.level().path_waypoints.iter().enumerate() {
        let (x, y) = cam.world_to_screen(*p);
        if i == 0 {
            ctx.move_to(x, y);
        } else {
            ctx.line_to(x, y);
        }
    }
    ctx.stroke();

    // Towers and their reach
    for t in game.towers() {
        let (x, y) = cam.world_to_screen(t.position);
        ctx.set_global_alpha(0.08);
        ctx.set_fill_style_str(tower_color(t.kind));
        circle(&ctx, x, y, t.range * cam.zoom);
        ctx.fill();
        ctx.set_global_alpha(1.0);
        ctx.set_fill_style_str(if t.is_disabled(now) { "#30363d" } else { tower_color(t.kind) });
        circle(&ctx, x, y, 0.6 * cam.zoom);
        ctx.fill();
    }

    ctx.set_fill_style_str("#ff7b00");
    ctx.set_global_alpha(0.5);
    for node in game.bloons().iter().flat_map(|b| b.fire_trail.iter()) {
        let (x, y) = cam.world_to_screen(node.position);
        circle(&ctx, x, y, 0.3 * cam.zoom);
        ctx.fill();
    }

    for b in game.bloons() {
        let (x, y) = cam.world_to_screen(b.position);
        let r = (if b.is_clone { 0.35 } else { 0.5 }) * cam.zoom;
        let fill = b
            .active_abilities()
            .find(|k| *k != AbilityKind::Shield)
            .map(ability_color)
            .unwrap_or("#f85149");
        ctx.set_global_alpha(if b.is_camo() || b.is_active(AbilityKind::Phase) { 0.4 } else { 1.0 });
        ctx.set_fill_style_str(fill);
        circle(&ctx, x, y, r);
        ctx.fill();
        if b.is_active(AbilityKind::Shield) {
            ctx.set_stroke_style_str(ability_color(AbilityKind::Shield));
            ctx.set_line_width(2.0);
            circle(&ctx, x, y, r + 4.0);
            ctx.stroke();
        }
    }
    ctx.set_global_alpha(1.0);

    ctx.set_fill_style_str("#e6edf3");
    for p in game.projectiles() {
        let (x, y) = cam.world_to_screen(p.position);
        circle(&ctx, x, y, 0.15 * cam.zoom);
        ctx.fill();
    }

    // Sniper aim lines while the beam charges
    ctx.set_stroke_style_str("rgba(240,136,62,0.5)");
    ctx.set_line_width(1.0);
    for beam in game.beams() {
        let from = game.towers().iter().find(|t| t.id == beam.tower).map(|t| t.position);
        let to = game.bloons().iter().find(|b| b.id == beam.target).map(|b| b.position);
        if let (Some(from), Some(to)) = (from, to) {
            let (x0, y0) = cam.world_to_screen(from);
            let (x1, y1) = cam.world_to_screen(to);
            ctx.begin_path();
            ctx.move_to(x0, y0);
            ctx.line_to(x1, y1);
            ctx.stroke();
        }
    }

    for f in flashes {
        let life = (f.until.saturating_sub(now)) as f64 / FLASH_MS as f64;
        ctx.set_global_alpha(life.clamp(0.0, 1.0));
        let (x, y) = cam.world_to_screen(f.at);
        match (f.kind, f.params.to) {
            (EffectKind::Lightning, _) => {
                ctx.set_fill_style_str("#ffffff");
                ctx.set_global_alpha(life.clamp(0.0, 1.0) * 0.4);
                ctx.fill_rect(0.0, 0.0, w, h);
            }
            (_, Some(to)) => {
                let (x1, y1) = cam.world_to_screen(to);
                ctx.set_stroke_style_str(if f.kind == EffectKind::TeslaArc { "#d2a8ff" } else { "#f0883e" });
                ctx.set_line_width(3.0);
                ctx.begin_path();
                ctx.move_to(x, y);
                ctx.line_to(x1, y1);
                ctx.stroke();
            }
            (kind, None) => {
                let color = match kind {
                    EffectKind::Pop | EffectKind::Explosion | EffectKind::Scorch => "#f85149",
                    EffectKind::FreezeWave => "#79c0ff",
                    EffectKind::Celebration => "#d4af37",
                    _ => "#e6edf3",
                };
                ctx.set_stroke_style_str(color);
                ctx.set_line_width(2.0);
                let radius = f.params.radius.max(0.8) * (1.5 - life * 0.5);
                circle(&ctx, x, y, radius * cam.zoom);
                ctx.stroke();
            }
        }
    }
    ctx.set_global_alpha(1.0);
}

/// Sizes the canvas and wires the frame interval and input listeners. Returns the teardown.
fn install(canvas_ref: NodeRef, camera: Rc<RefCell<Camera>>, game: UseReducerHandle<Game>) -> Option<impl FnOnce()> {
    let window = web_sys::window()?;
    let canvas = canvas_ref.cast::<HtmlCanvasElement>()?;
    let width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
    let height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
    canvas.set_width(width.max(0.0) as u32);
    canvas.set_height(height.max(0.0) as u32);
    {
        let level = &game.config().level;
        camera.borrow_mut().fit(level.bounds_min, level.bounds_max, width, height);
    }

    let click_cb = {
        let camera = camera.clone();
        let game = game.clone();
        Closure::wrap(Box::new(move |e: MouseEvent| {
            let pos = camera.borrow().screen_to_world(e.offset_x() as f64, e.offset_y() as f64);
            game.dispatch(GameAction::ClickAt { pos });
        }) as Box<dyn FnMut(_)>)
    };
    canvas
        .add_event_listener_with_callback("mousedown", click_cb.as_ref().unchecked_ref())
        .ok()?;

    let wheel_cb = {
        let camera = camera.clone();
        Closure::wrap(Box::new(move |e: WheelEvent| {
            e.prevent_default();
            let factor = (-e.delta_y() * 0.001).exp();
            camera.borrow_mut().zoom_at(e.offset_x() as f64, e.offset_y() as f64, factor);
        }) as Box<dyn FnMut(_)>)
    };
    canvas
        .add_event_listener_with_callback("wheel", wheel_cb.as_ref().unchecked_ref())
        .ok()?;

    // 1-8 pick an ability
    let keydown_cb = {
        let game = game.clone();
        Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let slot = e.key().parse::<usize>().ok().and_then(|n| n.checked_sub(1));
            if let Some(kind) = slot.and_then(|i| AbilityKind::ALL.get(i)) {
                game.dispatch(GameAction::SelectAbility(*kind));
            }
        }) as Box<dyn FnMut(_)>)
    };
    window
        .add_event_listener_with_callback("keydown", keydown_cb.as_ref().unchecked_ref())
        .ok()?;

    let tick = Closure::wrap(Box::new(move || {
        game.dispatch(GameAction::Tick { dt_ms: FRAME_MS });
    }) as Box<dyn FnMut()>);
    let tick_id = window
        .set_interval_with_callback_and_timeout_and_arguments_0(tick.as_ref().unchecked_ref(), FRAME_MS as i32)
        .ok()?;

    Some(move || {
        let _ = canvas.remove_event_listener_with_callback("mousedown", click_cb.as_ref().unchecked_ref());
        let _ = canvas.remove_event_listener_with_callback("wheel", wheel_cb.as_ref().unchecked_ref());
        let _ = window.remove_event_listener_with_callback("keydown", keydown_cb.as_ref().unchecked_ref());
        window.clear_interval_with_handle(tick_id);
        drop(tick);
    })
}

#[function_component(App)]
pub fn app() -> Html {
    let game = use_reducer(|| Game::new(GameConfig::default(), new_seed()));
    let canvas_ref = use_node_ref();
    let camera = use_mut_ref(Camera::default);
    let flash_buffer = use_mut_ref(FlashBuffer::default);

    {
        let canvas_ref = canvas_ref.clone();
        let camera = camera.clone();
        let game = game.clone();
        use_effect_with((), move |_| {
            let teardown = install(canvas_ref, camera, game);
            if teardown.is_none() {
                clog("canvas setup failed");
            }
            move || {
                if let Some(f) = teardown {
                    f();
                }
            }
        });
    }

    // Redraw after every state change
    {
        let canvas_ref = canvas_ref.clone();
        let camera = camera.clone();
        let flash_buffer = flash_buffer.clone();
        let game = game.clone();
        use_effect(move || {
            let now = game.clock_ms();
            let mut buf = flash_buffer.borrow_mut();
            if buf.seen_clock != now {
                buf.seen_clock = now;
                let fresh = game.visuals.effects().map(|(kind, at, params)| Flash { kind, at, params, until: now + FLASH_MS });
                buf.flashes.extend(fresh);
            }
            buf.flashes.retain(|f| f.until > now);
            if let Some(canvas) = canvas_ref.cast::<HtmlCanvasElement>() {
                draw(&canvas, &camera.borrow(), &game, &buf.flashes);
            }
            || ()
        });
    }

    {
        let rejection = game.last_rejection.clone();
        use_effect_with(rejection, |r| {
            if let Some(msg) = r {
                clog(msg);
            }
            || ()
        });
    }

    let dispatch = |action: GameAction| {
        let game = game.clone();
        Callback::from(move |()| game.dispatch(action.clone()))
    };
    let on_select_ability = {
        let game = game.clone();
        Callback::from(move |kind: AbilityKind| game.dispatch(GameAction::SelectAbility(kind)))
    };
    let on_select_upgrade = {
        let game = game.clone();
        Callback::from(move |id: UpgradeId| game.dispatch(GameAction::SelectUpgrade(id)))
    };

    let slots: Vec<AbilitySlot> = AbilityKind::ALL
        .iter()
        .map(|&kind| AbilitySlot {
            kind,
            remaining_ms: game.cooldown_remaining(kind),
            fraction: game.cooldown_fraction(kind),
        })
        .collect();
    let cursor = if game.selected_ability.is_some() { "crosshair" } else { "default" };

    html! {<div style="position:relative; width:100vw; height:100vh; overflow:hidden; color:#c9d1d9; font-family:sans-serif;">
        <canvas ref={canvas_ref.clone()} id="game-canvas" style={format!("display:block; width:100%; height:100%; cursor:{};", cursor)}></canvas>
        <StatsPanel
            level={game.current_level}
            score={game.score}
            theme={game.theme().name()}
            escaped={game.bloons_escaped}
            required={game.bloons_required}
            active={game.bloons_active}
            remaining={game.total_bloons}
            destroyed={game.bloons_destroyed}
            retries={game.retries_remaining}
        />
        <StatusEffectsHud active={game.status_effects.active.clone()} notifications={game.status_effects.notifications.clone()} history={game.upgrades.history.clone()} />
        if game.status == GameStatus::Playing {
            <AbilityBar {slots} selected={game.selected_ability} on_select={on_select_ability} />
        }
        <LevelCompleteOverlay
            status={game.status}
            level={game.current_level}
            score={game.score}
            escaped={game.bloons_escaped}
            destroyed={game.bloons_destroyed}
            on_continue={dispatch(GameAction::Continue)}
            on_skip_celebration={dispatch(GameAction::FinishClearAnimation)}
        />
        <UpgradeModal show={game.status == GameStatus::SelectingUpgrade} choices={game.upgrade_choices.clone()} on_select={on_select_upgrade} />
        <GameOverOverlay show={game.status == GameStatus::GameOver} score={game.score} level={game.current_level} restart={dispatch(GameAction::Restart)} />
    </div>}
}
