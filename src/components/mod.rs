pub mod ability_bar;
pub mod app;
pub mod game_over_overlay;
pub mod level_complete_overlay;
pub mod stats_panel;
pub mod status_effects_hud;
pub mod upgrade_modal;
