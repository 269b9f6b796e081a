//! Simulation core for Bloons Revenge, a reverse tower defence: the player guides
//! balloons down a generated path past automated towers. Everything here runs on a
//! logical millisecond clock and is independent of the browser shell in `main.rs`.

pub mod bloon;
pub mod config;
pub mod game;
pub mod leaderboard;
pub mod level;
pub mod model;
pub mod modifiers;
pub mod presentation;
pub mod reducer;
pub mod timers;
pub mod tower;
pub mod upgrades;

pub use config::GameConfig;
pub use game::{Game, GameEvent, IntentError};
pub use reducer::GameAction;
