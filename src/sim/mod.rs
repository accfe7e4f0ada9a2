//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod contact;
pub mod progression;
pub mod rank;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod tile;

pub use contact::{CollisionResult, circle_circle_collision, find_contacts, touches_line};
pub use progression::{Hud, MergeOutcome, Progression};
pub use rank::{Rank, RankTable};
pub use spawner::{Spawner, SpawnerPhase, band_for_roll, draw_rank};
pub use state::{AimGuide, GameEvent, GamePhase, GameState};
pub use tick::{TickInput, tick};
pub use tile::{Tile, TileId, TileState, try_pair};
