//! Merge Drop - a drop-and-merge tile puzzle
//!
//! Core modules:
//! - `sim`: Deterministic simulation (tiles, merging, spawning, progression)
//! - `game`: Fixed-step host driver that feeds collaborators from the event queue
//! - `session`: Player session lifecycle
//! - `persistence`: Key-value storage of progression fields
//! - `leaderboard`: Local leaderboard, paged like the online one
//! - `config`: Data-driven game balance

pub mod config;
pub mod game;
pub mod leaderboard;
pub mod persistence;
pub mod platform;
pub mod session;
pub mod sim;
pub mod sink;

pub use config::{ConfigError, FieldConfig, GameConfig};
pub use game::Game;
pub use leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardPage, Standings};
pub use persistence::{KeyValueStore, MemoryStore, StoreError};
pub use session::{Player, Session};
pub use sink::{LogSink, ProgressionSink, SinkError};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Tile values from smallest to largest
    pub const DEFAULT_RANK_VALUES: [u32; 11] = [2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048];
    /// Radius of the smallest tile; each rank is 20% larger than the previous
    pub const BASE_TILE_RADIUS: f32 = 0.3;
    pub const TILE_RADIUS_GROWTH: f32 = 1.2;

    /// Upper edges of the cumulative spawn bands.
    /// [0, 0.50) -> rank 0, [0.50, 0.70) -> 1, [0.70, 0.85) -> 2, [0.85, 1.0] -> 3
    pub const SPAWN_BAND_EDGES: [f32; 3] = [0.50, 0.70, 0.85];

    /// Seconds after a drop before the next tile may spawn
    pub const SPAWN_COOLDOWN: f32 = 0.8;
    /// Horizontal aim sensitivity (units per input delta per second)
    pub const MOVE_SPEED: f32 = 1.0;

    /// Speed at which a locked tile slides into its partner (units/s)
    pub const CONVERGENCE_SPEED: f32 = 5.0;
    /// Distance at which converging tiles fuse
    pub const MERGE_EPSILON: f32 = 0.1;
    /// Speed below which a tile counts as resting
    pub const REST_SPEED: f32 = 0.1;
    /// Extra gap still reported as contact (trigger volumes are slightly larger than the body)
    pub const CONTACT_MARGIN: f32 = 0.05;

    /// Physics
    pub const GRAVITY: f32 = 9.81;
    pub const RESTITUTION: f32 = 0.1;
    pub const LINEAR_DAMPING: f32 = 0.5;

    /// Play field (y up, floor at 0)
    pub const LEFT_WALL: f32 = -3.0;
    pub const RIGHT_WALL: f32 = 3.0;
    pub const FLOOR: f32 = 0.0;
    pub const GAME_OVER_LINE: f32 = 8.0;
    pub const SPAWN_HEIGHT: f32 = 9.0;

    /// Progression
    pub const INITIAL_LEVEL_THRESHOLD: f32 = 25.0;
    pub const LEVEL_SCORE_BONUS: f32 = 100.0;
}
