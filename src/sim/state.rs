//! Game state and core simulation types

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::progression::{Hud, Progression};
use super::rank::{Rank, RankTable};
use super::spawner::{Spawner, draw_rank};
use super::tile::{Tile, TileId, TileState};
use crate::config::GameConfig;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// No session yet; nothing spawns or moves
    Uninitialized,
    /// Active gameplay
    Playing,
    /// Run ended
    GameOver,
}

/// Things that happened during a tick, drained by the host once per frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    Spawned { id: TileId, rank: Rank },
    Dropped { id: TileId },
    Paired { mover: TileId, anchor: TileId },
    /// Merge lock released because the partner disappeared
    Unpaired { id: TileId },
    MergeCompleted { id: TileId, rank_value: u32, gained: f32 },
    LevelUp { level: u32, threshold: f32 },
    MaxRankReached { rank_value: u32, count: u32 },
    GameOver { final_score: i64, level: u32 },
    Restarted,
}

/// Where the held tile would land, for drawing an aim line
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AimGuide {
    pub x: f32,
    pub from_y: f32,
    pub landing_y: f32,
}

/// Complete game state (deterministic for a given seed and input stream)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub config: GameConfig,
    pub ranks: RankTable,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    /// Active tiles (sorted by id for determinism)
    pub tiles: Vec<Tile>,
    pub spawner: Spawner,
    pub progression: Progression,
    pub(crate) rng: Pcg32,
    pub(crate) events: Vec<GameEvent>,
    /// Set when the config cannot drive the spawner
    config_error: Option<String>,
    /// Next entity ID
    next_id: TileId,
}

impl GameState {
    /// Create a new game state with the given config and seed
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let config_error = match config.validate() {
            Ok(()) => None,
            Err(e) => {
                log::error!("Invalid game config, spawning disabled: {}", e);
                Some(e.to_string())
            }
        };

        Self {
            seed,
            ranks: config.rank_table(),
            spawner: Spawner::new(config.spawn_cooldown),
            config,
            time_ticks: 0,
            phase: GamePhase::Uninitialized,
            tiles: Vec::new(),
            progression: Progression::new(),
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
            config_error,
            next_id: 1,
        }
    }

    /// Validation error that keeps the spawner idle, if any
    pub fn config_error(&self) -> Option<&str> {
        self.config_error.as_deref()
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> TileId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Begin play: start the spawner and hand out the first tile
    pub fn start(&mut self) {
        match self.phase {
            GamePhase::Uninitialized => {
                self.phase = GamePhase::Playing;
                if self.spawner.start() {
                    log::info!("Starting tile spawning");
                    self.request_spawn();
                }
            }
            GamePhase::Playing => log::debug!("Run already started, ignoring"),
            GamePhase::GameOver => log::debug!("Run is over, restart to play again"),
        }
    }

    /// Reset progression and the field. A run that never started stays unstarted.
    pub fn restart(&mut self) {
        log::info!("Restarting run");
        self.tiles.clear();
        self.progression.restart();
        self.spawner.reset();
        self.events.push(GameEvent::Restarted);
        if self.phase == GamePhase::Uninitialized {
            return;
        }
        self.phase = GamePhase::Playing;
        self.spawner.start();
        self.request_spawn();
    }

    /// Spawn a held tile at a weighted-random rank.
    ///
    /// Refused while a tile is held or the drop cooldown is running, and a
    /// logged no-op when the rank table cannot drive the spawn bands.
    pub fn request_spawn(&mut self) -> Option<TileId> {
        if let Some(id) = self.spawner.held() {
            log::debug!("Spawn ignored: tile {} is still held", id);
            return None;
        }
        let cooldown = self.spawner.cooldown_remaining();
        if cooldown > 0.0 {
            log::debug!("Spawn ignored: {:.3}s of cooldown left", cooldown);
            return None;
        }
        if let Err(e) = self.config.validate_ranks() {
            log::error!("Cannot spawn: {}", e);
            return None;
        }
        if self.phase != GamePhase::Playing {
            log::debug!("Spawn ignored in phase {:?}", self.phase);
            return None;
        }

        let (rank, roll) = draw_rank(&mut self.rng, &self.config.spawn_band_edges);
        let Some(radius) = self.ranks.radius(rank) else {
            log::error!("Spawn rank {} is outside the rank table", rank);
            return None;
        };

        let id = self.next_entity_id();
        let pos = Vec2::new(self.config.field.center_x(), self.config.field.spawn_height);
        self.tiles.push(Tile::held(id, rank, radius, pos));
        self.spawner.hold(id);
        self.events.push(GameEvent::Spawned { id, rank });
        log::debug!("Spawned tile {} at rank {} (roll {:.3})", id, rank, roll);
        Some(id)
    }

    /// Place a free tile directly on the field (level layouts, tests)
    pub fn place_tile(&mut self, rank: Rank, pos: Vec2) -> Option<TileId> {
        let Some(radius) = self.ranks.radius(rank) else {
            log::warn!("Cannot place tile: rank {} is outside the rank table", rank);
            return None;
        };
        let id = self.next_entity_id();
        self.tiles.push(Tile::new(id, rank, radius, pos));
        Some(id)
    }

    /// Remove a tile, releasing spawner control if it was held
    pub fn remove_tile(&mut self, id: TileId) -> Option<Tile> {
        let index = self.index_of(id)?;
        self.spawner.forget(id);
        Some(self.tiles.remove(index))
    }

    pub fn index_of(&self, id: TileId) -> Option<usize> {
        self.tiles.binary_search_by_key(&id, |t| t.id).ok()
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.index_of(id).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.index_of(id).map(move |i| &mut self.tiles[i])
    }

    /// Tile under player control
    pub fn held_tile(&self) -> Option<&Tile> {
        self.spawner.held().and_then(|id| self.tile(id))
    }

    /// Tiles currently paired for merging
    pub fn locked_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_locked()).count()
    }

    pub fn hud(&self) -> Hud {
        self.progression.hud()
    }

    /// Vertical ray from the held tile down to the first surface below it
    pub fn aim_guide(&self) -> Option<AimGuide> {
        let held = self.held_tile()?;
        let x = held.pos.x;
        let landing_y = self
            .tiles
            .iter()
            .filter(|t| !t.is_held() && t.pos.y < held.pos.y)
            .filter_map(|t| {
                let dx = (t.pos.x - x).abs();
                (dx < t.radius).then(|| t.pos.y + (t.radius * t.radius - dx * dx).sqrt())
            })
            .fold(self.config.field.floor, f32::max);
        Some(AimGuide {
            x,
            from_y: held.pos.y,
            landing_y,
        })
    }

    /// Take all events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events waiting to be drained
    pub fn pending_events(&self) -> &[GameEvent] {
        &self.events
    }

    /// End the run, freezing progression and stopping the spawner
    pub(crate) fn end_run(&mut self) {
        if self.phase == GamePhase::GameOver {
            return;
        }
        let final_score = self.progression.on_game_over();
        let level = self.progression.level;
        self.phase = GamePhase::GameOver;
        self.spawner.stop();
        self.tiles.retain(|t| !t.is_held());
        log::info!("GAME OVER - final score {} at level {}", final_score, level);
        self.events.push(GameEvent::GameOver { final_score, level });
    }

    /// Ensure tiles are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.tiles.sort_by_key(|t| t.id);
    }

    /// Pairs whose partner no longer points back are released
    pub(crate) fn release_dangling_locks(&mut self) {
        let states: Vec<(TileId, TileState)> = self.tiles.iter().map(|t| (t.id, t.state)).collect();
        let state_of = |id: TileId| {
            states
                .binary_search_by_key(&id, |(tid, _)| *tid)
                .ok()
                .map(|i| states[i].1)
        };

        for tile in &mut self.tiles {
            let consistent = match tile.state {
                TileState::Converging { target } => {
                    state_of(target) == Some(TileState::Anchored { by: tile.id })
                }
                TileState::Anchored { by } => {
                    state_of(by) == Some(TileState::Converging { target: tile.id })
                }
                _ => true,
            };
            if !consistent {
                log::warn!("Tile {} lost its merge partner, unlocking", tile.id);
                tile.unlock();
                self.events.push(GameEvent::Unpaired { id: tile.id });
            }
        }
    }
}
