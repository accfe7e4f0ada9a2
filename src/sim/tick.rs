//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically:
//! aim/drop, physics, contact pairing, game-over check, convergence, merge
//! resolution, then spawning.

use glam::Vec2;

use super::contact::{
    circle_circle_collision, find_contacts, pair_mut, reflect_velocity, tile_bounds_collision,
    touches_line,
};
use super::state::{GameEvent, GamePhase, GameState};
use super::tile::{TileId, TileState, try_pair};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Horizontal pointer delta for the held tile (frame-relative)
    pub move_dx: f32,
    /// Release the held tile
    pub drop: bool,
    /// Start a new run
    pub restart: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.restart {
        state.restart();
        return;
    }

    // Don't tick before the run starts or after it ends
    if state.phase != GamePhase::Playing {
        return;
    }

    state.time_ticks += 1;

    apply_aim(state, input, dt);
    if input.drop {
        drop_held(state);
    }

    integrate(state, dt);
    separate(state);

    let game_over = pair_contacts(state);
    if game_over {
        state.end_run();
        state.normalize_order();
        return;
    }

    state.release_dangling_locks();

    for (mover, anchor) in advance_convergence(state, dt) {
        resolve_merge(state, mover, anchor);
    }

    // A refused config was already reported at construction
    if state.spawner.update(dt) && state.config_error().is_none() {
        state.request_spawn();
    }

    // Ensure deterministic ordering
    state.normalize_order();
}

/// Slide the held tile horizontally, clamped inside the walls
fn apply_aim(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.move_dx == 0.0 {
        return;
    }
    let dx = input.move_dx * state.config.move_speed * dt;
    let (left, right) = (state.config.field.left_wall, state.config.field.right_wall);
    if let Some(tile) = state.spawner.held().and_then(|id| state.tile_mut(id)) {
        tile.nudge_x(dx, left, right);
    }
}

fn drop_held(state: &mut GameState) {
    let Some(id) = state.spawner.drop_held() else {
        log::debug!("Drop ignored: nothing held");
        return;
    };
    match state.tile_mut(id) {
        Some(tile) => {
            tile.release();
            log::debug!("Dropped tile {} at x={:.2}", id, tile.pos.x);
            state.events.push(GameEvent::Dropped { id });
        }
        None => log::warn!("Held tile {} vanished before drop", id),
    }
}

/// Gravity, damping and wall/floor response for simulated tiles
fn integrate(state: &mut GameState, dt: f32) {
    let cfg = &state.config;
    let field = &cfg.field;
    let damping = (1.0 - cfg.linear_damping * dt).max(0.0);

    for tile in state.tiles.iter_mut().filter(|t| t.is_simulated()) {
        tile.vel.y -= cfg.gravity * dt;
        tile.vel *= damping;
        tile.pos += tile.vel * dt;

        // Floor and walls can both be touched in a corner
        for _ in 0..2 {
            let hit = tile_bounds_collision(
                tile.pos,
                tile.radius,
                field.left_wall,
                field.right_wall,
                field.floor,
            );
            if !hit.hit {
                break;
            }
            tile.pos += hit.normal * hit.penetration;
            tile.vel = reflect_velocity(tile.vel, hit.normal, cfg.restitution);
        }
    }
}

/// Push overlapping tiles apart.
///
/// Converging tiles are skipped: they pass through their partner on purpose.
fn separate(state: &mut GameState) {
    let restitution = state.config.restitution;
    let n = state.tiles.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = pair_mut(&mut state.tiles, i, j);
            if !a.is_simulated() || !b.is_simulated() {
                continue;
            }
            let hit = circle_circle_collision(a.pos, a.radius, b.pos, b.radius);
            if !hit.hit {
                continue;
            }

            let correction = hit.normal * (hit.penetration / 2.0);
            a.pos -= correction;
            b.pos += correction;

            // Cancel the approaching part of the relative velocity
            let rel_n = (b.vel - a.vel).dot(hit.normal);
            if rel_n < 0.0 {
                let impulse = hit.normal * (-(1.0 + restitution) * rel_n / 2.0);
                a.vel -= impulse;
                b.vel += impulse;
            }
        }
    }
}

/// Lock touching equal-rank pairs and look for a resting tile on the
/// game-over line. Returns true when the run should end.
fn pair_contacts(state: &mut GameState) -> bool {
    let pairs = find_contacts(&state.tiles, state.config.contact_margin);
    for (i, j) in pairs {
        let (a, b) = pair_mut(&mut state.tiles, i, j);
        if try_pair(a, b) {
            log::debug!("Tiles {} and {} locked for merge at rank {}", a.id, b.id, a.rank);
            state.events.push(GameEvent::Paired {
                mover: a.id,
                anchor: b.id,
            });
        }
    }

    let line = state.config.field.game_over_line;
    let rest_speed = state.config.rest_speed;
    state.tiles.iter().any(|t| {
        t.state == TileState::Free && t.is_at_rest(rest_speed) && touches_line(t.pos, t.radius, line)
    })
}

/// Move converging tiles toward their partners.
/// Returns `(mover, anchor)` pairs that arrived this tick.
fn advance_convergence(state: &mut GameState, dt: f32) -> Vec<(TileId, TileId)> {
    let step = state.config.convergence_speed * dt;
    let epsilon = state.config.merge_epsilon;
    let mut arrived = Vec::new();

    for i in 0..state.tiles.len() {
        let Some(target) = state.tiles[i].merge_target() else {
            continue;
        };
        let Some(j) = state.index_of(target) else {
            continue;
        };
        let target_pos = state.tiles[j].pos;
        let tile = &mut state.tiles[i];
        tile.vel = Vec2::ZERO;
        let remaining = tile.move_toward(target_pos, step);
        if remaining <= epsilon {
            arrived.push((tile.id, target));
        }
    }
    arrived
}

/// Fuse an arrived pair into the next rank, or retire it at the top rank
fn resolve_merge(state: &mut GameState, mover: TileId, anchor: TileId) {
    let Some(tile) = state.tile(mover).cloned() else {
        log::warn!("Merge skipped: tile {} is gone", mover);
        return;
    };
    if state.tile(anchor).is_none() {
        log::warn!("Merge skipped: partner {} of tile {} is gone", anchor, mover);
        if let Some(t) = state.tile_mut(mover) {
            t.unlock();
        }
        return;
    }
    let Some(value) = state.ranks.value(tile.rank) else {
        log::warn!("Merge skipped: rank {} of tile {} is outside the table", tile.rank, mover);
        for id in [mover, anchor] {
            if let Some(t) = state.tile_mut(id) {
                t.unlock();
            }
        }
        return;
    };

    state.remove_tile(anchor);
    state.remove_tile(mover);

    let outcome = match state.ranks.next(tile.rank) {
        None => {
            let outcome = state.progression.on_merge_completed(value);
            let count = state.progression.on_max_rank_reached();
            log::info!("Top rank {} reached ({} so far)", value, count);
            state.events.push(GameEvent::MaxRankReached {
                rank_value: value,
                count,
            });
            outcome
        }
        Some(next) => {
            let next_value = state.ranks.value(next).unwrap_or(value);
            let Some(id) = state.place_tile(next, tile.pos) else {
                return;
            };
            let outcome = state.progression.on_merge_completed(next_value);
            log::debug!("Merged {} + {} into tile {} ({})", mover, anchor, id, next_value);
            state.events.push(GameEvent::MergeCompleted {
                id,
                rank_value: next_value,
                gained: outcome.gained,
            });
            outcome
        }
    };

    if outcome.levels_gained > 0 {
        let progression = &state.progression;
        log::info!(
            "Level up! Now level {} (next at {})",
            progression.level,
            progression.remaining_for_next_level
        );
        state.events.push(GameEvent::LevelUp {
            level: progression.level,
            threshold: progression.remaining_for_next_level,
        });
    }
}
