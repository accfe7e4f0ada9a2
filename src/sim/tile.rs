//! Tile entity and its lock/merge state

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rank::Rank;

/// Entity id, allocated in increasing order
pub type TileId = u32;

/// Lock state of a tile
///
/// A merging pair is always `Converging { target: b }` on one side and
/// `Anchored { by: a }` on the other; both are set and cleared together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileState {
    /// Under player control above the field, not simulated
    Held,
    /// Simulated and available for pairing
    Free,
    /// Locked, sliding toward its partner
    Converging { target: TileId },
    /// Locked, waiting for its partner to arrive
    Anchored { by: TileId },
}

/// A game piece
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub rank: Rank,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub state: TileState,
}

impl Tile {
    pub fn new(id: TileId, rank: Rank, radius: f32, pos: Vec2) -> Self {
        Self {
            id,
            rank,
            pos,
            vel: Vec2::ZERO,
            radius,
            state: TileState::Free,
        }
    }

    /// A tile hovering at the spawner, waiting to be dropped
    pub fn held(id: TileId, rank: Rank, radius: f32, pos: Vec2) -> Self {
        Self {
            state: TileState::Held,
            ..Self::new(id, rank, radius, pos)
        }
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        self.state == TileState::Held
    }

    /// Paired with another tile for merging
    #[inline]
    pub fn is_locked(&self) -> bool {
        matches!(
            self.state,
            TileState::Converging { .. } | TileState::Anchored { .. }
        )
    }

    /// Affected by gravity and collisions
    #[inline]
    pub fn is_simulated(&self) -> bool {
        matches!(self.state, TileState::Free | TileState::Anchored { .. })
    }

    /// Tile this one is sliding toward
    pub fn merge_target(&self) -> Option<TileId> {
        match self.state {
            TileState::Converging { target } => Some(target),
            _ => None,
        }
    }

    #[inline]
    pub fn is_at_rest(&self, rest_speed: f32) -> bool {
        self.vel.length() <= rest_speed
    }

    /// Drop any lock and return to the simulation
    pub fn unlock(&mut self) {
        if self.is_locked() {
            self.state = TileState::Free;
        }
    }

    /// Release a held tile into the simulation
    pub fn release(&mut self) {
        if self.is_held() {
            self.state = TileState::Free;
            self.vel = Vec2::ZERO;
        }
    }

    /// Move toward `target` by at most `max_step`, returning the remaining distance
    pub fn move_toward(&mut self, target: Vec2, max_step: f32) -> f32 {
        let delta = target - self.pos;
        let dist = delta.length();
        if dist <= max_step || dist <= f32::EPSILON {
            self.pos = target;
            return 0.0;
        }
        self.pos += delta / dist * max_step;
        dist - max_step
    }

    /// Shift horizontally, keeping the whole tile between the walls
    pub fn nudge_x(&mut self, dx: f32, left_wall: f32, right_wall: f32) {
        let min_x = left_wall + self.radius;
        let max_x = right_wall - self.radius;
        let x = self.pos.x + dx;
        self.pos.x = if min_x <= max_x {
            x.clamp(min_x, max_x)
        } else {
            (left_wall + right_wall) / 2.0
        };
    }
}

/// Lock two touching tiles into a merging pair.
///
/// `first` is the tile that registered contact first and becomes the mover.
/// Returns false (and changes nothing) unless both share a rank and both are free.
pub fn try_pair(first: &mut Tile, second: &mut Tile) -> bool {
    if first.id == second.id || first.rank != second.rank {
        return false;
    }
    if first.state != TileState::Free || second.state != TileState::Free {
        return false;
    }
    first.state = TileState::Converging { target: second.id };
    second.state = TileState::Anchored { by: first.id };
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: TileId, rank: Rank) -> Tile {
        Tile::new(id, rank, 0.3, Vec2::new(id as f32, 0.3))
    }

    #[test]
    fn test_pair_same_rank() {
        let mut a = tile(1, 2);
        let mut b = tile(2, 2);
        assert!(try_pair(&mut a, &mut b));
        assert_eq!(a.state, TileState::Converging { target: 2 });
        assert_eq!(b.state, TileState::Anchored { by: 1 });
        assert!(a.is_locked() && b.is_locked());
        assert_eq!(a.merge_target(), Some(2));
        assert_eq!(b.merge_target(), None);
    }

    #[test]
    fn test_pair_different_rank() {
        let mut a = tile(1, 2);
        let mut b = tile(2, 3);
        assert!(!try_pair(&mut a, &mut b));
        assert_eq!(a.state, TileState::Free);
        assert_eq!(b.state, TileState::Free);
    }

    #[test]
    fn test_no_double_pairing() {
        let mut a = tile(1, 0);
        let mut b = tile(2, 0);
        let mut c = tile(3, 0);
        assert!(try_pair(&mut a, &mut b));
        assert!(!try_pair(&mut b, &mut c));
        assert!(!try_pair(&mut c, &mut a));
        assert_eq!(c.state, TileState::Free);
        assert_eq!(a.merge_target(), Some(2));
    }

    #[test]
    fn test_held_tile_never_pairs() {
        let mut a = Tile::held(1, 0, 0.3, Vec2::ZERO);
        let mut b = tile(2, 0);
        assert!(!try_pair(&mut a, &mut b));
        assert!(!try_pair(&mut b, &mut a));
    }

    #[test]
    fn test_move_toward_no_overshoot() {
        let mut a = tile(1, 0);
        a.pos = Vec2::ZERO;
        let remaining = a.move_toward(Vec2::new(1.0, 0.0), 0.25);
        assert!((remaining - 0.75).abs() < 1e-6);
        assert!((a.pos.x - 0.25).abs() < 1e-6);

        let remaining = a.move_toward(Vec2::new(1.0, 0.0), 5.0);
        assert_eq!(remaining, 0.0);
        assert_eq!(a.pos, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_nudge_clamps_to_walls() {
        let mut a = tile(1, 0);
        a.pos.x = 0.0;
        a.nudge_x(10.0, -3.0, 3.0);
        assert!((a.pos.x - 2.7).abs() < 1e-6);
        a.nudge_x(-100.0, -3.0, 3.0);
        assert!((a.pos.x + 2.7).abs() < 1e-6);
    }

    #[test]
    fn test_unlock_and_release() {
        let mut a = tile(1, 0);
        let mut b = tile(2, 0);
        try_pair(&mut a, &mut b);
        a.unlock();
        b.unlock();
        assert_eq!(a.state, TileState::Free);
        assert_eq!(b.state, TileState::Free);

        let mut h = Tile::held(3, 1, 0.36, Vec2::new(0.0, 9.0));
        h.vel = Vec2::new(1.0, 1.0);
        h.release();
        assert_eq!(h.state, TileState::Free);
        assert_eq!(h.vel, Vec2::ZERO);
    }
}
