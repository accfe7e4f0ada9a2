//! Spawner: hands the player one tile at a time
//!
//! `Idle -> Holding -> Cooldown -> Idle`. The spawner only tracks control and
//! timing; `GameState::request_spawn` creates the tile itself.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::rank::Rank;
use super::tile::TileId;

/// Where the spawner is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnerPhase {
    /// Nothing held, ready to spawn
    Idle,
    /// A tile is under player control
    Holding,
    /// Tile dropped, waiting out the cooldown
    Cooldown,
}

/// Spawn control state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spawner {
    held: Option<TileId>,
    cooldown: f32,
    cooldown_remaining: f32,
    started: bool,
}

impl Spawner {
    pub fn new(cooldown: f32) -> Self {
        Self {
            held: None,
            cooldown,
            cooldown_remaining: 0.0,
            started: false,
        }
    }

    /// Begin spawning. Returns false if spawning had already started.
    pub fn start(&mut self) -> bool {
        if self.started {
            log::debug!("Spawning already started, ignoring duplicate start");
            return false;
        }
        self.started = true;
        true
    }

    /// Stop spawning (run ended)
    pub fn stop(&mut self) {
        self.started = false;
        self.held = None;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn phase(&self) -> SpawnerPhase {
        if self.held.is_some() {
            SpawnerPhase::Holding
        } else if self.cooldown_remaining > 0.0 {
            SpawnerPhase::Cooldown
        } else {
            SpawnerPhase::Idle
        }
    }

    /// Tile currently under player control
    pub fn held(&self) -> Option<TileId> {
        self.held
    }

    pub fn holds_tile(&self) -> bool {
        self.held.is_some()
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }

    /// Record a freshly spawned tile as held
    pub fn hold(&mut self, id: TileId) {
        self.held = Some(id);
    }

    /// Release the held tile and start the cooldown
    pub fn drop_held(&mut self) -> Option<TileId> {
        let id = self.held.take()?;
        self.cooldown_remaining = self.cooldown;
        Some(id)
    }

    /// Forget a held tile that no longer exists, without a cooldown
    pub fn forget(&mut self, id: TileId) {
        if self.held == Some(id) {
            self.held = None;
        }
    }

    /// Count down the cooldown. Returns true when a spawn is due.
    pub fn update(&mut self, dt: f32) -> bool {
        if !self.started || self.held.is_some() {
            return false;
        }
        if self.cooldown_remaining > 0.0 {
            self.cooldown_remaining -= dt;
        }
        self.cooldown_remaining <= 0.0
    }

    /// Back to a fresh spawner, keeping the started flag
    pub fn reset(&mut self) {
        self.held = None;
        self.cooldown_remaining = 0.0;
    }
}

/// Map a roll in [0, 1] onto cumulative bands with the given upper edges.
///
/// With edges [0.5, 0.7, 0.85]: [0, 0.5) -> 0, [0.5, 0.7) -> 1,
/// [0.7, 0.85) -> 2, everything else -> 3.
pub fn band_for_roll(roll: f32, edges: &[f32]) -> Rank {
    edges
        .iter()
        .position(|edge| roll < *edge)
        .unwrap_or(edges.len())
}

/// Draw a spawn rank from the seeded RNG
pub fn draw_rank<R: Rng + ?Sized>(rng: &mut R, edges: &[f32]) -> (Rank, f32) {
    let roll: f32 = rng.random();
    (band_for_roll(roll, edges), roll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SPAWN_BAND_EDGES;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_band_edges() {
        let edges = SPAWN_BAND_EDGES;
        assert_eq!(band_for_roll(0.0, &edges), 0);
        assert_eq!(band_for_roll(0.4999, &edges), 0);
        assert_eq!(band_for_roll(0.5, &edges), 1);
        assert_eq!(band_for_roll(0.6999, &edges), 1);
        assert_eq!(band_for_roll(0.7, &edges), 2);
        assert_eq!(band_for_roll(0.85, &edges), 3);
        assert_eq!(band_for_roll(1.0, &edges), 3);
    }

    #[test]
    fn test_spawn_distribution() {
        let mut rng = Pcg32::seed_from_u64(2048);
        let mut counts = [0u32; 4];
        let trials = 10_000;
        for _ in 0..trials {
            let (rank, _) = draw_rank(&mut rng, &SPAWN_BAND_EDGES);
            counts[rank] += 1;
        }

        let expected = [0.50, 0.20, 0.15, 0.15];
        for (count, p) in counts.iter().zip(expected) {
            let observed = *count as f32 / trials as f32;
            // ~4.5 standard deviations for the widest band
            assert!(
                (observed - p).abs() < 0.025,
                "observed {observed} expected {p}"
            );
        }
    }

    #[test]
    fn test_phase_cycle() {
        let mut spawner = Spawner::new(0.8);
        assert!(!spawner.update(0.1), "not started");
        assert!(spawner.start());
        assert!(!spawner.start());
        assert_eq!(spawner.phase(), SpawnerPhase::Idle);
        assert!(spawner.update(0.1));

        spawner.hold(7);
        assert_eq!(spawner.phase(), SpawnerPhase::Holding);
        assert!(!spawner.update(1.0));

        assert_eq!(spawner.drop_held(), Some(7));
        assert_eq!(spawner.phase(), SpawnerPhase::Cooldown);
        assert_eq!(spawner.drop_held(), None);

        assert!(!spawner.update(0.5));
        assert!(spawner.update(0.5));
        assert_eq!(spawner.phase(), SpawnerPhase::Idle);
    }

    #[test]
    fn test_stop_releases_control() {
        let mut spawner = Spawner::new(0.8);
        spawner.start();
        spawner.hold(3);
        spawner.stop();
        assert!(!spawner.holds_tile());
        assert!(!spawner.update(1.0));
    }
}
