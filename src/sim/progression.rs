//! Score, level and top-rank tracking
//!
//! Level thresholds grow by `level / 2` using integer division, so levels 2 and 3
//! keep the previous threshold and growth starts at level 4.

use serde::{Deserialize, Serialize};

use crate::consts::{INITIAL_LEVEL_THRESHOLD, LEVEL_SCORE_BONUS};

/// What a single merge did to the progression
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MergeOutcome {
    /// Score added before any threshold subtraction
    pub gained: f32,
    /// Levels gained by this merge (usually 0 or 1)
    pub levels_gained: u32,
}

/// Values a HUD shows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hud {
    pub score: f32,
    pub level: u32,
    pub next_level: u32,
    /// Progress toward the next level (0-1)
    pub progress: f32,
    pub remaining: f32,
    /// `round(score + level * 100)`, the number submitted at game over
    pub display_score: i64,
    pub max_rank_reached_count: u32,
}

/// Progression state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    pub score: f32,
    pub level: u32,
    pub remaining_for_next_level: f32,
    pub max_rank_reached_count: u32,
    /// Set at game over; merges no longer count
    #[serde(skip)]
    frozen: bool,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            score: 0.0,
            level: 1,
            remaining_for_next_level: INITIAL_LEVEL_THRESHOLD,
            max_rank_reached_count: 0,
            frozen: false,
        }
    }
}

impl Progression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore persisted fields
    pub fn from_parts(score: f32, level: u32, remaining_for_next_level: f32, max_rank_reached_count: u32) -> Self {
        Self {
            score: score.max(0.0),
            level: level.max(1),
            remaining_for_next_level,
            max_rank_reached_count,
            frozen: false,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Credit a merge that produced a tile worth `rank_value`
    pub fn on_merge_completed(&mut self, rank_value: u32) -> MergeOutcome {
        if self.frozen {
            return MergeOutcome::default();
        }

        let gained = (rank_value / 2) as f32;
        self.score += gained;
        let levels_gained = self.apply_level_ups();
        MergeOutcome {
            gained,
            levels_gained,
        }
    }

    fn apply_level_ups(&mut self) -> u32 {
        let mut gained = 0;
        while self.score >= self.remaining_for_next_level {
            if self.remaining_for_next_level <= 0.0 {
                log::warn!(
                    "Level threshold {} is not positive, skipping level-ups",
                    self.remaining_for_next_level
                );
                break;
            }
            self.score -= self.remaining_for_next_level;
            if self.score < 0.0 {
                self.score = 0.0;
            }
            self.level = self.level.saturating_add(1);
            self.remaining_for_next_level *= (self.level / 2) as f32;
            gained += 1;
        }
        gained
    }

    /// Count a top-rank tile. Score is credited separately.
    pub fn on_max_rank_reached(&mut self) -> u32 {
        if !self.frozen {
            self.max_rank_reached_count += 1;
        }
        self.max_rank_reached_count
    }

    /// Score submitted to leaderboards
    pub fn final_score(&self) -> i64 {
        (self.score + self.level as f32 * LEVEL_SCORE_BONUS).round() as i64
    }

    /// Freeze further updates and return the final score
    pub fn on_game_over(&mut self) -> i64 {
        self.frozen = true;
        self.final_score()
    }

    /// Back to a fresh run
    pub fn restart(&mut self) {
        *self = Self::default();
    }

    pub fn hud(&self) -> Hud {
        let progress = if self.remaining_for_next_level > 0.0 {
            (self.score / self.remaining_for_next_level).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Hud {
            score: self.score,
            level: self.level,
            next_level: self.level.saturating_add(1),
            progress,
            remaining: (self.remaining_for_next_level - self.score).max(0.0),
            display_score: self.final_score(),
            max_rank_reached_count: self.max_rank_reached_count,
        }
    }
}
