//! Progression sinks: collaborators that hear about merges and finished runs
//!
//! Sinks are registered on the [`Game`](crate::Game) and called after each frame
//! from the drained event queue, never from inside a tick.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::persistence::StoreError;
use crate::sim::Progression;

/// Failure reported by a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{0} is unavailable")]
    Unavailable(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Receives progression updates
pub trait ProgressionSink {
    /// A merge produced a tile worth `rank_value`
    fn merge_completed(&mut self, _rank_value: u32, _progress: &Progression) -> Result<(), SinkError> {
        Ok(())
    }

    fn level_up(&mut self, _level: u32, _progress: &Progression) -> Result<(), SinkError> {
        Ok(())
    }

    /// A top-rank tile was produced; `count` is the running total
    fn max_rank_reached(&mut self, _count: u32) -> Result<(), SinkError> {
        Ok(())
    }

    /// A new run began; per-run state should be dropped
    fn restarted(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// The run ended. May be called again for the same run if it returned an error.
    fn game_over(&mut self, final_score: i64, level: u32) -> Result<(), SinkError>;
}

/// Shared sinks, so the host can keep a handle (e.g. to page a leaderboard)
impl<T: ProgressionSink> ProgressionSink for Rc<RefCell<T>> {
    fn merge_completed(&mut self, rank_value: u32, progress: &Progression) -> Result<(), SinkError> {
        self.borrow_mut().merge_completed(rank_value, progress)
    }

    fn level_up(&mut self, level: u32, progress: &Progression) -> Result<(), SinkError> {
        self.borrow_mut().level_up(level, progress)
    }

    fn max_rank_reached(&mut self, count: u32) -> Result<(), SinkError> {
        self.borrow_mut().max_rank_reached(count)
    }

    fn restarted(&mut self) -> Result<(), SinkError> {
        self.borrow_mut().restarted()
    }

    fn game_over(&mut self, final_score: i64, level: u32) -> Result<(), SinkError> {
        self.borrow_mut().game_over(final_score, level)
    }
}

/// Writes progression updates to the log
#[derive(Debug, Default)]
pub struct LogSink;

impl ProgressionSink for LogSink {
    fn merge_completed(&mut self, rank_value: u32, progress: &Progression) -> Result<(), SinkError> {
        log::info!("Merged into {} - score {}", rank_value, progress.score);
        Ok(())
    }

    fn level_up(&mut self, level: u32, progress: &Progression) -> Result<(), SinkError> {
        log::info!("Level {} (next at {})", level, progress.remaining_for_next_level);
        Ok(())
    }

    fn max_rank_reached(&mut self, count: u32) -> Result<(), SinkError> {
        log::info!("Top tile made {} time(s)", count);
        Ok(())
    }

    fn restarted(&mut self) -> Result<(), SinkError> {
        log::info!("New run");
        Ok(())
    }

    fn game_over(&mut self, final_score: i64, level: u32) -> Result<(), SinkError> {
        log::info!("Final score {} at level {}", final_score, level);
        Ok(())
    }
}
