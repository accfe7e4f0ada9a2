//! Local leaderboard
//!
//! Standings are kept sorted by score (descending), read back one page of
//! [`PAGE_SIZE`] at a time, and persisted as one JSON document in a
//! [`KeyValueStore`] (LocalStorage on web).

use serde::{Deserialize, Serialize};

use crate::persistence::{KeyValueStore, StoreError};
use crate::platform;
use crate::sim::Progression;
use crate::sink::{ProgressionSink, SinkError};

/// Entries per page
pub const PAGE_SIZE: usize = 100;
/// Highest page start position
pub const MAX_PAGE_START: usize = 400;
/// Maximum number of entries to keep (the last reachable page)
pub const MAX_ENTRIES: usize = MAX_PAGE_START + PAGE_SIZE;

/// A single leaderboard entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player: String,
    pub score: i64,
    /// Level reached
    pub level: u32,
    /// Top-rank tiles made during the run
    pub max_rank_count: u32,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

/// One page of ranked entries
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardPage {
    /// Clamped start position (0-based)
    pub start: usize,
    /// `(rank, entry)` pairs, ranks 1-based
    pub entries: Vec<(usize, LeaderboardEntry)>,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Sorted entries
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Standings {
    pub entries: Vec<LeaderboardEntry>,
}

impl Standings {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score would make it onto the board
    pub fn qualifies(&self, score: i64) -> bool {
        if score <= 0 {
            return false;
        }
        if self.entries.len() < MAX_ENTRIES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Insert an entry in score order. Returns the rank achieved (1-based).
    pub fn add_score(&mut self, entry: LeaderboardEntry) -> Option<usize> {
        if !self.qualifies(entry.score) {
            return None;
        }

        // Ties keep the earlier entry ahead
        let pos = self.entries.iter().position(|e| entry.score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        self.entries.truncate(MAX_ENTRIES);
        Some(rank)
    }

    /// Page starting at `start`, clamped to `0..=MAX_PAGE_START`
    pub fn page(&self, start: i64) -> LeaderboardPage {
        let start = start.clamp(0, MAX_PAGE_START as i64) as usize;
        let entries = self
            .entries
            .iter()
            .enumerate()
            .skip(start)
            .take(PAGE_SIZE)
            .map(|(i, e)| (i + 1, e.clone()))
            .collect();
        LeaderboardPage {
            start,
            entries,
            has_prev: start > 0,
            has_next: start < MAX_PAGE_START && self.entries.len() > start + PAGE_SIZE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn top_score(&self) -> Option<i64> {
        self.entries.first().map(|e| e.score)
    }
}

/// Standings bound to a store, recording each finished run
#[derive(Debug)]
pub struct Leaderboard<S: KeyValueStore> {
    standings: Standings,
    store: S,
    /// Name recorded with the next submitted score
    player: String,
    /// Top-rank count of the current run
    run_max_rank_count: u32,
    /// Run recorded in memory but not yet written to the store
    unsaved: Option<(i64, u32)>,
}

impl<S: KeyValueStore> Leaderboard<S> {
    /// Store key of the standings document
    pub const STORAGE_KEY: &'static str = "leaderboard";

    /// Open the leaderboard kept in `store`, starting fresh if it is missing or corrupt
    pub fn new(store: S) -> Self {
        let standings = match Self::load_from(&store) {
            Ok(Some(standings)) => {
                log::info!("Loaded {} leaderboard entries", standings.len());
                standings
            }
            Ok(None) => {
                log::info!("No leaderboard found, starting fresh");
                Standings::new()
            }
            Err(e) => {
                log::warn!("Ignoring stored leaderboard: {}", e);
                Standings::new()
            }
        };

        Self {
            standings,
            store,
            player: "Guest".to_string(),
            run_max_rank_count: 0,
            unsaved: None,
        }
    }

    fn load_from(store: &S) -> Result<Option<Standings>, StoreError> {
        let Some(json) = store.get(Self::STORAGE_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|_| StoreError::Corrupt {
                key: Self::STORAGE_KEY.to_string(),
                value: json,
            })
    }

    /// Write the standings to the store
    pub fn save(&mut self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.standings)?;
        self.store.set(Self::STORAGE_KEY, &json)?;
        log::info!("Leaderboard saved ({} entries)", self.standings.len());
        Ok(())
    }

    pub fn set_player(&mut self, name: impl Into<String>) {
        self.player = name.into();
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn standings(&self) -> &Standings {
        &self.standings
    }

    pub fn page(&self, start: i64) -> LeaderboardPage {
        self.standings.page(start)
    }

    pub fn top_score(&self) -> Option<i64> {
        self.standings.top_score()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

impl<S: KeyValueStore> ProgressionSink for Leaderboard<S> {
    fn merge_completed(&mut self, _rank_value: u32, progress: &Progression) -> Result<(), SinkError> {
        self.run_max_rank_count = progress.max_rank_reached_count;
        Ok(())
    }

    fn max_rank_reached(&mut self, count: u32) -> Result<(), SinkError> {
        self.run_max_rank_count = count;
        Ok(())
    }

    fn restarted(&mut self) -> Result<(), SinkError> {
        self.run_max_rank_count = 0;
        self.unsaved = None;
        Ok(())
    }

    /// Records the run once; a repeated call for the same unsaved run only
    /// retries the write.
    fn game_over(&mut self, final_score: i64, level: u32) -> Result<(), SinkError> {
        if self.unsaved == Some((final_score, level)) {
            log::debug!("Retrying leaderboard save for score {}", final_score);
        } else {
            let entry = LeaderboardEntry {
                player: self.player.clone(),
                score: final_score,
                level,
                max_rank_count: self.run_max_rank_count,
                timestamp: platform::now_ms(),
            };
            self.run_max_rank_count = 0;
            match self.standings.add_score(entry) {
                Some(rank) => {
                    log::info!("{} placed #{} with {}", self.player, rank, final_score);
                    self.unsaved = Some((final_score, level));
                }
                None => {
                    log::info!("Score {} did not make the leaderboard", final_score);
                    return Ok(());
                }
            }
        }

        self.save()?;
        self.unsaved = None;
        Ok(())
    }
}
