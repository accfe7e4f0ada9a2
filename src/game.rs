//! Fixed-step host driver
//!
//! Owns the simulation, the player session, the progress store and the
//! registered sinks. Real frame time is accumulated and spent in fixed
//! [`SIM_DT`] ticks; afterwards the frame's events are drained and forwarded.

use std::fmt::Display;

use crate::config::GameConfig;
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::persistence::{KeyValueStore, clear_progression, load_progression, save_progression};
use crate::session::{Player, Session};
use crate::sim::{GameEvent, GameState, Hud, Progression, TickInput, tick};
use crate::sink::{ProgressionSink, SinkError};

/// Largest frame delta accepted, in seconds
const MAX_FRAME_DT: f32 = 0.1;

/// What to do with stored progress once the frame's events are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persist {
    Save,
    Clear,
}

/// A game instance wired to its collaborators
pub struct Game<K: KeyValueStore> {
    state: GameState,
    session: Session,
    store: K,
    sinks: Vec<Box<dyn ProgressionSink>>,
    accumulator: f32,
    /// Input for the coming frame. `drop` and `restart` fire once; `move_dx`
    /// is the pointer delta for this frame only.
    pub input: TickInput,
}

impl<K: KeyValueStore> Game<K> {
    /// Create a game, resuming progress found in `store`
    pub fn new(config: GameConfig, seed: u64, store: K) -> Self {
        let mut state = GameState::new(config, seed);
        match load_progression(&store) {
            Ok(Some(progress)) => {
                log::info!(
                    "Resuming at level {} with score {}",
                    progress.level,
                    progress.score
                );
                state.progression = progress;
            }
            Ok(None) => log::debug!("No saved progress"),
            Err(e) => log::warn!("Ignoring saved progress: {}", e),
        }

        Self {
            state,
            session: Session::new(),
            store,
            sinks: Vec::new(),
            accumulator: 0.0,
            input: TickInput::default(),
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn ProgressionSink>) {
        self.sinks.push(sink);
    }

    /// Begin a session and start spawning
    pub fn login(&mut self, player: Player) -> bool {
        if !self.session.login(player) {
            return false;
        }
        self.state.start();
        self.flush_events();
        true
    }

    /// End the session. The run is kept but no longer advances.
    pub fn logout(&mut self) -> Option<Player> {
        self.accumulator = 0.0;
        self.input = TickInput::default();
        self.session.logout()
    }

    /// Advance by a real frame delta (seconds)
    pub fn update(&mut self, frame_dt: f32) {
        if !self.session.is_logged_in() {
            return;
        }

        let dt = frame_dt.clamp(0.0, MAX_FRAME_DT);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            tick(&mut self.state, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.drop = false;
            self.input.restart = false;
        }
        if substeps > 0 {
            self.input.move_dx = 0.0;
        }
        if substeps == MAX_SUBSTEPS && self.accumulator >= SIM_DT {
            log::debug!("Dropping {:.3}s of simulation backlog", self.accumulator);
            self.accumulator = 0.0;
        }

        self.flush_events();
    }

    /// Start over immediately
    pub fn restart(&mut self) {
        self.state.restart();
        self.flush_events();
    }

    /// Forward the frame's events to sinks, then save or clear progress
    fn flush_events(&mut self) {
        let events = self.state.drain_events();
        let progress = &self.state.progression;
        let mut persist = None;

        for event in &events {
            match *event {
                GameEvent::MergeCompleted { rank_value, .. } => {
                    notify(&mut self.sinks, progress, "merge", |s, p| {
                        s.merge_completed(rank_value, p)
                    });
                    persist = Some(Persist::Save);
                }
                GameEvent::LevelUp { level, .. } => {
                    notify(&mut self.sinks, progress, "level-up", |s, p| s.level_up(level, p));
                    persist = Some(Persist::Save);
                }
                GameEvent::MaxRankReached { count, .. } => {
                    notify(&mut self.sinks, progress, "top-rank", |s, _| {
                        s.max_rank_reached(count)
                    });
                    persist = Some(Persist::Save);
                }
                GameEvent::GameOver { final_score, level } => {
                    notify(&mut self.sinks, progress, "game-over", |s, _| {
                        s.game_over(final_score, level)
                    });
                    persist = Some(Persist::Clear);
                }
                GameEvent::Restarted => {
                    notify(&mut self.sinks, progress, "restart", |s, _| s.restarted());
                    persist = Some(Persist::Clear);
                }
                _ => {}
            }
        }

        match persist {
            Some(Persist::Save) => {
                retry_once("saving progress", || save_progression(&mut self.store, progress));
            }
            Some(Persist::Clear) => {
                retry_once("clearing progress", || clear_progression(&mut self.store));
            }
            None => {}
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut K {
        &mut self.store
    }

    pub fn hud(&self) -> Hud {
        self.state.hud()
    }
}

/// Call every sink, retrying a failed call once
fn notify<F>(sinks: &mut [Box<dyn ProgressionSink>], progress: &Progression, what: &str, mut call: F)
where
    F: FnMut(&mut dyn ProgressionSink, &Progression) -> Result<(), SinkError>,
{
    for sink in sinks.iter_mut() {
        retry_once(what, || call(sink.as_mut(), progress));
    }
}

fn retry_once<T, E: Display>(what: &str, mut op: impl FnMut() -> Result<T, E>) -> Option<T> {
    match op() {
        Ok(value) => Some(value),
        Err(first) => {
            log::debug!("{} failed ({}), retrying", what, first);
            match op() {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!("{} failed: {}", what, e);
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;

    use super::*;
    use crate::leaderboard::Leaderboard;
    use crate::persistence::{KEY_LEVEL, KEY_SCORE, MemoryStore};
    use crate::sim::GamePhase;

    /// Records calls; fails the first `failures` calls of each kind
    #[derive(Default)]
    struct Recorder {
        merges: Vec<u32>,
        game_overs: Vec<(i64, u32)>,
        failures: u32,
        attempts: u32,
    }

    impl ProgressionSink for Recorder {
        fn merge_completed(&mut self, rank_value: u32, _progress: &Progression) -> Result<(), SinkError> {
            self.attempts += 1;
            if self.attempts <= self.failures {
                return Err(SinkError::Unavailable("recorder".to_string()));
            }
            self.merges.push(rank_value);
            Ok(())
        }

        fn game_over(&mut self, final_score: i64, level: u32) -> Result<(), SinkError> {
            self.game_overs.push((final_score, level));
            Ok(())
        }
    }

    fn game() -> Game<MemoryStore> {
        Game::new(GameConfig::default(), 7, MemoryStore::new())
    }

    fn run_frames(game: &mut Game<MemoryStore>, frames: u32) {
        for _ in 0..frames {
            game.update(1.0 / 60.0);
        }
    }

    #[test]
    fn test_nothing_happens_before_login() {
        let mut game = game();
        run_frames(&mut game, 10);
        assert_eq!(game.state().time_ticks, 0);
        assert!(game.state().tiles.is_empty());
        assert_eq!(game.state().phase, GamePhase::Uninitialized);
    }

    #[test]
    fn test_login_starts_spawning() {
        let mut game = game();
        assert!(game.login(Player::Guest));
        assert!(game.state().held_tile().is_some());
        assert!(!game.login(Player::named("late")));
    }

    #[test]
    fn test_logout_pauses() {
        let mut game = game();
        game.login(Player::Guest);
        run_frames(&mut game, 5);
        let ticks = game.state().time_ticks;
        assert!(ticks > 0);

        game.logout();
        run_frames(&mut game, 5);
        assert_eq!(game.state().time_ticks, ticks);

        game.login(Player::named("ada"));
        run_frames(&mut game, 1);
        assert!(game.state().time_ticks > ticks);
    }

    #[test]
    fn test_substep_limit() {
        let mut game = game();
        game.login(Player::Guest);
        game.update(0.5);
        assert_eq!(game.state().time_ticks, MAX_SUBSTEPS as u64);
        game.update(0.0);
        assert_eq!(game.state().time_ticks, MAX_SUBSTEPS as u64);
    }

    #[test]
    fn test_drop_fires_once() {
        let mut game = game();
        game.login(Player::Guest);
        let first = game.state().spawner.held().expect("held");
        game.input.drop = true;
        game.update(1.0 / 60.0);
        assert!(!game.input.drop);
        assert!(game.state().tile(first).is_some_and(|t| !t.is_held()));
    }

    #[test]
    fn test_resumes_saved_progress() {
        let mut store = MemoryStore::new();
        store.set(KEY_LEVEL, "3").unwrap();
        store.set(KEY_SCORE, "11").unwrap();
        let game = Game::new(GameConfig::default(), 1, store);
        assert_eq!(game.state().progression.level, 3);
        assert_eq!(game.state().progression.score, 11.0);
    }

    #[test]
    fn test_merge_reaches_sinks_and_store() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut game = game();
        game.add_sink(Box::new(recorder.clone()));
        game.state_mut().place_tile(0, Vec2::new(-2.3, 0.3)).expect("a");
        game.state_mut().place_tile(0, Vec2::new(-1.7, 0.3)).expect("b");
        game.login(Player::Guest);

        run_frames(&mut game, 120);
        assert_eq!(recorder.borrow().merges, vec![4]);
        assert_eq!(game.store().get(KEY_SCORE).unwrap().as_deref(), Some("2"));
        assert_eq!(game.store().get(KEY_LEVEL).unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_failed_sink_is_retried_once() {
        let recorder = Rc::new(RefCell::new(Recorder {
            failures: 1,
            ..Default::default()
        }));
        let mut game = game();
        game.add_sink(Box::new(recorder.clone()));
        game.state_mut().place_tile(0, Vec2::new(-2.3, 0.3)).expect("a");
        game.state_mut().place_tile(0, Vec2::new(-1.7, 0.3)).expect("b");
        game.login(Player::Guest);

        run_frames(&mut game, 120);
        assert_eq!(recorder.borrow().attempts, 2);
        assert_eq!(recorder.borrow().merges, vec![4]);
    }

    #[test]
    fn test_store_failure_does_not_stop_play() {
        let mut store = MemoryStore::new();
        store.set_fail_writes(true);
        let mut game = Game::new(GameConfig::default(), 7, store);
        game.state_mut().place_tile(0, Vec2::new(-2.3, 0.3)).expect("a");
        game.state_mut().place_tile(0, Vec2::new(-1.7, 0.3)).expect("b");
        game.login(Player::Guest);

        run_frames(&mut game, 120);
        assert_eq!(game.state().progression.score, 2.0);
        assert!(game.store().is_empty());
    }

    #[test]
    fn test_game_over_submits_and_clears_progress() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut store = MemoryStore::new();
        store.set(KEY_LEVEL, "2").unwrap();
        let mut game = Game::new(GameConfig::default(), 7, store);
        game.add_sink(Box::new(recorder.clone()));

        let line = game.state().config.field.game_over_line;
        game.state_mut().place_tile(0, Vec2::new(2.0, line)).expect("placed");
        game.login(Player::Guest);
        run_frames(&mut game, 1);

        assert_eq!(game.state().phase, GamePhase::GameOver);
        assert_eq!(recorder.borrow().game_overs, vec![(200, 2)]);
        assert_eq!(game.store().get(KEY_LEVEL).unwrap(), None);
    }

    #[test]
    fn test_restart_after_game_over() {
        let mut game = game();
        let line = game.state().config.field.game_over_line;
        game.state_mut().place_tile(0, Vec2::new(2.0, line)).expect("placed");
        game.login(Player::Guest);
        run_frames(&mut game, 1);
        assert_eq!(game.state().phase, GamePhase::GameOver);

        game.input.restart = true;
        run_frames(&mut game, 1);
        assert_eq!(game.state().phase, GamePhase::Playing);
        assert!(game.state().held_tile().is_some());
        assert_eq!(game.hud().level, 1);
    }

    #[test]
    fn test_highest_saved_level_plays_on() {
        let mut store = MemoryStore::new();
        store.set(KEY_LEVEL, &u32::MAX.to_string()).unwrap();
        let mut game = Game::new(GameConfig::default(), 7, store);
        game.login(Player::Guest);
        run_frames(&mut game, 2);
        assert_eq!(game.hud().level, u32::MAX);
        assert_eq!(game.hud().next_level, u32::MAX);
    }

    fn scored_game() -> Game<MemoryStore> {
        let mut store = MemoryStore::new();
        store.set(KEY_SCORE, "200").unwrap();
        store.set(KEY_LEVEL, "2").unwrap();
        Game::new(GameConfig::default(), 7, store)
    }

    fn end_run_on_line(game: &mut Game<MemoryStore>) {
        let line = game.state().config.field.game_over_line;
        game.state_mut().place_tile(0, Vec2::new(2.0, line)).expect("placed");
        game.login(Player::Guest);
        run_frames(game, 1);
        assert_eq!(game.state().phase, GamePhase::GameOver);
    }

    #[test]
    fn test_leaderboard_keeps_one_entry_when_save_fails() {
        let mut board_store = MemoryStore::new();
        board_store.set_fail_writes(true);
        let board = Rc::new(RefCell::new(Leaderboard::new(board_store)));
        board.borrow_mut().max_rank_reached(1).unwrap();

        let mut game = scored_game();
        game.add_sink(Box::new(board.clone()));
        end_run_on_line(&mut game);

        let board = board.borrow();
        assert_eq!(board.standings().len(), 1);
        assert_eq!(board.standings().entries[0].max_rank_count, 1);
    }

    #[test]
    fn test_restart_resets_leaderboard_run() {
        let board = Rc::new(RefCell::new(Leaderboard::new(MemoryStore::new())));
        board.borrow_mut().max_rank_reached(3).unwrap();

        let mut game = game();
        game.add_sink(Box::new(board.clone()));
        game.restart();
        game.state_mut().progression.score = 300.0;
        end_run_on_line(&mut game);

        assert_eq!(board.borrow().standings().entries[0].max_rank_count, 0);
    }
}
