//! Merge Drop entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{KeyboardEvent, PointerEvent};

    use merge_drop::consts::*;
    use merge_drop::persistence::LocalStorageStore;
    use merge_drop::sim::GamePhase;
    use merge_drop::{Game, GameConfig, Leaderboard, LogSink, Player};

    /// Browser wrapper around the core game
    struct App {
        game: Game<LocalStorageStore>,
        leaderboard: Rc<RefCell<Leaderboard<LocalStorageStore>>>,
        last_time: f64,
        last_phase: GamePhase,
    }

    impl App {
        fn new(seed: u64) -> Self {
            let config = GameConfig::load();
            let store = LocalStorageStore::new("merge_drop_");
            let mut game = Game::new(config, seed, store.clone());

            let leaderboard = Rc::new(RefCell::new(Leaderboard::new(store)));
            game.add_sink(Box::new(LogSink));
            game.add_sink(Box::new(leaderboard.clone()));

            Self {
                game,
                leaderboard,
                last_time: 0.0,
                last_phase: GamePhase::Uninitialized,
            }
        }

        fn login(&mut self, player: Player) {
            self.leaderboard
                .borrow_mut()
                .set_player(player.display_name().to_string());
            self.game.login(player);
        }

        fn update_hud(&mut self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let hud = self.game.hud();
            let set_text = |id: &str, text: String| {
                if let Some(el) = document.get_element_by_id(id) {
                    el.set_text_content(Some(&text));
                }
            };

            set_text("score", hud.display_score.to_string());
            set_text("level", hud.level.to_string());
            set_text("next-level", hud.next_level.to_string());
            set_text("progress", format!("{:.0}%", hud.progress * 100.0));
            set_text("top-tiles", hud.max_rank_reached_count.to_string());
            if let Some(best) = self.leaderboard.borrow().top_score() {
                set_text("best", best.to_string());
            }

            let phase = self.game.state().phase;
            if phase != self.last_phase {
                if let Some(el) = document.get_element_by_id("game-over") {
                    let class = if phase == GamePhase::GameOver { "" } else { "hidden" };
                    let _ = el.set_attribute("class", class);
                }
                self.last_phase = phase;
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Failed to init logger: {}", e).into());
        }

        log::info!("Merge Drop starting...");

        let seed = js_sys::Date::now() as u64;
        let app = Rc::new(RefCell::new(App::new(seed)));
        log::info!("Game initialized with seed: {}", seed);

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document, cannot start");
            return;
        };
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        // Guest play until a login form says otherwise
        app.borrow_mut().login(Player::Guest);

        setup_input_handlers(app.clone());
        setup_restart_button(app.clone());
        request_animation_frame(app);

        log::info!("Merge Drop running!");
    }

    fn setup_input_handlers(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Aim with horizontal pointer movement
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                app.borrow_mut().game.input.move_dx += event.movement_x() as f32;
            });
            let _ = window
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Release to drop
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: PointerEvent| {
                app.borrow_mut().game.input.drop = true;
            });
            let _ = window
                .add_event_listener_with_callback("pointerup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut a = app.borrow_mut();
                match event.key().as_str() {
                    " " | "Enter" => a.game.input.drop = true,
                    "ArrowLeft" => a.game.input.move_dx -= 20.0,
                    "ArrowRight" => a.game.input.move_dx += 20.0,
                    "r" | "R" => a.game.input.restart = true,
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_restart_button(app: Rc<RefCell<App>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                app.borrow_mut().game.restart();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(app: Rc<RefCell<App>>, time: f64) {
        {
            let mut a = app.borrow_mut();

            let dt = if a.last_time > 0.0 {
                ((time - a.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            a.last_time = time;

            a.game.update(dt);
            a.update_hud();
        }

        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Merge Drop (native) starting...");
    log::info!("Native mode runs a headless demo - build for wasm32 to play in a browser");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2048);
    demo::run(seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Self-playing run that drops tiles at random columns until the board fills
#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use merge_drop::sim::GamePhase;
    use merge_drop::{Game, GameConfig, Leaderboard, LogSink, MemoryStore, Player};

    /// Frames between decisions (60 fps)
    const FRAMES_PER_DROP: u32 = 60;
    const MAX_FRAMES: u32 = 60 * 60 * 10;

    pub fn run(seed: u64) {
        let mut game = Game::new(GameConfig::default(), seed, MemoryStore::new());
        let leaderboard = Rc::new(RefCell::new(Leaderboard::new(MemoryStore::new())));
        leaderboard.borrow_mut().set_player("demo");
        game.add_sink(Box::new(LogSink));
        game.add_sink(Box::new(leaderboard.clone()));
        game.login(Player::named("demo"));

        let mut rng = Pcg32::seed_from_u64(seed ^ 0x5eed);
        let field = game.state().config.field.clone();
        let mut target_x = 0.0;
        let mut frame = 0;

        while frame < MAX_FRAMES && game.state().phase == GamePhase::Playing {
            if frame % FRAMES_PER_DROP == 0 {
                target_x = rng.random_range(field.left_wall..field.right_wall);
            }
            if let Some(held) = game.state().held_tile() {
                // Pointer delta that would cover the gap this frame
                let gap = target_x - held.pos.x;
                game.input.move_dx = gap * 60.0;
                if gap.abs() < 0.05 && frame % FRAMES_PER_DROP > FRAMES_PER_DROP / 2 {
                    game.input.drop = true;
                }
            }
            game.update(1.0 / 60.0);
            frame += 1;
        }

        let hud = game.hud();
        println!(
            "Demo finished after {:.1}s: level {}, score {}, top tiles {}",
            frame as f32 / 60.0,
            hud.level,
            hud.display_score,
            hud.max_rank_reached_count
        );
        for (rank, entry) in leaderboard.borrow().page(0).entries {
            println!("#{} {} {} (level {})", rank, entry.player, entry.score, entry.level);
        }
    }
}
