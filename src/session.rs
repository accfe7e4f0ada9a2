//! Player session
//!
//! Play is gated on a session: nothing spawns until a player logs in, and
//! logging out pauses the run.

use serde::{Deserialize, Serialize};

/// Who is playing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Player {
    /// A named player, optionally linked to a wallet address
    Named {
        handle: String,
        wallet: Option<String>,
    },
    Guest,
}

impl Player {
    pub fn named(handle: impl Into<String>) -> Self {
        Player::Named {
            handle: handle.into(),
            wallet: None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Player::Named { handle, .. } => handle,
            Player::Guest => "Guest",
        }
    }
}

/// Login state
#[derive(Debug, Clone, Default)]
pub struct Session {
    player: Option<Player>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log in. Returns false (and changes nothing) if someone is already logged
    /// in or the handle is blank.
    pub fn login(&mut self, player: Player) -> bool {
        if let Some(current) = &self.player {
            log::warn!("{} is already logged in", current.display_name());
            return false;
        }
        if matches!(&player, Player::Named { handle, .. } if handle.trim().is_empty()) {
            log::warn!("Login refused: empty handle");
            return false;
        }
        log::info!("{} logged in", player.display_name());
        self.player = Some(player);
        true
    }

    pub fn logout(&mut self) -> Option<Player> {
        let player = self.player.take();
        if let Some(p) = &player {
            log::info!("{} logged out", p.display_name());
        }
        player
    }

    pub fn is_logged_in(&self) -> bool {
        self.player.is_some()
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }
}
