//! Game balance configuration
//!
//! Persisted separately from progress in LocalStorage. Every field has a default,
//! so partial JSON documents only override what they name.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::RankTable;

/// Errors found while validating a [`GameConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rank table is empty")]
    EmptyRankTable,
    #[error("rank table has {values} values but {radii} radii")]
    RadiusCountMismatch { values: usize, radii: usize },
    #[error("rank value at index {index} does not increase")]
    RanksNotIncreasing { index: usize },
    #[error("rank radius at index {index} must be positive")]
    NonPositiveRadius { index: usize },
    #[error("{bands} spawn bands need at least {bands} ranks, table has {ranks}")]
    TooFewRanks { ranks: usize, bands: usize },
    #[error("spawn band edges must increase strictly inside (0, 1)")]
    BadSpawnBands,
    #[error("`{0}` must be positive")]
    NonPositive(&'static str),
    #[error("invalid play field: {0}")]
    BadField(&'static str),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Play field geometry (y up)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub left_wall: f32,
    pub right_wall: f32,
    pub floor: f32,
    /// Resting tiles touching this line end the run
    pub game_over_line: f32,
    /// Height at which held tiles hover before being dropped
    pub spawn_height: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            left_wall: LEFT_WALL,
            right_wall: RIGHT_WALL,
            floor: FLOOR,
            game_over_line: GAME_OVER_LINE,
            spawn_height: SPAWN_HEIGHT,
        }
    }
}

impl FieldConfig {
    /// Horizontal center, where new tiles appear
    pub fn center_x(&self) -> f32 {
        (self.left_wall + self.right_wall) / 2.0
    }
}

/// Gameplay tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Tile values in merge order
    pub rank_values: Vec<u32>,
    /// Radius for each rank (same length as `rank_values`)
    pub rank_radii: Vec<f32>,
    /// Upper edges of the cumulative spawn bands; `edges.len() + 1` bands in total
    pub spawn_band_edges: Vec<f32>,
    pub spawn_cooldown: f32,
    pub move_speed: f32,
    pub convergence_speed: f32,
    pub merge_epsilon: f32,
    pub rest_speed: f32,
    pub contact_margin: f32,
    pub gravity: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub field: FieldConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        let rank_values = DEFAULT_RANK_VALUES.to_vec();
        let rank_radii = (0..rank_values.len())
            .map(|i| BASE_TILE_RADIUS * TILE_RADIUS_GROWTH.powi(i as i32))
            .collect();
        Self {
            rank_values,
            rank_radii,
            spawn_band_edges: SPAWN_BAND_EDGES.to_vec(),
            spawn_cooldown: SPAWN_COOLDOWN,
            move_speed: MOVE_SPEED,
            convergence_speed: CONVERGENCE_SPEED,
            merge_epsilon: MERGE_EPSILON,
            rest_speed: REST_SPEED,
            contact_margin: CONTACT_MARGIN,
            gravity: GRAVITY,
            restitution: RESTITUTION,
            linear_damping: LINEAR_DAMPING,
            field: FieldConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Number of probability bands the spawner draws from
    pub fn spawn_band_count(&self) -> usize {
        self.spawn_band_edges.len() + 1
    }

    /// Ordered rank table built from this config
    pub fn rank_table(&self) -> RankTable {
        RankTable::new(self.rank_values.clone(), self.rank_radii.clone())
    }

    /// Check everything the spawner and merge engine rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_ranks()?;

        let positive = [
            ("convergence_speed", self.convergence_speed),
            ("merge_epsilon", self.merge_epsilon),
            ("rest_speed", self.rest_speed),
            ("gravity", self.gravity),
        ];
        for (name, value) in positive {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive(name));
            }
        }
        if self.spawn_cooldown < 0.0 {
            return Err(ConfigError::NonPositive("spawn_cooldown"));
        }
        if self.contact_margin < 0.0 {
            return Err(ConfigError::NonPositive("contact_margin"));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::NonPositive("restitution"));
        }

        let field = &self.field;
        if field.left_wall >= field.right_wall {
            return Err(ConfigError::BadField("left wall must be left of right wall"));
        }
        if field.game_over_line <= field.floor {
            return Err(ConfigError::BadField("game-over line must be above the floor"));
        }
        // A held tile's lowest point must clear the line
        let largest_spawn_radius = self.rank_radii[..self.spawn_band_count()]
            .iter()
            .fold(0.0_f32, |a, &b| a.max(b));
        if field.spawn_height - largest_spawn_radius <= field.game_over_line {
            return Err(ConfigError::BadField(
                "spawned tiles must clear the game-over line",
            ));
        }
        Ok(())
    }

    /// Rank table and spawn band checks (the spawner refuses to run without these)
    pub fn validate_ranks(&self) -> Result<(), ConfigError> {
        if self.rank_values.is_empty() {
            return Err(ConfigError::EmptyRankTable);
        }
        if self.rank_radii.len() != self.rank_values.len() {
            return Err(ConfigError::RadiusCountMismatch {
                values: self.rank_values.len(),
                radii: self.rank_radii.len(),
            });
        }
        if let Some(index) = self
            .rank_values
            .windows(2)
            .position(|pair| pair[1] <= pair[0])
        {
            return Err(ConfigError::RanksNotIncreasing { index: index + 1 });
        }
        if let Some(index) = self.rank_radii.iter().position(|r| *r <= 0.0) {
            return Err(ConfigError::NonPositiveRadius { index });
        }

        let edges = &self.spawn_band_edges;
        let inside = edges.iter().all(|e| *e > 0.0 && *e < 1.0);
        let increasing = edges.windows(2).all(|pair| pair[1] > pair[0]);
        if !inside || !increasing {
            return Err(ConfigError::BadSpawnBands);
        }

        let bands = self.spawn_band_count();
        if self.rank_values.len() < bands {
            return Err(ConfigError::TooFewRanks {
                ranks: self.rank_values.len(),
                bands,
            });
        }
        Ok(())
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "merge_drop_config";

    /// Load config from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(config) => {
                        log::info!("Loaded config from LocalStorage");
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring stored config: {}", e),
                }
            }
        }

        log::info!("Using default config");
        Self::default()
    }

    /// Save config to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Config saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
