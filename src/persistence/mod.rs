//! Persistence of progression between sessions
//!
//! Progress is stored as four flat keys in a key-value store (LocalStorage on
//! web, in-memory natively and in tests):
//! - `score`, `level`, `remainingForNextLevel`, `howmany2048`
//!
//! A stored level of 0 or less (or none at all) means there is nothing to resume.

pub mod progress;
pub mod store;

pub use progress::{
    KEY_LEVEL, KEY_MAX_RANK_COUNT, KEY_REMAINING, KEY_SCORE, clear_progression, load_progression,
    save_progression,
};
#[cfg(target_arch = "wasm32")]
pub use store::LocalStorageStore;
pub use store::{KeyValueStore, MemoryStore, StoreError};
