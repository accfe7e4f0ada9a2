//! Saving and restoring [`Progression`] fields

use super::store::{KeyValueStore, StoreError};
use crate::sim::Progression;

pub const KEY_SCORE: &str = "score";
pub const KEY_LEVEL: &str = "level";
pub const KEY_REMAINING: &str = "remainingForNextLevel";
pub const KEY_MAX_RANK_COUNT: &str = "howmany2048";

fn read<S: KeyValueStore + ?Sized, T: std::str::FromStr>(
    store: &S,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| StoreError::Corrupt {
                key: key.to_string(),
                value: raw,
            }),
    }
}

/// Load saved progress.
///
/// Returns `Ok(None)` when nothing was saved or the stored level is not positive.
/// Missing secondary fields fall back to a fresh run's values.
pub fn load_progression<S: KeyValueStore + ?Sized>(
    store: &S,
) -> Result<Option<Progression>, StoreError> {
    let level = match read::<S, i64>(store, KEY_LEVEL)? {
        Some(level) if level > 0 => level,
        _ => return Ok(None),
    };
    let level = u32::try_from(level).map_err(|_| StoreError::Corrupt {
        key: KEY_LEVEL.to_string(),
        value: level.to_string(),
    })?;

    let fresh = Progression::default();
    let score = read::<S, f32>(store, KEY_SCORE)?.unwrap_or(fresh.score);
    let remaining = read::<S, f32>(store, KEY_REMAINING)?.unwrap_or(fresh.remaining_for_next_level);
    let count = read::<S, u32>(store, KEY_MAX_RANK_COUNT)?.unwrap_or(0);

    Ok(Some(Progression::from_parts(score, level, remaining, count)))
}

/// Write all progress fields
pub fn save_progression<S: KeyValueStore + ?Sized>(
    store: &mut S,
    progress: &Progression,
) -> Result<(), StoreError> {
    store.set(KEY_SCORE, &progress.score.to_string())?;
    store.set(KEY_LEVEL, &progress.level.to_string())?;
    store.set(KEY_REMAINING, &progress.remaining_for_next_level.to_string())?;
    store.set(KEY_MAX_RANK_COUNT, &progress.max_rank_reached_count.to_string())?;
    Ok(())
}

/// Remove saved progress so the next session starts fresh
pub fn clear_progression<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<(), StoreError> {
    for key in [KEY_SCORE, KEY_LEVEL, KEY_REMAINING, KEY_MAX_RANK_COUNT] {
        store.remove(key)?;
    }
    Ok(())
}
