//! Weighted candidate selection.
//!
//! Pure functions: no session state, no side effects beyond consuming
//! randomness. An empty pool is a silent no-op for callers, never an error.

use crate::domain::models::{Profile, RouletteSettings};
use crate::domain::ports::RandomSource;

/// Picks one candidate by weighted random draw.
///
/// Returns `None` for an empty pool. A single candidate is returned without
/// consuming randomness, which keeps seeded tests deterministic. Otherwise
/// a roll in `[0, total)` walks the pool subtracting each weight; the first
/// candidate that drives the remainder to zero or below wins.
pub fn weighted_draw<'a, T>(
    candidates: &'a [T],
    weight_of: impl Fn(&T) -> u32,
    random: &dyn RandomSource,
) -> Option<&'a T> {
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return candidates.first();
    }

    let total: u64 = candidates.iter().map(|c| u64::from(weight_of(c))).sum();
    #[allow(clippy::cast_precision_loss)]
    let mut remainder = random.next_unit() * total as f64;
    for candidate in candidates {
        remainder -= f64::from(weight_of(candidate));
        if remainder <= 0.0 {
            return Some(candidate);
        }
    }
    // Rounding can keep the remainder positive past the end; the last
    // candidate still wins so a non-empty pool always selects.
    candidates.last()
}

/// Profiles eligible for automatic rotation: selected, not currently
/// active, sorted by name for a stable display order.
pub fn rotation_candidates(
    profiles: &[Profile],
    settings: &RouletteSettings,
    active_id: Option<&str>,
) -> Vec<Profile> {
    let mut pool: Vec<Profile> = profiles
        .iter()
        .filter(|p| settings.is_selected(&p.id))
        .filter(|p| active_id != Some(p.id.as_str()))
        .cloned()
        .collect();
    pool.sort_by(|a, b| a.name.cmp(&b.name));
    pool
}

/// Profiles eligible for an explicit spin: selected, sorted by name, with
/// the active profile included.
pub fn spin_candidates(profiles: &[Profile], settings: &RouletteSettings) -> Vec<Profile> {
    let mut pool: Vec<Profile> = profiles
        .iter()
        .filter(|p| settings.is_selected(&p.id))
        .cloned()
        .collect();
    pool.sort_by(|a, b| a.name.cmp(&b.name));
    pool
}
