//! Settings store port - persistence for the settings record.

use crate::domain::models::RouletteSettings;

/// Persistence interface for [`RouletteSettings`].
///
/// The engine does not define the storage mechanism; debouncing and disk
/// layout are the adapter's concern.
pub trait SettingsStore: Send + Sync {
    /// Load the persisted record, normalized.
    fn load(&self) -> RouletteSettings;

    /// Persist the record.
    fn save(&self, settings: &RouletteSettings);
}
