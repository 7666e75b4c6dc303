//! Connection profile identity.

use serde::{Deserialize, Serialize};

/// Name understood by the host as "deselect the active profile".
///
/// Used when a restore targets a profile that was deleted mid-session.
pub const PROFILE_NONE: &str = "<None>";

/// A named connection profile owned by the external configuration store.
///
/// The engine never creates or edits profiles; it only reads listings and
/// switches between them by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Opaque identifier, unique within a listing.
    pub id: String,
    /// Display name, used for switching.
    pub name: String,
}

impl Profile {
    /// Creates a profile from id and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
