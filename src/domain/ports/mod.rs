//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that external collaborators must
//! implement:
//! - `ConnectionHost`: profile listing, active profile, async switching, and
//!   provider field access
//! - `SettingsStore`: persistence for the settings record
//! - `RandomSource`: uniform [0,1) generator
//! - `RotationNotifier`: user-visible rotation notices
//!
//! These traits keep the rotation engine independent of any particular host
//! application.

pub mod connection_host;
pub mod notifier;
pub mod random;
pub mod settings_store;

pub use connection_host::ConnectionHost;
pub use notifier::{NullNotifier, RotationNotifier};
pub use random::RandomSource;
pub use settings_store::SettingsStore;
