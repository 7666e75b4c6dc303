//! Infrastructure adapters for the port traits.

pub mod host;
pub mod random;

pub use host::{InMemoryHost, InMemorySettingsStore, NotifierEvent, RecordingNotifier};
pub use random::{EntropyRandom, SeededRandom};
