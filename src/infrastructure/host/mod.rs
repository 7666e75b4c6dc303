//! Host adapters.

pub mod in_memory;

pub use in_memory::{InMemoryHost, InMemorySettingsStore, NotifierEvent, RecordingNotifier};
