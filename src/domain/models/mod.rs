//! Domain models for the rotation engine.

pub mod profile;
pub mod settings;
pub mod signal;
pub mod signature;
pub mod snapshot;

pub use profile::{Profile, PROFILE_NONE};
pub use settings::{
    normalize_weight, ChanceGateSettings, MessageRoutingSettings, RestoreMode, RouletteSettings,
    DEFAULT_WEIGHT, MAX_WEIGHT,
};
pub use signal::{ConfigTopic, GenerationKind, LifecycleSignal, SessionKind};
pub use signature::{
    default_field_predicate, ConnectionSignature, FieldPredicate, FieldTarget, TrackedFields,
    BASE_CHAT_FIELDS, BASE_TEXT_FIELDS,
};
pub use snapshot::{ApplyOutcome, RestorableSnapshot};
