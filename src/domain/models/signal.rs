//! Lifecycle signals consumed by the orchestrator.

use serde::{Deserialize, Serialize};

/// Kind of generation request carried by a lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    /// A regular user message turn.
    Normal,
    /// A regeneration/swipe of the last response.
    Swipe,
    /// A background generation that must not disturb rotation state.
    Quiet,
    /// Any other request kind (impersonation, continuation, ...).
    #[serde(other)]
    Other,
}

impl GenerationKind {
    /// Stable name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Swipe => "swipe",
            Self::Quiet => "quiet",
            Self::Other => "other",
        }
    }
}

/// Which rotation session a piece of state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Rotation triggered by a swipe/regeneration.
    Swipe,
    /// Rotation triggered by a new user message.
    Message,
}

impl SessionKind {
    /// Stable name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Swipe => "swipe",
            Self::Message => "message",
        }
    }
}

/// Topic of an external configuration-changed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigTopic {
    /// The top-level API mode changed.
    ApiMode,
    /// A model selection changed.
    Model,
    /// A sampler/provider preset changed.
    Preset,
    /// A completion source changed.
    Source,
    /// A generic settings update.
    Settings,
}

impl ConfigTopic {
    /// Stable name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiMode => "api_mode",
            Self::Model => "model",
            Self::Preset => "preset",
            Self::Source => "source",
            Self::Settings => "settings",
        }
    }
}

/// External lifecycle signal delivered to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LifecycleSignal {
    /// A generation request started.
    GenerationStarted {
        /// Request kind.
        kind: GenerationKind,
        /// Dry runs (token counting, prompt inspection) are ignored entirely.
        dry_run: bool,
    },
    /// A generated message arrived.
    MessageReceived {
        /// Request kind the message belongs to.
        kind: GenerationKind,
    },
    /// The generation pipeline was stopped by the user.
    GenerationStopped,
    /// The generation pipeline finished.
    GenerationEnded,
    /// The surrounding chat was switched.
    ChatChanged,
    /// The profile catalog was edited (profiles added, renamed, deleted).
    ProfileCatalogChanged,
    /// Some tracked configuration changed outside the engine.
    ConfigurationChanged {
        /// What changed.
        topic: ConfigTopic,
    },
}
