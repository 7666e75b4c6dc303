//! Connection host port - interface to the live configuration.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::error::DomainResult;
use crate::domain::models::{FieldTarget, Profile};

/// Interface to the external system that owns profiles and provider state.
///
/// Reads are synchronous: the host's configuration is in-process state that
/// may change between calls but is always immediately observable. Only the
/// profile switch and field application suspend; both either fully succeed
/// or fail atomically.
#[async_trait]
pub trait ConnectionHost: Send + Sync {
    /// Current profile listing. May change between calls.
    fn profiles(&self) -> Vec<Profile>;

    /// Identifier of the active profile, if one is selected.
    fn active_profile_id(&self) -> Option<String>;

    /// Stored definition of a profile, if the host keeps one.
    fn profile_definition(&self, profile_id: &str) -> Option<Value>;

    /// The active top-level API mode.
    fn main_api_mode(&self) -> Option<String>;

    /// Copy of one provider field table, `None` when the target is
    /// unavailable.
    fn provider_fields(&self, target: FieldTarget) -> Option<Map<String, Value>>;

    /// Switch the active profile by display name.
    ///
    /// [`PROFILE_NONE`](crate::domain::models::PROFILE_NONE) deselects the
    /// active profile.
    async fn switch_to_profile(&self, name: &str) -> DomainResult<()>;

    /// Apply writes and deletes to one provider field table.
    ///
    /// Returns `false` when the target is unavailable and nothing was
    /// applied.
    async fn update_provider_fields(
        &self,
        target: FieldTarget,
        writes: Vec<(String, Value)>,
        deletes: Vec<String>,
    ) -> DomainResult<bool>;

    /// Set the top-level API mode.
    async fn set_main_api_mode(&self, mode: &str) -> DomainResult<()>;
}
