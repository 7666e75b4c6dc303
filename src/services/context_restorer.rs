//! Capture and reapply of the wider connection context.
//!
//! Restoring a profile by name does not undo in-place edits to provider
//! fields made while that profile was active. The restorer captures the
//! tracked field state alongside the profile id and reapplies it after the
//! switch, verifying the result and rolling back to the pre-restore state
//! when the configuration cannot be reproduced.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::error::{HostError, RestoreError};
use crate::domain::models::{ApplyOutcome, FieldTarget, RestorableSnapshot, TrackedFields};
use crate::domain::ports::ConnectionHost;

/// Captures and reapplies [`RestorableSnapshot`]s.
pub struct ContextRestorer {
    host: Arc<dyn ConnectionHost>,
    tracked: Arc<TrackedFields>,
}

impl ContextRestorer {
    /// Creates a restorer over the given host and tracked-field set.
    pub fn new(host: Arc<dyn ConnectionHost>, tracked: Arc<TrackedFields>) -> Self {
        Self { host, tracked }
    }

    /// Deep-copies the tracked connection state.
    pub fn capture(&self) -> RestorableSnapshot {
        let chat_fields = self
            .host
            .provider_fields(FieldTarget::Chat)
            .map(|fields| self.tracked.project(FieldTarget::Chat, &fields))
            .unwrap_or_default();
        let text_fields = self
            .host
            .provider_fields(FieldTarget::Text)
            .map(|fields| self.tracked.project(FieldTarget::Text, &fields))
            .unwrap_or_default();

        RestorableSnapshot {
            profile_id: self.host.active_profile_id(),
            main_api_mode: self.host.main_api_mode(),
            chat_fields,
            text_fields,
        }
    }

    /// Reapplies a snapshot onto the live configuration.
    ///
    /// Tracked fields are written only when they differ and deleted when
    /// the snapshot lacks them. An unreachable field table degrades the
    /// outcome (`complete = false`) but does not stop the rest. After
    /// applying, the live state is re-captured and compared; a mismatch
    /// rolls back to the configuration that was active immediately before
    /// this call and reports [`RestoreError::VerifyMismatch`].
    pub async fn apply(&self, snapshot: &RestorableSnapshot) -> Result<ApplyOutcome, RestoreError> {
        let fallback = self.capture();

        let outcome = self.apply_fields(snapshot).await?;
        if !outcome.complete {
            // Partial restoration is preferred over total failure; the
            // unreachable target cannot verify, so stop here.
            warn!("context restore incomplete; a provider field table was unavailable");
            return Ok(outcome);
        }

        if self.verifies(snapshot) {
            debug!(changed = outcome.changed, "context restore verified");
            return Ok(outcome);
        }

        warn!("applied snapshot did not verify; rolling back");
        match self.apply_fields(&fallback).await {
            Ok(_) => Err(RestoreError::VerifyMismatch),
            Err(err) => Err(RestoreError::RollbackFailed(err.to_string())),
        }
    }

    async fn apply_fields(&self, snapshot: &RestorableSnapshot) -> Result<ApplyOutcome, HostError> {
        let mut outcome = ApplyOutcome {
            changed: false,
            complete: true,
        };

        for target in FieldTarget::ALL {
            let Some(live) = self.host.provider_fields(target) else {
                outcome.complete = false;
                continue;
            };

            let desired = snapshot.fields(target);
            let mut writes = Vec::new();
            let mut deletes = Vec::new();
            for (name, value) in desired {
                if live.get(name) != Some(value) {
                    writes.push((name.clone(), value.clone()));
                }
            }
            for name in live.keys() {
                if self.tracked.is_tracked(target, name) && !desired.contains_key(name) {
                    deletes.push(name.clone());
                }
            }
            if writes.is_empty() && deletes.is_empty() {
                continue;
            }

            let applied = self.host.update_provider_fields(target, writes, deletes).await?;
            if applied {
                outcome.changed = true;
            } else {
                outcome.complete = false;
            }
        }

        if let Some(mode) = &snapshot.main_api_mode {
            if self.host.main_api_mode().as_deref() != Some(mode.as_str()) {
                self.host.set_main_api_mode(mode).await?;
                outcome.changed = true;
            }
        }

        Ok(outcome)
    }

    fn verifies(&self, snapshot: &RestorableSnapshot) -> bool {
        for target in FieldTarget::ALL {
            let Some(live) = self.host.provider_fields(target) else {
                return false;
            };
            if self.tracked.project(target, &live) != *snapshot.fields(target) {
                return false;
            }
        }
        if snapshot.main_api_mode.is_some()
            && self.host.main_api_mode() != snapshot.main_api_mode
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::host::InMemoryHost;
    use serde_json::json;

    fn restorer_for(host: Arc<InMemoryHost>) -> ContextRestorer {
        ContextRestorer::new(host, Arc::new(TrackedFields::default()))
    }

    #[tokio::test]
    async fn test_apply_writes_changed_fields_only() {
        let host = Arc::new(InMemoryHost::new());
        host.set_field(FieldTarget::Chat, "claude_model", json!("claude-3"));
        host.set_field(FieldTarget::Chat, "custom_url", json!("http://a"));

        let restorer = restorer_for(host.clone());
        let snapshot = restorer.capture();

        // Drift one tracked field, leave the other alone.
        host.set_field(FieldTarget::Chat, "claude_model", json!("claude-4"));

        let outcome = restorer.apply(&snapshot).await.unwrap();
        assert!(outcome.changed);
        assert!(outcome.complete);
        assert_eq!(
            host.provider_fields(FieldTarget::Chat).unwrap()["claude_model"],
            json!("claude-3")
        );
    }

    #[tokio::test]
    async fn test_apply_deletes_fields_the_snapshot_lacks() {
        let host = Arc::new(InMemoryHost::new());
        host.set_field(FieldTarget::Text, "api_server", json!("http://old"));

        let restorer = restorer_for(host.clone());
        let snapshot = restorer.capture();

        // A tracked field appears after capture; restore must remove it.
        host.set_field(FieldTarget::Text, "mancer_model", json!("weaver"));

        let outcome = restorer.apply(&snapshot).await.unwrap();
        assert!(outcome.changed);
        let live = host.provider_fields(FieldTarget::Text).unwrap();
        assert!(live.get("mancer_model").is_none());
        assert_eq!(live["api_server"], json!("http://old"));
    }

    #[tokio::test]
    async fn test_apply_is_a_noop_when_nothing_drifted() {
        let host = Arc::new(InMemoryHost::new());
        host.set_field(FieldTarget::Chat, "claude_model", json!("claude-3"));

        let restorer = restorer_for(host.clone());
        let snapshot = restorer.capture();

        let outcome = restorer.apply(&snapshot).await.unwrap();
        assert!(!outcome.changed);
        assert!(outcome.complete);
    }

    #[tokio::test]
    async fn test_missing_target_degrades_but_continues() {
        let host = Arc::new(InMemoryHost::new());
        host.set_field(FieldTarget::Chat, "claude_model", json!("claude-3"));
        host.set_field(FieldTarget::Text, "api_server", json!("http://old"));

        let restorer = restorer_for(host.clone());
        let snapshot = restorer.capture();

        host.drop_field_table(FieldTarget::Chat);
        host.set_field(FieldTarget::Text, "api_server", json!("http://new"));

        let outcome = restorer.apply(&snapshot).await.unwrap();
        assert!(!outcome.complete);
        // The reachable target was still restored.
        assert_eq!(
            host.provider_fields(FieldTarget::Text).unwrap()["api_server"],
            json!("http://old")
        );
    }

    #[tokio::test]
    async fn test_api_mode_reapplied_when_it_differs() {
        let host = Arc::new(InMemoryHost::new());
        host.set_api_mode(Some("cc"));

        let restorer = restorer_for(host.clone());
        let snapshot = restorer.capture();

        host.set_api_mode(Some("tc"));

        let outcome = restorer.apply(&snapshot).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(host.main_api_mode().as_deref(), Some("cc"));
    }
}
