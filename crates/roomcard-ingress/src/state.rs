//! Shared application state for the ingress API server.

use std::fmt;
use std::sync::Arc;

use roomcard_core::ReflectorState;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct IngressState {
    /// Pending-update slot shared with the reflector.
    pub reflector: Arc<ReflectorState>,
    /// Secret callers must send in the `x-api-key` header.
    pub api_key: String,
    /// Wake the reflector after each accepted update.
    pub publish_on_ingress: bool,
}

impl IngressState {
    /// Create ingress state over the given reflector slot.
    pub fn new(reflector: Arc<ReflectorState>, api_key: impl Into<String>) -> Self {
        Self {
            reflector,
            api_key: api_key.into(),
            publish_on_ingress: true,
        }
    }

    /// Enable or disable waking the reflector on each accepted update.
    #[must_use]
    pub fn with_publish_on_ingress(mut self, enabled: bool) -> Self {
        self.publish_on_ingress = enabled;
        self
    }
}

impl fmt::Debug for IngressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngressState")
            .field("reflector", &self.reflector)
            .field("api_key", &"<redacted>")
            .field("publish_on_ingress", &self.publish_on_ingress)
            .finish()
    }
}
