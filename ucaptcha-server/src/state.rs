//! Application state shared across all HTTP handlers.

use std::sync::Arc;

use ucaptcha_challenge::ChallengeManager;
use ucaptcha_common::config::Config;
use ucaptcha_keys::KeyPoolManager;

/// Everything a handler needs, threaded through via axum's extractor state
/// rather than process-global statics.
pub struct AppState {
    /// The loaded, validated process configuration.
    pub config: Config,
    /// Challenge issuance and verification.
    pub challenge_manager: Arc<ChallengeManager>,
    /// Key generation and rotation, shared with the background rotation task.
    pub key_pool: Arc<KeyPoolManager>,
}
