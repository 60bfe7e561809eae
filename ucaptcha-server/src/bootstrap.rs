//! Process orchestration: wiring storage, the key pool, and the challenge
//! manager together, running the initial key-pool fill, and driving the
//! periodic rotation task.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use ucaptcha_challenge::ChallengeManager;
use ucaptcha_common::config::Config;
use ucaptcha_common::error::CaptchaResult;
use ucaptcha_keys::KeyPoolManager;
use ucaptcha_storage::{build_challenge_storage, build_key_storage};

use crate::state::AppState;

/// Build the application state: construct the configured storage backends,
/// the key pool manager, and the challenge manager, then block until the
/// key pool has been topped up to `config.key_pool_size`.
///
/// Startup errors here (storage construction, the initial fill) are
/// fatal — the caller should abort the process rather than serve traffic
/// against a half-initialized pool.
pub async fn build_app_state(config: Config) -> CaptchaResult<Arc<AppState>> {
    let key_storage = build_key_storage(&config)?;
    let challenge_storage = build_challenge_storage(&config)?;

    let key_pool = Arc::new(KeyPoolManager::new(key_storage, config.key_length));
    info!(
        target_size = config.key_pool_size,
        "performing initial key pool fill"
    );
    key_pool.initial_fill(config.key_pool_size).await?;

    let challenge_manager = Arc::new(ChallengeManager::new(
        challenge_storage,
        key_pool.clone(),
        config.default_difficulty,
    ));

    Ok(Arc::new(AppState {
        config,
        challenge_manager,
        key_pool,
    }))
}

/// Run the periodic key rotation task until `shutdown` resolves. Never
/// returns an error: every tick's failures are logged by
/// [`KeyPoolManager::rotate`] and the loop continues regardless.
pub async fn run_rotation_task(
    key_pool: Arc<KeyPoolManager>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so rotation doesn't run
    // redundantly right after the initial fill already primed the pool.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                info!("rotation tick");
                key_pool.rotate().await;
            }
            _ = shutdown.changed() => {
                info!("rotation task shutting down");
                break;
            }
        }
    }
}
