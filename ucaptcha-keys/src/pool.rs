//! Key pool manager: lazy, concurrency-safe provisioning plus rotation.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};
use ucaptcha_common::error::CaptchaResult;
use ucaptcha_common::types::KeyPair;
use ucaptcha_storage::KeyStorage;

use crate::generate::generate_key_pair;

/// Owns the decision of *when* to generate a new key. Storage backends may
/// have their own internal locking, but must remain correct even if this
/// manager's lock is not held across their calls — the lock here protects
/// only the generate-vs-reuse decision, not the storage call itself.
pub struct KeyPoolManager {
    storage: Arc<dyn KeyStorage>,
    key_length: u32,
    /// Guards the "is the pool empty" decision in `get_random`. Held across
    /// the `.await` points of the storage calls it wraps, which is why this
    /// is a `tokio::sync::RwLock` rather than `std::sync::RwLock`.
    generation_lock: RwLock<()>,
}

impl KeyPoolManager {
    /// Build a pool manager over the given storage backend.
    pub fn new(storage: Arc<dyn KeyStorage>, key_length: u32) -> Self {
        Self {
            storage,
            key_length,
            generation_lock: RwLock::new(()),
        }
    }

    /// Generate a fresh `KeyPair` at the configured bit length. Does not
    /// touch storage.
    ///
    /// Runs the safe-prime search on a blocking-pool thread via
    /// `tokio::task::spawn_blocking`: at 2048 bits this is CPU-bound work
    /// costing several hundred milliseconds, and running it inline would
    /// stall whatever worker thread is driving it.
    async fn generate(&self) -> CaptchaResult<KeyPair> {
        let key_length = self.key_length;
        tokio::task::spawn_blocking(move || generate_key_pair(key_length))
            .await
            .map_err(|e| {
                ucaptcha_common::error::CaptchaError::key_generation(format!(
                    "key generation task panicked: {e}"
                ))
            })?
    }

    /// Unconditionally generate and persist a new key, returning it.
    pub async fn add_key(&self) -> CaptchaResult<KeyPair> {
        let key = self.generate().await?;
        self.storage.save(&key).await?;
        Ok(key)
    }

    /// Remove a key by id.
    pub async fn remove_key(&self, id: &str) -> CaptchaResult<()> {
        self.storage.delete(id).await
    }

    /// Number of keys currently in the pool.
    pub async fn count(&self) -> CaptchaResult<usize> {
        self.storage.count().await
    }

    /// Look up a specific key by id, used by the challenge manager to
    /// resolve the key a challenge was bound to. A miss here (the key was
    /// rotated out since the challenge was issued) is not an error; callers
    /// map `None` to `KeyMissing`.
    pub async fn get(&self, id: &str) -> CaptchaResult<Option<KeyPair>> {
        self.storage.get(id).await
    }

    /// Return an existing key if the store is non-empty; otherwise
    /// generate one, persist it, and return it.
    ///
    /// Implements the classic double-checked pattern under a
    /// reader-writer lock: read-lock → check count → if zero, upgrade to
    /// write-lock → re-check → generate → persist. A failure to persist a
    /// just-generated key is logged and ignored — the in-memory value is
    /// still returned, since the caller (typically issuing a challenge
    /// right now) needs *a* key more than it needs that key to survive a
    /// process restart.
    pub async fn get_random(&self) -> CaptchaResult<KeyPair> {
        {
            let _read_guard = self.generation_lock.read().await;
            if let Some(key) = self.storage.random().await? {
                return Ok(key);
            }
        }

        let _write_guard = self.generation_lock.write().await;
        // Re-check: another task may have generated a key while we waited
        // for the write lock.
        if let Some(key) = self.storage.random().await? {
            return Ok(key);
        }

        let key = self.generate().await?;
        if let Err(e) = self.storage.save(&key).await {
            warn!(error = %e, key_id = %key.id, "failed to persist newly generated key");
        }
        Ok(key)
    }

    /// One rotation tick: snapshot existing keys, generate and persist one
    /// new key, and if the snapshot was non-empty, evict the one with the
    /// earliest `generated_at` (tie-broken arbitrarily). All errors are
    /// logged; the caller's periodic loop continues regardless.
    pub async fn rotate(&self) {
        let snapshot = match self.storage.list_all().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "rotation: failed to snapshot key pool, skipping this tick");
                return;
            }
        };

        let new_key = match self.add_key().await {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "rotation: failed to generate replacement key");
                return;
            }
        };
        info!(key_id = %new_key.id, "rotation: added new key");

        if let Some(oldest) = snapshot.iter().min_by_key(|k| k.generated_at) {
            if let Err(e) = self.storage.delete(&oldest.id).await {
                warn!(error = %e, key_id = %oldest.id, "rotation: failed to evict oldest key");
            } else {
                info!(key_id = %oldest.id, "rotation: evicted oldest key");
            }
        }
    }

    /// At startup, top the pool up to `target_size` by calling `add_key`
    /// repeatedly. Blocks until the pool reaches the target; startup
    /// errors here are fatal to the caller by design (key generation is
    /// CPU-bound and not cancellable mid-way).
    pub async fn initial_fill(&self, target_size: usize) -> CaptchaResult<()> {
        let current = self.count().await?;
        let missing = target_size.saturating_sub(current);
        if missing > 0 {
            info!(missing, target_size, current, "initial key pool fill");
        }
        for _ in 0..missing {
            self.add_key().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucaptcha_storage::MemoryKeyStorage;

    fn manager() -> KeyPoolManager {
        KeyPoolManager::new(Arc::new(MemoryKeyStorage::new()), 512)
    }

    #[tokio::test]
    async fn get_random_lazily_fills_an_empty_pool() {
        let mgr = manager();
        assert_eq!(mgr.count().await.unwrap(), 0);
        let first = mgr.get_random().await.unwrap();
        assert_eq!(mgr.count().await.unwrap(), 1);
        let second = mgr.get_random().await.unwrap();
        // reuses the existing key rather than generating a second one
        assert_eq!(mgr.count().await.unwrap(), 1);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn initial_fill_tops_up_to_target() {
        let mgr = manager();
        mgr.initial_fill(3).await.unwrap();
        assert_eq!(mgr.count().await.unwrap(), 3);
        // calling again with the same target is a no-op
        mgr.initial_fill(3).await.unwrap();
        assert_eq!(mgr.count().await.unwrap(), 3);
    }

    /// A throwaway key pair with the given id and `generated_at`, cheap to
    /// build (no safe-prime search) since the rotation eviction policy only
    /// cares about the timestamp ordering, not the factorization.
    fn stub_key(id: &str, generated_at: i64) -> KeyPair {
        KeyPair {
            id: id.to_string(),
            components: ucaptcha_common::types::RsaComponents {
                p: ucaptcha_common::arithmetic::BigUint::from_u64(23),
                q: ucaptcha_common::arithmetic::BigUint::from_u64(11),
                n: ucaptcha_common::arithmetic::BigUint::from_u64(253),
            },
            generated_at,
        }
    }

    #[tokio::test]
    async fn rotation_adds_one_and_evicts_oldest() {
        let mgr = manager();
        // `generated_at` is whole-seconds; seed distinct timestamps directly
        // rather than via `initial_fill`, whose three keys would typically
        // land in the same second and make "the oldest" a tie broken
        // independently (and possibly differently) by the test's own
        // `min_by_key` and `rotate()`'s internal one.
        mgr.storage.save(&stub_key("k-oldest", 100)).await.unwrap();
        mgr.storage.save(&stub_key("k-middle", 200)).await.unwrap();
        mgr.storage.save(&stub_key("k-newest", 300)).await.unwrap();

        mgr.rotate().await;

        let after = mgr.storage.list_all().await.unwrap();
        assert_eq!(after.len(), 3);
        assert!(after.iter().all(|k| k.id != "k-oldest"));
    }

    #[tokio::test]
    async fn remove_key_then_get_by_id_is_absent() {
        let mgr = manager();
        let key = mgr.add_key().await.unwrap();
        mgr.remove_key(&key.id).await.unwrap();
        assert!(mgr.storage.get(&key.id).await.unwrap().is_none());
    }
}
