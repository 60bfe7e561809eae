//! Process-local, non-persistent storage backends.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::seq::IteratorRandom;
use tokio::sync::RwLock;
use ucaptcha_common::error::CaptchaResult;
use ucaptcha_common::types::{Challenge, KeyPair};

use crate::traits::{ChallengeStorage, KeyStorage};

/// In-memory key store, backed by a single `RwLock<HashMap<..>>`. Never
/// expires entries; eviction is entirely the key pool manager's business.
#[derive(Default)]
pub struct MemoryKeyStorage {
    keys: RwLock<HashMap<String, KeyPair>>,
}

impl MemoryKeyStorage {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStorage for MemoryKeyStorage {
    async fn save(&self, key: &KeyPair) -> CaptchaResult<()> {
        self.keys.write().await.insert(key.id.clone(), key.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> CaptchaResult<Option<KeyPair>> {
        Ok(self.keys.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> CaptchaResult<()> {
        self.keys.write().await.remove(id);
        Ok(())
    }

    async fn list_all(&self) -> CaptchaResult<Vec<KeyPair>> {
        Ok(self.keys.read().await.values().cloned().collect())
    }

    async fn count(&self) -> CaptchaResult<usize> {
        Ok(self.keys.read().await.len())
    }

    async fn random(&self) -> CaptchaResult<Option<KeyPair>> {
        let guard = self.keys.read().await;
        let mut rng = rand::thread_rng();
        Ok(guard.values().choose(&mut rng).cloned())
    }
}

/// In-memory challenge store, backed by a single `RwLock<HashMap<..>>`.
/// Carries no TTL of its own — abandoned challenges live until the
/// challenge manager deletes them on a terminal verification outcome.
#[derive(Default)]
pub struct MemoryChallengeStorage {
    challenges: RwLock<HashMap<String, Challenge>>,
}

impl MemoryChallengeStorage {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeStorage for MemoryChallengeStorage {
    async fn save(&self, challenge: &Challenge) -> CaptchaResult<()> {
        self.challenges
            .write()
            .await
            .insert(challenge.id.clone(), challenge.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> CaptchaResult<Option<Challenge>> {
        Ok(self.challenges.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> CaptchaResult<()> {
        self.challenges.write().await.remove(id);
        Ok(())
    }
}
