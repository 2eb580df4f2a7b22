use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{KeyResolutionError, ResolveResult};
use crate::keys::SigningKey;

/// Source of signing key material, looked up by kid.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, key_id: &str) -> ResolveResult<SigningKey>;
}

#[async_trait]
impl<R> KeyResolver for Arc<R>
where
    R: KeyResolver + ?Sized,
{
    async fn resolve(&self, key_id: &str) -> ResolveResult<SigningKey> {
        (**self).resolve(key_id).await
    }
}

/// Thread-safe in-memory key set, for pinned keys and deterministic tests.
#[derive(Clone, Default)]
pub struct StaticKeyResolver {
    inner: Arc<RwLock<HashMap<String, SigningKey>>>,
}

impl StaticKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(self, key: SigningKey) -> Self {
        self.insert(key);
        self
    }

    pub fn insert(&self, key: SigningKey) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key.key_id().to_string(), key);
    }

    pub fn insert_pem(&self, key_id: impl Into<String>, pem: &str) -> ResolveResult<()> {
        let key = SigningKey::from_pem(key_id, pem)?;
        self.insert(key);
        Ok(())
    }

    pub fn contains(&self, key_id: &str) -> bool {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.contains_key(key_id)
    }

    pub fn replace_all<I>(&self, keys: I)
    where
        I: IntoIterator<Item = SigningKey>,
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.clear();
        for key in keys {
            guard.insert(key.key_id().to_string(), key);
        }
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn resolve(&self, key_id: &str) -> ResolveResult<SigningKey> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(key_id)
            .cloned()
            .ok_or_else(|| KeyResolutionError::UnknownKeyId(key_id.to_string()))
    }
}
