use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{KeyResolutionError, ResolveResult};
use crate::keys::SigningKey;
use crate::resolver::KeyResolver;

pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

/// A resolved key and the instant it was stored.
type Slot = Arc<OnceCell<(SigningKey, Instant)>>;

/// Caches resolved keys per kid. Concurrent resolves of one kid share a
/// single inner call; failures are not cached.
pub struct CachingKeyResolver<R> {
    inner: R,
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl<R: KeyResolver> CachingKeyResolver<R> {
    pub fn new(inner: R) -> Self {
        Self::with_ttl(inner, DEFAULT_KEY_TTL)
    }

    pub fn with_ttl(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every cached key; the next resolve goes to the inner resolver.
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of kids currently tracked, cached or in flight.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, slot: &Slot) -> bool {
        slot.get()
            .is_some_and(|(_, stored)| stored.elapsed() >= self.ttl)
    }

    fn slot_for(&self, key_id: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(key_id) {
            if !self.is_expired(slot) {
                return Arc::clone(slot);
            }
        }

        // New or expired entry: sweep other stale keys before inserting.
        slots.retain(|_, slot| !self.is_expired(slot));
        let slot = Slot::default();
        slots.insert(key_id.to_string(), Arc::clone(&slot));
        slot
    }

    /// Forget `slot` for `key_id` unless another resolve already replaced it.
    fn evict(&self, key_id: &str, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots
            .get(key_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            slots.remove(key_id);
        }
    }
}

#[async_trait]
impl<R: KeyResolver> KeyResolver for CachingKeyResolver<R> {
    async fn resolve(&self, key_id: &str) -> ResolveResult<SigningKey> {
        let slot = self.slot_for(key_id);
        let resolved = slot
            .get_or_try_init(|| async {
                debug!(kid = key_id, "signing key cache miss");
                let key = self.inner.resolve(key_id).await?;
                Ok::<_, KeyResolutionError>((key, Instant::now()))
            })
            .await;

        match resolved {
            Ok((key, _)) => Ok(key.clone()),
            Err(err) => {
                self.evict(key_id, &slot);
                Err(err)
            }
        }
    }
}
