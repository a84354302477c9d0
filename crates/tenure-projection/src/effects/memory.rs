//! Process-local outbox.
//!
//! Deduplication is queue-scoped: an idempotency key is held while its entry
//! is pending and released when the entry leaves the queue. A redelivered
//! event therefore cannot double-enqueue, while a later delivery after the
//! outbox was drained enqueues again.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use ulid::Ulid;

use super::{EffectEnvelope, EffectQueue, EnqueueResult, QueueEntry, SideEffect};
use crate::config::ProjectionConfig;
use crate::error::{Error, Result};

/// Pending entries plus the message id held by each pending key.
#[derive(Debug, Default)]
struct Outbox {
    entries: VecDeque<QueueEntry>,
    held_keys: HashMap<String, String>,
}

impl Outbox {
    fn admit(&mut self, envelope: EffectEnvelope, capacity: Option<usize>) -> EnqueueResult {
        let key = envelope.idempotency_key();
        if let Some(held) = self.held_keys.get(&key) {
            return EnqueueResult::Deduplicated {
                existing_message_id: held.clone(),
            };
        }
        if capacity.is_some_and(|cap| self.entries.len() >= cap) {
            return EnqueueResult::QueueFull;
        }

        let message_id = Ulid::new().to_string();
        self.held_keys.insert(key.clone(), message_id.clone());
        self.entries.push_back(QueueEntry {
            message_id: message_id.clone(),
            idempotency_key: key,
            envelope,
        });
        EnqueueResult::Enqueued { message_id }
    }

    fn release_front(&mut self, count: usize) -> Vec<QueueEntry> {
        let count = count.min(self.entries.len());
        let released: Vec<_> = self.entries.drain(..count).collect();
        for entry in &released {
            self.held_keys.remove(&entry.idempotency_key);
        }
        released
    }
}

/// Outbox held in memory, optionally bounded.
///
/// ```rust
/// use tenure_projection::effects::memory::InMemoryEffectQueue;
///
/// let queue = InMemoryEffectQueue::with_capacity("effects", 100);
/// assert!(queue.pending()?.is_empty());
/// # Ok::<(), tenure_projection::error::Error>(())
/// ```
#[derive(Debug)]
pub struct InMemoryEffectQueue {
    name: String,
    capacity: Option<usize>,
    outbox: Mutex<Outbox>,
}

impl Default for InMemoryEffectQueue {
    fn default() -> Self {
        Self::new("effects")
    }
}

impl InMemoryEffectQueue {
    /// Unbounded outbox.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: None,
            outbox: Mutex::new(Outbox::default()),
        }
    }

    /// Outbox refusing new effects once `capacity` are pending.
    #[must_use]
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new(name)
        }
    }

    /// Outbox bounded by [`ProjectionConfig::outbox_capacity`] when set.
    #[must_use]
    pub fn from_config(name: impl Into<String>, config: &ProjectionConfig) -> Self {
        let queue = Self::new(name);
        Self {
            capacity: config.outbox_capacity,
            ..queue
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Outbox>> {
        self.outbox
            .lock()
            .map_err(|_| Error::storage("effect outbox lock poisoned"))
    }

    /// Pending effects, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the outbox lock is poisoned.
    pub fn pending(&self) -> Result<Vec<SideEffect>> {
        Ok(self
            .lock()?
            .entries
            .iter()
            .map(|entry| entry.envelope.effect.clone())
            .collect())
    }

    /// Removes every pending entry and releases their keys.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the outbox lock is poisoned.
    pub fn drain(&self) -> Result<Vec<QueueEntry>> {
        Ok(self.lock()?.release_front(usize::MAX))
    }
}

#[async_trait]
impl EffectQueue for InMemoryEffectQueue {
    async fn enqueue(&self, envelope: EffectEnvelope) -> Result<EnqueueResult> {
        Ok(self.lock()?.admit(envelope, self.capacity))
    }

    async fn dequeue(&self, max: usize) -> Result<Vec<QueueEntry>> {
        Ok(self.lock()?.release_front(max))
    }

    async fn queue_depth(&self) -> Result<usize> {
        Ok(self.lock()?.entries.len())
    }

    fn queue_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenure_core::{OrganizationId, TenantId};

    fn envelope(effect: SideEffect, cause: &str) -> EffectEnvelope {
        EffectEnvelope::new(TenantId::new("acme").unwrap(), effect, cause)
    }

    fn refresh_arr() -> SideEffect {
        SideEffect::RefreshArr {
            organization_id: OrganizationId::generate(),
        }
    }

    #[tokio::test]
    async fn same_effect_from_same_event_is_held_once() -> Result<()> {
        let queue = InMemoryEffectQueue::new("test");
        let effect = refresh_arr();

        let first = queue.enqueue(envelope(effect.clone(), "evt-1")).await?;
        let second = queue.enqueue(envelope(effect.clone(), "evt-1")).await?;
        assert!(first.is_enqueued());
        assert_eq!(second.message_id(), first.message_id());
        assert!(!second.is_enqueued());

        assert!(queue.enqueue(envelope(effect, "evt-2")).await?.is_enqueued());
        assert_eq!(queue.queue_depth().await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn dequeued_keys_can_be_enqueued_again() -> Result<()> {
        let queue = InMemoryEffectQueue::new("test");
        let effect = refresh_arr();
        queue.enqueue(envelope(effect.clone(), "evt-1")).await?;

        let taken = queue.dequeue(10).await?;
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].envelope.effect, effect);
        assert!(queue.enqueue(envelope(effect, "evt-1")).await?.is_enqueued());
        Ok(())
    }

    #[tokio::test]
    async fn full_outbox_refuses_new_keys() -> Result<()> {
        let queue = InMemoryEffectQueue::from_config(
            "test",
            &ProjectionConfig {
                outbox_capacity: Some(1),
                ..ProjectionConfig::default()
            },
        );
        let held = refresh_arr();
        assert!(queue.enqueue(envelope(held.clone(), "e")).await?.is_enqueued());
        assert_eq!(
            queue.enqueue(envelope(refresh_arr(), "e")).await?,
            EnqueueResult::QueueFull
        );
        assert!(matches!(
            queue.enqueue(envelope(held, "e")).await?,
            EnqueueResult::Deduplicated { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn dequeue_is_oldest_first_and_bounded() -> Result<()> {
        let queue = InMemoryEffectQueue::new("test");
        let effects: Vec<_> = (0..3).map(|_| refresh_arr()).collect();
        let batch = effects.iter().map(|e| envelope(e.clone(), "e")).collect();
        queue.enqueue_batch(batch).await?;

        let first_two = queue.dequeue(2).await?;
        assert_eq!(first_two.len(), 2);
        assert_eq!(first_two[1].envelope.effect, effects[1]);
        assert_eq!(queue.pending()?, vec![effects[2].clone()]);

        assert_eq!(queue.drain()?.len(), 1);
        assert!(queue.dequeue(5).await?.is_empty());
        assert_eq!(queue.queue_name(), "test");
        Ok(())
    }
}
