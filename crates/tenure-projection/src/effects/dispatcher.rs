//! Drains the effect queue into sibling-service calls.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use tracing::Instrument;

use tenure_core::observability::effect_span;

use super::client::{RetryingClient, SiblingClient};
use super::{EffectQueue, QueueEntry};
use crate::config::ProjectionConfig;
use crate::error::Result;
use crate::metrics::ProjectionMetrics;

/// Default number of sibling calls in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default number of entries taken from the queue per round.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Outcome of a drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Calls that eventually succeeded.
    pub succeeded: usize,
    /// Calls that failed after retries.
    pub failed: usize,
}

impl DispatchReport {
    /// Total entries handled.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Delivers queued effects with bounded concurrency.
///
/// A failed delivery is logged and counted. It is not re-enqueued and never
/// surfaces to the projection that caused it.
pub struct EffectDispatcher<Q, C> {
    queue: Q,
    client: RetryingClient<C>,
    concurrency: usize,
    batch_size: usize,
    metrics: ProjectionMetrics,
}

impl<Q, C> EffectDispatcher<Q, C>
where
    Q: EffectQueue,
    C: SiblingClient,
{
    /// Creates a dispatcher with default concurrency and batch size.
    pub fn new(queue: Q, client: RetryingClient<C>) -> Self {
        Self {
            queue,
            client,
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            metrics: ProjectionMetrics::new(),
        }
    }

    /// Creates a dispatcher with the configured retry policy and concurrency.
    pub fn from_config(queue: Q, client: C, config: &ProjectionConfig) -> Self {
        Self::new(queue, RetryingClient::with_policy(client, config.retry_policy()))
            .with_concurrency(config.dispatch_concurrency)
    }

    /// Sets the number of concurrent calls (at least one).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the dequeue batch size (at least one).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// The queue being drained.
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// The wrapped client.
    pub fn client(&self) -> &RetryingClient<C> {
        &self.client
    }

    /// Delivers everything currently pending.
    ///
    /// # Errors
    ///
    /// Returns an error only if the queue itself fails. Delivery failures are
    /// reported in [`DispatchReport::failed`].
    #[tracing::instrument(skip(self), fields(queue = self.queue.queue_name()))]
    pub async fn dispatch_pending(&self) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        loop {
            let batch = self.queue.dequeue(self.batch_size).await?;
            if batch.is_empty() {
                break;
            }
            let round = self.dispatch_batch(batch).await;
            report.succeeded += round.succeeded;
            report.failed += round.failed;
            self.metrics.set_outbox_depth(self.queue.queue_depth().await?);
        }

        if report.total() > 0 {
            tracing::info!(
                succeeded = report.succeeded,
                failed = report.failed,
                "dispatched pending effects"
            );
        }
        Ok(report)
    }

    async fn dispatch_batch(&self, batch: Vec<QueueEntry>) -> DispatchReport {
        let succeeded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        stream::iter(batch)
            .for_each_concurrent(self.concurrency, |entry| {
                let span = effect_span(
                    entry.envelope.effect.kind(),
                    entry.envelope.tenant.as_str(),
                    &entry.idempotency_key,
                );
                let succeeded = &succeeded;
                let failed = &failed;
                async move {
                    let kind = entry.envelope.effect.kind();
                    match self
                        .client
                        .call(&entry.envelope.tenant, &entry.envelope.effect)
                        .await
                    {
                        Ok(()) => {
                            tracing::debug!(effect = %entry.envelope.effect, "effect delivered");
                            self.metrics.record_effect_call(kind, "ok");
                            succeeded.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            tracing::warn!(
                                effect = %entry.envelope.effect,
                                causation_event_id = %entry.envelope.causation_event_id,
                                error = %err,
                                "effect delivery failed"
                            );
                            self.metrics.record_effect_call(kind, "error");
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                .instrument(span)
            })
            .await;

        DispatchReport {
            succeeded: succeeded.into_inner(),
            failed: failed.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tenure_core::{ContractId, OpportunityId, OrganizationId, TenantId};

    use super::*;
    use crate::effects::client::RetryPolicy;
    use crate::effects::memory::InMemoryEffectQueue;
    use crate::effects::{EffectEnvelope, SideEffect};
    use crate::error::Error;
    use crate::model::OnboardingStatus;

    /// Fails every ARR refresh permanently, accepts everything else.
    #[derive(Default)]
    struct ArrDown {
        delivered: Mutex<Vec<String>>,
    }

    impl ArrDown {
        fn ok(&self, name: &str) -> Result<()> {
            self.delivered.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl SiblingClient for ArrDown {
        async fn create_renewal_opportunity(&self, _: &TenantId, _: &ContractId) -> Result<()> {
            self.ok("create_renewal_opportunity")
        }
        async fn close_win_opportunity(&self, _: &TenantId, _: &OpportunityId) -> Result<()> {
            self.ok("close_win_opportunity")
        }
        async fn close_lost_opportunity(&self, _: &TenantId, _: &OpportunityId) -> Result<()> {
            self.ok("close_lost_opportunity")
        }
        async fn refresh_renewal_summary(&self, _: &TenantId, _: &OrganizationId) -> Result<()> {
            self.ok("refresh_renewal_summary")
        }
        async fn refresh_arr(&self, _: &TenantId, _: &OrganizationId) -> Result<()> {
            Err(Error::dispatch_permanent("arr service rejected request"))
        }
        async fn update_onboarding_status(
            &self,
            _: &TenantId,
            _: &OrganizationId,
            _: OnboardingStatus,
            _: &str,
            _: Option<&ContractId>,
        ) -> Result<()> {
            self.ok("update_onboarding_status")
        }
        async fn refresh_contract_status(&self, _: &TenantId, _: &ContractId) -> Result<()> {
            self.ok("refresh_contract_status")
        }
    }

    #[tokio::test]
    async fn failures_are_counted_not_returned() -> Result<()> {
        let queue = InMemoryEffectQueue::new("test");
        let tenant = TenantId::new("acme")?;
        let organization_id = OrganizationId::generate();
        queue
            .enqueue_batch(vec![
                EffectEnvelope::new(tenant.clone(), SideEffect::RefreshArr { organization_id }, "e"),
                EffectEnvelope::new(
                    tenant.clone(),
                    SideEffect::RefreshRenewalSummary { organization_id },
                    "e",
                ),
                EffectEnvelope::new(
                    tenant,
                    SideEffect::RefreshContractStatus {
                        contract_id: ContractId::generate(),
                    },
                    "e",
                ),
            ])
            .await?;

        let policy = RetryPolicy {
            max_attempts: 2,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        };
        let dispatcher = EffectDispatcher::new(queue, RetryingClient::with_policy(ArrDown::default(), policy))
            .with_batch_size(2)
            .with_concurrency(4);

        let report = dispatcher.dispatch_pending().await?;
        assert_eq!(report, DispatchReport { succeeded: 2, failed: 1 });
        assert_eq!(dispatcher.queue().queue_depth().await?, 0);
        assert_eq!(dispatcher.client().inner().delivered.lock().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn empty_queue_is_a_no_op() -> Result<()> {
        let dispatcher = EffectDispatcher::new(
            InMemoryEffectQueue::new("test"),
            RetryingClient::new(ArrDown::default()),
        );
        assert_eq!(dispatcher.dispatch_pending().await?.total(), 0);
        Ok(())
    }
}
