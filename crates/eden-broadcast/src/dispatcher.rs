//! Alert fan-out to every registered viewer.
//!
//! One dispatch serializes the alert once, snapshots the registry and offers
//! the same frame to each member concurrently. A member that cannot take the
//! frame within the send timeout, or whose connection is gone, is evicted.
//! Nothing is retried, queued for late joiners, or reported to the producer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eden_core::types::CanonicalAlert;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::BroadcastError;
use crate::registry::{ConnectionRegistry, Frame, Member};

/// Outcome of a single dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Members in the snapshot taken at dispatch start.
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Cumulative delivery counters since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryCounters {
    pub dispatches: u64,
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Default)]
struct DeliveryStats {
    dispatches: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

pub struct BroadcastDispatcher {
    registry: Arc<ConnectionRegistry>,
    send_timeout: Duration,
    stats: DeliveryStats,
}

impl BroadcastDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
            stats: DeliveryStats::default(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Best-effort broadcast of one alert to the current viewers.
    pub async fn dispatch(&self, alert: &CanonicalAlert) -> DispatchReport {
        self.stats.dispatches.fetch_add(1, Ordering::Relaxed);

        let frame: Frame = match serde_json::to_string(alert) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                error!(alert_id = %alert.alert_id, error = %e, "alert serialization failed");
                return DispatchReport::default();
            }
        };

        let report = self.fan_out(frame).await;
        debug!(
            alert_id = %alert.alert_id,
            recipients = report.recipients,
            delivered = report.delivered,
            failed = report.failed,
            "alert dispatched"
        );
        report
    }

    pub fn counters(&self) -> DeliveryCounters {
        DeliveryCounters {
            dispatches: self.stats.dispatches.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }

    async fn fan_out(&self, frame: Frame) -> DispatchReport {
        let members = self.registry.snapshot();
        let recipients = members.len();

        let attempts = members.into_iter().map(|member| {
            let frame = Arc::clone(&frame);
            async move {
                match deliver(&member, frame, self.send_timeout).await {
                    Ok(()) => true,
                    Err(e) => {
                        self.registry.remove(&member.id);
                        warn!(conn_id = %member.id, error = %e, "delivery failed, viewer dropped");
                        false
                    }
                }
            }
        });
        let outcomes = join_all(attempts).await;

        let delivered = outcomes.iter().filter(|ok| **ok).count();
        let failed = recipients - delivered;
        self.stats
            .delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.stats.failed.fetch_add(failed as u64, Ordering::Relaxed);

        DispatchReport {
            recipients,
            delivered,
            failed,
        }
    }
}

async fn deliver(member: &Member, frame: Frame, limit: Duration) -> Result<(), BroadcastError> {
    match tokio::time::timeout(limit, member.outbox.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(BroadcastError::Closed),
        Err(_) => Err(BroadcastError::Timeout {
            ms: limit.as_millis() as u64,
        }),
    }
}
