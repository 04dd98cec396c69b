//! Subscription table: resource -> expiration, refreshed by `subscribe`
//! messages and cleaned by a periodic sweeper task.
//!
//! The engine task writes it while the sweeper reads/removes concurrently,
//! hence the concurrent map.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct SubscriptionTable {
    entries: DashMap<String, i64>,
    ttl_millis: i64,
}

impl SubscriptionTable {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_millis: (timeout_seconds * 1000) as i64,
        }
    }

    /// Create or refresh a subscription.
    pub fn subscribe(&self, resource: &str, now_millis: i64) {
        self.entries
            .insert(resource.to_string(), now_millis + self.ttl_millis);
    }

    pub fn unsubscribe(&self, resource: &str) {
        self.entries.remove(resource);
    }

    /// Active means present and not past expiration; the sweeper may lag an
    /// expired entry by up to its interval, matching must not.
    pub fn is_active(&self, resource: &str, now_millis: i64) -> bool {
        self.entries
            .get(resource)
            .map(|exp| *exp > now_millis)
            .unwrap_or(false)
    }

    pub fn sweep(&self, now_millis: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, exp| *exp > now_millis);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Sweeper task: every 30 s drop expired subscriptions.
pub async fn run_sweeper(table: Arc<SubscriptionTable>, cancel: CancellationToken) {
    let mut tick = interval(SWEEP_INTERVAL);
    tick.tick().await; // immediate first tick

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("subscription sweeper stopping");
                return;
            }
            _ = tick.tick() => {
                let removed = table.sweep(now_millis());
                if removed > 0 {
                    debug!(removed, remaining = table.len(), "swept expired subscriptions");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_sets_expiration_from_ttl() {
        let table = SubscriptionTable::new(60);
        table.subscribe("AS15169", 1_000);
        assert!(table.is_active("AS15169", 60_999));
        assert!(!table.is_active("AS15169", 61_000));
    }

    #[test]
    fn resubscribe_refreshes() {
        let table = SubscriptionTable::new(60);
        table.subscribe("AS65000", 0);
        table.subscribe("AS65000", 50_000);
        assert!(table.is_active("AS65000", 100_000));
    }

    #[test]
    fn sweep_removes_only_expired() {
        let table = SubscriptionTable::new(60);
        table.subscribe("AS65000", 0); // expires at 60_000
        table.subscribe("AS15169", 100_000); // expires at 160_000

        // 120 s in: AS65000 is gone, AS15169 stays
        assert_eq!(table.sweep(120_000), 1);
        assert!(!table.is_active("AS65000", 120_000));
        assert!(table.is_active("AS15169", 120_000));
    }

    #[test]
    fn unsubscribe_removes_immediately() {
        let table = SubscriptionTable::new(60);
        table.subscribe("AS65000", 0);
        table.unsubscribe("AS65000");
        assert_eq!(table.len(), 0);
    }
}
