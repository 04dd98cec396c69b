//! Runtime counters and the periodic stats log line.
//!
//! The engine task bumps counters as it dispatches; the stats loop renders
//! them every `stats_interval` seconds and warns when collector heartbeats go
//! stale.

use crate::records::RecordKind;
use crate::writer::pool::WriterStat;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct Stats {
    collectors: AtomicU64,
    routers: AtomicU64,
    peers: AtomicU64,
    base_attrs: AtomicU64,
    pub base_attrs_suppressed: AtomicU64,
    unicast_prefixes: AtomicU64,
    l3vpn_prefixes: AtomicU64,
    ls_nodes: AtomicU64,
    ls_links: AtomicU64,
    ls_prefixes: AtomicU64,
    bmp_stats: AtomicU64,
    subscriptions: AtomicU64,
    pub decode_dropped: AtomicU64,
    pub notifications: AtomicU64,

    intake_size: AtomicUsize,
    pub last_collector_millis: AtomicI64,

    pools: Mutex<Vec<(&'static str, Vec<WriterStat>)>>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_set(&self, kind: RecordKind, count: u64) {
        let counter = match kind {
            RecordKind::Collector => &self.collectors,
            RecordKind::Router => &self.routers,
            RecordKind::Peer => &self.peers,
            RecordKind::BaseAttribute => &self.base_attrs,
            RecordKind::UnicastPrefix => &self.unicast_prefixes,
            RecordKind::L3VpnPrefix => &self.l3vpn_prefixes,
            RecordKind::LsNode => &self.ls_nodes,
            RecordKind::LsLink => &self.ls_links,
            RecordKind::LsPrefix => &self.ls_prefixes,
            RecordKind::BmpStat => &self.bmp_stats,
            RecordKind::Subscription => &self.subscriptions,
        };
        counter.fetch_add(count, Ordering::Relaxed);
    }

    pub fn set_intake_size(&self, size: usize) {
        self.intake_size.store(size, Ordering::Relaxed);
    }

    pub fn set_pool_snapshot(&self, snapshot: Vec<(&'static str, Vec<WriterStat>)>) {
        if let Ok(mut pools) = self.pools.lock() {
            *pools = snapshot;
        }
    }

    fn log_counters(&self) {
        info!(
            collectors = self.collectors.load(Ordering::Relaxed),
            routers = self.routers.load(Ordering::Relaxed),
            peers = self.peers.load(Ordering::Relaxed),
            base_attrs = self.base_attrs.load(Ordering::Relaxed),
            base_attrs_suppressed = self.base_attrs_suppressed.load(Ordering::Relaxed),
            unicast_prefixes = self.unicast_prefixes.load(Ordering::Relaxed),
            l3vpn_prefixes = self.l3vpn_prefixes.load(Ordering::Relaxed),
            ls_nodes = self.ls_nodes.load(Ordering::Relaxed),
            ls_links = self.ls_links.load(Ordering::Relaxed),
            ls_prefixes = self.ls_prefixes.load(Ordering::Relaxed),
            bmp_stats = self.bmp_stats.load(Ordering::Relaxed),
            subscriptions = self.subscriptions.load(Ordering::Relaxed),
            decode_dropped = self.decode_dropped.load(Ordering::Relaxed),
            notifications = self.notifications.load(Ordering::Relaxed),
            intake = self.intake_size.load(Ordering::Relaxed),
            "ingest stats"
        );

        if let Ok(pools) = self.pools.lock() {
            for (pool, writers) in pools.iter() {
                for (idx, w) in writers.iter().enumerate() {
                    info!(
                        pool,
                        writer = idx,
                        assigned = w.assigned,
                        queued = w.queued,
                        pending = w.pending,
                        above_count = w.above_count,
                        messages = w.message_count,
                        "writer stats"
                    );
                }
            }
        }
    }
}

pub async fn run_stats_loop(
    stats: Arc<Stats>,
    stats_interval_secs: u64,
    heartbeat_max_age_minutes: u64,
    cancel: CancellationToken,
) {
    let mut tick = interval(Duration::from_secs(stats_interval_secs.max(1)));
    tick.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tick.tick() => {
                stats.log_counters();

                let last = stats.last_collector_millis.load(Ordering::Relaxed);
                if last > 0 {
                    let age_minutes = (chrono::Utc::now().timestamp_millis() - last) / 60_000;
                    if age_minutes >= heartbeat_max_age_minutes as i64 {
                        warn!(age_minutes, "no collector message within heartbeat window");
                    }
                }
            }
        }
    }
}
