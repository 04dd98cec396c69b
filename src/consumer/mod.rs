//! Consumer engine: the single task that owns the bus consumer.
//!
//! Two behaviors carry the whole design:
//!
//! * **Staged subscription**: topic patterns activate one at a time in the
//!   config-declared order, so inventory topics (collector/router/peer) drain
//!   before NLRI topics start referencing them.
//! * **Pause for processing**: every fetched batch is handled with the
//!   assignment paused. Group membership stays alive through the client's
//!   background heartbeats plus the zero-duration polls interleaved into the
//!   synchronous inventory writes.
//!
//! The engine is also the sole writer of the intake queue and the in-memory
//! caches, which is why none of them need locks.

use crate::appconfig::AppConfig;
use crate::cache::{AttrDedupCache, RouterCache};
use crate::codec;
use crate::db::DbHandle;
use crate::error::AppResult;
use crate::notify::{matched_resources, NotificationProducer};
use crate::records::{
    BaseAttrRec, CollectorRec, PeerRec, RecordSet, RouterRec, SubscriptionRec,
};
use crate::sql::{builders, QueryTriple};
use crate::stats::Stats;
use crate::subs::{now_millis, SubscriptionTable};
use crate::writer::{
    BatchSettings, DispatchOutcome, IntakeItem, PoolSettings, WriterPool, WriterType,
};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{Message, OwnedMessage};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const POLL_WAIT: Duration = Duration::from_millis(10);
const WRITER_CHECK_EVERY: Duration = Duration::from_secs(10);
const HOUSEKEEPING_EVERY: Duration = Duration::from_secs(10);
const INTAKE_FULL_BACKOFF: Duration = Duration::from_millis(1);

/// Consumer-map keys consumed by the engine itself rather than the client
/// library.
const ENGINE_ONLY_CONSUMER_KEYS: &[&str] = &["max.poll.records"];

pub struct ConsumerEngine {
    cfg: Arc<AppConfig>,
    consumer: StreamConsumer,
    db: DbHandle,
    pools: HashMap<WriterType, WriterPool>,
    intake: VecDeque<IntakeItem>,
    /// Messages surfaced by a heartbeat poll; fed back into the next batch.
    stashed: Vec<OwnedMessage>,
    router_cache: RouterCache,
    attr_cache: AttrDedupCache,
    subs: Arc<SubscriptionTable>,
    notifier: NotificationProducer,
    stats: Arc<Stats>,
    cancel: CancellationToken,
    subscribed: usize,
    next_subscribe_at: Instant,
    last_writer_check: Instant,
    last_housekeeping: Instant,
    max_poll: usize,
}

impl ConsumerEngine {
    pub async fn new(
        cfg: Arc<AppConfig>,
        subs: Arc<SubscriptionTable>,
        stats: Arc<Stats>,
        cancel: CancellationToken,
    ) -> AppResult<Self> {
        let mut client_config = ClientConfig::new();
        for (key, value) in &cfg.kafka.consumer_config {
            if ENGINE_ONLY_CONSUMER_KEYS.contains(&key.as_str()) {
                continue;
            }
            client_config.set(key.as_str(), value.as_str());
        }
        let consumer: StreamConsumer = client_config.create()?;

        let db = DbHandle::connect(&cfg.postgres).await?;
        let notifier = NotificationProducer::new(&cfg.kafka)?;

        let pool_settings = PoolSettings {
            queue_size: cfg.base.writer_queue_size,
            max_writers: cfg.base.writer_max_threads_per_type,
            allowed_over_queue_times: cfg.base.writer_allowed_over_queue_times,
            scale_back: Duration::from_secs(cfg.base.writer_seconds_thread_scale_back),
            rebalance_every: Duration::from_secs(cfg.base.writer_rebalance_seconds),
            drain_deadline: Duration::from_secs(cfg.base.writer_drain_deadline_seconds),
        };
        let batch_settings = BatchSettings {
            batch_records: cfg.postgres.batch_records,
            batch_time: Duration::from_millis(cfg.postgres.batch_time_millis),
            retries: cfg.postgres.retries,
        };

        let mut pools = HashMap::new();
        for wtype in WriterType::ALL {
            let pool =
                WriterPool::new(*wtype, pool_settings, batch_settings, cfg.postgres.clone())
                    .await?;
            pools.insert(*wtype, pool);
        }

        let max_poll = cfg.max_poll_records();
        let attr_ttl = cfg.base.attr_dedup_ttl_millis;
        let now = Instant::now();
        Ok(Self {
            cfg,
            consumer,
            db,
            pools,
            intake: VecDeque::new(),
            stashed: Vec::new(),
            router_cache: RouterCache::new(),
            attr_cache: AttrDedupCache::new(attr_ttl),
            subs,
            stats,
            notifier,
            cancel,
            subscribed: 0,
            next_subscribe_at: now,
            last_writer_check: now,
            last_housekeeping: now,
            max_poll,
        })
    }

    pub async fn run(mut self) -> AppResult<()> {
        self.subscribe_next()?;

        let result = self.poll_loop().await;
        if let Err(e) = &result {
            error!(error = %e, "consumer loop stopped");
        }

        self.drain_on_shutdown().await;
        for (_, pool) in self.pools.drain() {
            pool.shutdown().await;
        }
        self.notifier.close();
        self.db.disconnect().await;

        result
    }

    async fn poll_loop(&mut self) -> AppResult<()> {
        while !self.cancel.is_cancelled() {
            if self.subscribed < self.cfg.kafka.subscribe_topic_patterns.len()
                && Instant::now() >= self.next_subscribe_at
            {
                self.subscribe_next()?;
            }

            let batch = self.poll_batch().await?;
            if batch.is_empty() {
                self.write_pending();
                continue;
            }

            // Stop fetching while the batch is processed; membership is kept
            // alive without pulling more records in.
            let assignment = self.consumer.assignment()?;
            self.consumer.pause(&assignment)?;

            for msg in &batch {
                if let Err(e) = self.dispatch(msg).await {
                    warn!(topic = msg.topic(), error = %e, "record dispatch failed");
                }
            }

            self.periodic_checks().await?;
            self.write_pending();
            self.consumer.resume(&assignment)?;
        }
        Ok(())
    }

    /// One fetch pass: block up to 10 ms for the first record, then top up
    /// with zero-duration polls until `max.poll.records` or the queue runs
    /// dry.
    async fn poll_batch(&mut self) -> AppResult<Vec<OwnedMessage>> {
        let mut batch: Vec<OwnedMessage> = std::mem::take(&mut self.stashed);

        if batch.is_empty() {
            match timeout(POLL_WAIT, self.consumer.recv()).await {
                Err(_) => return Ok(batch),
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(msg)) => batch.push(msg.detach()),
            }
        }

        while batch.len() < self.max_poll {
            match timeout(Duration::ZERO, self.consumer.recv()).await {
                Err(_) => break,
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(msg)) => batch.push(msg.detach()),
            }
        }

        Ok(batch)
    }

    /// Zero-duration poll while paused: services the client without fetching.
    /// A racing pre-pause record is stashed for the next batch instead of
    /// being dropped.
    async fn heartbeat_poll(&mut self) {
        if let Ok(Ok(msg)) = timeout(Duration::ZERO, self.consumer.recv()).await {
            self.stashed.push(msg.detach());
        }
    }

    fn subscribe_next(&mut self) -> AppResult<()> {
        let patterns = &self.cfg.kafka.subscribe_topic_patterns;
        self.subscribed += 1;
        let active: Vec<&str> = patterns[..self.subscribed]
            .iter()
            .map(String::as_str)
            .collect();
        self.consumer.subscribe(&active)?;

        // Record the position reached under the previous subscription set.
        if let Err(e) = self.consumer.commit_consumer_state(CommitMode::Sync) {
            debug!(error = %e, "offset commit skipped");
        }

        info!(
            step = self.subscribed,
            of = patterns.len(),
            pattern = %patterns[self.subscribed - 1],
            "topic pattern subscribed"
        );

        if self.subscribed == patterns.len() {
            info!("all topic patterns active");
        } else {
            self.next_subscribe_at = Instant::now()
                + Duration::from_millis(self.cfg.kafka.topic_subscribe_delay_millis);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    async fn dispatch(&mut self, msg: &OwnedMessage) -> AppResult<()> {
        let topic = msg.topic();
        let key = msg
            .key()
            .map(|k| String::from_utf8_lossy(k).to_string())
            .unwrap_or_default();
        let Some(payload) = msg.payload() else {
            debug!(topic, "empty payload dropped");
            return Ok(());
        };

        let set = match codec::decode(topic, payload) {
            Ok(set) => set,
            Err(e) => {
                debug!(topic, error = %e, "undecodable record dropped");
                self.stats.decode_dropped.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
        };
        self.stats.record_set(set.kind(), set.len() as u64);
        debug!(topic, kind = set.kind().as_str(), records = set.len(), "message decoded");

        match set {
            RecordSet::Collectors(recs) => self.handle_collectors(&recs).await?,
            RecordSet::Routers(recs) => self.handle_routers(&recs).await?,
            RecordSet::Peers(recs) => self.handle_peers(&recs).await?,
            RecordSet::BaseAttrs(recs) => self.handle_base_attrs(key, recs).await,
            RecordSet::UnicastPrefixes(recs) => {
                self.enqueue(key, builders::unicast_rib(&recs)).await;

                let now = now_millis();
                for rec in &recs {
                    for resource in matched_resources(rec, &self.subs, now) {
                        self.notifier.publish(&resource);
                        self.stats.notifications.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            RecordSet::L3VpnPrefixes(recs) => self.enqueue(key, builders::l3vpn_rib(&recs)).await,
            RecordSet::LsNodes(recs) => self.enqueue(key, builders::ls_nodes(&recs)).await,
            RecordSet::LsLinks(recs) => self.enqueue(key, builders::ls_links(&recs)).await,
            RecordSet::LsPrefixes(recs) => self.enqueue(key, builders::ls_prefixes(&recs)).await,
            RecordSet::BmpStats(recs) => self.enqueue(key, builders::bmp_stats(&recs)).await,
            RecordSet::Subscriptions(recs) => self.handle_subscriptions(&recs),
        }

        Ok(())
    }

    /// Collectors write synchronously; a stopped collector cascades to its
    /// routers.
    async fn handle_collectors(&mut self, recs: &[CollectorRec]) -> AppResult<()> {
        let retries = self.cfg.postgres.retries;
        let triple = builders::collectors(recs);
        self.db.update(&triple.assemble(), retries).await?;
        self.heartbeat_poll().await;

        for c in recs {
            if let Some(sql) = builders::collector_router_state(c) {
                self.db.update(&sql, retries).await?;
                self.heartbeat_poll().await;
            }
        }

        self.stats
            .last_collector_millis
            .store(now_millis(), Ordering::Relaxed);
        Ok(())
    }

    /// Routers write synchronously, cascade to their peers, then the router
    /// cache is rebuilt from committed state.
    async fn handle_routers(&mut self, recs: &[RouterRec]) -> AppResult<()> {
        let retries = self.cfg.postgres.retries;
        let triple = builders::routers(recs);
        self.db.update(&triple.assemble(), retries).await?;
        self.heartbeat_poll().await;

        for r in recs {
            if let Some(sql) = builders::router_peer_state(r, &self.router_cache) {
                let name = self
                    .router_cache
                    .get(&r.hash)
                    .map(|e| e.name.clone())
                    .unwrap_or_else(|| r.name.clone());
                debug!(router = %name, "router down, marking peers down");
                self.db.update(&sql, retries).await?;
                self.heartbeat_poll().await;
            }
        }

        self.router_cache.refresh(&self.db).await?;
        Ok(())
    }

    /// Peers write synchronously; a down peer withdraws its RIB entries
    /// before any further NLRI for it is accepted.
    async fn handle_peers(&mut self, recs: &[PeerRec]) -> AppResult<()> {
        let retries = self.cfg.postgres.retries;
        let triple = builders::peers(recs);
        self.db.update(&triple.assemble(), retries).await?;
        self.heartbeat_poll().await;

        for p in recs {
            for sql in builders::peer_rib_withdraw(p) {
                self.db.update(&sql, retries).await?;
                self.heartbeat_poll().await;
            }
        }
        Ok(())
    }

    async fn handle_base_attrs(&mut self, key: String, recs: Vec<BaseAttrRec>) {
        let total = recs.len();
        let fresh = self.attr_cache.filter_fresh(recs, now_millis());
        let suppressed = (total - fresh.len()) as u64;
        if suppressed > 0 {
            self.stats
                .base_attrs_suppressed
                .fetch_add(suppressed, Ordering::Relaxed);
        }
        if !fresh.is_empty() {
            self.enqueue(key, builders::base_attrs(&fresh)).await;
        }
    }

    fn handle_subscriptions(&mut self, recs: &[SubscriptionRec]) {
        let now = now_millis();
        for rec in recs {
            match rec.action.as_str() {
                "subscribe" => self.subs.subscribe(&rec.resource, now),
                "unsubscribe" => self.subs.unsubscribe(&rec.resource),
                other => debug!(action = other, "unknown subscription action"),
            }
        }
    }

    // ------------------------------------------------------------------
    // Intake and writer handoff
    // ------------------------------------------------------------------

    /// Push onto the bounded intake; when full, keep the client serviced and
    /// push completed work to writers until a slot opens.
    async fn enqueue(&mut self, key: String, triple: QueryTriple) {
        if triple.is_empty() {
            return;
        }
        let capacity = self.cfg.base.consumer_queue_size;
        while self.intake.len() >= capacity && !self.cancel.is_cancelled() {
            self.heartbeat_poll().await;
            self.write_pending();
            tokio::time::sleep(INTAKE_FULL_BACKOFF).await;
        }
        self.intake.push_back(IntakeItem {
            key,
            triple,
            wtype: WriterType::Default,
        });
        self.stats.set_intake_size(self.intake.len());
    }

    /// Route queued items to their writers. An item whose writer is full goes
    /// back to the intake tail and that writer sits out the rest of the pass.
    fn write_pending(&mut self) {
        let mut busy: HashMap<WriterType, HashSet<usize>> = HashMap::new();

        let passes = self.intake.len();
        for _ in 0..passes {
            let Some(item) = self.intake.pop_front() else {
                break;
            };
            let wtype = item.wtype;
            let Some(pool) = self.pools.get_mut(&wtype) else {
                warn!(pool = wtype.as_str(), "no pool for writer type, item dropped");
                continue;
            };
            let busy_set = busy.entry(wtype).or_default();
            match pool.dispatch(item, busy_set) {
                DispatchOutcome::Sent => {}
                DispatchOutcome::Busy(item, idx) => {
                    busy_set.insert(idx);
                    self.intake.push_back(item);
                }
            }
        }
        self.stats.set_intake_size(self.intake.len());
    }

    async fn periodic_checks(&mut self) -> AppResult<()> {
        if self.last_writer_check.elapsed() >= WRITER_CHECK_EVERY {
            self.last_writer_check = Instant::now();
            self.heartbeat_poll().await;
            for pool in self.pools.values_mut() {
                pool.periodic_check().await?;
            }

            let snapshot = self
                .pools
                .iter()
                .map(|(wtype, pool)| (wtype.as_str(), pool.snapshot()))
                .collect();
            self.stats.set_pool_snapshot(snapshot);
        }

        if self.last_housekeeping.elapsed() >= HOUSEKEEPING_EVERY {
            self.last_housekeeping = Instant::now();
            let purged = self.attr_cache.purge(now_millis());
            if purged > 0 {
                debug!(purged, resident = self.attr_cache.len(), "attribute fingerprints expired");
            }
        }

        Ok(())
    }

    /// Shutdown drain: feed intake into the writers until empty or the
    /// backlog stops moving (500 checks at 100 ms).
    async fn drain_on_shutdown(&mut self) {
        info!(intake = self.intake.len(), "draining intake before shutdown");

        let mut last_len = self.intake.len();
        let mut stalled: u32 = 0;
        while !self.intake.is_empty() {
            self.write_pending();

            let len = self.intake.len();
            if len == last_len {
                stalled += 1;
                if stalled >= 500 {
                    warn!(remaining = len, "intake drain stalled, dropping remainder");
                    break;
                }
            } else {
                stalled = 0;
                last_len = len;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
