//! Writer pool: sticky per-key routing over a dynamically sized writer list.
//!
//! Writer 0 is permanent; scale-down always removes from the tail. Any key is
//! held by at most one writer at a time, which is what preserves per-key
//! write order end to end. Reassignment (reset, rebalance, scale-down) only
//! happens after the affected writers have fully drained and written their
//! queues.

use crate::appconfig::PostgresConfig;
use crate::db::DbHandle;
use crate::error::{AppError, AppResult};
use crate::writer::types::{IntakeItem, WriterType};
use crate::writer::writer::{BatchSettings, WriterHandle};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

const JOIN_BUDGET: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub queue_size: usize,
    pub max_writers: usize,
    pub allowed_over_queue_times: u32,
    pub scale_back: Duration,
    pub rebalance_every: Duration,
    pub drain_deadline: Duration,
}

struct WriterSlot {
    handle: WriterHandle,
    message_count: u64,
    above_count: u32,
    assigned: HashSet<String>,
}

/// Stats snapshot for the supervisor log line.
#[derive(Debug, Clone)]
pub struct WriterStat {
    pub assigned: usize,
    pub queued: usize,
    pub pending: usize,
    pub above_count: u32,
    pub message_count: u64,
}

pub enum DispatchOutcome {
    Sent,
    /// The target writer's queue is full (or was already marked busy this
    /// pass); the item comes back with the writer index to defer.
    Busy(IntakeItem, usize),
}

pub struct WriterPool {
    wtype: WriterType,
    settings: PoolSettings,
    batch: BatchSettings,
    pg: PostgresConfig,
    writers: Vec<WriterSlot>,
    keys: HashMap<String, usize>,
    last_change: Instant,
    last_rebalance: Instant,
}

impl WriterPool {
    pub async fn new(
        wtype: WriterType,
        settings: PoolSettings,
        batch: BatchSettings,
        pg: PostgresConfig,
    ) -> AppResult<Self> {
        let mut pool = Self {
            wtype,
            settings,
            batch,
            pg,
            writers: Vec::new(),
            keys: HashMap::new(),
            last_change: Instant::now(),
            last_rebalance: Instant::now(),
        };
        pool.add_writer().await?;
        Ok(pool)
    }

    /// Sticky route: an already-assigned key goes to its holder, a new key to
    /// the preferred writer per `pick_writer`.
    fn route(&mut self, key: &str) -> usize {
        if let Some(&idx) = self.keys.get(key) {
            self.writers[idx].message_count += 1;
            return idx;
        }

        let gauges: Vec<WriterGauge> = self
            .writers
            .iter()
            .map(|w| WriterGauge {
                assigned: w.assigned.len(),
                queued: w.handle.queued(),
                message_count: w.message_count,
            })
            .collect();
        let idx = pick_writer(&gauges, self.settings.queue_size / 2);

        self.keys.insert(key.to_string(), idx);
        self.writers[idx].assigned.insert(key.to_string());
        self.writers[idx].message_count += 1;
        idx
    }

    pub fn dispatch(&mut self, item: IntakeItem, busy: &HashSet<usize>) -> DispatchOutcome {
        let idx = self.route(&item.key);
        if busy.contains(&idx) {
            return DispatchOutcome::Busy(item, idx);
        }
        match self.writers[idx].handle.try_send(item.triple) {
            Ok(()) => DispatchOutcome::Sent,
            Err(triple) => DispatchOutcome::Busy(
                IntakeItem {
                    key: item.key,
                    triple,
                    wtype: item.wtype,
                },
                idx,
            ),
        }
    }

    /// 10 s sampling pass: refresh the over-watermark counters, then apply at
    /// most one structural change (scale-up beats rebalance beats
    /// scale-down).
    pub async fn periodic_check(&mut self) -> AppResult<()> {
        let high = self.settings.queue_size * 3 / 4;
        let low = self.settings.queue_size / 5;

        for w in &mut self.writers {
            if w.handle.queued() >= high {
                w.above_count += 1;
            } else {
                w.above_count = 0;
            }
        }

        let allowed = self.settings.allowed_over_queue_times;
        let over_limit = move |w: &WriterSlot| w.above_count > allowed;

        if self.writers.iter().any(over_limit) && self.writers.len() < self.settings.max_writers {
            info!(
                pool = self.wtype.as_str(),
                writers = self.writers.len() + 1,
                "queue pressure, scaling up"
            );
            self.reset().await?;
            self.add_writer().await?;
            self.last_change = Instant::now();
            return Ok(());
        }

        if self.last_rebalance.elapsed() >= self.settings.rebalance_every {
            self.last_rebalance = Instant::now();
            for idx in 0..self.writers.len() {
                if over_limit(&self.writers[idx]) && self.writers[idx].assigned.len() > 1 {
                    info!(
                        pool = self.wtype.as_str(),
                        writer = idx,
                        keys = self.writers[idx].assigned.len(),
                        "rebalancing overloaded writer"
                    );
                    self.drain_writer(idx).await?;
                    self.release_keys(idx);
                    self.writers[idx].above_count = 0;
                }
            }
            return Ok(());
        }

        if self.writers.len() > 1
            && self.writers.iter().all(|w| w.handle.queued() <= low)
            && self.last_change.elapsed() > self.settings.scale_back
        {
            info!(
                pool = self.wtype.as_str(),
                writers = self.writers.len() - 1,
                "sustained idle, scaling down"
            );
            self.drain_all().await?;
            self.release_keys(self.writers.len() - 1);
            if let Some(slot) = self.writers.pop() {
                slot.handle.shutdown(JOIN_BUDGET).await;
            }
            self.last_change = Instant::now();
        }

        Ok(())
    }

    /// Full drain, then forget all assignments and counters.
    async fn reset(&mut self) -> AppResult<()> {
        self.drain_all().await?;
        for w in &mut self.writers {
            w.assigned.clear();
            w.above_count = 0;
            w.message_count = 0;
        }
        self.keys.clear();
        Ok(())
    }

    fn release_keys(&mut self, idx: usize) {
        let Some(slot) = self.writers.get_mut(idx) else {
            return;
        };
        for key in slot.assigned.drain() {
            self.keys.remove(&key);
        }
    }

    async fn add_writer(&mut self) -> AppResult<()> {
        let db = DbHandle::connect(&self.pg).await?;
        let handle = WriterHandle::spawn(db, self.batch, self.settings.queue_size);
        self.writers.push(WriterSlot {
            handle,
            message_count: 0,
            above_count: 0,
            assigned: HashSet::new(),
        });
        Ok(())
    }

    async fn drain_writer(&self, idx: usize) -> AppResult<()> {
        let deadline = Instant::now() + self.settings.drain_deadline;
        while self.writers[idx].handle.pending() > 0 {
            if Instant::now() >= deadline {
                return Err(AppError::DrainDeadline(format!(
                    "writer {idx} of pool '{}'",
                    self.wtype.as_str()
                )));
            }
            tokio::time::sleep(DRAIN_POLL).await;
        }
        Ok(())
    }

    async fn drain_all(&self) -> AppResult<()> {
        for idx in 0..self.writers.len() {
            self.drain_writer(idx).await?;
        }
        Ok(())
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.drain_all().await {
            warn!(pool = self.wtype.as_str(), error = %e, "drain incomplete at shutdown");
        }
        for slot in self.writers.drain(..) {
            slot.handle.shutdown(JOIN_BUDGET).await;
        }
    }

    pub fn snapshot(&self) -> Vec<WriterStat> {
        self.writers
            .iter()
            .map(|w| WriterStat {
                assigned: w.assigned.len(),
                queued: w.handle.queued(),
                pending: w.handle.pending(),
                above_count: w.above_count,
                message_count: w.message_count,
            })
            .collect()
    }
}

pub(crate) struct WriterGauge {
    pub assigned: usize,
    pub queued: usize,
    pub message_count: u64,
}

/// Target choice for a new key: an empty writer beats any non-empty one, a
/// writer below half the high-water mark beats one above, then the smaller
/// message count wins. Ties keep the lower index.
pub(crate) fn pick_writer(gauges: &[WriterGauge], half_queue: usize) -> usize {
    let rank = |g: &WriterGauge| (g.assigned > 0, g.queued >= half_queue, g.message_count);

    let mut best = 0;
    for idx in 1..gauges.len() {
        if rank(&gauges[idx]) < rank(&gauges[best]) {
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gauge(assigned: usize, queued: usize, message_count: u64) -> WriterGauge {
        WriterGauge {
            assigned,
            queued,
            message_count,
        }
    }

    #[test]
    fn empty_writer_beats_loaded_ones() {
        let gauges = [gauge(5, 900, 10_000), gauge(0, 0, 0), gauge(2, 10, 50)];
        assert_eq!(pick_writer(&gauges, 500), 1);
    }

    #[test]
    fn below_half_watermark_beats_above() {
        let gauges = [gauge(1, 800, 5), gauge(1, 100, 9_000)];
        assert_eq!(pick_writer(&gauges, 500), 1);
    }

    #[test]
    fn smaller_message_count_breaks_the_tie() {
        let gauges = [gauge(1, 100, 500), gauge(1, 100, 200), gauge(1, 100, 300)];
        assert_eq!(pick_writer(&gauges, 500), 1);
    }

    #[test]
    fn full_tie_keeps_lowest_index() {
        let gauges = [gauge(1, 100, 200), gauge(1, 100, 200)];
        assert_eq!(pick_writer(&gauges, 500), 0);
    }
}
