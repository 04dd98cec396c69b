//! Writer: owns one DB handle and a bounded inbound queue, drains it in
//! time/size-bounded batches, merges statements that share a shape and ships
//! them.
//!
//! Lifecycle is running -> draining -> stopped: closing the channel flips the
//! writer into drain (it flushes what is buffered, then exits). A writer has
//! no knowledge of routing.

use crate::db::DbHandle;
use crate::sql::QueryTriple;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub batch_records: usize,
    pub batch_time: Duration,
    pub retries: u32,
}

#[derive(Debug)]
pub struct WriterHandle {
    tx: mpsc::Sender<QueryTriple>,
    /// Items accepted but not yet written to the DB. A drain waits on this,
    /// not on the queue, so moved keys are fully persisted before
    /// reassignment.
    pending: Arc<AtomicUsize>,
    join: JoinHandle<()>,
    queue_size: usize,
}

impl WriterHandle {
    pub fn spawn(db: DbHandle, settings: BatchSettings, queue_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_size);
        let pending = Arc::new(AtomicUsize::new(0));
        let join = tokio::spawn(run(rx, db, settings, Arc::clone(&pending)));
        Self {
            tx,
            pending,
            join,
            queue_size,
        }
    }

    pub fn queued(&self) -> usize {
        self.queue_size - self.tx.capacity()
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Non-blocking enqueue; a full (or closed) queue hands the item back.
    /// The gauge goes up before the send so the writer can never decrement
    /// past it.
    pub fn try_send(&self, triple: QueryTriple) -> Result<(), QueryTriple> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        match self.tx.try_send(triple) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(t)) | Err(mpsc::error::TrySendError::Closed(t)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                Err(t)
            }
        }
    }

    /// Close the inbound queue and wait for the drain, bounded by
    /// `join_budget`.
    pub async fn shutdown(self, join_budget: Duration) {
        drop(self.tx);
        if timeout(join_budget, self.join).await.is_err() {
            warn!("writer did not stop within join budget");
        }
    }
}

async fn run(
    mut rx: mpsc::Receiver<QueryTriple>,
    db: DbHandle,
    settings: BatchSettings,
    pending: Arc<AtomicUsize>,
) {
    loop {
        let Some(first) = rx.recv().await else { break };

        let deadline = Instant::now() + settings.batch_time;
        let mut items = vec![first];
        let mut draining = false;

        while items.len() < settings.batch_records {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(triple)) => items.push(triple),
                Ok(None) => {
                    draining = true;
                    break;
                }
                Err(_) => break, // batch window elapsed
            }
        }

        let count = items.len();
        for group in merge_batch(items) {
            let sql = group.assemble();
            if let Err(e) = db.update(&sql, settings.retries).await {
                // At-least-once redelivery plus upsert idempotence covers the
                // dropped rows.
                warn!(error = %e, rows = group.values.len(), "batch dropped");
            }
        }
        pending.fetch_sub(count, Ordering::SeqCst);

        if draining {
            break;
        }
    }

    db.disconnect().await;
    debug!("writer stopped");
}

/// Merge items sharing `(prefix, suffix)` into one statement each; key
/// conflicts within a group keep the later tuple. Group order follows first
/// appearance.
pub(crate) fn merge_batch(items: Vec<QueryTriple>) -> Vec<QueryTriple> {
    let mut groups: Vec<QueryTriple> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|g| g.same_statement(&item)) {
            Some(group) => group.merge_from(item),
            None => groups.push(item),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(prefix: &str, key: &str, tuple: &str) -> QueryTriple {
        let mut t = QueryTriple::new(prefix, " ON CONFLICT DO NOTHING");
        t.values.insert(key.to_string(), tuple.to_string());
        t
    }

    #[test]
    fn merge_unions_same_statement() {
        let groups = merge_batch(vec![
            triple("INSERT INTO a VALUES", "k1", "('1')"),
            triple("INSERT INTO b VALUES", "k1", "('b1')"),
            triple("INSERT INTO a VALUES", "k2", "('2')"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].values.len(), 2);
        assert_eq!(groups[1].values.len(), 1);
    }

    #[test]
    fn merge_conflates_duplicate_keys_last_write_wins() {
        let groups = merge_batch(vec![
            triple("INSERT INTO a VALUES", "k1", "('old')"),
            triple("INSERT INTO a VALUES", "k1", "('new')"),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].values.len(), 1);
        assert_eq!(groups[0].values["k1"], "('new')");
    }

    #[test]
    fn batch_keys_stay_unique() {
        let groups = merge_batch(vec![
            triple("INSERT INTO a VALUES", "k1", "('1')"),
            triple("INSERT INTO a VALUES", "k2", "('2')"),
            triple("INSERT INTO a VALUES", "k1", "('3')"),
        ]);
        let keys: Vec<_> = groups[0].values.keys().collect();
        assert_eq!(keys.len(), 2);
    }
}
