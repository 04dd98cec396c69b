//! In-memory mirror of the `routers` table.
//!
//! Owned by the consumer engine task; cleared and rebuilt from a full SELECT
//! after every router upsert so cascade decisions see committed DB state, not
//! an incrementally drifting copy.

use crate::db::DbHandle;
use crate::error::AppResult;
use sqlx::Row;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RouterEntry {
    pub name: String,
    pub up_count: u32,
}

#[derive(Debug, Default)]
pub struct RouterCache {
    entries: HashMap<String, RouterEntry>,
}

impl RouterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh(&mut self, db: &DbHandle) -> AppResult<()> {
        let rows = db.select("SELECT name, hash_id, state FROM routers").await?;

        self.entries.clear();
        for row in rows {
            let name: String = row.try_get("name")?;
            let hash: String = row.try_get("hash_id")?;
            let state: String = row.try_get("state")?;

            let entry = self
                .entries
                .entry(hash)
                .or_insert_with(|| RouterEntry { name, up_count: 0 });
            if state == "up" {
                entry.up_count += 1;
            }
        }

        debug!(routers = self.entries.len(), "router cache rebuilt");
        Ok(())
    }

    pub fn up_count(&self, hash: &str) -> u32 {
        self.entries.get(hash).map(|e| e.up_count).unwrap_or(0)
    }

    pub fn get(&self, hash: &str) -> Option<&RouterEntry> {
        self.entries.get(hash)
    }

    #[cfg(test)]
    pub fn insert_for_test(&mut self, hash: &str, name: &str, up_count: u32) {
        self.entries.insert(
            hash.to_string(),
            RouterEntry {
                name: name.to_string(),
                up_count,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_router_has_zero_up_count() {
        let cache = RouterCache::new();
        assert_eq!(cache.up_count("R9"), 0);
    }

    #[test]
    fn lookup_returns_entry() {
        let mut cache = RouterCache::new();
        cache.insert_for_test("R1", "edge-1", 1);
        assert_eq!(cache.up_count("R1"), 1);
        assert_eq!(cache.get("R1").unwrap().name, "edge-1");
    }
}
