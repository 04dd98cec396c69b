//! Short-TTL fingerprint set for base attributes.
//!
//! The same attribute set recurs across many prefix updates; suppressing
//! repeats here removes the vast majority of redundant upserts. Time is an
//! explicit parameter so the engine passes one clock reading per tick and
//! tests inject their own.

use crate::records::BaseAttrRec;
use std::collections::HashMap;

#[derive(Debug)]
pub struct AttrDedupCache {
    seen: HashMap<String, i64>,
    ttl_millis: i64,
}

impl AttrDedupCache {
    pub fn new(ttl_millis: i64) -> Self {
        Self {
            seen: HashMap::new(),
            ttl_millis,
        }
    }

    /// Keep only records whose hash has not been seen inside the TTL.
    /// Duplicates still touch the timestamp, keeping hot hashes resident.
    pub fn filter_fresh(&mut self, recs: Vec<BaseAttrRec>, now_millis: i64) -> Vec<BaseAttrRec> {
        let mut fresh = Vec::new();
        for rec in recs {
            match self.seen.insert(rec.hash.clone(), now_millis) {
                Some(_) => {}
                None => fresh.push(rec),
            }
        }
        fresh
    }

    /// Drop fingerprints older than the TTL. Called from the housekeeping
    /// tick.
    pub fn purge(&mut self, now_millis: i64) -> usize {
        let before = self.seen.len();
        let ttl = self.ttl_millis;
        self.seen.retain(|_, last_seen| now_millis - *last_seen < ttl);
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn attr(hash: &str) -> BaseAttrRec {
        BaseAttrRec {
            hash: hash.into(),
            peer_hash: "P1".into(),
            origin: "igp".into(),
            as_path: "64512 64500".into(),
            as_path_count: Some(2),
            origin_as: Some(64500),
            next_hop: "192.0.2.1".into(),
            med: None,
            local_pref: Some(100),
            aggregator: String::new(),
            community_list: String::new(),
            ext_community_list: String::new(),
            cluster_list: String::new(),
            is_atomic_agg: false,
            is_nexthop_ipv4: true,
            originator_id: String::new(),
            timestamp: NaiveDateTime::parse_from_str("2021-03-01 08:30:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
        }
    }

    #[test]
    fn repeat_hash_is_suppressed() {
        let mut cache = AttrDedupCache::new(1_200_000);
        let fresh = cache.filter_fresh(vec![attr("A1"), attr("A1"), attr("A2")], 1000);
        assert_eq!(fresh.len(), 2);

        // 99 repeats later, still only the first insert survives
        for _ in 0..99 {
            assert!(cache.filter_fresh(vec![attr("A1")], 2000).is_empty());
        }
    }

    #[test]
    fn purge_respects_ttl_and_touch() {
        let mut cache = AttrDedupCache::new(1_200_000);
        cache.filter_fresh(vec![attr("A1")], 0);
        cache.filter_fresh(vec![attr("A2")], 600_000);
        // A1 re-seen late: timestamp touched even though record is dropped
        cache.filter_fresh(vec![attr("A1")], 1_100_000);

        let removed = cache.purge(1_300_000);
        assert_eq!(removed, 0);

        let removed = cache.purge(1_900_000);
        assert_eq!(removed, 1); // A2 expired, A1 was touched
        assert_eq!(cache.len(), 1);
    }
}
