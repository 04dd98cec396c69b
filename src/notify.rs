//! Notification fan-out: match prefix updates against the subscription table
//! and emit `update\t<resource>` records downstream.
//!
//! Emission is fire-and-forget. A broker hiccup here must never stall
//! ingestion, so delivery results are awaited on a detached task and failures
//! only logged.

use crate::appconfig::KafkaConfig;
use crate::error::AppResult;
use crate::records::UnicastPrefixRec;
use crate::subs::SubscriptionTable;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;

pub const NOTIFICATION_TOPIC: &str = "bgpdata.parsed.notification";

/// Resources a prefix update matches: the origin ASN plus every parseable
/// ASN token on the AS path, deduplicated, filtered to active subscriptions.
/// Junk tokens (AS_SET braces and the like) are skipped.
pub fn matched_resources(
    rec: &UnicastPrefixRec,
    subs: &SubscriptionTable,
    now_millis: i64,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    let mut check = |asn: u32| {
        let resource = format!("AS{asn}");
        if subs.is_active(&resource, now_millis) && seen.insert(resource.clone()) {
            out.push(resource);
        }
    };

    if let Some(asn) = rec.origin_as {
        check(asn);
    }
    for token in rec.as_path.split_whitespace() {
        if let Ok(asn) = token.parse::<u32>() {
            check(asn);
        }
    }

    out
}

pub struct NotificationProducer {
    producer: FutureProducer,
}

impl NotificationProducer {
    pub fn new(cfg: &KafkaConfig) -> AppResult<Self> {
        let mut client_config = ClientConfig::new();
        for (key, value) in &cfg.producer_config {
            client_config.set(key.as_str(), value.as_str());
        }
        let producer: FutureProducer = client_config.create()?;
        Ok(Self { producer })
    }

    /// Enqueue one notification. Errors are logged and swallowed.
    pub fn publish(&self, resource: &str) {
        let value = format!("update\t{resource}");
        let record = FutureRecord::to(NOTIFICATION_TOPIC)
            .key(resource)
            .payload(&value);

        match self.producer.send_result(record) {
            Ok(delivery) => {
                let resource = resource.to_string();
                tokio::spawn(async move {
                    match delivery.await {
                        Ok(Ok(_)) => {}
                        Ok(Err((e, _msg))) => {
                            warn!(resource = %resource, error = %e, "notification delivery failed");
                        }
                        Err(_) => {
                            warn!(resource = %resource, "notification delivery canceled");
                        }
                    }
                });
            }
            Err((e, _record)) => {
                warn!(resource = %resource, error = %e, "notification enqueue failed");
            }
        }
    }

    /// Best-effort flush of in-flight deliveries at shutdown.
    pub fn close(&self) {
        if let Err(e) = self.producer.flush(Duration::from_secs(5)) {
            warn!(error = %e, "notification producer flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn prefix(origin_as: Option<u32>, as_path: &str) -> UnicastPrefixRec {
        UnicastPrefixRec {
            action: "add".into(),
            hash: "X1".into(),
            router_hash: "R1".into(),
            base_attr_hash: "A1".into(),
            peer_hash: "P1".into(),
            prefix: "10.0.0.0".into(),
            prefix_len: 24,
            is_ipv4: true,
            origin_as,
            as_path: as_path.into(),
            next_hop: "192.0.2.1".into(),
            med: None,
            local_pref: None,
            community_list: String::new(),
            path_id: None,
            labels: String::new(),
            timestamp: NaiveDateTime::parse_from_str("2021-03-01 08:30:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
        }
    }

    #[test]
    fn origin_and_path_matches_collapse() {
        let subs = SubscriptionTable::new(60);
        subs.subscribe("AS15169", 0);

        // origin and path both name AS15169: one notification
        let matched = matched_resources(&prefix(Some(15169), "64512 15169"), &subs, 1_000);
        assert_eq!(matched, vec!["AS15169"]);
    }

    #[test]
    fn unparseable_tokens_are_ignored() {
        let subs = SubscriptionTable::new(60);
        subs.subscribe("AS64512", 0);
        subs.subscribe("AS65000", 0);

        let matched = matched_resources(&prefix(Some(64512), "{65000,65001} junk 64512"), &subs, 1_000);
        assert_eq!(matched, vec!["AS64512"]);
    }

    #[test]
    fn empty_path_matches_origin_only() {
        let subs = SubscriptionTable::new(60);
        subs.subscribe("AS64500", 0);

        let matched = matched_resources(&prefix(Some(64500), ""), &subs, 1_000);
        assert_eq!(matched, vec!["AS64500"]);
        assert!(matched_resources(&prefix(None, ""), &subs, 1_000).is_empty());
    }

    #[test]
    fn expired_subscription_never_matches() {
        let subs = SubscriptionTable::new(60);
        subs.subscribe("AS65000", 0); // expires at 60_000

        assert!(matched_resources(&prefix(None, "65000"), &subs, 120_000).is_empty());
    }
}
