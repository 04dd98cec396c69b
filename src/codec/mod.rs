//! Envelope codec: headered messages with a tab-separated content block.
//!
//! A message value looks like:
//!
//! ```text
//! V: 1.7
//! T: unicast_prefix
//! R: 2
//!
//! <row>\t<fields...>
//! <row>\t<fields...>
//! ```
//!
//! The `T` header selects the record kind; without it the topic-name suffix
//! decides. Malformed rows are dropped at debug level, the rest of the block
//! still decodes.

use crate::error::{AppError, AppResult};
use crate::records::{
    BaseAttrRec, BmpStatRec, CollectorRec, L3VpnPrefixRec, LsLinkRec, LsNodeRec, LsPrefixRec,
    PeerRec, RecordKind, RecordSet, RouterRec, SubscriptionRec, UnicastPrefixRec,
};
use tracing::debug;

/// Decode a message payload into a typed record set.
pub fn decode(topic: &str, payload: &[u8]) -> AppResult<RecordSet> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| AppError::Decode(format!("payload is not UTF-8: {e}")))?;

    let (headers, content) = split_envelope(text)?;

    let kind = headers
        .type_name
        .as_deref()
        .and_then(RecordKind::from_name)
        .or_else(|| RecordKind::from_topic(topic))
        .ok_or_else(|| AppError::Decode(format!("no record kind for topic '{topic}'")))?;

    Ok(decode_rows(kind, content))
}

struct Headers {
    type_name: Option<String>,
}

/// Split header lines from the content block. Headers are `NAME: value`
/// pairs terminated by the first blank line; a message with no blank line is
/// treated as all content (header-less producers exist in older collectors).
fn split_envelope(text: &str) -> AppResult<(Headers, &str)> {
    let mut type_name = None;

    let Some((head, content)) = text.split_once("\n\n") else {
        return Ok((Headers { type_name }, text));
    };

    for line in head.lines() {
        let Some((name, value)) = line.split_once(':') else {
            return Err(AppError::Decode(format!("malformed header line '{line}'")));
        };
        match name.trim() {
            "T" => type_name = Some(value.trim().to_string()),
            // V (format version), R (row count), L (content length) are
            // currently informational.
            "V" | "R" | "L" => {}
            other => {
                debug!(header = other, "ignoring unknown envelope header");
            }
        }
    }

    Ok((Headers { type_name }, content))
}

fn decode_rows(kind: RecordKind, content: &str) -> RecordSet {
    match kind {
        RecordKind::Collector => RecordSet::Collectors(rows(content, CollectorRec::decode)),
        RecordKind::Router => RecordSet::Routers(rows(content, RouterRec::decode)),
        RecordKind::Peer => RecordSet::Peers(rows(content, PeerRec::decode)),
        RecordKind::BaseAttribute => RecordSet::BaseAttrs(rows(content, BaseAttrRec::decode)),
        RecordKind::UnicastPrefix => {
            RecordSet::UnicastPrefixes(rows(content, UnicastPrefixRec::decode))
        }
        RecordKind::L3VpnPrefix => RecordSet::L3VpnPrefixes(rows(content, L3VpnPrefixRec::decode)),
        RecordKind::LsNode => RecordSet::LsNodes(rows(content, LsNodeRec::decode)),
        RecordKind::LsLink => RecordSet::LsLinks(rows(content, LsLinkRec::decode)),
        RecordKind::LsPrefix => RecordSet::LsPrefixes(rows(content, LsPrefixRec::decode)),
        RecordKind::BmpStat => RecordSet::BmpStats(rows(content, BmpStatRec::decode)),
        RecordKind::Subscription => {
            RecordSet::Subscriptions(rows(content, SubscriptionRec::decode))
        }
    }
}

fn rows<T>(content: &str, decode_one: fn(&str) -> AppResult<T>) -> Vec<T> {
    let mut out = Vec::new();
    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        match decode_one(line) {
            Ok(rec) => out.push(rec),
            Err(e) => debug!(error = %e, "dropping malformed record row"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_type_beats_topic_suffix() {
        let payload = b"V: 1.7\nT: subscription\nR: 1\n\nsubscribe\tAS15169\n";
        // topic says unicast_prefix, header says subscription
        let set = decode("bgpdata.parsed.unicast_prefix", payload).unwrap();
        assert_eq!(set.kind(), RecordKind::Subscription);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn falls_back_to_topic_suffix() {
        let payload = b"V: 1.7\nR: 1\n\nsubscribe\tAS65000\n";
        let set = decode("bgpdata.parsed.subscription", payload).unwrap();
        assert_eq!(set.kind(), RecordKind::Subscription);
    }

    #[test]
    fn headerless_payload_is_all_content() {
        let payload = b"subscribe\tAS65000\n";
        let set = decode("bgpdata.parsed.subscription", payload).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let payload = b"T: unicast_prefix\n\nnot-a-row\nadd\t7\tX1\tR1\tA1\tP1\t10.1.1.1\t64500\t10.0.0.0\t24\t1\t64500\t64512 64500\t192.0.2.1\t\t100\t64500:100\t\t\t2021-03-01 08:30:00.000000\n";
        let set = decode("bgpdata.parsed.unicast_prefix", payload).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn unknown_topic_is_an_error() {
        let payload = b"x\ty\n";
        assert!(decode("bgpdata.parsed.geo_ip", payload).is_err());
    }
}
