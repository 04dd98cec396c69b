//! Query builders: one per record kind, producing `(prefix, suffix, values)`
//! triples for the bulk path, plus the derived statements that cascade
//! collector/router/peer state transitions.

use crate::cache::RouterCache;
use crate::records::{
    BaseAttrRec, BmpStatRec, CollectorRec, L3VpnPrefixRec, LsLinkRec, LsNodeRec, LsPrefixRec,
    PeerRec, RouterRec, UnicastPrefixRec,
};
use crate::sql::{boolean, opt_num, quote, ts, QueryTriple};

/// `col = CASE WHEN excluded.is_withdrawn THEN t.col ELSE excluded.col END`
///
/// A withdraw must not overwrite the last-known live-path reference.
fn preserve_on_withdraw(table: &str, col: &str) -> String {
    format!("{col} = CASE WHEN excluded.is_withdrawn THEN {table}.{col} ELSE excluded.{col} END")
}

fn nlri_key(peer_hash: &str, hash: &str) -> String {
    format!("{peer_hash}:{hash}")
}

// ----------------------------------------------------------------------------
// Inventory tables
// ----------------------------------------------------------------------------

pub fn collectors(recs: &[CollectorRec]) -> QueryTriple {
    let mut t = QueryTriple::new(
        "INSERT INTO collectors \
         (hash_id, state, admin_id, routers, router_count, timestamp) VALUES",
        " ON CONFLICT (hash_id) DO UPDATE SET \
         state = excluded.state, routers = excluded.routers, \
         router_count = excluded.router_count, timestamp = excluded.timestamp",
    );
    for r in recs {
        let state = if r.is_up() { "'up'" } else { "'down'" };
        t.values.insert(
            r.hash.clone(),
            format!(
                "({}, {}, {}, {}, {}, {})",
                quote(&r.hash),
                state,
                quote(&r.admin_id),
                quote(&r.routers),
                r.router_count,
                ts(&r.timestamp)
            ),
        );
    }
    t
}

pub fn routers(recs: &[RouterRec]) -> QueryTriple {
    let mut t = QueryTriple::new(
        "INSERT INTO routers \
         (hash_id, name, ip_address, router_as, description, state, \
         term_code, term_reason, collector_hash_id, timestamp) VALUES",
        " ON CONFLICT (hash_id) DO UPDATE SET \
         name = excluded.name, description = excluded.description, \
         state = excluded.state, term_code = excluded.term_code, \
         term_reason = excluded.term_reason, \
         collector_hash_id = excluded.collector_hash_id, \
         timestamp = excluded.timestamp",
    );
    for r in recs {
        let state = if r.is_up() { "'up'" } else { "'down'" };
        t.values.insert(
            r.hash.clone(),
            format!(
                "({}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                quote(&r.hash),
                quote(&r.name),
                quote(&r.ip),
                opt_num(&r.asn),
                quote(&r.description),
                state,
                opt_num(&r.term_code),
                quote(&r.term_reason),
                quote(&r.collector_hash),
                ts(&r.timestamp)
            ),
        );
    }
    t
}

pub fn peers(recs: &[PeerRec]) -> QueryTriple {
    let mut t = QueryTriple::new(
        "INSERT INTO peers \
         (hash_id, router_hash_id, name, peer_bgp_id, peer_addr, peer_as, \
         peer_rd, local_ip, local_asn, state, is_l3vpn_peer, is_pre_policy, \
         is_ipv4, bmp_reason, bgp_err_code, bgp_err_subcode, error_text, \
         timestamp) VALUES",
        " ON CONFLICT (hash_id) DO UPDATE SET \
         name = excluded.name, state = excluded.state, \
         bmp_reason = excluded.bmp_reason, bgp_err_code = excluded.bgp_err_code, \
         bgp_err_subcode = excluded.bgp_err_subcode, \
         error_text = excluded.error_text, timestamp = excluded.timestamp",
    );
    for p in recs {
        let state = if p.is_up() { "'up'" } else { "'down'" };
        t.values.insert(
            p.hash.clone(),
            format!(
                "({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                quote(&p.hash),
                quote(&p.router_hash),
                quote(&p.name),
                quote(&p.remote_bgp_id),
                quote(&p.remote_ip),
                opt_num(&p.remote_asn),
                quote(&p.peer_rd),
                quote(&p.local_ip),
                opt_num(&p.local_asn),
                state,
                boolean(p.is_l3vpn),
                boolean(p.is_prepolicy),
                boolean(p.is_ipv4),
                opt_num(&p.bmp_reason),
                opt_num(&p.bgp_err_code),
                opt_num(&p.bgp_err_subcode),
                quote(&p.error_text),
                ts(&p.timestamp)
            ),
        );
    }
    t
}

// ----------------------------------------------------------------------------
// Attribute and NLRI tables
// ----------------------------------------------------------------------------

/// Attributes are content-addressed by their hash; re-seeing one only
/// refreshes the timestamp.
pub fn base_attrs(recs: &[BaseAttrRec]) -> QueryTriple {
    let mut t = QueryTriple::new(
        "INSERT INTO base_attrs \
         (hash_id, peer_hash_id, origin, as_path, as_path_count, origin_as, \
         next_hop, med, local_pref, aggregator, community_list, \
         ext_community_list, cluster_list, is_atomic_agg, is_nexthop_ipv4, \
         originator_id, timestamp) VALUES",
        " ON CONFLICT (hash_id) DO UPDATE SET timestamp = excluded.timestamp",
    );
    for a in recs {
        t.values.insert(
            a.hash.clone(),
            format!(
                "({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                quote(&a.hash),
                quote(&a.peer_hash),
                quote(&a.origin),
                quote(&a.as_path),
                opt_num(&a.as_path_count),
                opt_num(&a.origin_as),
                quote(&a.next_hop),
                opt_num(&a.med),
                opt_num(&a.local_pref),
                quote(&a.aggregator),
                quote(&a.community_list),
                quote(&a.ext_community_list),
                quote(&a.cluster_list),
                boolean(a.is_atomic_agg),
                boolean(a.is_nexthop_ipv4),
                quote(&a.originator_id),
                ts(&a.timestamp)
            ),
        );
    }
    t
}

pub fn unicast_rib(recs: &[UnicastPrefixRec]) -> QueryTriple {
    let suffix = format!(
        " ON CONFLICT (peer_hash_id, hash_id) DO UPDATE SET \
         {}, {}, \
         is_withdrawn = excluded.is_withdrawn, as_path = excluded.as_path, \
         next_hop = excluded.next_hop, med = excluded.med, \
         local_pref = excluded.local_pref, \
         community_list = excluded.community_list, \
         path_id = excluded.path_id, labels = excluded.labels, \
         timestamp = excluded.timestamp",
        preserve_on_withdraw("unicast_rib", "base_attr_hash_id"),
        preserve_on_withdraw("unicast_rib", "origin_as"),
    );
    let mut t = QueryTriple::new(
        "INSERT INTO unicast_rib \
         (hash_id, peer_hash_id, router_hash_id, base_attr_hash_id, prefix, \
         prefix_len, is_ipv4, origin_as, as_path, next_hop, med, local_pref, \
         community_list, path_id, labels, is_withdrawn, timestamp) VALUES",
        suffix,
    );
    for p in recs {
        t.values.insert(
            nlri_key(&p.peer_hash, &p.hash),
            format!(
                "({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                quote(&p.hash),
                quote(&p.peer_hash),
                quote(&p.router_hash),
                quote(&p.base_attr_hash),
                quote(&p.prefix),
                p.prefix_len,
                boolean(p.is_ipv4),
                opt_num(&p.origin_as),
                quote(&p.as_path),
                quote(&p.next_hop),
                opt_num(&p.med),
                opt_num(&p.local_pref),
                quote(&p.community_list),
                opt_num(&p.path_id),
                quote(&p.labels),
                boolean(p.is_withdrawn()),
                ts(&p.timestamp)
            ),
        );
    }
    t
}

pub fn l3vpn_rib(recs: &[L3VpnPrefixRec]) -> QueryTriple {
    let suffix = format!(
        " ON CONFLICT (peer_hash_id, hash_id) DO UPDATE SET \
         {}, {}, \
         is_withdrawn = excluded.is_withdrawn, as_path = excluded.as_path, \
         next_hop = excluded.next_hop, med = excluded.med, \
         local_pref = excluded.local_pref, \
         community_list = excluded.community_list, \
         path_id = excluded.path_id, labels = excluded.labels, \
         timestamp = excluded.timestamp",
        preserve_on_withdraw("l3vpn_rib", "base_attr_hash_id"),
        preserve_on_withdraw("l3vpn_rib", "origin_as"),
    );
    let mut t = QueryTriple::new(
        "INSERT INTO l3vpn_rib \
         (hash_id, peer_hash_id, router_hash_id, base_attr_hash_id, vpn_rd, \
         prefix, prefix_len, is_ipv4, origin_as, as_path, next_hop, med, \
         local_pref, community_list, path_id, labels, is_withdrawn, \
         timestamp) VALUES",
        suffix,
    );
    for p in recs {
        t.values.insert(
            nlri_key(&p.peer_hash, &p.hash),
            format!(
                "({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                quote(&p.hash),
                quote(&p.peer_hash),
                quote(&p.router_hash),
                quote(&p.base_attr_hash),
                quote(&p.vpn_rd),
                quote(&p.prefix),
                p.prefix_len,
                boolean(p.is_ipv4),
                opt_num(&p.origin_as),
                quote(&p.as_path),
                quote(&p.next_hop),
                opt_num(&p.med),
                opt_num(&p.local_pref),
                quote(&p.community_list),
                opt_num(&p.path_id),
                quote(&p.labels),
                boolean(p.is_withdrawn()),
                ts(&p.timestamp)
            ),
        );
    }
    t
}

pub fn ls_nodes(recs: &[LsNodeRec]) -> QueryTriple {
    let suffix = format!(
        " ON CONFLICT (peer_hash_id, hash_id) DO UPDATE SET \
         {}, name = excluded.name, flags = excluded.flags, \
         as_path = excluded.as_path, local_pref = excluded.local_pref, \
         med = excluded.med, next_hop = excluded.next_hop, \
         is_withdrawn = excluded.is_withdrawn, timestamp = excluded.timestamp",
        preserve_on_withdraw("ls_nodes", "base_attr_hash_id"),
    );
    let mut t = QueryTriple::new(
        "INSERT INTO ls_nodes \
         (hash_id, peer_hash_id, base_attr_hash_id, router_hash_id, \
         igp_router_id, router_id, ls_id, mt_ids, ospf_area_id, isis_area_id, \
         protocol, flags, as_path, local_pref, med, next_hop, name, \
         is_withdrawn, timestamp) VALUES",
        suffix,
    );
    for n in recs {
        t.values.insert(
            nlri_key(&n.peer_hash, &n.hash),
            format!(
                "({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                quote(&n.hash),
                quote(&n.peer_hash),
                quote(&n.base_attr_hash),
                quote(&n.router_hash),
                quote(&n.igp_router_id),
                quote(&n.router_id),
                opt_num(&n.ls_id),
                quote(&n.mt_ids),
                quote(&n.ospf_area_id),
                quote(&n.isis_area_id),
                quote(&n.protocol),
                quote(&n.flags),
                quote(&n.as_path),
                opt_num(&n.local_pref),
                opt_num(&n.med),
                quote(&n.next_hop),
                quote(&n.name),
                boolean(n.is_withdrawn()),
                ts(&n.timestamp)
            ),
        );
    }
    t
}

pub fn ls_links(recs: &[LsLinkRec]) -> QueryTriple {
    let suffix = format!(
        " ON CONFLICT (peer_hash_id, hash_id) DO UPDATE SET \
         {}, as_path = excluded.as_path, local_pref = excluded.local_pref, \
         med = excluded.med, next_hop = excluded.next_hop, \
         igp_metric = excluded.igp_metric, \
         is_withdrawn = excluded.is_withdrawn, timestamp = excluded.timestamp",
        preserve_on_withdraw("ls_links", "base_attr_hash_id"),
    );
    let mut t = QueryTriple::new(
        "INSERT INTO ls_links \
         (hash_id, peer_hash_id, base_attr_hash_id, router_hash_id, \
         igp_router_id, router_id, ls_id, protocol, as_path, local_pref, med, \
         next_hop, mt_id, local_link_id, remote_link_id, interface_ip, \
         neighbor_ip, igp_metric, local_node_hash_id, remote_node_hash_id, \
         is_withdrawn, timestamp) VALUES",
        suffix,
    );
    for l in recs {
        t.values.insert(
            nlri_key(&l.peer_hash, &l.hash),
            format!(
                "({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                quote(&l.hash),
                quote(&l.peer_hash),
                quote(&l.base_attr_hash),
                quote(&l.router_hash),
                quote(&l.igp_router_id),
                quote(&l.router_id),
                opt_num(&l.ls_id),
                quote(&l.protocol),
                quote(&l.as_path),
                opt_num(&l.local_pref),
                opt_num(&l.med),
                quote(&l.next_hop),
                quote(&l.mt_id),
                opt_num(&l.local_link_id),
                opt_num(&l.remote_link_id),
                quote(&l.interface_ip),
                quote(&l.neighbor_ip),
                opt_num(&l.igp_metric),
                quote(&l.local_node_hash),
                quote(&l.remote_node_hash),
                boolean(l.is_withdrawn()),
                ts(&l.timestamp)
            ),
        );
    }
    t
}

pub fn ls_prefixes(recs: &[LsPrefixRec]) -> QueryTriple {
    let suffix = format!(
        " ON CONFLICT (peer_hash_id, hash_id) DO UPDATE SET \
         {}, as_path = excluded.as_path, local_pref = excluded.local_pref, \
         med = excluded.med, next_hop = excluded.next_hop, \
         igp_metric = excluded.igp_metric, route_tag = excluded.route_tag, \
         ext_route_tag = excluded.ext_route_tag, \
         is_withdrawn = excluded.is_withdrawn, timestamp = excluded.timestamp",
        preserve_on_withdraw("ls_prefixes", "base_attr_hash_id"),
    );
    let mut t = QueryTriple::new(
        "INSERT INTO ls_prefixes \
         (hash_id, peer_hash_id, base_attr_hash_id, router_hash_id, \
         igp_router_id, router_id, ls_id, protocol, as_path, local_pref, med, \
         next_hop, local_node_hash_id, mt_id, ospf_route_type, igp_flags, \
         route_tag, ext_route_tag, ospf_fwd_addr, igp_metric, prefix, \
         prefix_len, is_withdrawn, timestamp) VALUES",
        suffix,
    );
    for p in recs {
        t.values.insert(
            nlri_key(&p.peer_hash, &p.hash),
            format!(
                "({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                quote(&p.hash),
                quote(&p.peer_hash),
                quote(&p.base_attr_hash),
                quote(&p.router_hash),
                quote(&p.igp_router_id),
                quote(&p.router_id),
                opt_num(&p.ls_id),
                quote(&p.protocol),
                quote(&p.as_path),
                opt_num(&p.local_pref),
                opt_num(&p.med),
                quote(&p.next_hop),
                quote(&p.local_node_hash),
                quote(&p.mt_id),
                quote(&p.ospf_route_type),
                quote(&p.igp_flags),
                opt_num(&p.route_tag),
                opt_num(&p.ext_route_tag),
                quote(&p.ospf_fwd_addr),
                opt_num(&p.igp_metric),
                quote(&p.prefix),
                p.prefix_len,
                boolean(p.is_withdrawn()),
                ts(&p.timestamp)
            ),
        );
    }
    t
}

/// Stats are samples, not state: append-only, keyed by `(peer, sequence)` so
/// distinct samples never conflate.
pub fn bmp_stats(recs: &[BmpStatRec]) -> QueryTriple {
    let mut t = QueryTriple::new(
        "INSERT INTO bmp_stats \
         (peer_hash_id, router_hash_id, prefixes_rejected, \
         known_dup_prefixes, known_dup_withdraws, invalid_cluster_list, \
         invalid_as_path, invalid_originator, invalid_as_confed, \
         routes_pre_policy, routes_post_policy, timestamp) VALUES",
        "",
    );
    for s in recs {
        t.values.insert(
            format!("{}:{}", s.peer_hash, s.sequence),
            format!(
                "({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
                quote(&s.peer_hash),
                quote(&s.router_hash),
                opt_num(&s.prefixes_rejected),
                opt_num(&s.known_dup_prefixes),
                opt_num(&s.known_dup_withdraws),
                opt_num(&s.invalid_cluster_list),
                opt_num(&s.invalid_as_path),
                opt_num(&s.invalid_originator),
                opt_num(&s.invalid_as_confed),
                opt_num(&s.routes_pre_policy),
                opt_num(&s.routes_post_policy),
                ts(&s.timestamp)
            ),
        );
    }
    t
}

// ----------------------------------------------------------------------------
// Cascade statements
// ----------------------------------------------------------------------------

/// A stopped collector takes its routers down with it.
pub fn collector_router_state(c: &CollectorRec) -> Option<String> {
    if c.is_up() {
        return None;
    }
    Some(format!(
        "UPDATE routers SET state = 'down', timestamp = {} WHERE collector_hash_id = {}",
        ts(&c.timestamp),
        quote(&c.hash)
    ))
}

/// A terminated router marks its peers down, unless another live instance of
/// the same router is still connected.
pub fn router_peer_state(r: &RouterRec, cache: &RouterCache) -> Option<String> {
    if r.is_up() {
        return None;
    }
    if cache.up_count(&r.hash) > 1 {
        return None;
    }
    Some(format!(
        "UPDATE peers SET state = 'down', timestamp = {} WHERE router_hash_id = {}",
        ts(&r.timestamp),
        quote(&r.hash)
    ))
}

/// A peer going down withdraws everything it advertised; one statement per
/// RIB table.
pub fn peer_rib_withdraw(p: &PeerRec) -> Vec<String> {
    if p.is_up() {
        return Vec::new();
    }
    ["unicast_rib", "l3vpn_rib"]
        .iter()
        .map(|table| {
            format!(
                "UPDATE {table} SET is_withdrawn = true, timestamp = {} \
                 WHERE peer_hash_id = {} AND is_withdrawn = false",
                ts(&p.timestamp),
                quote(&p.hash)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn t0() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2021-03-01 08:30:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn prefix_rec(action: &str, hash: &str, peer_hash: &str) -> UnicastPrefixRec {
        UnicastPrefixRec {
            action: action.into(),
            hash: hash.into(),
            router_hash: "R1".into(),
            base_attr_hash: "A1".into(),
            peer_hash: peer_hash.into(),
            prefix: "10.0.0.0".into(),
            prefix_len: 24,
            is_ipv4: true,
            origin_as: Some(64500),
            as_path: "64512 64500".into(),
            next_hop: "192.0.2.1".into(),
            med: None,
            local_pref: Some(100),
            community_list: String::new(),
            path_id: None,
            labels: String::new(),
            timestamp: t0(),
        }
    }

    #[test]
    fn unicast_triple_conflates_same_row() {
        let mut withdraw = prefix_rec("del", "X1", "P1");
        withdraw.labels = "second-update".into();
        let recs = vec![
            prefix_rec("add", "X1", "P1"),
            withdraw,
            prefix_rec("add", "X2", "P1"),
        ];
        let t = unicast_rib(&recs);
        // X1 appears once, the withdraw (later record) wins
        assert_eq!(t.values.len(), 2);
        assert!(t.values["P1:X1"].contains("'second-update'"));
    }

    #[test]
    fn same_hash_different_peer_stays_distinct() {
        let recs = vec![prefix_rec("add", "X1", "P1"), prefix_rec("add", "X1", "P2")];
        let t = unicast_rib(&recs);
        assert_eq!(t.values.len(), 2);
    }

    #[test]
    fn withdraw_preserves_live_path_columns() {
        let t = unicast_rib(&[prefix_rec("del", "X1", "P1")]);
        assert!(t.suffix.contains(
            "base_attr_hash_id = CASE WHEN excluded.is_withdrawn \
             THEN unicast_rib.base_attr_hash_id ELSE excluded.base_attr_hash_id END"
        ));
        assert!(t.suffix.contains(
            "origin_as = CASE WHEN excluded.is_withdrawn \
             THEN unicast_rib.origin_as ELSE excluded.origin_as END"
        ));
    }

    #[test]
    fn assembled_statement_has_one_values_clause() {
        let t = unicast_rib(&[prefix_rec("add", "X1", "P1"), prefix_rec("add", "X2", "P1")]);
        let sql = t.assemble();
        assert!(sql.starts_with("INSERT INTO unicast_rib"));
        assert_eq!(sql.matches("VALUES").count(), 1);
        assert!(sql.contains("'X1'"));
        assert!(sql.contains("'X2'"));
        assert!(sql.ends_with("timestamp = excluded.timestamp"));
    }

    #[test]
    fn peer_down_withdraws_both_rib_tables() {
        let peer = PeerRec {
            action: "down".into(),
            hash: "P1".into(),
            router_hash: "R1".into(),
            name: "peer-1".into(),
            remote_bgp_id: "198.51.100.1".into(),
            remote_asn: Some(64500),
            remote_ip: "198.51.100.1".into(),
            peer_rd: String::new(),
            local_asn: Some(64512),
            local_ip: "203.0.113.1".into(),
            bmp_reason: Some(1),
            bgp_err_code: None,
            bgp_err_subcode: None,
            error_text: String::new(),
            is_l3vpn: false,
            is_prepolicy: false,
            is_ipv4: true,
            timestamp: t0(),
        };
        let stmts = peer_rib_withdraw(&peer);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("unicast_rib"));
        assert!(stmts[1].contains("l3vpn_rib"));
        for s in &stmts {
            assert!(s.contains("peer_hash_id = 'P1'"));
            assert!(s.contains("is_withdrawn = false"));
        }

        let up = PeerRec {
            action: "up".into(),
            ..peer
        };
        assert!(peer_rib_withdraw(&up).is_empty());
    }

    #[test]
    fn router_term_cascades_unless_another_instance_is_up() {
        let router = RouterRec {
            action: "term".into(),
            name: "r1".into(),
            hash: "R1".into(),
            ip: "203.0.113.1".into(),
            description: String::new(),
            term_code: Some(2),
            term_reason: "closed".into(),
            asn: Some(64500),
            collector_hash: "C1".into(),
            timestamp: t0(),
        };

        let mut cache = RouterCache::new();
        cache.insert_for_test("R1", "r1", 1);
        let sql = router_peer_state(&router, &cache).unwrap();
        assert!(sql.contains("router_hash_id = 'R1'"));

        cache.insert_for_test("R1", "r1", 2);
        assert!(router_peer_state(&router, &cache).is_none());
    }

    #[test]
    fn collector_cascade_only_on_stop() {
        let mut c = CollectorRec {
            action: "stopped".into(),
            admin_id: "collector-1".into(),
            hash: "C1".into(),
            routers: String::new(),
            router_count: 0,
            timestamp: t0(),
        };
        assert!(collector_router_state(&c)
            .unwrap()
            .contains("collector_hash_id = 'C1'"));

        c.action = "heartbeat".into();
        assert!(collector_router_state(&c).is_none());
    }

    #[test]
    fn bmp_stats_samples_never_conflate() {
        let mut s = BmpStatRec {
            sequence: 1,
            router_hash: "R1".into(),
            peer_hash: "P1".into(),
            prefixes_rejected: Some(0),
            known_dup_prefixes: Some(4),
            known_dup_withdraws: Some(0),
            invalid_cluster_list: None,
            invalid_as_path: None,
            invalid_originator: None,
            invalid_as_confed: None,
            routes_pre_policy: Some(1000),
            routes_post_policy: Some(990),
            timestamp: t0(),
        };
        let first = s.clone();
        s.sequence = 2;
        let t = bmp_stats(&[first, s]);
        assert_eq!(t.values.len(), 2);
        assert!(t.suffix.is_empty());
    }
}
