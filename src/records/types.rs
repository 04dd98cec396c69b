//! Typed records decoded from the parsed-message topics.
//!
//! Each record kind maps to one table; the decoders consume the tab-separated
//! content rows in the field order documented by the `decode` impls below.
//! Wire fields the aggregator has no use for are consumed with `skip` so row
//! lengths still validate.

use crate::error::AppResult;
use crate::records::fields::Fields;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Collector,
    Router,
    Peer,
    BaseAttribute,
    UnicastPrefix,
    L3VpnPrefix,
    LsNode,
    LsLink,
    LsPrefix,
    BmpStat,
    Subscription,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Collector => "collector",
            RecordKind::Router => "router",
            RecordKind::Peer => "peer",
            RecordKind::BaseAttribute => "base_attribute",
            RecordKind::UnicastPrefix => "unicast_prefix",
            RecordKind::L3VpnPrefix => "l3vpn",
            RecordKind::LsNode => "ls_node",
            RecordKind::LsLink => "ls_link",
            RecordKind::LsPrefix => "ls_prefix",
            RecordKind::BmpStat => "bmp_stat",
            RecordKind::Subscription => "subscription",
        }
    }

    /// Lookup by the envelope `T` header value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "collector" => Some(RecordKind::Collector),
            "router" => Some(RecordKind::Router),
            "peer" => Some(RecordKind::Peer),
            "base_attribute" => Some(RecordKind::BaseAttribute),
            "unicast_prefix" => Some(RecordKind::UnicastPrefix),
            "l3vpn" => Some(RecordKind::L3VpnPrefix),
            "ls_node" => Some(RecordKind::LsNode),
            "ls_link" => Some(RecordKind::LsLink),
            "ls_prefix" => Some(RecordKind::LsPrefix),
            "bmp_stat" => Some(RecordKind::BmpStat),
            "subscription" => Some(RecordKind::Subscription),
            _ => None,
        }
    }

    /// Lookup by topic-name suffix (the segment after the last '.').
    pub fn from_topic(topic: &str) -> Option<Self> {
        Self::from_name(topic.rsplit('.').next().unwrap_or(topic))
    }
}

/// One decoded message: a homogeneous batch of records.
#[derive(Debug, Clone)]
pub enum RecordSet {
    Collectors(Vec<CollectorRec>),
    Routers(Vec<RouterRec>),
    Peers(Vec<PeerRec>),
    BaseAttrs(Vec<BaseAttrRec>),
    UnicastPrefixes(Vec<UnicastPrefixRec>),
    L3VpnPrefixes(Vec<L3VpnPrefixRec>),
    LsNodes(Vec<LsNodeRec>),
    LsLinks(Vec<LsLinkRec>),
    LsPrefixes(Vec<LsPrefixRec>),
    BmpStats(Vec<BmpStatRec>),
    Subscriptions(Vec<SubscriptionRec>),
}

impl RecordSet {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordSet::Collectors(_) => RecordKind::Collector,
            RecordSet::Routers(_) => RecordKind::Router,
            RecordSet::Peers(_) => RecordKind::Peer,
            RecordSet::BaseAttrs(_) => RecordKind::BaseAttribute,
            RecordSet::UnicastPrefixes(_) => RecordKind::UnicastPrefix,
            RecordSet::L3VpnPrefixes(_) => RecordKind::L3VpnPrefix,
            RecordSet::LsNodes(_) => RecordKind::LsNode,
            RecordSet::LsLinks(_) => RecordKind::LsLink,
            RecordSet::LsPrefixes(_) => RecordKind::LsPrefix,
            RecordSet::BmpStats(_) => RecordKind::BmpStat,
            RecordSet::Subscriptions(_) => RecordKind::Subscription,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordSet::Collectors(v) => v.len(),
            RecordSet::Routers(v) => v.len(),
            RecordSet::Peers(v) => v.len(),
            RecordSet::BaseAttrs(v) => v.len(),
            RecordSet::UnicastPrefixes(v) => v.len(),
            RecordSet::L3VpnPrefixes(v) => v.len(),
            RecordSet::LsNodes(v) => v.len(),
            RecordSet::LsLinks(v) => v.len(),
            RecordSet::LsPrefixes(v) => v.len(),
            RecordSet::BmpStats(v) => v.len(),
            RecordSet::Subscriptions(v) => v.len(),
        }
    }
}

// ----------------------------------------------------------------------------
// Inventory records
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CollectorRec {
    pub action: String, // started | change | heartbeat | stopped
    pub admin_id: String,
    pub hash: String,
    pub routers: String,
    pub router_count: u32,
    pub timestamp: NaiveDateTime,
}

impl CollectorRec {
    /// Fields: action, sequence, admin_id, hash, routers, router_count,
    /// timestamp.
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        Ok(Self {
            action: f.text("action")?,
            admin_id: {
                f.skip("sequence")?;
                f.text("admin_id")?
            },
            hash: f.text("hash")?,
            routers: f.text("routers")?,
            router_count: f.u32_opt("router_count")?.unwrap_or(0),
            timestamp: f.timestamp("timestamp")?,
        })
    }

    pub fn is_up(&self) -> bool {
        self.action != "stopped"
    }
}

#[derive(Debug, Clone)]
pub struct RouterRec {
    pub action: String, // first | init | term
    pub name: String,
    pub hash: String,
    pub ip: String,
    pub description: String,
    pub term_code: Option<i32>,
    pub term_reason: String,
    pub asn: Option<u32>,
    pub collector_hash: String,
    pub timestamp: NaiveDateTime,
}

impl RouterRec {
    /// Fields: action, sequence, name, hash, ip, description, term_code,
    /// term_reason, asn, collector_hash, timestamp.
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        Ok(Self {
            action: f.text("action")?,
            name: {
                f.skip("sequence")?;
                f.text("name")?
            },
            hash: f.text("hash")?,
            ip: f.text("ip")?,
            description: f.text("description")?,
            term_code: f.i32_opt("term_code")?,
            term_reason: f.text("term_reason")?,
            asn: f.u32_opt("asn")?,
            collector_hash: f.text("collector_hash")?,
            timestamp: f.timestamp("timestamp")?,
        })
    }

    pub fn is_up(&self) -> bool {
        self.action != "term"
    }
}

#[derive(Debug, Clone)]
pub struct PeerRec {
    pub action: String, // first | up | down
    pub hash: String,
    pub router_hash: String,
    pub name: String,
    pub remote_bgp_id: String,
    pub remote_asn: Option<u32>,
    pub remote_ip: String,
    pub peer_rd: String,
    pub local_asn: Option<u32>,
    pub local_ip: String,
    pub bmp_reason: Option<i32>,
    pub bgp_err_code: Option<i32>,
    pub bgp_err_subcode: Option<i32>,
    pub error_text: String,
    pub is_l3vpn: bool,
    pub is_prepolicy: bool,
    pub is_ipv4: bool,
    pub timestamp: NaiveDateTime,
}

impl PeerRec {
    /// Fields: action, sequence, hash, router_hash, name, remote_bgp_id,
    /// router_ip, remote_asn, remote_ip, peer_rd, local_asn, local_ip,
    /// bmp_reason, bgp_err_code, bgp_err_subcode, error_text, is_l3vpn,
    /// is_prepolicy, is_ipv4, timestamp.
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        Ok(Self {
            action: f.text("action")?,
            hash: {
                f.skip("sequence")?;
                f.text("hash")?
            },
            router_hash: f.text("router_hash")?,
            name: f.text("name")?,
            remote_bgp_id: f.text("remote_bgp_id")?,
            remote_asn: {
                f.skip("router_ip")?;
                f.u32_opt("remote_asn")?
            },
            remote_ip: f.text("remote_ip")?,
            peer_rd: f.text("peer_rd")?,
            local_asn: f.u32_opt("local_asn")?,
            local_ip: f.text("local_ip")?,
            bmp_reason: f.i32_opt("bmp_reason")?,
            bgp_err_code: f.i32_opt("bgp_err_code")?,
            bgp_err_subcode: f.i32_opt("bgp_err_subcode")?,
            error_text: f.text("error_text")?,
            is_l3vpn: f.bool01("is_l3vpn")?,
            is_prepolicy: f.bool01("is_prepolicy")?,
            is_ipv4: f.bool01("is_ipv4")?,
            timestamp: f.timestamp("timestamp")?,
        })
    }

    pub fn is_up(&self) -> bool {
        self.action != "down"
    }
}

// ----------------------------------------------------------------------------
// Attribute and NLRI records
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BaseAttrRec {
    pub hash: String,
    pub peer_hash: String,
    pub origin: String,
    pub as_path: String,
    pub as_path_count: Option<i32>,
    pub origin_as: Option<u32>,
    pub next_hop: String,
    pub med: Option<i64>,
    pub local_pref: Option<i64>,
    pub aggregator: String,
    pub community_list: String,
    pub ext_community_list: String,
    pub cluster_list: String,
    pub is_atomic_agg: bool,
    pub is_nexthop_ipv4: bool,
    pub originator_id: String,
    pub timestamp: NaiveDateTime,
}

impl BaseAttrRec {
    /// Fields: action, sequence, hash, router_hash, peer_hash, peer_ip,
    /// peer_asn, origin, as_path, as_path_count, origin_as, next_hop, med,
    /// local_pref, aggregator, community_list, ext_community_list,
    /// cluster_list, is_atomic_agg, is_nexthop_ipv4, originator_id,
    /// timestamp.
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        f.skip("action")?;
        f.skip("sequence")?;
        Ok(Self {
            hash: f.text("hash")?,
            peer_hash: {
                f.skip("router_hash")?;
                f.text("peer_hash")?
            },
            origin: {
                f.skip("peer_ip")?;
                f.skip("peer_asn")?;
                f.text("origin")?
            },
            as_path: f.text("as_path")?,
            as_path_count: f.i32_opt("as_path_count")?,
            origin_as: f.u32_opt("origin_as")?,
            next_hop: f.text("next_hop")?,
            med: f.i64_opt("med")?,
            local_pref: f.i64_opt("local_pref")?,
            aggregator: f.text("aggregator")?,
            community_list: f.text("community_list")?,
            ext_community_list: f.text("ext_community_list")?,
            cluster_list: f.text("cluster_list")?,
            is_atomic_agg: f.bool01("is_atomic_agg")?,
            is_nexthop_ipv4: f.bool01("is_nexthop_ipv4")?,
            originator_id: f.text("originator_id")?,
            timestamp: f.timestamp("timestamp")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UnicastPrefixRec {
    pub action: String, // add | del
    pub hash: String,
    pub router_hash: String,
    pub base_attr_hash: String,
    pub peer_hash: String,
    pub prefix: String,
    pub prefix_len: u8,
    pub is_ipv4: bool,
    pub origin_as: Option<u32>,
    pub as_path: String,
    pub next_hop: String,
    pub med: Option<i64>,
    pub local_pref: Option<i64>,
    pub community_list: String,
    pub path_id: Option<i64>,
    pub labels: String,
    pub timestamp: NaiveDateTime,
}

impl UnicastPrefixRec {
    /// Fields: action, sequence, hash, router_hash, base_attr_hash,
    /// peer_hash, peer_ip, peer_asn, prefix, prefix_len, is_ipv4, origin_as,
    /// as_path, next_hop, med, local_pref, community_list, path_id, labels,
    /// timestamp.
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        Ok(Self {
            action: f.text("action")?,
            hash: {
                f.skip("sequence")?;
                f.text("hash")?
            },
            router_hash: f.text("router_hash")?,
            base_attr_hash: f.text("base_attr_hash")?,
            peer_hash: f.text("peer_hash")?,
            prefix: {
                f.skip("peer_ip")?;
                f.skip("peer_asn")?;
                f.text("prefix")?
            },
            prefix_len: f.u8_req("prefix_len")?,
            is_ipv4: f.bool01("is_ipv4")?,
            origin_as: f.u32_opt("origin_as")?,
            as_path: f.text("as_path")?,
            next_hop: f.text("next_hop")?,
            med: f.i64_opt("med")?,
            local_pref: f.i64_opt("local_pref")?,
            community_list: f.text("community_list")?,
            path_id: f.i64_opt("path_id")?,
            labels: f.text("labels")?,
            timestamp: f.timestamp("timestamp")?,
        })
    }

    pub fn is_withdrawn(&self) -> bool {
        self.action == "del"
    }
}

/// L3VPN prefix: unicast layout plus the route distinguisher, carried right
/// before the prefix fields.
#[derive(Debug, Clone)]
pub struct L3VpnPrefixRec {
    pub action: String,
    pub hash: String,
    pub router_hash: String,
    pub base_attr_hash: String,
    pub peer_hash: String,
    pub vpn_rd: String,
    pub prefix: String,
    pub prefix_len: u8,
    pub is_ipv4: bool,
    pub origin_as: Option<u32>,
    pub as_path: String,
    pub next_hop: String,
    pub med: Option<i64>,
    pub local_pref: Option<i64>,
    pub community_list: String,
    pub path_id: Option<i64>,
    pub labels: String,
    pub timestamp: NaiveDateTime,
}

impl L3VpnPrefixRec {
    /// Fields: action, sequence, hash, router_hash, base_attr_hash,
    /// peer_hash, peer_ip, peer_asn, vpn_rd, prefix, prefix_len, is_ipv4,
    /// origin_as, as_path, next_hop, med, local_pref, community_list,
    /// path_id, labels, timestamp.
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        Ok(Self {
            action: f.text("action")?,
            hash: {
                f.skip("sequence")?;
                f.text("hash")?
            },
            router_hash: f.text("router_hash")?,
            base_attr_hash: f.text("base_attr_hash")?,
            peer_hash: f.text("peer_hash")?,
            vpn_rd: {
                f.skip("peer_ip")?;
                f.skip("peer_asn")?;
                f.text("vpn_rd")?
            },
            prefix: f.text("prefix")?,
            prefix_len: f.u8_req("prefix_len")?,
            is_ipv4: f.bool01("is_ipv4")?,
            origin_as: f.u32_opt("origin_as")?,
            as_path: f.text("as_path")?,
            next_hop: f.text("next_hop")?,
            med: f.i64_opt("med")?,
            local_pref: f.i64_opt("local_pref")?,
            community_list: f.text("community_list")?,
            path_id: f.i64_opt("path_id")?,
            labels: f.text("labels")?,
            timestamp: f.timestamp("timestamp")?,
        })
    }

    pub fn is_withdrawn(&self) -> bool {
        self.action == "del"
    }
}

// ----------------------------------------------------------------------------
// Link-state records
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LsNodeRec {
    pub action: String,
    pub hash: String,
    pub base_attr_hash: String,
    pub router_hash: String,
    pub peer_hash: String,
    pub igp_router_id: String,
    pub router_id: String,
    pub ls_id: Option<i64>,
    pub mt_ids: String,
    pub ospf_area_id: String,
    pub isis_area_id: String,
    pub protocol: String,
    pub flags: String,
    pub as_path: String,
    pub local_pref: Option<i64>,
    pub med: Option<i64>,
    pub next_hop: String,
    pub name: String,
    pub timestamp: NaiveDateTime,
}

impl LsNodeRec {
    /// Fields: action, sequence, hash, base_attr_hash, router_hash,
    /// peer_hash, igp_router_id, router_id, ls_id, mt_ids, ospf_area_id,
    /// isis_area_id, protocol, flags, as_path, local_pref, med, next_hop,
    /// name, timestamp.
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        Ok(Self {
            action: f.text("action")?,
            hash: {
                f.skip("sequence")?;
                f.text("hash")?
            },
            base_attr_hash: f.text("base_attr_hash")?,
            router_hash: f.text("router_hash")?,
            peer_hash: f.text("peer_hash")?,
            igp_router_id: f.text("igp_router_id")?,
            router_id: f.text("router_id")?,
            ls_id: f.i64_opt("ls_id")?,
            mt_ids: f.text("mt_ids")?,
            ospf_area_id: f.text("ospf_area_id")?,
            isis_area_id: f.text("isis_area_id")?,
            protocol: f.text("protocol")?,
            flags: f.text("flags")?,
            as_path: f.text("as_path")?,
            local_pref: f.i64_opt("local_pref")?,
            med: f.i64_opt("med")?,
            next_hop: f.text("next_hop")?,
            name: f.text("name")?,
            timestamp: f.timestamp("timestamp")?,
        })
    }

    pub fn is_withdrawn(&self) -> bool {
        self.action == "del"
    }
}

#[derive(Debug, Clone)]
pub struct LsLinkRec {
    pub action: String,
    pub hash: String,
    pub base_attr_hash: String,
    pub router_hash: String,
    pub peer_hash: String,
    pub igp_router_id: String,
    pub router_id: String,
    pub ls_id: Option<i64>,
    pub protocol: String,
    pub as_path: String,
    pub local_pref: Option<i64>,
    pub med: Option<i64>,
    pub next_hop: String,
    pub mt_id: String,
    pub local_link_id: Option<i64>,
    pub remote_link_id: Option<i64>,
    pub interface_ip: String,
    pub neighbor_ip: String,
    pub igp_metric: Option<i64>,
    pub local_node_hash: String,
    pub remote_node_hash: String,
    pub timestamp: NaiveDateTime,
}

impl LsLinkRec {
    /// Fields: action, sequence, hash, base_attr_hash, router_hash,
    /// peer_hash, igp_router_id, router_id, ls_id, protocol, as_path,
    /// local_pref, med, next_hop, mt_id, local_link_id, remote_link_id,
    /// interface_ip, neighbor_ip, igp_metric, local_node_hash,
    /// remote_node_hash, timestamp.
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        Ok(Self {
            action: f.text("action")?,
            hash: {
                f.skip("sequence")?;
                f.text("hash")?
            },
            base_attr_hash: f.text("base_attr_hash")?,
            router_hash: f.text("router_hash")?,
            peer_hash: f.text("peer_hash")?,
            igp_router_id: f.text("igp_router_id")?,
            router_id: f.text("router_id")?,
            ls_id: f.i64_opt("ls_id")?,
            protocol: f.text("protocol")?,
            as_path: f.text("as_path")?,
            local_pref: f.i64_opt("local_pref")?,
            med: f.i64_opt("med")?,
            next_hop: f.text("next_hop")?,
            mt_id: f.text("mt_id")?,
            local_link_id: f.i64_opt("local_link_id")?,
            remote_link_id: f.i64_opt("remote_link_id")?,
            interface_ip: f.text("interface_ip")?,
            neighbor_ip: f.text("neighbor_ip")?,
            igp_metric: f.i64_opt("igp_metric")?,
            local_node_hash: f.text("local_node_hash")?,
            remote_node_hash: f.text("remote_node_hash")?,
            timestamp: f.timestamp("timestamp")?,
        })
    }

    pub fn is_withdrawn(&self) -> bool {
        self.action == "del"
    }
}

#[derive(Debug, Clone)]
pub struct LsPrefixRec {
    pub action: String,
    pub hash: String,
    pub base_attr_hash: String,
    pub router_hash: String,
    pub peer_hash: String,
    pub igp_router_id: String,
    pub router_id: String,
    pub ls_id: Option<i64>,
    pub protocol: String,
    pub as_path: String,
    pub local_pref: Option<i64>,
    pub med: Option<i64>,
    pub next_hop: String,
    pub local_node_hash: String,
    pub mt_id: String,
    pub ospf_route_type: String,
    pub igp_flags: String,
    pub route_tag: Option<i64>,
    pub ext_route_tag: Option<i64>,
    pub ospf_fwd_addr: String,
    pub igp_metric: Option<i64>,
    pub prefix: String,
    pub prefix_len: u8,
    pub timestamp: NaiveDateTime,
}

impl LsPrefixRec {
    /// Fields: action, sequence, hash, base_attr_hash, router_hash,
    /// peer_hash, igp_router_id, router_id, ls_id, protocol, as_path,
    /// local_pref, med, next_hop, local_node_hash, mt_id, ospf_route_type,
    /// igp_flags, route_tag, ext_route_tag, ospf_fwd_addr, igp_metric,
    /// prefix, prefix_len, timestamp.
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        Ok(Self {
            action: f.text("action")?,
            hash: {
                f.skip("sequence")?;
                f.text("hash")?
            },
            base_attr_hash: f.text("base_attr_hash")?,
            router_hash: f.text("router_hash")?,
            peer_hash: f.text("peer_hash")?,
            igp_router_id: f.text("igp_router_id")?,
            router_id: f.text("router_id")?,
            ls_id: f.i64_opt("ls_id")?,
            protocol: f.text("protocol")?,
            as_path: f.text("as_path")?,
            local_pref: f.i64_opt("local_pref")?,
            med: f.i64_opt("med")?,
            next_hop: f.text("next_hop")?,
            local_node_hash: f.text("local_node_hash")?,
            mt_id: f.text("mt_id")?,
            ospf_route_type: f.text("ospf_route_type")?,
            igp_flags: f.text("igp_flags")?,
            route_tag: f.i64_opt("route_tag")?,
            ext_route_tag: f.i64_opt("ext_route_tag")?,
            ospf_fwd_addr: f.text("ospf_fwd_addr")?,
            igp_metric: f.i64_opt("igp_metric")?,
            prefix: f.text("prefix")?,
            prefix_len: f.u8_req("prefix_len")?,
            timestamp: f.timestamp("timestamp")?,
        })
    }

    pub fn is_withdrawn(&self) -> bool {
        self.action == "del"
    }
}

// ----------------------------------------------------------------------------
// Stats and subscriptions
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BmpStatRec {
    pub sequence: u64,
    pub router_hash: String,
    pub peer_hash: String,
    pub prefixes_rejected: Option<i64>,
    pub known_dup_prefixes: Option<i64>,
    pub known_dup_withdraws: Option<i64>,
    pub invalid_cluster_list: Option<i64>,
    pub invalid_as_path: Option<i64>,
    pub invalid_originator: Option<i64>,
    pub invalid_as_confed: Option<i64>,
    pub routes_pre_policy: Option<i64>,
    pub routes_post_policy: Option<i64>,
    pub timestamp: NaiveDateTime,
}

impl BmpStatRec {
    /// Fields: sequence, router_hash, router_ip, peer_hash, peer_ip,
    /// peer_asn, prefixes_rejected, known_dup_prefixes, known_dup_withdraws,
    /// invalid_cluster_list, invalid_as_path, invalid_originator,
    /// invalid_as_confed, routes_pre_policy, routes_post_policy, timestamp.
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        Ok(Self {
            sequence: f.u64_req("sequence")?,
            router_hash: f.text("router_hash")?,
            peer_hash: {
                f.skip("router_ip")?;
                f.text("peer_hash")?
            },
            prefixes_rejected: {
                f.skip("peer_ip")?;
                f.skip("peer_asn")?;
                f.i64_opt("prefixes_rejected")?
            },
            known_dup_prefixes: f.i64_opt("known_dup_prefixes")?,
            known_dup_withdraws: f.i64_opt("known_dup_withdraws")?,
            invalid_cluster_list: f.i64_opt("invalid_cluster_list")?,
            invalid_as_path: f.i64_opt("invalid_as_path")?,
            invalid_originator: f.i64_opt("invalid_originator")?,
            invalid_as_confed: f.i64_opt("invalid_as_confed")?,
            routes_pre_policy: f.i64_opt("routes_pre_policy")?,
            routes_post_policy: f.i64_opt("routes_post_policy")?,
            timestamp: f.timestamp("timestamp")?,
        })
    }
}

/// Subscription request: `subscribe` refreshes, `unsubscribe` removes.
#[derive(Debug, Clone)]
pub struct SubscriptionRec {
    pub action: String,
    pub resource: String,
}

impl SubscriptionRec {
    pub fn decode(line: &str) -> AppResult<Self> {
        let mut f = Fields::new(line);
        Ok(Self {
            action: f.text("action")?,
            resource: f.text("resource")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_topic_uses_suffix() {
        assert_eq!(
            RecordKind::from_topic("bgpdata.parsed.unicast_prefix"),
            Some(RecordKind::UnicastPrefix)
        );
        assert_eq!(
            RecordKind::from_topic("bgpdata.parsed.ls_link"),
            Some(RecordKind::LsLink)
        );
        assert_eq!(RecordKind::from_topic("bgpdata.parsed.whois"), None);
    }

    #[test]
    fn decodes_unicast_prefix_row() {
        let line = "add\t7\tX1\tR1\tA1\tP1\t10.1.1.1\t64500\t10.0.0.0\t24\t1\t64500\t64512 64500\t192.0.2.1\t\t100\t64500:100\t\t\t2021-03-01 08:30:00.000000";
        let rec = UnicastPrefixRec::decode(line).unwrap();
        assert_eq!(rec.hash, "X1");
        assert_eq!(rec.peer_hash, "P1");
        assert_eq!(rec.prefix, "10.0.0.0");
        assert_eq!(rec.prefix_len, 24);
        assert_eq!(rec.origin_as, Some(64500));
        assert_eq!(rec.med, None);
        assert!(!rec.is_withdrawn());
    }

    #[test]
    fn withdraw_action_maps_to_is_withdrawn() {
        let line = "del\t8\tX1\tR1\t\tP1\t10.1.1.1\t64500\t10.0.0.0\t24\t1\t\t\t\t\t\t\t\t\t2021-03-01 08:31:00.000000";
        let rec = UnicastPrefixRec::decode(line).unwrap();
        assert!(rec.is_withdrawn());
        assert_eq!(rec.origin_as, None);
    }

    #[test]
    fn decodes_router_and_peer_state() {
        let router = "term\t3\tr1.example\tR1\t203.0.113.1\tedge router\t2\tconnection closed\t64500\tC1\t2021-03-01 08:00:00";
        let rec = RouterRec::decode(router).unwrap();
        assert!(!rec.is_up());
        assert_eq!(rec.collector_hash, "C1");

        let peer = "up\t4\tP1\tR1\tpeer-1\t198.51.100.1\t203.0.113.1\t64500\t198.51.100.1\t\t64512\t203.0.113.1\t\t\t\t\t0\t0\t1\t2021-03-01 08:01:00";
        let rec = PeerRec::decode(peer).unwrap();
        assert!(rec.is_up());
        assert_eq!(rec.remote_asn, Some(64500));
        assert!(rec.is_ipv4);
    }

    #[test]
    fn decodes_base_attribute_row() {
        let line = "add\t5\tA1\tR1\tP1\t10.1.1.1\t64500\tigp\t64512 64500\t2\t64500\t192.0.2.1\t\t100\t\t64500:100\t\t\t0\t1\t\t2021-03-01 08:02:00";
        let rec = BaseAttrRec::decode(line).unwrap();
        assert_eq!(rec.hash, "A1");
        assert_eq!(rec.peer_hash, "P1");
        assert_eq!(rec.origin_as, Some(64500));
        assert!(rec.is_nexthop_ipv4);
    }

    #[test]
    fn short_row_is_rejected() {
        assert!(UnicastPrefixRec::decode("add\t1\tX1").is_err());
    }
}
