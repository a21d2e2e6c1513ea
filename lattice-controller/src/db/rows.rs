//! Row types mapped from the relational schema.
//!
//! Fields mirror the schema's column set; all integer columns come back as
//! `i64` (SQLite's native width) and are narrowed at the edges.

#[derive(Debug, Clone, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct NetworkRow {
    pub id: String,
    pub name: String,
    pub private: bool,
    pub enable_broadcast: bool,
    pub allow_passive_bridging: bool,
    pub v4_assign_mode: String,
    pub v6_assign_mode: String,
    pub multicast_limit: i64,
    pub creation_time: i64,
    pub revision: i64,
}

#[derive(Debug, Clone, Copy, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct MemberRow {
    pub authorized: bool,
    pub active_bridge: bool,
}

/// Member joined with its node row, as rendered by the member view.
#[derive(Debug, Clone, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct MemberDetailRow {
    pub authorized: bool,
    pub active_bridge: bool,
    pub identity: String,
    pub last_at: Option<String>,
    pub last_seen: i64,
    pub first_seen: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct IpAssignmentRow {
    pub ip: Vec<u8>,
    pub ip_netmask_bits: i64,
    pub ip_version: i64,
}

/// Assignment pool joined with its route (which carries the netmask bits
/// and IP version). Pools without a matching route never materialize.
#[derive(Debug, Clone, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct PoolRow {
    pub route_ip: Vec<u8>,
    pub ip_first: Vec<u8>,
    pub ip_last: Vec<u8>,
    pub ip_netmask_bits: i64,
    pub ip_version: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct RouteRow {
    pub node_id: Option<String>,
    pub ip: Vec<u8>,
    pub ip_netmask_bits: i64,
    pub ip_version: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct RelayRow {
    pub node_id: String,
    pub phy_address: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct GatewayRow {
    pub ip: Vec<u8>,
    pub ip_version: i64,
    pub metric: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct RuleRow {
    pub rule_no: i64,
    pub node_id: Option<String>,
    pub vlan_id: Option<i64>,
    pub vlan_pcp: Option<i64>,
    pub ether_type: Option<i64>,
    pub mac_source: Option<String>,
    pub mac_dest: Option<String>,
    pub ip_source: Option<String>,
    pub ip_dest: Option<String>,
    pub ip_tos: Option<i64>,
    pub ip_protocol: Option<i64>,
    pub ip_source_port: Option<i64>,
    pub ip_dest_port: Option<i64>,
    pub flags: Option<i64>,
    pub inv_flags: Option<i64>,
    pub action: Option<String>,
}
