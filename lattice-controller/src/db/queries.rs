//! The controller's prepared operations.
//!
//! Every statement the controller runs lives here, one function per
//! operation, generic over the executor so the same operation can run
//! against the pool or inside a transaction. Identifiers are passed in
//! their canonical fixed-width hex string form; IPs as 16-byte blobs.

use sqlx::SqliteExecutor;

use super::rows::*;

// --- Node ---------------------------------------------------------------

pub async fn node_identity(
    ex: impl SqliteExecutor<'_>,
    node_id: &str,
) -> sqlx::Result<Option<String>> {
    sqlx::query_scalar("SELECT identity FROM Node WHERE id = ?")
        .bind(node_id)
        .fetch_optional(ex)
        .await
}

pub async fn create_node(
    ex: impl SqliteExecutor<'_>,
    node_id: &str,
    identity: &str,
    last_at: &str,
    now: i64,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO Node (id,identity,lastAt,lastSeen,firstSeen) VALUES (?,?,?,?,?)")
        .bind(node_id)
        .bind(identity)
        .bind(last_at)
        .bind(now)
        .bind(now)
        .execute(ex)
        .await?;
    Ok(())
}

/// Update `lastSeen`, and `lastAt` only when the request carried a physical
/// peer endpoint (relayed requests do not).
pub async fn update_node_seen(
    ex: impl SqliteExecutor<'_>,
    node_id: &str,
    now: i64,
    last_at: Option<&str>,
) -> sqlx::Result<()> {
    match last_at {
        Some(last_at) => {
            sqlx::query("UPDATE Node SET lastAt = ?,lastSeen = ? WHERE id = ?")
                .bind(last_at)
                .bind(now)
                .bind(node_id)
                .execute(ex)
                .await?;
        }
        None => {
            sqlx::query("UPDATE Node SET lastSeen = ? WHERE id = ?")
                .bind(now)
                .bind(node_id)
                .execute(ex)
                .await?;
        }
    }
    Ok(())
}

// --- Network ------------------------------------------------------------

pub async fn network_by_id(
    ex: impl SqliteExecutor<'_>,
    id: &str,
) -> sqlx::Result<Option<NetworkRow>> {
    sqlx::query_as(
        "SELECT id,name,private,enableBroadcast,allowPassiveBridging,v4AssignMode,v6AssignMode,\
         multicastLimit,creationTime,revision FROM Network WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(ex)
    .await
}

pub async fn network_revision(
    ex: impl SqliteExecutor<'_>,
    id: &str,
) -> sqlx::Result<Option<i64>> {
    sqlx::query_scalar("SELECT revision FROM Network WHERE id = ?")
        .bind(id)
        .fetch_optional(ex)
        .await
}

pub async fn set_network_revision(
    ex: impl SqliteExecutor<'_>,
    id: &str,
    revision: i64,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE Network SET revision = ? WHERE id = ?")
        .bind(revision)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn create_network(
    ex: impl SqliteExecutor<'_>,
    id: &str,
    name: &str,
    now: i64,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO Network (id,name,creationTime,revision) VALUES (?,?,?,1)")
        .bind(id)
        .bind(name)
        .bind(now)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn delete_network(ex: impl SqliteExecutor<'_>, id: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM Network WHERE id = ?")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn list_network_ids(ex: impl SqliteExecutor<'_>) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar("SELECT id FROM Network ORDER BY id ASC")
        .fetch_all(ex)
        .await
}

pub async fn set_network_name(
    ex: impl SqliteExecutor<'_>,
    id: &str,
    name: &str,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE Network SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn set_network_private(
    ex: impl SqliteExecutor<'_>,
    id: &str,
    private: bool,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE Network SET private = ? WHERE id = ?")
        .bind(private)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn set_network_enable_broadcast(
    ex: impl SqliteExecutor<'_>,
    id: &str,
    enable: bool,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE Network SET enableBroadcast = ? WHERE id = ?")
        .bind(enable)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn set_network_allow_passive_bridging(
    ex: impl SqliteExecutor<'_>,
    id: &str,
    allow: bool,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE Network SET allowPassiveBridging = ? WHERE id = ?")
        .bind(allow)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn set_network_v4_assign_mode(
    ex: impl SqliteExecutor<'_>,
    id: &str,
    mode: &str,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE Network SET v4AssignMode = ? WHERE id = ?")
        .bind(mode)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn set_network_v6_assign_mode(
    ex: impl SqliteExecutor<'_>,
    id: &str,
    mode: &str,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE Network SET v6AssignMode = ? WHERE id = ?")
        .bind(mode)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn set_network_multicast_limit(
    ex: impl SqliteExecutor<'_>,
    id: &str,
    limit: i64,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE Network SET multicastLimit = ? WHERE id = ?")
        .bind(limit)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

// --- Member -------------------------------------------------------------

pub async fn member(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: &str,
) -> sqlx::Result<Option<MemberRow>> {
    sqlx::query_as(
        "SELECT authorized,activeBridge FROM Member WHERE networkId = ? AND nodeId = ?",
    )
    .bind(network_id)
    .bind(node_id)
    .fetch_optional(ex)
    .await
}

pub async fn member_with_node(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: &str,
) -> sqlx::Result<Option<MemberDetailRow>> {
    sqlx::query_as(
        "SELECT m.authorized,m.activeBridge,n.identity,n.lastAt,n.lastSeen,n.firstSeen \
         FROM Member AS m JOIN Node AS n ON n.id = m.nodeId \
         WHERE m.networkId = ? AND m.nodeId = ?",
    )
    .bind(network_id)
    .bind(node_id)
    .fetch_optional(ex)
    .await
}

pub async fn create_member(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: &str,
    authorized: bool,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO Member (networkId,nodeId,authorized,activeBridge) VALUES (?,?,?,0)")
        .bind(network_id)
        .bind(node_id)
        .bind(authorized)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn set_member_authorized(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: &str,
    authorized: bool,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE Member SET authorized = ? WHERE networkId = ? AND nodeId = ?")
        .bind(authorized)
        .bind(network_id)
        .bind(node_id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn set_member_active_bridge(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: &str,
    active_bridge: bool,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE Member SET activeBridge = ? WHERE networkId = ? AND nodeId = ?")
        .bind(active_bridge)
        .bind(network_id)
        .bind(node_id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn delete_member(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: &str,
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM Member WHERE networkId = ? AND nodeId = ?")
        .bind(network_id)
        .bind(node_id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn member_ids(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar("SELECT nodeId FROM Member WHERE networkId = ? ORDER BY nodeId ASC")
        .bind(network_id)
        .fetch_all(ex)
        .await
}

/// Node ids of authorized members flagged as active bridges.
pub async fn active_bridges(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar(
        "SELECT nodeId FROM Member WHERE networkId = ? AND activeBridge > 0 AND authorized > 0 \
         ORDER BY nodeId ASC",
    )
    .bind(network_id)
    .fetch_all(ex)
    .await
}

// --- IP assignments -----------------------------------------------------

pub async fn ip_assignments_for_member(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: &str,
) -> sqlx::Result<Vec<IpAssignmentRow>> {
    sqlx::query_as(
        "SELECT ip,ipNetmaskBits,ipVersion FROM IpAssignment \
         WHERE networkId = ? AND nodeId = ? ORDER BY ip ASC",
    )
    .bind(network_id)
    .bind(node_id)
    .fetch_all(ex)
    .await
}

pub async fn ip_taken(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    ip: &[u8],
    ip_version: i64,
) -> sqlx::Result<bool> {
    let row: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM IpAssignment WHERE networkId = ? AND ip = ? AND ipVersion = ?",
    )
    .bind(network_id)
    .bind(ip)
    .bind(ip_version)
    .fetch_optional(ex)
    .await?;
    Ok(row.is_some())
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_ip_assignment(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: &str,
    ip: &[u8],
    ip_netmask_bits: i64,
    ip_version: i64,
    route_ip: Option<&[u8]>,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO IpAssignment (networkId,nodeId,ip,ipNetmaskBits,ipVersion,routeIp) \
         VALUES (?,?,?,?,?,?)",
    )
    .bind(network_id)
    .bind(node_id)
    .bind(ip)
    .bind(ip_netmask_bits)
    .bind(ip_version)
    .bind(route_ip)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn delete_ip_assignments(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: &str,
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM IpAssignment WHERE networkId = ? AND nodeId = ?")
        .bind(network_id)
        .bind(node_id)
        .execute(ex)
        .await?;
    Ok(())
}

// --- Assignment pools ---------------------------------------------------

/// Pools joined with the route that supplies their netmask bits and IP
/// version. A pool whose `routeIp` matches no route is invisible.
pub async fn assignment_pools(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
) -> sqlx::Result<Vec<PoolRow>> {
    sqlx::query_as(
        "SELECT p.routeIp,p.ipFirst,p.ipLast,r.ipNetmaskBits,r.ipVersion \
         FROM IpAssignmentPool AS p \
         JOIN Route AS r ON r.networkId = p.networkId AND r.ip = p.routeIp \
         WHERE p.networkId = ? ORDER BY p.routeIp ASC",
    )
    .bind(network_id)
    .fetch_all(ex)
    .await
}

pub async fn insert_assignment_pool(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    route_ip: &[u8],
    ip_first: &[u8],
    ip_last: &[u8],
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO IpAssignmentPool (networkId,routeIp,ipFirst,ipLast) VALUES (?,?,?,?)",
    )
    .bind(network_id)
    .bind(route_ip)
    .bind(ip_first)
    .bind(ip_last)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn delete_assignment_pools(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM IpAssignmentPool WHERE networkId = ?")
        .bind(network_id)
        .execute(ex)
        .await?;
    Ok(())
}

// --- Routes -------------------------------------------------------------

pub async fn routes(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
) -> sqlx::Result<Vec<RouteRow>> {
    sqlx::query_as(
        "SELECT nodeId,ip,ipNetmaskBits,ipVersion FROM Route WHERE networkId = ? ORDER BY ip ASC",
    )
    .bind(network_id)
    .fetch_all(ex)
    .await
}

pub async fn insert_route(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: Option<&str>,
    ip: &[u8],
    ip_netmask_bits: i64,
    ip_version: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO Route (networkId,nodeId,ip,ipNetmaskBits,ipVersion) VALUES (?,?,?,?,?)",
    )
    .bind(network_id)
    .bind(node_id)
    .bind(ip)
    .bind(ip_netmask_bits)
    .bind(ip_version)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn delete_routes(ex: impl SqliteExecutor<'_>, network_id: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM Route WHERE networkId = ?")
        .bind(network_id)
        .execute(ex)
        .await?;
    Ok(())
}

// --- Relays -------------------------------------------------------------

pub async fn relays(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
) -> sqlx::Result<Vec<RelayRow>> {
    sqlx::query_as(
        "SELECT nodeId,phyAddress FROM Relay WHERE networkId = ? ORDER BY nodeId ASC",
    )
    .bind(network_id)
    .fetch_all(ex)
    .await
}

pub async fn insert_relay(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    node_id: &str,
    phy_address: &str,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO Relay (networkId,nodeId,phyAddress) VALUES (?,?,?)")
        .bind(network_id)
        .bind(node_id)
        .bind(phy_address)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn delete_relays(ex: impl SqliteExecutor<'_>, network_id: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM Relay WHERE networkId = ?")
        .bind(network_id)
        .execute(ex)
        .await?;
    Ok(())
}

// --- Gateways -----------------------------------------------------------

pub async fn gateways(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
) -> sqlx::Result<Vec<GatewayRow>> {
    sqlx::query_as(
        "SELECT ip,ipVersion,metric FROM Gateway WHERE networkId = ? ORDER BY metric ASC",
    )
    .bind(network_id)
    .fetch_all(ex)
    .await
}

pub async fn insert_gateway(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    ip: &[u8],
    ip_version: i64,
    metric: i64,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO Gateway (networkId,ip,ipVersion,metric) VALUES (?,?,?,?)")
        .bind(network_id)
        .bind(ip)
        .bind(ip_version)
        .bind(metric)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn delete_gateways(ex: impl SqliteExecutor<'_>, network_id: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM Gateway WHERE networkId = ?")
        .bind(network_id)
        .execute(ex)
        .await?;
    Ok(())
}

// --- Rules --------------------------------------------------------------

pub async fn rules(ex: impl SqliteExecutor<'_>, network_id: &str) -> sqlx::Result<Vec<RuleRow>> {
    sqlx::query_as(
        "SELECT ruleNo,nodeId,vlanId,vlanPcp,etherType,macSource,macDest,ipSource,ipDest,\
         ipTos,ipProtocol,ipSourcePort,ipDestPort,flags,invFlags,action \
         FROM Rule WHERE networkId = ? ORDER BY ruleNo ASC",
    )
    .bind(network_id)
    .fetch_all(ex)
    .await
}

/// Ether types named by accept-action rules; the allowed-ether-type list of
/// the network.
pub async fn accept_rule_ether_types(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar(
        "SELECT etherType FROM Rule WHERE networkId = ? AND action = 'accept' \
         AND etherType IS NOT NULL",
    )
    .bind(network_id)
    .fetch_all(ex)
    .await
}

pub struct RuleInsert<'a> {
    pub rule_no: i64,
    pub node_id: Option<&'a str>,
    pub vlan_id: Option<i64>,
    pub vlan_pcp: Option<i64>,
    pub ether_type: Option<i64>,
    pub mac_source: Option<&'a str>,
    pub mac_dest: Option<&'a str>,
    pub ip_source: Option<&'a str>,
    pub ip_dest: Option<&'a str>,
    pub ip_tos: Option<i64>,
    pub ip_protocol: Option<i64>,
    pub ip_source_port: Option<i64>,
    pub ip_dest_port: Option<i64>,
    pub flags: Option<i64>,
    pub inv_flags: Option<i64>,
    pub action: &'a str,
}

pub async fn insert_rule(
    ex: impl SqliteExecutor<'_>,
    network_id: &str,
    rule: &RuleInsert<'_>,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO Rule (networkId,ruleNo,nodeId,vlanId,vlanPcp,etherType,macSource,macDest,\
         ipSource,ipDest,ipTos,ipProtocol,ipSourcePort,ipDestPort,flags,invFlags,action) \
         VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)",
    )
    .bind(network_id)
    .bind(rule.rule_no)
    .bind(rule.node_id)
    .bind(rule.vlan_id)
    .bind(rule.vlan_pcp)
    .bind(rule.ether_type)
    .bind(rule.mac_source)
    .bind(rule.mac_dest)
    .bind(rule.ip_source)
    .bind(rule.ip_dest)
    .bind(rule.ip_tos)
    .bind(rule.ip_protocol)
    .bind(rule.ip_source_port)
    .bind(rule.ip_dest_port)
    .bind(rule.flags)
    .bind(rule.inv_flags)
    .bind(rule.action)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn delete_rules(ex: impl SqliteExecutor<'_>, network_id: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM Rule WHERE networkId = ?")
        .bind(network_id)
        .execute(ex)
        .await?;
    Ok(())
}
