//! Network resources of the control plane.
//!
//! `POST /network/{id}` upserts scalar fields and replaces collection fields
//! (relays, routes, gateways, assignment pools, rules) wholesale. All
//! mutations of one POST, including the revision bump, commit in a single
//! transaction; the response re-renders the committed state through the same
//! code path `GET` uses.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lattice_core::identity::{Address, NetworkId};
use lattice_core::util::now_millis;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::db::{self, blob};
use crate::engine::Controller;
use crate::rest_api::{ApiError, RestApiServer};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkUpdate {
    pub name: Option<String>,
    pub private: Option<bool>,
    pub enable_broadcast: Option<bool>,
    pub allow_passive_bridging: Option<bool>,
    pub v4_assign_mode: Option<String>,
    pub v6_assign_mode: Option<String>,
    pub multicast_limit: Option<i64>,
    pub relays: Option<Vec<RelaySpec>>,
    pub routes: Option<Vec<RouteSpec>>,
    pub gateways: Option<Vec<String>>,
    pub ip_assignment_pools: Option<Vec<PoolSpec>>,
    pub rules: Option<Vec<RuleSpec>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySpec {
    pub address: Option<String>,
    pub phy_address: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteSpec {
    pub node_id: Option<String>,
    pub network: Option<String>,
    pub netmask_bits: Option<i64>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolSpec {
    pub network: Option<String>,
    pub ip_first: Option<String>,
    pub ip_last: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSpec {
    pub rule_no: Option<i64>,
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

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkView {
    pub nwid: String,
    pub name: String,
    pub private: bool,
    pub enable_broadcast: bool,
    pub allow_passive_bridging: bool,
    pub v4_assign_mode: String,
    pub v6_assign_mode: String,
    pub multicast_limit: i64,
    pub creation_time: i64,
    pub revision: i64,
    pub members: Vec<String>,
    pub relays: Vec<RelayView>,
    pub gateways: Vec<String>,
    pub routes: Vec<RouteView>,
    pub ip_assignment_pools: Vec<PoolView>,
    pub rules: Vec<RuleView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayView {
    pub address: String,
    pub phy_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteView {
    pub network: String,
    pub netmask_bits: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolView {
    pub network: String,
    pub ip_first: String,
    pub ip_last: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleView {
    pub rule_no: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_pcp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ether_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_dest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_dest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_tos: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_protocol: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_source_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_dest_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inv_flags: Option<i64>,
    pub action: String,
}

impl RestApiServer {
    /// `GET /network` — ascending list of 16-hex network ids.
    pub(crate) async fn list_networks(
        State(controller): State<Arc<Controller>>,
    ) -> Result<Response, ApiError> {
        let _guard = controller.lock().lock().await;
        let ids = db::list_network_ids(controller.store().pool()).await?;
        Ok(Json(ids).into_response())
    }

    /// `GET /network/{id}` — the full network object.
    pub(crate) async fn get_network(
        State(controller): State<Arc<Controller>>,
        Path(id): Path<String>,
    ) -> Result<Response, ApiError> {
        let Ok(nwid) = id.parse::<NetworkId>() else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };

        let _guard = controller.lock().lock().await;
        match render_network(controller.store().pool(), &nwid.to_string()).await? {
            Some(view) => Ok(Json(view).into_response()),
            None => Ok(StatusCode::NOT_FOUND.into_response()),
        }
    }

    /// `POST /network/{id}` — create/update a network.
    ///
    /// A path of ten hex digits followed by six underscores coins a new
    /// network id under that controller prefix with an unused random 24-bit
    /// suffix (503 when the suffix space is exhausted).
    pub(crate) async fn post_network(
        State(controller): State<Arc<Controller>>,
        Path(id): Path<String>,
        body: Bytes,
    ) -> Result<Response, ApiError> {
        let update: NetworkUpdate = serde_json::from_slice(&body).unwrap_or_default();

        let _guard = controller.lock().lock().await;
        let mut tx = controller.store().begin().await?;

        let coinage_prefix = id
            .strip_suffix("______")
            .and_then(|p| p.parse::<Address>().ok());
        let nwid_s = if let Ok(nwid) = id.parse::<NetworkId>() {
            nwid.to_string()
        } else if let Some(prefix) = coinage_prefix {
            match Self::coin_network_id(&mut tx, prefix).await? {
                Some(nwid) => {
                    info!(nwid = %nwid, "Coined network id");
                    nwid.to_string()
                }
                // the 24-bit suffix space under this prefix is full
                None => return Ok(StatusCode::SERVICE_UNAVAILABLE.into_response()),
            }
        } else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };

        let previous_revision = db::network_revision(&mut *tx, &nwid_s).await?;
        if previous_revision.is_none() {
            // new networks start out named after their id
            db::create_network(&mut *tx, &nwid_s, &nwid_s, now_millis() as i64).await?;
        }

        apply_network_update(&mut tx, &nwid_s, &update).await?;

        db::set_network_revision(&mut *tx, &nwid_s, previous_revision.unwrap_or(0) + 1).await?;
        tx.commit().await?;
        debug!(nwid = %nwid_s, "Network updated");

        match render_network(controller.store().pool(), &nwid_s).await? {
            Some(view) => Ok(Json(view).into_response()),
            None => Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        }
    }

    /// `DELETE /network/{id}` — drop a network and all of its child rows.
    pub(crate) async fn delete_network(
        State(controller): State<Arc<Controller>>,
        Path(id): Path<String>,
    ) -> Result<Response, ApiError> {
        let Ok(nwid) = id.parse::<NetworkId>() else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };

        let _guard = controller.lock().lock().await;
        let nwid_s = nwid.to_string();
        let pool = controller.store().pool();
        if db::network_revision(pool, &nwid_s).await?.is_none() {
            return Ok(StatusCode::NOT_FOUND.into_response());
        }

        db::delete_network(pool, &nwid_s).await?;
        info!(nwid = %nwid_s, "Network deleted");
        Ok(StatusCode::OK.into_response())
    }

    /// Probe for an unused id under `controller_address`, starting from a
    /// random 24-bit suffix. `Ok(None)` means the suffix space is full.
    async fn coin_network_id(
        tx: &mut sqlx::Transaction<'static, sqlx::Sqlite>,
        controller_address: Address,
    ) -> Result<Option<NetworkId>, ApiError> {
        let start = rand::random::<u32>() & 0x00ff_ffff;
        let mut suffix = start;
        loop {
            let candidate = NetworkId::from_controller(controller_address, suffix);
            let conn: &mut SqliteConnection = &mut *tx;
            if db::network_revision(conn, &candidate.to_string())
                .await?
                .is_none()
            {
                return Ok(Some(candidate));
            }
            suffix = (suffix + 1) & 0x00ff_ffff;
            if suffix == start {
                return Ok(None);
            }
        }
    }
}

async fn apply_network_update(
    tx: &mut sqlx::Transaction<'static, sqlx::Sqlite>,
    nwid_s: &str,
    update: &NetworkUpdate,
) -> Result<(), sqlx::Error> {
    if let Some(name) = update.name.as_deref().filter(|n| !n.is_empty()) {
        db::set_network_name(&mut **tx, nwid_s, name).await?;
    }
    if let Some(private) = update.private {
        db::set_network_private(&mut **tx, nwid_s, private).await?;
    }
    if let Some(enable) = update.enable_broadcast {
        db::set_network_enable_broadcast(&mut **tx, nwid_s, enable).await?;
    }
    if let Some(allow) = update.allow_passive_bridging {
        db::set_network_allow_passive_bridging(&mut **tx, nwid_s, allow).await?;
    }
    if let Some(mode) = update.v4_assign_mode.as_deref() {
        db::set_network_v4_assign_mode(&mut **tx, nwid_s, mode).await?;
    }
    if let Some(mode) = update.v6_assign_mode.as_deref() {
        db::set_network_v6_assign_mode(&mut **tx, nwid_s, mode).await?;
    }
    if let Some(limit) = update.multicast_limit {
        db::set_network_multicast_limit(&mut **tx, nwid_s, limit).await?;
    }

    if let Some(relays) = &update.relays {
        // last phyAddress wins per node id
        let mut by_node: BTreeMap<String, String> = BTreeMap::new();
        for relay in relays {
            let (Some(address), Some(phy_address)) =
                (relay.address.as_deref(), relay.phy_address.as_deref())
            else {
                continue;
            };
            let Ok(address) = address.parse::<Address>() else {
                continue;
            };
            by_node.insert(address.to_string(), phy_address.to_string());
        }
        db::delete_relays(&mut **tx, nwid_s).await?;
        for (node_id, phy_address) in &by_node {
            db::insert_relay(&mut **tx, nwid_s, node_id, phy_address).await?;
        }
    }

    if let Some(routes) = &update.routes {
        // first occurrence of a (target, bits) pair wins
        let mut seen: BTreeSet<(Vec<u8>, i64)> = BTreeSet::new();
        let mut inserts = Vec::new();
        for route in routes {
            let (Some(network), Some(bits)) = (route.network.as_deref(), route.netmask_bits)
            else {
                continue;
            };
            let Some((ip, _)) = blob::parse_ip_prefix(network) else {
                continue;
            };
            let max_bits = if ip.is_ipv4() { 32 } else { 128 };
            if bits <= 0 || bits >= max_bits {
                continue;
            }
            let node_id = route
                .node_id
                .as_deref()
                .and_then(|n| n.parse::<Address>().ok())
                .map(|a| a.to_string());
            let ip_blob = blob::ip_to_blob(ip).to_vec();
            if seen.insert((ip_blob.clone(), bits)) {
                inserts.push((node_id, ip_blob, bits, blob::ip_version(ip)));
            }
        }
        db::delete_routes(&mut **tx, nwid_s).await?;
        for (node_id, ip_blob, bits, version) in &inserts {
            db::insert_route(&mut **tx, nwid_s, node_id.as_deref(), ip_blob, *bits, *version)
                .await?;
        }
    }

    if let Some(gateways) = &update.gateways {
        // gateway strings are "<ip>/<metric>"; first occurrence of an IP wins
        let mut by_ip: BTreeMap<Vec<u8>, (i64, i64)> = BTreeMap::new();
        for gateway in gateways {
            let Some((ip, metric)) = blob::parse_ip_prefix(gateway) else {
                continue;
            };
            by_ip
                .entry(blob::ip_to_blob(ip).to_vec())
                .or_insert((blob::ip_version(ip), i64::from(metric)));
        }
        db::delete_gateways(&mut **tx, nwid_s).await?;
        for (ip_blob, (version, metric)) in &by_ip {
            db::insert_gateway(&mut **tx, nwid_s, ip_blob, *version, *metric).await?;
        }
    }

    if let Some(pools) = &update.ip_assignment_pools {
        let mut seen: BTreeSet<(Vec<u8>, Vec<u8>, Vec<u8>)> = BTreeSet::new();
        for pool in pools {
            let (Some(network), Some(ip_first), Some(ip_last)) = (
                pool.network.as_deref(),
                pool.ip_first.as_deref(),
                pool.ip_last.as_deref(),
            ) else {
                continue;
            };
            let (Some((route_ip, _)), Some((first, _)), Some((last, _))) = (
                blob::parse_ip_prefix(network),
                blob::parse_ip_prefix(ip_first),
                blob::parse_ip_prefix(ip_last),
            ) else {
                continue;
            };
            // a pool's route and bounds must share one address family
            if route_ip.is_ipv4() != first.is_ipv4() || first.is_ipv4() != last.is_ipv4() {
                continue;
            }
            seen.insert((
                blob::ip_to_blob(route_ip).to_vec(),
                blob::ip_to_blob(first).to_vec(),
                blob::ip_to_blob(last).to_vec(),
            ));
        }
        db::delete_assignment_pools(&mut **tx, nwid_s).await?;
        for (route_ip, first, last) in &seen {
            db::insert_assignment_pool(&mut **tx, nwid_s, route_ip, first, last).await?;
        }
    }

    if let Some(rules) = &update.rules {
        db::delete_rules(&mut **tx, nwid_s).await?;
        let mut seen_rule_nos: BTreeSet<i64> = BTreeSet::new();
        for rule in rules {
            // ruleNo and a non-empty action are mandatory; everything else
            // is a wildcard when absent
            let (Some(rule_no), Some(action)) = (
                rule.rule_no,
                rule.action.as_deref().filter(|a| !a.is_empty()),
            ) else {
                continue;
            };
            if !seen_rule_nos.insert(rule_no) {
                continue;
            }
            let node_id = rule
                .node_id
                .as_deref()
                .and_then(|n| n.parse::<Address>().ok())
                .map(|a| a.to_string());
            let mac_source = rule.mac_source.as_deref().and_then(blob::parse_mac);
            let mac_dest = rule.mac_dest.as_deref().and_then(blob::parse_mac);
            db::insert_rule(
                &mut **tx,
                nwid_s,
                &db::RuleInsert {
                    rule_no,
                    node_id: node_id.as_deref(),
                    vlan_id: rule.vlan_id,
                    vlan_pcp: rule.vlan_pcp,
                    ether_type: rule.ether_type.map(|et| et & 0xffff),
                    mac_source: mac_source.as_deref(),
                    mac_dest: mac_dest.as_deref(),
                    ip_source: rule.ip_source.as_deref(),
                    ip_dest: rule.ip_dest.as_deref(),
                    ip_tos: rule.ip_tos,
                    ip_protocol: rule.ip_protocol,
                    ip_source_port: rule.ip_source_port.map(|p| p & 0xffff),
                    ip_dest_port: rule.ip_dest_port.map(|p| p & 0xffff),
                    flags: rule.flags,
                    inv_flags: rule.inv_flags,
                    action,
                },
            )
            .await?;
        }
    }

    Ok(())
}

/// Render the network object the way every network-returning endpoint does.
pub(crate) async fn render_network(
    pool: &sqlx::SqlitePool,
    nwid_s: &str,
) -> Result<Option<NetworkView>, ApiError> {
    let Some(network) = db::network_by_id(pool, nwid_s).await? else {
        return Ok(None);
    };

    let members = db::member_ids(pool, nwid_s).await?;

    let relays = db::relays(pool, nwid_s)
        .await?
        .into_iter()
        .map(|r| RelayView {
            address: r.node_id,
            phy_address: r.phy_address,
        })
        .collect();

    let gateways = db::gateways(pool, nwid_s)
        .await?
        .into_iter()
        .filter_map(|g| {
            let ip = blob::blob_to_ip(&g.ip, g.ip_version)?;
            Some(format!("{}/{}", blob::format_ip(ip), g.metric))
        })
        .collect();

    let routes = db::routes(pool, nwid_s)
        .await?
        .into_iter()
        .filter_map(|r| {
            let ip = blob::blob_to_ip(&r.ip, r.ip_version)?;
            Some(RouteView {
                network: blob::format_ip(ip),
                netmask_bits: r.ip_netmask_bits,
            })
        })
        .collect();

    let ip_assignment_pools = db::assignment_pools(pool, nwid_s)
        .await?
        .into_iter()
        .filter_map(|p| {
            Some(PoolView {
                network: blob::format_ip(blob::blob_to_ip(&p.route_ip, p.ip_version)?),
                ip_first: blob::format_ip(blob::blob_to_ip(&p.ip_first, p.ip_version)?),
                ip_last: blob::format_ip(blob::blob_to_ip(&p.ip_last, p.ip_version)?),
            })
        })
        .collect();

    let rules = db::rules(pool, nwid_s)
        .await?
        .into_iter()
        .map(|r| RuleView {
            rule_no: r.rule_no,
            node_id: r.node_id,
            vlan_id: r.vlan_id,
            vlan_pcp: r.vlan_pcp,
            ether_type: r.ether_type,
            mac_source: r.mac_source.as_deref().map(blob::format_mac),
            mac_dest: r.mac_dest.as_deref().map(blob::format_mac),
            ip_source: r.ip_source,
            ip_dest: r.ip_dest,
            ip_tos: r.ip_tos,
            ip_protocol: r.ip_protocol,
            ip_source_port: r.ip_source_port,
            ip_dest_port: r.ip_dest_port,
            flags: r.flags,
            inv_flags: r.inv_flags,
            action: r.action.unwrap_or_else(|| "drop".to_string()),
        })
        .collect();

    Ok(Some(NetworkView {
        nwid: network.id,
        name: network.name,
        private: network.private,
        enable_broadcast: network.enable_broadcast,
        allow_passive_bridging: network.allow_passive_bridging,
        v4_assign_mode: network.v4_assign_mode,
        v6_assign_mode: network.v6_assign_mode,
        multicast_limit: network.multicast_limit,
        creation_time: network.creation_time,
        revision: network.revision,
        members,
        relays,
        gateways,
        routes,
        ip_assignment_pools,
        rules,
    }))
}
