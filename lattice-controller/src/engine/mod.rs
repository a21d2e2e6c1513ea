//! The network-config request engine.
//!
//! This is the authoritative control path a member node hits when it wants
//! to (re)join a network: bind the requesting identity to its node record,
//! admit or refuse, auto-assign an IPv4 address from the network's pools if
//! needed, assemble the config dictionary, and sign it. Everything runs
//! under the controller lock inside a single store transaction.

mod result;

pub use result::*;

use std::net::SocketAddr;

use lattice_core::com::{CertificateOfMembership, REVISION_MAX_DELTA};
use lattice_core::dictionary::Dictionary;
use lattice_core::identity::{Identity, NetworkId, SecretIdentity};
use lattice_core::util::now_millis;
use sqlx::{Sqlite, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, error, trace};

use crate::db::{self, blob, Store};

pub const DICT_KEY_TIMESTAMP: &str = "ts";
pub const DICT_KEY_REVISION: &str = "r";
pub const DICT_KEY_NETWORK_ID: &str = "nwid";
pub const DICT_KEY_ISSUED_TO: &str = "id";
pub const DICT_KEY_PRIVATE: &str = "p";
pub const DICT_KEY_NAME: &str = "n";
pub const DICT_KEY_ENABLE_BROADCAST: &str = "eb";
pub const DICT_KEY_ALLOW_PASSIVE_BRIDGING: &str = "pb";
pub const DICT_KEY_ALLOWED_ETHER_TYPES: &str = "et";
pub const DICT_KEY_MULTICAST_LIMIT: &str = "ml";
pub const DICT_KEY_ACTIVE_BRIDGES: &str = "ab";
pub const DICT_KEY_RELAYS: &str = "rl";
pub const DICT_KEY_GATEWAYS: &str = "gw";
pub const DICT_KEY_IPV4_STATIC: &str = "v4s";
pub const DICT_KEY_COM: &str = "com";
pub const DICT_KEY_ERROR: &str = "error";

/// Serialized active-bridge list is not allowed to grow past this.
const ACTIVE_BRIDGES_MAX_LEN: usize = 1024;

/// One controller instance per database file.
///
/// All operations (config requests and admin mutations alike) serialize
/// through [`Controller::lock`]; the store transaction inside each operation
/// then gives every request a consistent snapshot.
pub struct Controller {
    store: Store,
    signer: SecretIdentity,
    lock: Mutex<()>,
}

impl Controller {
    pub fn new(store: Store, signer: SecretIdentity) -> Self {
        Self {
            store,
            signer,
            lock: Mutex::new(()),
        }
    }

    /// The controller's own signing identity.
    pub fn signer(&self) -> &SecretIdentity {
        &self.signer
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    /// Release the store, flushing deferred writes.
    pub async fn shutdown(&self) {
        self.store.close().await;
    }

    /// Handle a network-config request from `requester`.
    ///
    /// `peer_addr` is the physical endpoint the request arrived from, absent
    /// for relayed requests. `signer` must be the identity owning the upper
    /// 40 bits of `nwid`. `have_revision` is the config revision the member
    /// already holds (0 for none). On [`RequestResult::Ok`] the returned
    /// dictionary is fully populated and signed; on
    /// [`RequestResult::InternalServerError`] it carries a diagnostic under
    /// the `error` key; otherwise it is empty.
    pub async fn network_config_request(
        &self,
        peer_addr: Option<SocketAddr>,
        signer: &SecretIdentity,
        requester: &Identity,
        nwid: NetworkId,
        _meta: &Dictionary,
        have_revision: u64,
    ) -> (RequestResult, Dictionary) {
        let _guard = self.lock.lock().await;

        if signer.address() != nwid.controller_address() {
            let mut netconf = Dictionary::new();
            netconf.set(
                DICT_KEY_ERROR,
                "signing identity address does not match most significant 40 bits of network ID",
            );
            return (RequestResult::InternalServerError, netconf);
        }

        match self
            .handle_request(peer_addr, signer, requester, nwid, have_revision)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%nwid, requester = %requester.address(), "Config request failed: {e}");
                let mut netconf = Dictionary::new();
                netconf.set(DICT_KEY_ERROR, e.to_string());
                (RequestResult::InternalServerError, netconf)
            }
        }
    }

    async fn handle_request(
        &self,
        peer_addr: Option<SocketAddr>,
        signer: &SecretIdentity,
        requester: &Identity,
        nwid: NetworkId,
        have_revision: u64,
    ) -> Result<(RequestResult, Dictionary), db::Error> {
        let mut tx = self.store.begin().await?;
        let now = now_millis() as i64;
        let nwid_s = nwid.to_string();
        let node_id = requester.address().to_string();
        let last_at = peer_addr.map(|a| a.to_string());

        // Identity binding: identities are first-come-first-claim. A node
        // record never changes its identity; a mismatch is a refusal, not an
        // update.
        match db::node_identity(&mut *tx, &node_id).await? {
            Some(stored) => {
                // An unparsable stored identity is treated the same as a
                // mismatch: refuse, never rewrite.
                match stored.parse::<Identity>() {
                    Ok(known) if known == *requester => {}
                    _ => {
                        trace!(node = %node_id, "Requester identity does not match stored identity");
                        return Self::decide(tx, RequestResult::AccessDenied).await;
                    }
                }
                db::update_node_seen(&mut *tx, &node_id, now, last_at.as_deref()).await?;
            }
            None => {
                db::create_node(
                    &mut *tx,
                    &node_id,
                    &requester.to_string(),
                    last_at.as_deref().unwrap_or(""),
                    now,
                )
                .await?;
            }
        }

        let Some(network) = db::network_by_id(&mut *tx, &nwid_s).await? else {
            return Self::decide(tx, RequestResult::ObjectNotFound).await;
        };

        let member = match db::member(&mut *tx, &nwid_s, &node_id).await? {
            Some(member) => member,
            None => {
                // Unknown nodes become members on first contact,
                // auto-authorized only on public networks.
                let authorized = !network.private;
                db::create_member(&mut *tx, &nwid_s, &node_id, authorized).await?;
                db::MemberRow {
                    authorized,
                    active_bridge: false,
                }
            }
        };

        if !member.authorized {
            return Self::decide(tx, RequestResult::AccessDenied).await;
        }

        // Member already holds the current revision: no payload needed.
        if have_revision > 0 && have_revision == network.revision as u64 {
            return Self::decide(tx, RequestResult::OkButNotNewer).await;
        }

        let mut netconf = Dictionary::new();
        netconf.set(DICT_KEY_TIMESTAMP, format!("{now:016x}"));
        netconf.set(DICT_KEY_REVISION, format!("{:016x}", network.revision));
        netconf.set(DICT_KEY_NETWORK_ID, nwid_s.as_str());
        netconf.set(DICT_KEY_ISSUED_TO, node_id.as_str());
        netconf.set(DICT_KEY_PRIVATE, if network.private { "1" } else { "0" });
        netconf.set(DICT_KEY_NAME, network.name.as_str());
        netconf.set(
            DICT_KEY_ENABLE_BROADCAST,
            if network.enable_broadcast { "1" } else { "0" },
        );
        netconf.set(
            DICT_KEY_ALLOW_PASSIVE_BRIDGING,
            if network.allow_passive_bridging { "1" } else { "0" },
        );
        netconf.set(
            DICT_KEY_ALLOWED_ETHER_TYPES,
            allowed_ether_types_csv(db::accept_rule_ether_types(&mut *tx, &nwid_s).await?),
        );

        if network.multicast_limit > 0 {
            netconf.set(
                DICT_KEY_MULTICAST_LIMIT,
                format!("{:x}", network.multicast_limit),
            );
        }

        let mut active_bridges = String::new();
        for bridge in db::active_bridges(&mut *tx, &nwid_s).await? {
            if bridge.len() != 10 {
                continue;
            }
            if !active_bridges.is_empty() {
                active_bridges.push(',');
            }
            active_bridges.push_str(&bridge);
            if active_bridges.len() > ACTIVE_BRIDGES_MAX_LEN {
                break;
            }
        }
        if !active_bridges.is_empty() {
            netconf.set(DICT_KEY_ACTIVE_BRIDGES, active_bridges);
        }

        let relays: Vec<String> = db::relays(&mut *tx, &nwid_s)
            .await?
            .into_iter()
            .map(|r| format!("{};{}", r.node_id, r.phy_address))
            .collect();
        if !relays.is_empty() {
            netconf.set(DICT_KEY_RELAYS, relays.join(","));
        }

        let gateways: Vec<String> = db::gateways(&mut *tx, &nwid_s)
            .await?
            .into_iter()
            .filter_map(|g| {
                let ip = blob::blob_to_ip(&g.ip, g.ip_version)?;
                Some(format!("{}/{}", blob::format_ip(ip), g.metric))
            })
            .collect();
        if !gateways.is_empty() {
            netconf.set(DICT_KEY_GATEWAYS, gateways.join(","));
        }

        if network.v4_assign_mode == "zt" {
            let mut v4s: Vec<String> = db::ip_assignments_for_member(&mut *tx, &nwid_s, &node_id)
                .await?
                .into_iter()
                .filter(|a| {
                    a.ip_version == 4 && a.ip_netmask_bits > 0 && a.ip_netmask_bits <= 32
                })
                .filter_map(|a| {
                    let ip = blob::blob_to_ip(&a.ip, 4)?;
                    Some(format!("{}/{}", ip, a.ip_netmask_bits))
                })
                .collect();

            if v4s.is_empty() {
                if let Some(assigned) = self.allocate_v4(&mut tx, &nwid_s, &node_id).await? {
                    debug!(%nwid, node = %node_id, ip = %assigned, "Auto-assigned IPv4 address");
                    v4s.push(assigned);
                }
            }

            if !v4s.is_empty() {
                netconf.set(DICT_KEY_IPV4_STATIC, v4s.join(","));
            }
        }

        if network.private {
            let mut com = CertificateOfMembership::new(
                network.revision as u64,
                REVISION_MAX_DELTA,
                nwid,
                requester.address(),
            );
            com.sign(signer);
            netconf.set(DICT_KEY_COM, com.to_string());
        }

        netconf.sign(signer, now as u64);

        tx.commit().await?;
        Ok((RequestResult::Ok, netconf))
    }

    /// Commit node/member bookkeeping and surface a non-`Ok` decision. The
    /// decisions are legitimate outcomes, not failures: a denied or stale
    /// request still updates `lastSeen` and may have created its node or
    /// member row.
    async fn decide(
        tx: Transaction<'static, Sqlite>,
        result: RequestResult,
    ) -> Result<(RequestResult, Dictionary), db::Error> {
        tx.commit().await?;
        Ok((result, Dictionary::new()))
    }

    /// First-fit IPv4 allocation. Pools are scanned in stable (routeIp)
    /// order; within a pool candidates run from `ipFirst` to `ipLast` in
    /// numeric order and the first address with no existing
    /// `(network, ip, version)` row wins. Exhaustion is not an error.
    async fn allocate_v4(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        network_id: &str,
        node_id: &str,
    ) -> Result<Option<String>, db::Error> {
        for pool in db::assignment_pools(&mut **tx, network_id).await? {
            if pool.ip_version != 4 || pool.ip_netmask_bits <= 0 || pool.ip_netmask_bits >= 32 {
                continue;
            }
            let (Some(first), Some(last)) = (
                blob::v4_from_blob(&pool.ip_first),
                blob::v4_from_blob(&pool.ip_last),
            ) else {
                continue;
            };

            for candidate in first..=last {
                let candidate_blob = blob::v4_to_blob(candidate);
                if db::ip_taken(&mut **tx, network_id, &candidate_blob, 4).await? {
                    continue;
                }
                db::insert_ip_assignment(
                    &mut **tx,
                    network_id,
                    node_id,
                    &candidate_blob,
                    pool.ip_netmask_bits,
                    4,
                    Some(&pool.route_ip),
                )
                .await?;
                let octets = candidate.to_be_bytes();
                return Ok(Some(format!(
                    "{}.{}.{}.{}/{}",
                    octets[0], octets[1], octets[2], octets[3], pool.ip_netmask_bits
                )));
            }
        }
        Ok(None)
    }
}

/// Sorted, deduplicated 4-hex CSV of allowed ether types.
fn allowed_ether_types_csv(mut ether_types: Vec<i64>) -> String {
    ether_types.retain(|et| (0..=0xffff).contains(et));
    ether_types.sort_unstable();
    ether_types.dedup();
    ether_types
        .iter()
        .map(|et| format!("{et:04x}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use std::net::IpAddr;

    async fn controller() -> Controller {
        let store = Store::open_in_memory().await;
        Controller::new(store, SecretIdentity::generate())
    }

    fn nwid_of(controller: &Controller) -> NetworkId {
        NetworkId::from_controller(controller.signer().address(), 1)
    }

    async fn create_network(controller: &Controller, nwid: NetworkId, private: bool) {
        let pool = controller.store().pool();
        let id = nwid.to_string();
        db::create_network(pool, &id, "demo", 1).await.unwrap();
        db::set_network_private(pool, &id, private).await.unwrap();
    }

    async fn with_v4_pool(controller: &Controller, nwid: NetworkId, first: &str, last: &str) {
        let pool = controller.store().pool();
        let id = nwid.to_string();
        let route: IpAddr = "10.0.0.0".parse().unwrap();
        db::set_network_v4_assign_mode(pool, &id, "zt").await.unwrap();
        db::insert_route(pool, &id, None, &blob::ip_to_blob(route), 24, 4)
            .await
            .unwrap();
        db::insert_assignment_pool(
            pool,
            &id,
            &blob::ip_to_blob(route),
            &blob::ip_to_blob(first.parse().unwrap()),
            &blob::ip_to_blob(last.parse().unwrap()),
        )
        .await
        .unwrap();
    }

    async fn request(
        controller: &Controller,
        requester: &SecretIdentity,
        nwid: NetworkId,
        have_revision: u64,
    ) -> (RequestResult, Dictionary) {
        let signer = controller.signer().clone();
        controller
            .network_config_request(
                None,
                &signer,
                requester.public(),
                nwid,
                &Dictionary::new(),
                have_revision,
            )
            .await
    }

    #[tokio::test]
    async fn test_public_network_autoadmits_and_assigns() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);
        create_network(&controller, nwid, false).await;
        with_v4_pool(&controller, nwid, "10.0.0.2", "10.0.0.10").await;

        let member = SecretIdentity::generate();
        let (result, netconf) = request(&controller, &member, nwid, 0).await;

        assert_eq!(result, RequestResult::Ok);
        assert_eq!(netconf.get(DICT_KEY_PRIVATE), Some("0"));
        assert_eq!(netconf.get(DICT_KEY_NETWORK_ID), Some(nwid.to_string().as_str()));
        assert_eq!(
            netconf.get(DICT_KEY_ISSUED_TO),
            Some(member.address().to_string().as_str())
        );
        assert_eq!(netconf.get(DICT_KEY_IPV4_STATIC), Some("10.0.0.2/24"));
        assert_eq!(netconf.get(DICT_KEY_ALLOWED_ETHER_TYPES), Some(""));
        assert!(netconf.get(DICT_KEY_COM).is_none());
        assert!(netconf.verify(controller.signer().public()));

        let row = db::member(
            controller.store().pool(),
            &nwid.to_string(),
            &member.address().to_string(),
        )
        .await
        .unwrap()
        .expect("member row created");
        assert!(row.authorized);
    }

    #[tokio::test]
    async fn test_two_requesters_get_distinct_addresses() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);
        create_network(&controller, nwid, false).await;
        with_v4_pool(&controller, nwid, "10.0.0.2", "10.0.0.10").await;

        let a = SecretIdentity::generate();
        let b = SecretIdentity::generate();

        let (_, netconf_a) = request(&controller, &a, nwid, 0).await;
        let (_, netconf_b) = request(&controller, &b, nwid, 0).await;
        assert_eq!(netconf_a.get(DICT_KEY_IPV4_STATIC), Some("10.0.0.2/24"));
        assert_eq!(netconf_b.get(DICT_KEY_IPV4_STATIC), Some("10.0.0.3/24"));

        // a stable repeat: the existing assignment is returned, not a new one
        let (_, netconf_a2) = request(&controller, &a, nwid, 0).await;
        assert_eq!(netconf_a2.get(DICT_KEY_IPV4_STATIC), Some("10.0.0.2/24"));
    }

    #[tokio::test]
    async fn test_identity_collision_is_denied_without_rebinding() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);
        create_network(&controller, nwid, false).await;

        let requester = SecretIdentity::generate();
        let original = SecretIdentity::generate();

        // the requester's address is already bound to someone else's identity
        let stored_identity = original.public().to_string();
        db::create_node(
            controller.store().pool(),
            &requester.address().to_string(),
            &stored_identity,
            "",
            1,
        )
        .await
        .unwrap();

        let (result, _) = request(&controller, &requester, nwid, 0).await;
        assert_eq!(result, RequestResult::AccessDenied);

        let still_stored = db::node_identity(
            controller.store().pool(),
            &requester.address().to_string(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(still_stored, stored_identity);
    }

    #[tokio::test]
    async fn test_private_network_gates_until_authorized() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);
        create_network(&controller, nwid, true).await;

        let member = SecretIdentity::generate();
        let (result, _) = request(&controller, &member, nwid, 0).await;
        assert_eq!(result, RequestResult::AccessDenied);

        let node_id = member.address().to_string();
        let row = db::member(controller.store().pool(), &nwid.to_string(), &node_id)
            .await
            .unwrap()
            .expect("provisional member row created");
        assert!(!row.authorized);

        db::set_member_authorized(controller.store().pool(), &nwid.to_string(), &node_id, true)
            .await
            .unwrap();

        let (result, netconf) = request(&controller, &member, nwid, 0).await;
        assert_eq!(result, RequestResult::Ok);
        assert_eq!(netconf.get(DICT_KEY_PRIVATE), Some("1"));

        let com: CertificateOfMembership =
            netconf.get(DICT_KEY_COM).expect("com present").parse().unwrap();
        assert!(com.verify(controller.signer().public()));
        assert_eq!(com.network_id(), nwid);
        assert_eq!(com.issued_to(), member.address());
    }

    #[tokio::test]
    async fn test_revision_short_circuit() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);
        create_network(&controller, nwid, false).await;

        let member = SecretIdentity::generate();
        let (result, netconf) = request(&controller, &member, nwid, 0).await;
        assert_eq!(result, RequestResult::Ok);

        let revision = u64::from_str_radix(netconf.get(DICT_KEY_REVISION).unwrap(), 16).unwrap();
        let (result, netconf) = request(&controller, &member, nwid, revision).await;
        assert_eq!(result, RequestResult::OkButNotNewer);
        assert!(netconf.is_empty());

        // an older revision still gets a full config
        let (result, _) = request(&controller, &member, nwid, revision + 1).await;
        assert_eq!(result, RequestResult::Ok);
    }

    #[tokio::test]
    async fn test_unknown_network_keeps_node_bookkeeping() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);

        let member = SecretIdentity::generate();
        let (result, _) = request(&controller, &member, nwid, 0).await;
        assert_eq!(result, RequestResult::ObjectNotFound);

        // the node row outlives the refusal
        let stored = db::node_identity(
            controller.store().pool(),
            &member.address().to_string(),
        )
        .await
        .unwrap();
        assert_eq!(stored, Some(member.public().to_string()));
    }

    #[tokio::test]
    async fn test_foreign_signer_is_rejected() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);
        create_network(&controller, nwid, false).await;

        let member = SecretIdentity::generate();
        let imposter = SecretIdentity::generate();
        let (result, netconf) = controller
            .network_config_request(
                None,
                &imposter,
                member.public(),
                nwid,
                &Dictionary::new(),
                0,
            )
            .await;
        assert_eq!(result, RequestResult::InternalServerError);
        assert!(netconf.get(DICT_KEY_ERROR).is_some());
    }

    #[tokio::test]
    async fn test_pool_exhaustion_is_not_an_error() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);
        create_network(&controller, nwid, false).await;
        with_v4_pool(&controller, nwid, "10.0.0.2", "10.0.0.3").await;

        let a = SecretIdentity::generate();
        let b = SecretIdentity::generate();
        let c = SecretIdentity::generate();

        let (_, netconf_a) = request(&controller, &a, nwid, 0).await;
        let (_, netconf_b) = request(&controller, &b, nwid, 0).await;
        assert_eq!(netconf_a.get(DICT_KEY_IPV4_STATIC), Some("10.0.0.2/24"));
        assert_eq!(netconf_b.get(DICT_KEY_IPV4_STATIC), Some("10.0.0.3/24"));

        let (result, netconf_c) = request(&controller, &c, nwid, 0).await;
        assert_eq!(result, RequestResult::Ok);
        assert!(netconf_c.get(DICT_KEY_IPV4_STATIC).is_none());
    }

    #[tokio::test]
    async fn test_pool_without_route_is_invisible() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);
        create_network(&controller, nwid, false).await;

        let pool = controller.store().pool();
        let id = nwid.to_string();
        db::set_network_v4_assign_mode(pool, &id, "zt").await.unwrap();
        let route: IpAddr = "10.0.0.0".parse().unwrap();
        db::insert_assignment_pool(
            pool,
            &id,
            &blob::ip_to_blob(route),
            &blob::ip_to_blob("10.0.0.2".parse().unwrap()),
            &blob::ip_to_blob("10.0.0.10".parse().unwrap()),
        )
        .await
        .unwrap();

        let member = SecretIdentity::generate();
        let (result, netconf) = request(&controller, &member, nwid, 0).await;
        assert_eq!(result, RequestResult::Ok);
        assert!(netconf.get(DICT_KEY_IPV4_STATIC).is_none());
    }

    #[tokio::test]
    async fn test_ether_types_sorted_and_deduplicated() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);
        create_network(&controller, nwid, false).await;

        let pool = controller.store().pool();
        let id = nwid.to_string();
        for (rule_no, ether_type, action) in
            [(1, 0x0806, "accept"), (2, 0x0800, "accept"), (3, 0x0800, "accept"), (4, 0x86dd, "drop")]
        {
            db::insert_rule(
                pool,
                &id,
                &db::RuleInsert {
                    rule_no,
                    node_id: None,
                    vlan_id: None,
                    vlan_pcp: None,
                    ether_type: Some(ether_type),
                    mac_source: None,
                    mac_dest: None,
                    ip_source: None,
                    ip_dest: None,
                    ip_tos: None,
                    ip_protocol: None,
                    ip_source_port: None,
                    ip_dest_port: None,
                    flags: None,
                    inv_flags: None,
                    action,
                },
            )
            .await
            .unwrap();
        }

        let member = SecretIdentity::generate();
        let (_, netconf) = request(&controller, &member, nwid, 0).await;
        assert_eq!(netconf.get(DICT_KEY_ALLOWED_ETHER_TYPES), Some("0800,0806"));
    }

    #[tokio::test]
    async fn test_collections_render_into_dictionary() {
        let controller = controller().await;
        let nwid = nwid_of(&controller);
        create_network(&controller, nwid, false).await;

        let pool = controller.store().pool();
        let id = nwid.to_string();
        db::insert_relay(pool, &id, "bbbbbbbbbb", "192.0.2.10/9993").await.unwrap();
        db::insert_gateway(
            pool,
            &id,
            &blob::ip_to_blob("10.0.0.1".parse().unwrap()),
            4,
            0,
        )
        .await
        .unwrap();

        let bridge = SecretIdentity::generate();
        let bridge_id = bridge.address().to_string();
        db::create_member(pool, &id, &bridge_id, true).await.unwrap();
        db::set_member_active_bridge(pool, &id, &bridge_id, true).await.unwrap();

        let member = SecretIdentity::generate();
        let (_, netconf) = request(&controller, &member, nwid, 0).await;
        assert_eq!(
            netconf.get(DICT_KEY_RELAYS),
            Some("bbbbbbbbbb;192.0.2.10/9993")
        );
        assert_eq!(netconf.get(DICT_KEY_GATEWAYS), Some("10.0.0.1/0"));
        assert_eq!(netconf.get(DICT_KEY_ACTIVE_BRIDGES), Some(bridge_id.as_str()));
    }
}
