//! Member resources of the control plane.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lattice_core::dictionary::Dictionary;
use lattice_core::identity::{Address, Identity, NetworkId, SecretIdentity};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{self, blob};
use crate::engine::{Controller, DICT_KEY_ERROR};
use crate::rest_api::{ApiError, RestApiServer};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberUpdate {
    pub authorized: Option<bool>,
    pub active_bridge: Option<bool>,
    pub ip_assignments: Option<Vec<String>>,
}

/// Query arguments of the member GET debug facility: passing the member's
/// serialized identity plus the controller's full secret identity runs a
/// synthetic config request and embeds its outcome in the response. Meant
/// for exercising the whole controller through the JSON API.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberQuery {
    pub member_identity: Option<String>,
    pub signing_identity: Option<String>,
    pub have_revision: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub nwid: String,
    pub address: String,
    pub authorized: bool,
    pub active_bridge: bool,
    pub last_at: String,
    pub last_seen: i64,
    pub first_seen: i64,
    pub identity: String,
    pub ip_assignments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netconf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netconf_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netconf_result_message: Option<String>,
}

impl RestApiServer {
    /// `GET /network/{id}/member/{addr}`.
    pub(crate) async fn get_member(
        State(controller): State<Arc<Controller>>,
        Path((id, addr)): Path<(String, String)>,
        Query(query): Query<MemberQuery>,
    ) -> Result<Response, ApiError> {
        let (Ok(nwid), Ok(address)) = (id.parse::<NetworkId>(), addr.parse::<Address>()) else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };

        let view = {
            let _guard = controller.lock().lock().await;
            render_member(controller.store().pool(), &nwid.to_string(), &address.to_string())
                .await?
        };
        let Some(mut view) = view else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };

        // The debug invocation runs outside the render guard; the config
        // engine takes the controller lock itself.
        if query.member_identity.is_some() && query.signing_identity.is_some() {
            Self::embed_netconf(&controller, &query, nwid, &mut view).await;
        }

        Ok(Json(view).into_response())
    }

    async fn embed_netconf(
        controller: &Controller,
        query: &MemberQuery,
        nwid: NetworkId,
        view: &mut MemberView,
    ) {
        let member_identity = query
            .member_identity
            .as_deref()
            .and_then(|s| s.parse::<Identity>().ok());
        let signing_identity = query
            .signing_identity
            .as_deref()
            .and_then(|s| s.parse::<SecretIdentity>().ok());

        let (Some(member_identity), Some(signing_identity)) = (member_identity, signing_identity)
        else {
            view.netconf = Some(String::new());
            view.netconf_result = Some("INTERNAL_SERVER_ERROR".to_string());
            view.netconf_result_message = Some("invalid member or signing identity".to_string());
            return;
        };

        let (result, netconf) = controller
            .network_config_request(
                None,
                &signing_identity,
                &member_identity,
                nwid,
                &Dictionary::new(),
                query.have_revision.unwrap_or(0),
            )
            .await;

        view.netconf_result = Some(result.to_string());
        view.netconf_result_message = Some(
            netconf
                .get(DICT_KEY_ERROR)
                .unwrap_or_default()
                .to_string(),
        );
        view.netconf = Some(netconf.to_string());
    }

    /// `POST /network/{id}/member/{addr}` — upsert authorization flags and
    /// optionally replace the member's static IP assignments.
    pub(crate) async fn post_member(
        State(controller): State<Arc<Controller>>,
        Path((id, addr)): Path<(String, String)>,
        body: Bytes,
    ) -> Result<Response, ApiError> {
        let (Ok(nwid), Ok(address)) = (id.parse::<NetworkId>(), addr.parse::<Address>()) else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };
        let update: MemberUpdate = serde_json::from_slice(&body).unwrap_or_default();

        let _guard = controller.lock().lock().await;
        let nwid_s = nwid.to_string();
        let node_id = address.to_string();

        let mut tx = controller.store().begin().await?;
        if db::network_revision(&mut *tx, &nwid_s).await?.is_none() {
            return Ok(StatusCode::NOT_FOUND.into_response());
        }

        if db::member(&mut *tx, &nwid_s, &node_id).await?.is_none() {
            db::create_member(&mut *tx, &nwid_s, &node_id, false).await?;
        }

        if let Some(authorized) = update.authorized {
            db::set_member_authorized(&mut *tx, &nwid_s, &node_id, authorized).await?;
        }
        if let Some(active_bridge) = update.active_bridge {
            db::set_member_active_bridge(&mut *tx, &nwid_s, &node_id, active_bridge).await?;
        }

        if let Some(ip_assignments) = &update.ip_assignments {
            db::delete_ip_assignments(&mut *tx, &nwid_s, &node_id).await?;
            for assignment in ip_assignments {
                let Some((ip, bits)) = blob::parse_ip_prefix(assignment) else {
                    continue;
                };
                db::insert_ip_assignment(
                    &mut *tx,
                    &nwid_s,
                    &node_id,
                    &blob::ip_to_blob(ip),
                    i64::from(bits),
                    blob::ip_version(ip),
                    None,
                )
                .await?;
            }
        }

        tx.commit().await?;

        // A member whose node has never phoned home has no node row yet and
        // therefore no renderable view.
        match render_member(controller.store().pool(), &nwid_s, &node_id).await? {
            Some(view) => Ok(Json(view).into_response()),
            None => Ok(StatusCode::NOT_FOUND.into_response()),
        }
    }

    /// `DELETE /network/{id}/member/{addr}` — IP assignments first, then the
    /// member row.
    pub(crate) async fn delete_member(
        State(controller): State<Arc<Controller>>,
        Path((id, addr)): Path<(String, String)>,
    ) -> Result<Response, ApiError> {
        let (Ok(nwid), Ok(address)) = (id.parse::<NetworkId>(), addr.parse::<Address>()) else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };

        let _guard = controller.lock().lock().await;
        let nwid_s = nwid.to_string();
        let node_id = address.to_string();

        let mut tx = controller.store().begin().await?;
        if db::network_revision(&mut *tx, &nwid_s).await?.is_none() {
            return Ok(StatusCode::NOT_FOUND.into_response());
        }
        if db::member(&mut *tx, &nwid_s, &node_id).await?.is_none() {
            return Ok(StatusCode::NOT_FOUND.into_response());
        }

        db::delete_ip_assignments(&mut *tx, &nwid_s, &node_id).await?;
        db::delete_member(&mut *tx, &nwid_s, &node_id).await?;
        tx.commit().await?;
        info!(nwid = %nwid_s, node = %node_id, "Member deleted");

        Ok(StatusCode::OK.into_response())
    }
}

/// Render the member object; `None` when the member (or its node row) does
/// not exist.
pub(crate) async fn render_member(
    pool: &sqlx::SqlitePool,
    nwid_s: &str,
    node_id: &str,
) -> Result<Option<MemberView>, ApiError> {
    let Some(detail) = db::member_with_node(pool, nwid_s, node_id).await? else {
        return Ok(None);
    };

    let ip_assignments = db::ip_assignments_for_member(pool, nwid_s, node_id)
        .await?
        .into_iter()
        .filter_map(|a| {
            let ip = blob::blob_to_ip(&a.ip, a.ip_version)?;
            Some(format!("{}/{}", blob::format_ip(ip), a.ip_netmask_bits))
        })
        .collect();

    Ok(Some(MemberView {
        nwid: nwid_s.to_string(),
        address: node_id.to_string(),
        authorized: detail.authorized,
        active_bridge: detail.active_bridge,
        last_at: detail.last_at.unwrap_or_default(),
        last_seen: detail.last_seen,
        first_seen: detail.first_seen,
        identity: detail.identity,
        ip_assignments,
        netconf: None,
        netconf_result: None,
        netconf_result_message: None,
    }))
}
