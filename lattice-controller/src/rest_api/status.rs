use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use lattice_core::util::now_millis;
use serde::{Deserialize, Serialize};

use crate::engine::Controller;
use crate::rest_api::{RestApiServer, API_VERSION};

#[derive(Serialize, Deserialize)]
pub struct ControllerStatus {
    pub controller: bool,
    #[serde(rename = "apiVersion")]
    pub api_version: u32,
    pub clock: u64,
}

impl RestApiServer {
    /// `GET /controller` — liveness, API version and the controller clock.
    pub(crate) async fn status(State(_): State<Arc<Controller>>) -> Json<ControllerStatus> {
        Json(ControllerStatus {
            controller: true,
            api_version: API_VERSION,
            clock: now_millis(),
        })
    }
}
