use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::Controller;
use crate::rest_api::error;

pub struct RestApiServer {
    controller: Arc<Controller>,
}

impl RestApiServer {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }

    /// The control plane route tree of the controller.
    pub fn router(controller: Arc<Controller>) -> Router {
        Router::new()
            .route("/controller", get(Self::status))
            .route("/network", get(Self::list_networks))
            .route(
                "/network/{id}",
                get(Self::get_network)
                    .post(Self::post_network)
                    .delete(Self::delete_network),
            )
            .route(
                "/network/{id}/member/{addr}",
                get(Self::get_member)
                    .post(Self::post_member)
                    .delete(Self::delete_member),
            )
            .with_state(controller)
    }

    /// Serve the control plane until `shutdown` fires.
    pub async fn bind(
        &self,
        listen: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<(), error::Error> {
        let api = Self::router(self.controller.clone());
        let listener = TcpListener::bind(listen)
            .await
            .map_err(error::Error::Bind)?;
        info!("Control plane listening on {listen}");
        axum::serve(listener, api)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(error::Error::Serve)?;

        Ok(())
    }
}
