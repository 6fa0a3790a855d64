use std::path::PathBuf;

use axum::Router;
use drop_blob::UploadAdapter;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

use crate::middlewares::OriginPolicy;
use crate::{upload, DropAxumState};

pub struct AxumApp {
    pub state: DropAxumState,
    pub origins: OriginPolicy,
}

impl Clone for AxumApp {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            origins: self.origins.clone(),
        }
    }
}

impl AxumApp {
    pub fn new(adapter: UploadAdapter) -> Self {
        Self {
            state: DropAxumState::new(adapter),
            origins: OriginPolicy::any(),
        }
    }

    pub fn with_origins(mut self, origins: OriginPolicy) -> Self {
        self.origins = origins;
        self
    }

    pub fn with_spool_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.state = self.state.with_spool_dir(dir);
        self
    }

    /// The full service: every method and path goes to the upload handler,
    /// wrapped in origin policy, tracing and request ids.
    pub fn router(&self) -> Router<()> {
        Router::new()
            .fallback(upload::upload)
            .with_state(self.state.clone())
            .layer(self.origins.clone())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_request(DefaultOnRequest::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

pub fn axum(adapter: UploadAdapter) -> AxumApp {
    AxumApp::new(adapter)
}
