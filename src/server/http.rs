//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; each connection runs on its own task.
//! Request bodies are read up front with a size cap, then handed to the
//! router under the configured request timeout.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::engine::ConsistencyEngine;
use crate::routes;
use crate::services::{AccountService, CatalogService};
use crate::store::Store;
use crate::types::{PlatformError, Result};

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Record store shared by every component
    pub store: Arc<dyn Store>,
    pub engine: ConsistencyEngine<dyn Store>,
    pub catalog: CatalogService,
    pub accounts: AccountService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn Store>) -> Self {
        let engine = ConsistencyEngine::new(Arc::clone(&store), args.enrollment_counting);
        let catalog = CatalogService::new(Arc::clone(&store), args.max_page_limit);
        let accounts = AccountService::new(Arc::clone(&store));

        Self {
            args,
            store,
            engine,
            catalog,
            accounts,
            started_at: Instant::now(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.args.request_timeout_ms)
    }
}

/// Accept connections until the listener fails
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "signlearn listening on {} (store: {})",
        state.args.listen,
        state.store.backend_name()
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Read the body, then route under the request timeout
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    info!("[{}] {} {}", addr, method, path);

    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("[{}] rejected body for {} {}: {}", addr, method, path, e);
            return Ok(routes::error_response(&PlatformError::Validation(
                "Request body too large or unreadable".into(),
            )));
        }
    };

    let timeout = state.request_timeout();
    let response = match tokio::time::timeout(
        timeout,
        routes::dispatch(&state, &method, &path, query.as_deref(), body),
    )
    .await
    {
        Ok(response) => response,
        Err(_) => {
            warn!("[{}] {} {} timed out after {:?}", addr, method, path, timeout);
            routes::error_response(&PlatformError::Store("Request timed out".into()))
        }
    };

    Ok(response)
}
