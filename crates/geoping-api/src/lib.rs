// # Query Service
//
// HTTP endpoint serving the current device snapshot to the dashboard.
//
// ## Routes
//
// - `GET /` and `GET /<endpoint>`: the snapshot as a JSON array
// - `GET /<endpoint>/`: `301` to `/<endpoint>`, keeping the query string
// - `?user=<identity>` narrows the array to that owner's devices, unless the
//   identity is the administrative one
// - Anything else: `404`
//
// Requests are served from the shared `SnapshotHandle` and never touch the
// inventory file, so a slow or failing refresh cycle cannot fail a request.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use geoping_core::config::QueryConfig;
use geoping_core::filter::filter_by_identity;
use geoping_core::{Device, Error, Result, SnapshotHandle};

/// State shared by every request
#[derive(Clone)]
pub struct ApiState {
    pub handle: SnapshotHandle,
    pub admin_identity: Arc<str>,
}

impl ApiState {
    pub fn new(handle: SnapshotHandle, admin_identity: impl Into<Arc<str>>) -> Self {
        Self {
            handle,
            admin_identity: admin_identity.into(),
        }
    }
}

/// Build the query router
///
/// `endpoint` is served in addition to `/`.
pub fn build_router(state: ApiState, endpoint: &str) -> Router {
    let mut router = Router::new().route("/", get(list_devices));
    if endpoint != "/" {
        router = router.route(endpoint, get(list_devices));

        if !endpoint.ends_with('/') {
            let target: Arc<str> = Arc::from(endpoint);
            router = router.route(
                &format!("{}/", endpoint),
                get(move |RawQuery(query): RawQuery| redirect_to(target.clone(), query)),
            );
        }
    }
    router.fallback(not_found).with_state(state)
}

async fn list_devices(
    State(state): State<ApiState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<Vec<Device>> {
    // First `user` wins when the parameter is repeated
    let identity = params
        .iter()
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.as_str());

    let snapshot = state.handle.current();
    let devices = filter_by_identity(&snapshot.devices, identity, &state.admin_identity);
    debug!(
        "Serving {}/{} devices (user={:?}, snapshot v{})",
        devices.len(),
        snapshot.len(),
        identity,
        snapshot.version
    );
    Json(devices)
}

async fn redirect_to(target: Arc<str>, query: Option<String>) -> impl IntoResponse {
    let location = match query {
        Some(query) => format!("{}?{}", target, query),
        None => target.to_string(),
    };
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)])
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Bind the listen socket
///
/// Fails with [`Error::Listen`] when the address is invalid or in use.
pub async fn bind(listen_addr: &str) -> Result<TcpListener> {
    let addr: SocketAddr = listen_addr
        .parse()
        .map_err(|e| Error::listen(format!("Invalid listen address '{}': {}", listen_addr, e)))?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::listen(format!("Cannot bind {}: {}", addr, e)))
}

/// Serve `router` on `listener` until `shutdown` is cancelled
///
/// In-flight requests are allowed to complete.
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> Result<()> {
    let local = listener.local_addr()?;
    info!("Query service listening on http://{}", local);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Error::listen(format!("Query service failed: {}", e)))?;

    info!("Query service stopped");
    Ok(())
}

/// Bind and build the router from `config`
pub async fn prepare(config: &QueryConfig, handle: SnapshotHandle) -> Result<(TcpListener, Router)> {
    let listener = bind(&config.listen_addr).await?;
    let state = ApiState::new(handle, config.admin_identity.as_str());
    Ok((listener, build_router(state, &config.endpoint)))
}
