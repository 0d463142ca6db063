use axum::Router;
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use super::api::{create_api_router, AppState};
use super::ws::create_ws_router;
use crate::error::{GatewayError, Result};

/// Bind the HTTP port up front so a taken port fails startup.
pub fn bind(address: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(address)
        .map_err(|source| GatewayError::Bind { address: address.to_string(), source })?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api", create_api_router(state.clone()))
        .nest("/ws", create_ws_router(state))
        .fallback_service(ServeDir::new("static"))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// axum on its own runtime thread, so the pipeline threads never share an
/// executor with HTTP clients.
pub struct WebServer {
    handle: JoinHandle<()>,
    stop: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl WebServer {
    pub fn start(listener: TcpListener, state: AppState) -> Result<Self> {
        let local_addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("web-worker")
            .enable_all()
            .build()?;

        let handle = thread::Builder::new().name("web-server".to_string()).spawn(move || {
            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(l) => l,
                    Err(e) => {
                        error!("Failed to register web listener: {}", e);
                        return;
                    }
                };
                info!("Web server starting on http://{}", local_addr);

                let shutdown = async {
                    let _ = stop_rx.await;
                };
                if let Err(e) = axum::serve(listener, create_app(state))
                    .with_graceful_shutdown(shutdown)
                    .await
                {
                    error!("Web server error: {}", e);
                }
            });
            info!("Web server stopped");
        })?;

        Ok(Self {
            handle,
            stop: Some(stop_tx),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if self.handle.join().is_err() {
            error!("Web server thread panicked");
        }
    }
}
