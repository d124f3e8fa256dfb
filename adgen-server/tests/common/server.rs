//! Live API server for integration tests.
//!
//! Spins up the real API router on a random port, backed by the fake
//! services in [`super`], so requests carry a real client address.

use std::net::SocketAddr;

use adgen_server::{api_router, AppState, RateLimiters};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A running API server and its shutdown handle.
pub struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with the given state on a random available port.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or the server fails to bind.
    pub async fn start(state: AppState) -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let app = api_router(state, &RateLimiters::default());

        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("server error");
        });

        // let the accept loop start
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            client: reqwest::Client::new(),
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Full URL for a path.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Shared HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Stop accepting and wait up to five seconds for the server task.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), self.handle).await;
    }
}
