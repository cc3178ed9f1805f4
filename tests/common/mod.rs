//! Shared test utilities

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use voicechat_gateway::{ApiServerBuilder, DbPool, db};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Build the full application router over `db`
#[must_use]
pub fn build_test_router(db: DbPool) -> axum::Router {
    ApiServerBuilder::new(db, 0)
        .build()
        .expect("failed to build server")
        .router()
}

/// Running server bound to an ephemeral port; stops when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Base HTTP URL, e.g. `http://127.0.0.1:54321`
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Spawn a live server on 127.0.0.1 with a fresh in-memory database
pub async fn spawn_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("no local addr");

    let server = ApiServerBuilder::new(setup_test_db(), addr.port())
        .build()
        .expect("failed to build server");

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = server
            .serve_with_shutdown(listener, async {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        addr,
        shutdown: Some(tx),
    }
}
