use std::net::SocketAddr;
use std::sync::Arc;

use faq_cascade::gateway::{HandlerState, create_router_with_state};
use faq_cascade::{EntryFetcher, Embedder, Resolver};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A gateway bound to an ephemeral local port, aborted on drop.
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_test_server<F, E>(resolver: Arc<Resolver<F, E>>) -> std::io::Result<TestServer>
where
    F: EntryFetcher + 'static,
    E: Embedder + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router_with_state(HandlerState::new(resolver));

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer { addr, handle })
}
