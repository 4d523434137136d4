//! HTTP listener bound to an ephemeral port for tests

use logicbox_sandbox::SandboxService;
use logicbox_transport::{start_server, HttpServerState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A running HTTP listener, shut down on drop
pub struct TestServer {
    pub addr: SocketAddr,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub async fn start(service: Arc<SandboxService>) -> anyhow::Result<Self> {
        Self::start_with_body_limit(service, 64 * 1024).await
    }

    pub async fn start_with_body_limit(
        service: Arc<SandboxService>,
        max_body_bytes: usize,
    ) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(start_server(
            listener,
            HttpServerState::new(service),
            max_body_bytes,
        ));
        Ok(Self { addr, handle })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
