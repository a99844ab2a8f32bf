//! Scoped config server lifetime

use super::ConfigServer;
use crate::error::MastersResult;
use std::sync::Arc;
use tracing::warn;

/// A started config server that must be stopped exactly once.
///
/// Call [`ServerScope::close`] on every normal exit path. If the scope is
/// dropped without closing (the owning future was cancelled), the server is
/// signalled to stop before the drop returns, so a following start on the
/// same server does not see it as busy. Servers that cannot be signalled get
/// their stop scheduled on the current runtime instead.
pub struct ServerScope {
    server: Arc<dyn ConfigServer>,
    open: bool,
}

impl ServerScope {
    /// Start `server` and return the scope that owns its lifetime
    pub async fn start(
        server: Arc<dyn ConfigServer>,
        base_url: &str,
        content: &str,
    ) -> MastersResult<Self> {
        server.start(base_url, content).await?;
        Ok(Self { server, open: true })
    }

    /// Stop the server
    pub async fn close(mut self) {
        self.open = false;
        self.server.stop().await;
    }
}

impl Drop for ServerScope {
    fn drop(&mut self) {
        if !self.open || self.server.signal_stop() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let server = self.server.clone();
                handle.spawn(async move { server.stop().await });
            }
            Err(_) => warn!("Config server scope dropped outside a runtime; server left running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preseed::PreseedServer;
    use crate::testing::FakeConfigServer;

    #[tokio::test]
    async fn close_stops_once() {
        let server = Arc::new(FakeConfigServer::default());
        let scope = ServerScope::start(server.clone(), "http://127.0.0.1:1/p", "cfg")
            .await
            .unwrap();
        scope.close().await;

        assert_eq!(server.starts(), 1);
        assert_eq!(server.stops(), 1);
        assert_eq!(server.last_content().as_deref(), Some("cfg"));
    }

    #[tokio::test]
    async fn drop_schedules_stop() {
        let server = Arc::new(FakeConfigServer::default());
        let scope = ServerScope::start(server.clone(), "http://127.0.0.1:1/p", "cfg")
            .await
            .unwrap();
        drop(scope);

        for _ in 0..100 {
            if server.stops() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(server.stops(), 1);
    }

    #[tokio::test]
    async fn dropped_scope_frees_server_for_next_start() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}/preseed.cfg", port);
        let server = Arc::new(PreseedServer::new());

        let scope = ServerScope::start(server.clone(), &url, "first").await.unwrap();
        drop(scope);
        assert!(server.local_addr().await.is_none());

        let scope = ServerScope::start(server.clone(), &url, "second").await.unwrap();
        assert_eq!(server.local_addr().await.map(|a| a.port()), Some(port));
        scope.close().await;
        assert!(server.local_addr().await.is_none());
    }

    #[tokio::test]
    async fn failed_start_has_nothing_to_stop() {
        let server = Arc::new(FakeConfigServer::failing());
        let result = ServerScope::start(server.clone(), "http://127.0.0.1:1/p", "cfg").await;

        assert!(result.is_err());
        assert_eq!(server.stops(), 0);
    }
}
