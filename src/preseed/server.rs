//! Minimal HTTP server for preseed files

use super::ConfigServer;
use crate::error::{MastersError, MastersResult};
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ureq::http::Uri;

/// Largest request head read before answering
const MAX_REQUEST_HEAD: usize = 8 * 1024;

struct Running {
    addr: SocketAddr,
    /// `None` once shutdown was signalled
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Serves one preseed document over HTTP.
///
/// The host in the base URL is how the guest sees the host (for NAT that is
/// usually `10.0.2.2`), so the listener binds every interface on the URL's
/// port and answers any path with the same content.
#[derive(Default)]
pub struct PreseedServer {
    running: Mutex<Option<Running>>,
}

impl PreseedServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address the server is listening on, if running
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running
            .lock()
            .await
            .as_ref()
            .filter(|r| r.shutdown.is_some())
            .map(|r| r.addr)
    }
}

fn listen_port(base_url: &str) -> MastersResult<u16> {
    let uri: Uri = base_url
        .parse()
        .map_err(|e| MastersError::ConfigServer(format!("invalid URL '{}': {}", base_url, e)))?;

    match (uri.port_u16(), uri.scheme_str()) {
        (Some(port), _) => Ok(port),
        (None, Some("http")) => Ok(80),
        _ => Err(MastersError::ConfigServer(format!(
            "cannot determine port of '{}'",
            base_url
        ))),
    }
}

#[async_trait]
impl ConfigServer for PreseedServer {
    async fn start(&self, base_url: &str, content: &str) -> MastersResult<()> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            if current.shutdown.is_some() {
                return Err(MastersError::ConfigServer(format!(
                    "already serving on {}",
                    current.addr
                )));
            }
        }
        // A signalled server still holds its port until its task ends
        if let Some(stale) = running.take() {
            debug!("Waiting for signalled preseed server on {}", stale.addr);
            if let Err(e) = stale.task.await {
                warn!("Preseed server task ended abnormally: {}", e);
            }
        }

        let port = listen_port(base_url)?;
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|e| MastersError::ConfigServer(format!("binding port {}: {}", port, e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| MastersError::io("reading listener address", e))?;

        let (shutdown, shutdown_rx) = oneshot::channel();
        let body: Arc<str> = Arc::from(content);
        let task = tokio::spawn(serve(listener, body, shutdown_rx));

        info!("Serving preseed for {} on {}", base_url, addr);
        *running = Some(Running {
            addr,
            shutdown: Some(shutdown),
            task,
        });
        Ok(())
    }

    async fn stop(&self) {
        let Some(mut running) = self.running.lock().await.take() else {
            return;
        };

        if let Some(shutdown) = running.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = running.task.await {
            warn!("Preseed server task ended abnormally: {}", e);
        }
        info!("Preseed server on {} stopped", running.addr);
    }

    fn signal_stop(&self) -> bool {
        let Ok(mut running) = self.running.try_lock() else {
            return false;
        };
        if let Some(shutdown) = running.as_mut().and_then(|r| r.shutdown.take()) {
            let _ = shutdown.send(());
            debug!("Preseed server signalled to stop");
        }
        true
    }
}

async fn serve(listener: TcpListener, body: Arc<str>, mut shutdown: oneshot::Receiver<()>) {
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let body = body.clone();
                    tokio::spawn(async move {
                        if let Err(e) = respond(stream, &body).await {
                            debug!("Preseed request from {} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => warn!("Preseed server accept failed: {}", e),
            },
        }
    }
}

async fn respond(mut stream: TcpStream, body: &str) -> std::io::Result<()> {
    let mut head = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];

    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < MAX_REQUEST_HEAD {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let request_line = String::from_utf8_lossy(&head);
    let request_line = request_line.lines().next().unwrap_or_default();
    debug!("Preseed request: {}", request_line);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    if !request_line.starts_with("HEAD ") {
        stream.write_all(body.as_bytes()).await?;
    }
    stream.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    async fn get(port: u16, path: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn port_from_url() {
        assert_eq!(listen_port("http://10.0.2.2:23232/preseed.cfg").unwrap(), 23232);
        assert_eq!(listen_port("http://10.0.2.2/preseed.cfg").unwrap(), 80);
        assert!(listen_port("not a url").is_err());
    }

    #[tokio::test]
    async fn serves_content_until_stopped() {
        let port = free_port();
        let server = PreseedServer::new();
        let url = format!("http://10.0.2.2:{}/preseed.cfg", port);

        server.start(&url, "d-i passwd/root-login boolean true").await.unwrap();
        assert_eq!(server.local_addr().await.map(|a| a.port()), Some(port));

        let response = get(port, "/preseed.cfg").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("d-i passwd/root-login boolean true"));

        server.stop().await;
        assert!(server.local_addr().await.is_none());
        assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    }

    #[tokio::test]
    async fn second_start_rejected() {
        let port = free_port();
        let server = PreseedServer::new();
        let url = format!("http://127.0.0.1:{}/preseed.cfg", port);

        server.start(&url, "a").await.unwrap();
        let err = server.start(&url, "b").await.unwrap_err();
        assert!(matches!(err, MastersError::ConfigServer(_)));

        server.stop().await;
        server.start(&url, "c").await.unwrap();
        server.stop().await;
    }

    #[tokio::test]
    async fn signalled_server_replaced_by_next_start() {
        let port = free_port();
        let server = PreseedServer::new();
        let url = format!("http://127.0.0.1:{}/preseed.cfg", port);

        server.start(&url, "old").await.unwrap();
        assert!(server.signal_stop());
        assert!(server.local_addr().await.is_none());

        server.start(&url, "new").await.unwrap();
        assert!(get(port, "/preseed.cfg").await.ends_with("new"));
        server.stop().await;
        assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    }

    #[tokio::test]
    async fn stop_when_idle_is_noop() {
        let server = PreseedServer::new();
        server.stop().await;
        assert!(server.local_addr().await.is_none());
    }
}
