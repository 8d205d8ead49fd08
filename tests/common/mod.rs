//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use service_gateway::{ConfigManager, Gateway, ServiceRegistry, Shutdown};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A mock upstream. Every response body starts with the backend's name on
/// its own line, followed by the raw request head it received.
pub struct Backend {
    pub name: &'static str,
    pub addr: SocketAddr,
    status: Arc<AtomicU16>,
    hits: Arc<AtomicUsize>,
}

impl Backend {
    pub async fn start(name: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let status = Arc::new(AtomicU16::new(200));
        let hits = Arc::new(AtomicUsize::new(0));

        let (status_task, hits_task) = (status.clone(), hits.clone());
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let status = status_task.clone();
                let hits = hits_task.clone();
                tokio::spawn(async move {
                    let head = read_head(&mut socket).await;
                    if !head.starts_with("GET /health") {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }
                    let code = status.load(Ordering::SeqCst);
                    let body = format!("{}\n{}", name, head);
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        code,
                        reason(code),
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            name,
            addr,
            status,
            hits,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Status returned for every subsequent request, health probes included.
    pub fn set_status(&self, code: u16) {
        self.status.store(code, Ordering::SeqCst);
    }

    /// Proxied requests seen, excluding health probes.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        204 => "No Content",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// An address with nothing listening on it.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A gateway serving on an ephemeral port, configured from a YAML file in
/// a temporary directory.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub manager: Arc<ConfigManager>,
    pub registry: Arc<ServiceRegistry>,
    pub shutdown: Shutdown,
    pub config_path: PathBuf,
    handle: JoinHandle<std::io::Result<()>>,
    _dir: TempDir,
}

impl TestGateway {
    pub async fn start(yaml: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("gateway.yaml");
        std::fs::write(&config_path, yaml).unwrap();

        let manager = Arc::new(ConfigManager::new(&config_path).unwrap());
        let gateway = Gateway::build(manager.clone());
        let registry = gateway.registry().clone();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let serve_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move { gateway.serve(listener, &serve_shutdown).await });

        Self {
            addr,
            manager,
            registry,
            shutdown,
            config_path,
            handle,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Rewrite the config file with a strictly newer mtime, then reload.
    pub async fn rewrite_config(&self, yaml: &str) -> bool {
        std::fs::write(&self.config_path, yaml).unwrap();
        let file = std::fs::File::options().write(true).open(&self.config_path).unwrap();
        file.set_modified(std::time::SystemTime::now() + Duration::from_secs(5)).unwrap();
        drop(file);
        self.manager.load_config().await.unwrap()
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("gateway did not stop in time")
            .unwrap();
        assert!(result.is_ok());
    }
}

/// Base config: no rate limiting, no health monitor.
pub fn config_with(services: &str) -> String {
    let services = if services.trim().is_empty() { "  {}\n" } else { services };
    format!(
        "port: 8080\ntimeout: 5s\nrate_limit: 0\nload_balancer:\n  strategy: round_robin\n  health_check: false\nservices:\n{}",
        services
    )
}

/// Poll `cond` until it holds or `within` elapses.
pub async fn eventually<F: Fn() -> bool>(within: Duration, cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}
