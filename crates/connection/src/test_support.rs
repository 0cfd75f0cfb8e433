//! Scripted stand-in for the Proclaim control API.
//!
//! Accepts any number of connections, records each raw request head so tests
//! can inspect header casing, and answers from a per-path route table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Address that is not loopback for auth purposes but still routes locally.
pub(crate) const REMOTE_HOST: &str = "127.0.0.2";

/// Loopback address; Proclaim skips authentication for it.
pub(crate) const LOCAL_HOST: &str = "127.0.0.1";

#[derive(Clone)]
struct Route {
    status: u16,
    body: String,
    delay: Duration,
}

/// A recorded request.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    /// Request target including the query string.
    pub target: String,
    /// Raw request line and headers exactly as received.
    pub head: String,
    pub body: String,
}

impl Recorded {
    pub(crate) fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }
}

pub(crate) struct MockProclaim {
    pub port: u16,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockProclaim {
    /// Starts a server bound to `host` on an ephemeral port.
    pub(crate) async fn start(host: &str) -> Self {
        let listener = TcpListener::bind((host, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let routes = routes.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let routes = routes.clone();
                    let requests = requests.clone();
                    tokio::spawn(serve(stream, routes, requests));
                }
            })
        };

        Self {
            port,
            routes,
            requests,
            handle,
        }
    }

    pub(crate) fn route(&self, path: &str, status: u16, body: &str) {
        self.route_delayed(path, status, body, Duration::ZERO);
    }

    pub(crate) fn route_delayed(&self, path: &str, status: u16, body: &str, delay: Duration) {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                status,
                body: body.to_string(),
                delay,
            },
        );
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path() == path)
            .count()
    }
}

impl Drop for MockProclaim {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Returns a port on `host` with nothing listening.
pub(crate) async fn closed_port(host: &str) -> u16 {
    let listener = TcpListener::bind((host, 0)).await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn serve(
    mut stream: TcpStream,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
        }
    }

    let target = head
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();
    let recorded = Recorded {
        target,
        head,
        body: String::from_utf8_lossy(&body).to_string(),
    };
    let route = routes.lock().unwrap().get(recorded.path()).cloned();
    requests.lock().unwrap().push(recorded);

    let route = route.unwrap_or(Route {
        status: 404,
        body: String::new(),
        delay: Duration::ZERO,
    });
    if !route.delay.is_zero() {
        tokio::time::sleep(route.delay).await;
    }

    let resp = format!(
        "HTTP/1.1 {} Mock\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        route.status,
        route.body.len(),
        route.body
    );
    let _ = stream.write_all(resp.as_bytes()).await;
    let _ = stream.shutdown().await;
}
