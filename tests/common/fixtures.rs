//! Application fixtures: a router wired to an in-memory (or temp-file)
//! store, request helpers, and generated feedback text.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use http_body_util::BodyExt;
use tower::ServiceExt;

use murmur::AppState;
use murmur_core::config::Config;
use murmur_core::notify::Mailer;
use murmur_core::store::Store;
use murmur_core::{Document, NotificationSettings};

/// Address notifications go to when a fixture enables them.
pub const NOTIFY_TO: &str = "ops@example.com";

pub fn client_ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 0, 2, last))
}

pub fn client_addr(last: u8) -> SocketAddr {
    SocketAddr::new(client_ip(last), 40_000 + u16::from(last))
}

/// A random one-line feedback message.
pub fn fake_message() -> String {
    Sentence(3..10).fake()
}

// ---------------------------------------------------------------------------
// TestApp
// ---------------------------------------------------------------------------

/// The full application wired to a store the test controls.
pub struct TestApp {
    pub state: AppState,
    pub store: Store,
    pub config: Config,
}

impl TestApp {
    /// Empty in-memory store, notifications off.
    pub fn new() -> Self {
        Self::build(Store::in_memory(), None)
    }

    /// In-memory store seeded with `document`.
    pub fn with_document(document: Document) -> Self {
        Self::build(Store::from_document(document), None)
    }

    /// Notifications enabled for [`NOTIFY_TO`] and delivered through `mailer`.
    pub fn with_mailer(mailer: Arc<dyn Mailer>) -> Self {
        let mut document = Document::default();
        document.settings.notifications = NotificationSettings::with_email(NOTIFY_TO);
        Self::build(Store::from_document(document), Some(mailer))
    }

    pub fn with_store(store: Store) -> Self {
        Self::build(store, None)
    }

    fn build(store: Store, mailer: Option<Arc<dyn Mailer>>) -> Self {
        let config = Config::defaults();
        let state = AppState::new(store.clone(), &config, mailer);
        Self {
            state,
            store,
            config,
        }
    }

    /// Router that sees every request as coming from `client_addr(1)`.
    pub fn router(&self) -> Router {
        self.router_for(client_addr(1))
    }

    pub fn router_for(&self, peer: SocketAddr) -> Router {
        murmur::router(self.state.clone(), &self.config).layer(MockConnectInfo(peer))
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send(self.router(), request).await
    }

    pub async fn send_from(&self, peer: SocketAddr, request: Request<Body>) -> TestResponse {
        send(self.router_for(peer), request).await
    }

    pub async fn record_count(&self) -> usize {
        self.store.read(|doc| doc.feedback.len()).await
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Status, headers and parsed JSON body of one response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Drive `request` through `router` and collect the answer.
pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes: Bytes = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        headers,
        body: parse_body(&bytes),
    }
}

/// Parse a body as JSON, falling back to a JSON string for plain text.
pub fn parse_body(bytes: &Bytes) -> serde_json::Value {
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// A file-backed store whose next flush fails: its directory is replaced by
/// a plain file after opening. Keep the returned `TempDir` alive.
pub async fn broken_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let store = Store::open(data.join("db.json"), IO_TIMEOUT).await.unwrap();
    std::fs::remove_dir_all(&data).unwrap();
    std::fs::write(&data, b"").unwrap();
    (dir, store)
}
