//! Scanner behavior against an in-memory backend.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use gymdesk_client::transport::mock::MockTransport;
use gymdesk_client::storage::{keys, StoreId};
use gymdesk_client::{ApiClient, KeyValueStore, MemoryStore, Method, StorageEvent};
use gymdesk_core::{AccessDecision, GymError, GymResult, MemberId, ScanSource};
use gymdesk_kiosk::{Connectivity, Scanner, ScannerConfig};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const KIOSK: &str = "front-door";

fn qr(sub: &str, exp: i64) -> String {
    let payload = json!({ "sub": sub, "exp": exp, "type": "qr" });
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

fn in_an_hour() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

/// Backend that serves one active member while `online` is set and is
/// unreachable otherwise.
fn backend(online: Arc<AtomicBool>) -> Arc<MockTransport> {
    Arc::new(MockTransport::new(move |req| {
        if !online.load(Ordering::SeqCst) {
            return MockTransport::unreachable();
        }
        match req.path.as_str() {
            "/access/offline-roster" => MockTransport::ok(&json!([
                { "id": "m-1", "full_name": "Rana Khoury", "subscription_status": "ACTIVE" },
                { "id": 42, "full_name": "Sami Haddad" }
            ])),
            "/access/scan" => MockTransport::ok(&json!({
                "status": "GRANTED",
                "user_name": "Rana Khoury",
                "member_id": "m-1"
            })),
            _ => MockTransport::status(404, "Not found"),
        }
    }))
}

fn scanner_with(transport: Arc<MockTransport>, config: ScannerConfig) -> (Scanner, ApiClient) {
    let persistent = Arc::new(MemoryStore::new());
    let client = ApiClient::with_stores(transport, Arc::new(MemoryStore::new()), persistent.clone());
    (Scanner::new(client.clone(), persistent, config), client)
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

#[tokio::test]
async fn online_scan_uses_server_decision() {
    let online = Arc::new(AtomicBool::new(true));
    let transport = backend(online);
    let (scanner, _) = scanner_with(transport.clone(), ScannerConfig::new(KIOSK));

    let outcome = scanner.scan(&qr("m-1", in_an_hour())).await.unwrap();
    assert_eq!(outcome.decision, AccessDecision::Granted);
    assert_eq!(outcome.source, ScanSource::Online);
    assert_eq!(outcome.member_name.as_deref(), Some("Rana Khoury"));
    assert!(scanner.queue().is_empty());
    assert!(scanner.is_online());
    assert_eq!(transport.count(Method::Post, "/access/scan"), 1);
}

#[tokio::test]
async fn blank_token_is_rejected_before_any_request() {
    let transport = backend(Arc::new(AtomicBool::new(true)));
    let (scanner, _) = scanner_with(transport.clone(), ScannerConfig::new(KIOSK));

    assert!(matches!(
        scanner.scan("   ").await,
        Err(GymError::InvalidInput(_))
    ));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn unreachable_backend_falls_back_to_cached_roster() {
    let online = Arc::new(AtomicBool::new(true));
    let (scanner, _) = scanner_with(backend(online.clone()), ScannerConfig::new(KIOSK));
    assert_eq!(scanner.sync_roster().await.unwrap(), 2);

    online.store(false, Ordering::SeqCst);
    let mut status = scanner.subscribe_status();

    let granted = scanner.scan(&qr("m-1", in_an_hour())).await.unwrap();
    assert_eq!(granted.decision, AccessDecision::Granted);
    assert_eq!(granted.source, ScanSource::Offline);
    assert_eq!(granted.member_id, Some(MemberId::new("m-1")));
    assert_eq!(granted.member_name.as_deref(), Some("Rana Khoury"));

    // Numeric ids from the roster match string subjects.
    let numeric = scanner.scan(&qr("42", in_an_hour())).await.unwrap();
    assert!(numeric.is_granted());

    let stranger = scanner.scan(&qr("m-9", in_an_hour())).await.unwrap();
    assert_eq!(stranger.decision, AccessDecision::Denied);
    assert_eq!(stranger.reason.as_deref(), Some("not_in_offline_roster"));

    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), Connectivity::Offline);

    // Every offline attempt is queued, granted or not.
    let queued = scanner.queue().snapshot().unwrap();
    assert_eq!(queued.len(), 3);
    assert!(queued.iter().all(|s| s.kiosk_id == KIOSK));
}

#[tokio::test]
async fn expired_token_is_denied_offline_even_for_active_member() {
    let online = Arc::new(AtomicBool::new(true));
    let (scanner, _) = scanner_with(backend(online.clone()), ScannerConfig::new(KIOSK));
    scanner.sync_roster().await.unwrap();
    online.store(false, Ordering::SeqCst);

    let expired = qr("m-1", chrono::Utc::now().timestamp() - 60);
    let outcome = scanner.scan(&expired).await.unwrap();
    assert_eq!(outcome.decision, AccessDecision::Denied);
    assert_eq!(outcome.reason.as_deref(), Some("token_expired"));
}

#[tokio::test]
async fn garbage_token_offline_without_roster_is_denied() {
    let (scanner, _) = scanner_with(
        backend(Arc::new(AtomicBool::new(false))),
        ScannerConfig::new(KIOSK),
    );

    let outcome = scanner.scan("not-a-jwt").await.unwrap();
    assert_eq!(outcome.decision, AccessDecision::Denied);
    assert_eq!(outcome.reason.as_deref(), Some("invalid_token"));
    assert_eq!(scanner.queue().len(), 1);
}

#[tokio::test]
async fn server_error_is_not_treated_as_offline() {
    let transport = Arc::new(MockTransport::new(|_| {
        MockTransport::status(500, "boom")
    }));
    let (scanner, _) = scanner_with(transport, ScannerConfig::new(KIOSK));

    let err = scanner.scan(&qr("m-1", in_an_hour())).await.unwrap_err();
    assert!(err.is_server_error());
    assert!(scanner.queue().is_empty());
    assert!(scanner.is_online());
}

#[tokio::test]
async fn kiosk_rejection_keeps_operator_session() {
    let transport = Arc::new(MockTransport::new(|req| match req.path.as_str() {
        "/access/scan" => MockTransport::status(401, "Invalid kiosk credentials"),
        _ => MockTransport::status(404, "Not found"),
    }));
    let (scanner, client) = scanner_with(transport.clone(), ScannerConfig::new(KIOSK));
    client
        .tokens()
        .set_tokens("operator-access", "operator-refresh")
        .unwrap();

    let err = scanner.scan(&qr("m-1", in_an_hour())).await.unwrap_err();
    assert!(matches!(err, GymError::Unauthorized(_)));
    assert_eq!(transport.count(Method::Post, "/auth/refresh"), 0);
    assert_eq!(
        client.tokens().access_token().unwrap().as_deref(),
        Some("operator-access")
    );
    let sent = transport.requests();
    assert_eq!(sent[0].bearer.as_deref(), Some("operator-access"));
}

#[tokio::test]
async fn corrupt_queue_does_not_block_offline_decision() {
    let persistent = Arc::new(MemoryStore::new());
    persistent.set(keys::PENDING_SCANS, "{garbage").unwrap();
    let client = ApiClient::with_stores(
        backend(Arc::new(AtomicBool::new(false))),
        Arc::new(MemoryStore::new()),
        persistent.clone(),
    );
    let scanner = Scanner::new(client, persistent, ScannerConfig::new(KIOSK));

    let outcome = scanner.scan("a.b.c").await.unwrap();
    assert_eq!(outcome.decision, AccessDecision::Denied);
    assert_eq!(outcome.source, ScanSource::Offline);
    assert_eq!(scanner.queue().len(), 1);
}

/// Store whose pending-scan writes always fail.
struct QueueWritesFail(MemoryStore);

impl KeyValueStore for QueueWritesFail {
    fn id(&self) -> StoreId {
        self.0.id()
    }

    fn get(&self, key: &str) -> GymResult<Option<String>> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> GymResult<()> {
        if key == keys::PENDING_SCANS {
            return Err(GymError::Storage("disk full".into()));
        }
        self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> GymResult<()> {
        self.0.remove(key)
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.0.subscribe()
    }
}

#[tokio::test]
async fn failed_enqueue_still_returns_offline_decision() {
    let online = Arc::new(AtomicBool::new(true));
    let persistent = Arc::new(QueueWritesFail(MemoryStore::new()));
    let client = ApiClient::with_stores(
        backend(online.clone()),
        Arc::new(MemoryStore::new()),
        persistent.clone(),
    );
    let scanner = Scanner::new(client, persistent, ScannerConfig::new(KIOSK));
    scanner.sync_roster().await.unwrap();
    online.store(false, Ordering::SeqCst);

    let outcome = scanner.scan(&qr("m-1", in_an_hour())).await.unwrap();
    assert!(outcome.is_granted());
    assert_eq!(outcome.source, ScanSource::Offline);
    assert!(scanner.queue().is_empty());
}

// ---------------------------------------------------------------------------
// sync + replay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_sync_keeps_previous_roster() {
    let online = Arc::new(AtomicBool::new(true));
    let (scanner, _) = scanner_with(backend(online.clone()), ScannerConfig::new(KIOSK));
    scanner.sync_roster().await.unwrap();
    let synced_at = scanner.roster().last_synced();
    assert!(synced_at.is_some());

    online.store(false, Ordering::SeqCst);
    assert!(scanner.sync_roster().await.unwrap_err().is_network());
    assert!(!scanner.is_online());
    assert_eq!(scanner.roster().load().unwrap().len(), 2);
    assert_eq!(scanner.roster().last_synced(), synced_at);
}

#[tokio::test]
async fn replay_empties_queue_even_when_submissions_fail() {
    let online = Arc::new(AtomicBool::new(false));
    let (scanner, _) = scanner_with(backend(online.clone()), ScannerConfig::new(KIOSK));
    scanner.scan(&qr("m-1", in_an_hour())).await.unwrap();
    scanner.scan(&qr("m-2", in_an_hour())).await.unwrap();
    assert_eq!(scanner.queue().len(), 2);

    // Still unreachable: both are attempted and dropped.
    let summary = scanner.replay_pending().await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.dropped, 2);
    assert!(scanner.queue().is_empty());

    let nothing = scanner.replay_pending().await.unwrap();
    assert_eq!(nothing.attempted, 0);
}

#[tokio::test]
async fn replay_clears_corrupt_queue() {
    let persistent = Arc::new(MemoryStore::new());
    persistent.set(keys::PENDING_SCANS, "{garbage").unwrap();
    let client = ApiClient::with_stores(
        backend(Arc::new(AtomicBool::new(true))),
        Arc::new(MemoryStore::new()),
        persistent.clone(),
    );
    let scanner = Scanner::new(client, persistent.clone(), ScannerConfig::new(KIOSK));

    let summary = scanner.replay_pending().await.unwrap();
    assert_eq!(summary.attempted, 0);
    assert_eq!(persistent.get(keys::PENDING_SCANS).unwrap(), None);
}

#[tokio::test]
async fn replay_resubmits_with_original_kiosk() {
    let online = Arc::new(AtomicBool::new(false));
    let transport = backend(online.clone());
    let (scanner, _) = scanner_with(transport.clone(), ScannerConfig::new(KIOSK));
    let token = qr("m-1", in_an_hour());
    scanner.scan(&token).await.unwrap();

    online.store(true, Ordering::SeqCst);
    let summary = scanner.replay_pending().await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert!(scanner.is_online());

    let last = transport.requests().pop().unwrap();
    assert_eq!(
        last.body,
        Some(json!({ "qr_token": token, "kiosk_id": KIOSK }))
    );
}

#[tokio::test]
async fn background_loop_syncs_and_drains_queue() {
    let online = Arc::new(AtomicBool::new(false));
    let transport = backend(online.clone());
    let mut config = ScannerConfig::new(KIOSK);
    config.sync_interval = Duration::from_millis(40);
    config.replay_interval = Duration::from_millis(25);
    let (scanner, _) = scanner_with(transport.clone(), config);

    scanner.scan(&qr("m-1", in_an_hour())).await.unwrap();
    assert_eq!(scanner.queue().len(), 1);
    online.store(true, Ordering::SeqCst);

    scanner
        .run_until(tokio::time::sleep(Duration::from_millis(150)))
        .await;

    assert!(scanner.queue().is_empty());
    assert!(scanner.is_online());
    assert!(transport.count(Method::Get, "/access/offline-roster") >= 2);
    // One live attempt plus exactly one replay.
    assert_eq!(transport.count(Method::Post, "/access/scan"), 2);
    assert_eq!(scanner.roster().load().unwrap().len(), 2);
}

#[tokio::test]
async fn background_loop_holds_queue_while_offline() {
    let transport = backend(Arc::new(AtomicBool::new(false)));
    let mut config = ScannerConfig::new(KIOSK);
    config.sync_interval = Duration::from_millis(40);
    config.replay_interval = Duration::from_millis(20);
    let (scanner, _) = scanner_with(transport.clone(), config);

    scanner.scan(&qr("m-1", in_an_hour())).await.unwrap();
    scanner
        .run_until(tokio::time::sleep(Duration::from_millis(120)))
        .await;

    assert_eq!(scanner.queue().len(), 1);
    assert!(!scanner.is_online());
    assert_eq!(transport.count(Method::Post, "/access/scan"), 1);
}
