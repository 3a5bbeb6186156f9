// ABOUTME: Integration tests for the gateway operations over a mock backing store
// ABOUTME: Covers key lookup faults, allow-list policy, and the revocation side effect

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vaultgate::auth::TokenService;
use vaultgate::broker::JobBroker;
use vaultgate::errors::ErrorKind;
use vaultgate::gateway::Gateway;
use vaultgate::models::AuthKeyRecord;
use vaultgate::storage::{BackingStore, StoreError};

/// In-memory store that counts revocations.
#[derive(Default)]
struct MockStore {
    records: Mutex<HashMap<String, AuthKeyRecord>>,
    artifacts: Mutex<HashMap<(String, String), String>>,
    deletes: AtomicUsize,
}

impl MockStore {
    fn with_record(record: AuthKeyRecord) -> Arc<Self> {
        let store = Self::default();
        store
            .records
            .lock()
            .unwrap()
            .insert(record.key.clone(), record);
        Arc::new(store)
    }
}

#[async_trait]
impl BackingStore for MockStore {
    async fn auth_record(&self, key: &str) -> Result<Option<AuthKeyRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn delete_auth_record(&self, key: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().remove(key);
        Ok(())
    }

    async fn find_artifact(&self, os: &str, arch: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .get(&(os.to_string(), arch.to_string()))
            .cloned())
    }

    async fn put_artifact(&self, os: &str, arch: &str, data: &str) -> Result<(), StoreError> {
        self.artifacts
            .lock()
            .unwrap()
            .insert((os.to_string(), arch.to_string()), data.to_string());
        Ok(())
    }
}

fn record(key: &str, admin: bool) -> AuthKeyRecord {
    AuthKeyRecord {
        key: key.to_string(),
        admin,
        expiration: 0,
        ip_allow_list: vec![],
        owner: "tests".to_string(),
    }
}

fn gateway(store: Arc<MockStore>) -> Gateway {
    Gateway::new(
        JobBroker::new(4, Duration::from_secs(5)),
        TokenService::new(b"test-signing-secret", chrono::Duration::hours(1)),
        store,
    )
}

#[tokio::test]
async fn unknown_key_is_a_user_fault_not_a_store_failure() {
    let gw = gateway(Arc::new(MockStore::default()));

    let err = gw.authenticate("nope", "1.2.3.4").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserFault);
    assert!(err.message().contains("invalid authentication key"));
}

#[tokio::test]
async fn authenticate_then_verify_round_trip() {
    let store = MockStore::with_record(record("goodkey", false));
    let gw = gateway(store);

    let auth = gw.authenticate("goodkey", "1.2.3.4").await.unwrap();
    assert!(auth.refresh_at > chrono::Utc::now().timestamp());

    let claims = gw.verify(&auth.token, "1.2.3.4").unwrap();
    assert_eq!(claims.sub, "goodkey");
    assert!(!claims.admin);
}

#[tokio::test]
async fn expired_key_cannot_authenticate() {
    let mut rec = record("oldkey", false);
    rec.expiration = chrono::Utc::now().timestamp() - 60;
    let gw = gateway(MockStore::with_record(rec));

    let err = gw.authenticate("oldkey", "1.2.3.4").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserFault);
    assert!(err.message().contains("expired"));
}

#[tokio::test]
async fn allow_list_rejects_outsiders_and_admits_listed_addresses() {
    let mut rec = record("listedkey", false);
    rec.ip_allow_list = vec!["1.2.3.4".to_string(), "5.6.7.8".to_string()];
    let gw = gateway(MockStore::with_record(rec));

    let err = gw.authenticate("listedkey", "9.9.9.9").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserFaultNeedsLog);

    gw.authenticate("listedkey", "5.6.7.8").await.unwrap();
}

#[tokio::test]
async fn empty_allow_list_admits_any_address() {
    let gw = gateway(MockStore::with_record(record("openkey", false)));
    gw.authenticate("openkey", "203.0.113.9").await.unwrap();
}

#[tokio::test]
async fn non_admin_upload_revokes_the_key_exactly_once() {
    let store = MockStore::with_record(record("victim", false));
    let gw = gateway(Arc::clone(&store));

    let auth = gw.authenticate("victim", "1.2.3.4").await.unwrap();
    let err = gw
        .upload(&auth.token, "1.2.3.4", "linux", "amd64", "payload")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PrivilegeViolation);
    assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
    assert!(!store.records.lock().unwrap().contains_key("victim"));

    // Nothing was written on the punished path.
    assert!(store.artifacts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn admin_upload_issues_no_revocation_and_stores_the_artifact() {
    let store = MockStore::with_record(record("boss", true));
    let gw = gateway(Arc::clone(&store));

    let auth = gw.authenticate("boss", "1.2.3.4").await.unwrap();
    gw.upload(&auth.token, "1.2.3.4", "linux", "arm64", "blob-v2")
        .await
        .unwrap();

    assert_eq!(store.deletes.load(Ordering::SeqCst), 0);

    let artifact = gw
        .download(&auth.token, "1.2.3.4", "linux", "arm64")
        .await
        .unwrap();
    assert_eq!(artifact.data, "blob-v2");
}

#[tokio::test]
async fn missing_artifact_is_a_security_relevant_user_fault() {
    let store = MockStore::with_record(record("goodkey", false));
    let gw = gateway(store);

    let auth = gw.authenticate("goodkey", "1.2.3.4").await.unwrap();
    let err = gw
        .download(&auth.token, "1.2.3.4", "plan9", "mips")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserFaultNeedsLog);
    assert!(err.message().contains("plan9_mips"));
}

#[tokio::test]
async fn download_with_replayed_token_never_reaches_the_store() {
    let store = MockStore::with_record(record("goodkey", false));
    store
        .artifacts
        .lock()
        .unwrap()
        .insert(("linux".into(), "amd64".into()), "secret-blob".into());
    let gw = gateway(Arc::clone(&store));

    let auth = gw.authenticate("goodkey", "1.2.3.4").await.unwrap();
    let err = gw
        .download(&auth.token, "9.9.9.9", "linux", "amd64")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserFaultNeedsLog);
    assert!(err.message().contains("replay"));
}
