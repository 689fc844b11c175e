use super::*;

use chrono::Duration;

use crate::{
    credentials::MemoryCredentialStore,
    test_support::{drain, jwt_with_exp, InMemoryBackend, TOKEN},
};

/// Fails every request with the same error.
struct Failing(ClientError);

#[async_trait]
impl Transport for Failing {
    async fn send(&self, _request: ApiRequest) -> ClientResult<ApiResponse> {
        Err(self.0.clone())
    }
}

fn gated<T: Transport>(
    inner: T,
    token: Option<&str>,
) -> (
    CredentialGate<T>,
    Arc<MemoryCredentialStore>,
    broadcast::Receiver<ClientEvent>,
) {
    let (events, rx) = broadcast::channel(16);
    let store = Arc::new(match token {
        Some(token) => MemoryCredentialStore::with_token(token),
        None => MemoryCredentialStore::default(),
    });
    let gate = CredentialGate::new(inner, Arc::clone(&store) as Arc<dyn CredentialStore>, events);
    (gate, store, rx)
}

fn expired_logouts(events: &mut broadcast::Receiver<ClientEvent>) -> usize {
    drain(events)
        .into_iter()
        .filter(|event| matches!(event, ClientEvent::LoggedOut { expired: true }))
        .count()
}

#[tokio::test]
async fn attaches_stored_token_as_bearer() {
    let backend = InMemoryBackend::new();
    let (gate, _store, mut events) = gated(Arc::clone(&backend), Some(TOKEN));

    gate.send(ApiRequest::get("/tasks")).await.expect("list");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].bearer.as_deref(), Some(TOKEN));
    assert_eq!(expired_logouts(&mut events), 0);
}

#[tokio::test]
async fn anonymous_401_is_not_a_session_expiry() {
    let backend = InMemoryBackend::new();
    let (gate, _store, mut events) = gated(Arc::clone(&backend), None);

    let err = gate
        .send(ApiRequest::get("/tasks"))
        .await
        .expect_err("no credential");

    assert_eq!(err.status(), Some(401));
    assert!(!err.is_auth_expired());
    assert_eq!(backend.requests()[0].bearer, None);
    assert_eq!(expired_logouts(&mut events), 0);
}

#[tokio::test]
async fn rejected_token_forces_logout() {
    let backend = InMemoryBackend::new();
    backend.revoke_tokens();
    let (gate, store, mut events) = gated(Arc::clone(&backend), Some(TOKEN));

    let err = gate
        .send(ApiRequest::get("/tasks"))
        .await
        .expect_err("revoked credential");

    assert!(err.is_auth_expired(), "{err:?}");
    assert_eq!(store.load(), None);
    assert_eq!(expired_logouts(&mut events), 1);
}

#[tokio::test]
async fn locally_expired_token_never_reaches_backend() {
    let backend = InMemoryBackend::new();
    let stale = jwt_with_exp((Utc::now() - Duration::minutes(5)).timestamp());
    let (gate, store, mut events) = gated(Arc::clone(&backend), Some(&stale));

    let err = gate
        .send(ApiRequest::get("/tasks"))
        .await
        .expect_err("expired credential");

    assert!(err.is_auth_expired());
    assert!(backend.requests().is_empty());
    assert_eq!(store.load(), None);
    assert_eq!(expired_logouts(&mut events), 1);
}

#[tokio::test]
async fn unexpired_jwt_is_sent() {
    let backend = InMemoryBackend::new();
    let fresh = jwt_with_exp((Utc::now() + Duration::hours(1)).timestamp());
    backend.issue_token(&fresh);
    let (gate, store, _events) = gated(Arc::clone(&backend), Some(&fresh));

    gate.send(ApiRequest::get("/tasks")).await.expect("list");
    assert_eq!(store.load().as_deref(), Some(fresh.as_str()));
}

#[tokio::test]
async fn malformed_token_422_counts_as_expiry() {
    let inner = Failing(ClientError::Api {
        status: 422,
        message: "Not enough segments in token".to_string(),
    });
    let (gate, store, _events) = gated(inner, Some(TOKEN));

    let err = gate
        .send(ApiRequest::get("/tasks"))
        .await
        .expect_err("bad token");
    assert!(err.is_auth_expired());
    assert_eq!(store.load(), None);
}

#[tokio::test]
async fn other_failures_keep_the_session() {
    for failure in [
        ClientError::Api {
            status: 422,
            message: "title is required".to_string(),
        },
        ClientError::Api {
            status: 404,
            message: "Task not found".to_string(),
        },
        ClientError::Network("connection refused".to_string()),
    ] {
        let (gate, store, mut events) = gated(Failing(failure.clone()), Some(TOKEN));
        let err = gate
            .send(ApiRequest::get("/tasks"))
            .await
            .expect_err("failure passes through");
        assert!(!err.is_auth_expired(), "{failure:?}");
        assert_eq!(store.load().as_deref(), Some(TOKEN));
        assert_eq!(expired_logouts(&mut events), 0);
    }
}

#[tokio::test]
async fn anonymous_requests_skip_an_expired_credential() {
    let backend = InMemoryBackend::new();
    backend.add_user("Alice", "alice@example.com", "secret");
    let stale = jwt_with_exp((Utc::now() - Duration::minutes(5)).timestamp());
    let (gate, store, mut events) = gated(Arc::clone(&backend), Some(&stale));

    let body = serde_json::json!({ "email": "alice@example.com", "password": "secret" });
    gate.send(ApiRequest::post("/auth/login", body).anonymous())
        .await
        .expect("login goes through");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].bearer, None);
    assert_eq!(store.load().as_deref(), Some(stale.as_str()));
    assert_eq!(expired_logouts(&mut events), 0);
}

#[tokio::test]
async fn anonymous_401_keeps_the_stored_credential() {
    let backend = InMemoryBackend::new();
    backend.revoke_tokens();
    let (gate, store, mut events) = gated(Arc::clone(&backend), Some("revoked-opaque"));

    let body = serde_json::json!({ "email": "alice@example.com", "password": "wrong" });
    let err = gate
        .send(ApiRequest::post("/auth/login", body).anonymous())
        .await
        .expect_err("bad password");

    assert_eq!(err.status(), Some(401));
    assert!(!err.is_auth_expired());
    assert_eq!(store.load().as_deref(), Some("revoked-opaque"));
    assert_eq!(expired_logouts(&mut events), 0);
}
