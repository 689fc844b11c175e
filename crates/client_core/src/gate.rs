//! Credential gate: attaches the stored token to every authenticated request
//! and turns a rejected credential into a forced logout. Anonymous requests
//! (login, registration) pass through untouched.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    credentials::{token_is_expired, CredentialStore},
    error::{ClientError, ClientResult},
    events::ClientEvent,
    transport::{ApiRequest, ApiResponse, Transport},
};

pub struct CredentialGate<T> {
    inner: T,
    store: Arc<dyn CredentialStore>,
    events: broadcast::Sender<ClientEvent>,
}

impl<T: Transport> CredentialGate<T> {
    pub fn new(
        inner: T,
        store: Arc<dyn CredentialStore>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            inner,
            store,
            events,
        }
    }

    fn expire_session(&self, reason: &str) -> ClientError {
        warn!("credential rejected, forcing logout: {reason}");
        if let Err(err) = self.store.clear() {
            warn!("failed to clear rejected credential: {err}");
        }
        let _ = self.events.send(ClientEvent::LoggedOut { expired: true });
        ClientError::AuthExpired(reason.to_string())
    }
}

fn rejects_credential(err: &ClientError) -> Option<&str> {
    match err {
        ClientError::Api { status: 401, message } => Some(message),
        // Malformed JWTs come back as 422 with a token-related message.
        ClientError::Api {
            status: 422,
            message,
        } if message.to_ascii_lowercase().contains("token") => Some(message),
        _ => None,
    }
}

#[async_trait]
impl<T: Transport> Transport for CredentialGate<T> {
    async fn send(&self, mut request: ApiRequest) -> ClientResult<ApiResponse> {
        if request.anonymous {
            // Auth routes neither carry nor judge the stored credential.
            request.bearer = None;
            return self.inner.send(request).await;
        }
        let token = self.store.load();
        if let Some(token) = &token {
            if token_is_expired(token, Utc::now()) {
                info!("stored credential expired before request was sent");
                return Err(self.expire_session("Token has expired"));
            }
            request.bearer = Some(token.clone());
        }

        match self.inner.send(request).await {
            Err(err) if token.is_some() => {
                if let Some(reason) = rejects_credential(&err) {
                    return Err(self.expire_session(reason));
                }
                Err(err)
            }
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "tests/gate_tests.rs"]
mod tests;
