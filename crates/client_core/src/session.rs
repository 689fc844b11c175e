use std::sync::Arc;

use shared::protocol::{LoginRequest, RegisterRequest};
use tokio::sync::broadcast;
use tracing::info;

use crate::{
    api::TaskApi,
    credentials::CredentialStore,
    error::{ClientError, ClientResult},
    events::ClientEvent,
    transport::Transport,
    validation::{validate_login, validate_registration},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPane {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Auth(AuthPane),
    Tasks,
}

pub struct SessionManager<T: Transport + ?Sized> {
    api: TaskApi<T>,
    store: Arc<dyn CredentialStore>,
    events: broadcast::Sender<ClientEvent>,
    pane: AuthPane,
}

impl<T: Transport + ?Sized> SessionManager<T> {
    pub fn new(
        api: TaskApi<T>,
        store: Arc<dyn CredentialStore>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            api,
            store,
            events,
            pane: AuthPane::Login,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.load().is_some()
    }

    /// The task view whenever a credential is stored, otherwise the auth pane.
    pub fn view(&self) -> View {
        if self.is_authenticated() {
            View::Tasks
        } else {
            View::Auth(self.pane)
        }
    }

    pub fn show_pane(&mut self, pane: AuthPane) {
        if self.pane != pane {
            self.pane = pane;
            let _ = self.events.send(ClientEvent::AuthPaneChanged(pane));
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<()> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        validate_login(&request)?;

        let response = self.api.login(&request).await?;
        if response.access_token.trim().is_empty() {
            return Err(ClientError::Decode("login response carried no token".into()));
        }
        self.store.save(response.access_token.trim())?;
        self.pane = AuthPane::Login;
        info!(email = %request.email, "logged in");
        let _ = self.events.send(ClientEvent::LoggedIn);
        Ok(())
    }

    /// Registers an account and returns the backend's confirmation message.
    /// The login pane is shown afterwards.
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> ClientResult<String> {
        let request = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        validate_registration(&request)?;

        let response = self.api.register(&request).await?;
        info!(email = %request.email, "account registered");
        self.show_pane(AuthPane::Login);
        let message = if response.msg.is_empty() {
            "Account created; you can log in now.".to_string()
        } else {
            response.msg
        };
        Ok(message)
    }

    pub fn logout(&mut self) -> ClientResult<()> {
        self.store.clear()?;
        self.pane = AuthPane::Login;
        info!("logged out");
        let _ = self.events.send(ClientEvent::LoggedOut { expired: false });
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
