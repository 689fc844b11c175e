//! Single-threaded command loop tying the session and the task list together.
//!
//! Commands are handled strictly in arrival order and each one is awaited
//! before the next is taken. The search debounce deadline is the only other
//! event source. Failures never escape `dispatch`; they are logged and
//! published as notices.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::{
    api::TaskApi,
    commands::Command,
    config::ClientSettings,
    controller::{ConfirmPrompt, DeleteOutcome, FilterChange, ListSyncController},
    credentials::CredentialStore,
    debounce::sleep_until_deadline,
    error::{ClientError, ClientResult},
    events::{ClientEvent, Notice, NoticeContext},
    gate::CredentialGate,
    session::{AuthPane, SessionManager, View},
    transport::{HttpTransport, Transport},
};

const EVENT_CAPACITY: usize = 1024;

pub struct TaskApp<T: Transport + ?Sized> {
    session: SessionManager<T>,
    list: ListSyncController<T>,
    events: broadcast::Sender<ClientEvent>,
}

impl TaskApp<CredentialGate<HttpTransport>> {
    /// Wires an HTTP transport behind the credential gate.
    pub fn connect(
        settings: &ClientSettings,
        store: Arc<dyn CredentialStore>,
        confirm: Arc<dyn ConfirmPrompt>,
    ) -> ClientResult<Self> {
        settings.validate()?;
        let transport = HttpTransport::new(&settings.api_url, settings.request_timeout())?;
        Ok(Self::with_transport(transport, settings, store, confirm))
    }
}

impl<U: Transport> TaskApp<CredentialGate<U>> {
    pub fn with_transport(
        transport: U,
        settings: &ClientSettings,
        store: Arc<dyn CredentialStore>,
        confirm: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let gate = CredentialGate::new(transport, Arc::clone(&store), events.clone());
        let api = TaskApi::new(Arc::new(gate));
        let session = SessionManager::new(api.clone(), store, events.clone());
        let list = ListSyncController::new(
            api,
            settings.page_size,
            settings.search_debounce(),
            confirm,
            events.clone(),
        );
        Self {
            session,
            list,
            events,
        }
    }
}

impl<T: Transport + ?Sized> TaskApp<T> {
    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn view(&self) -> View {
        self.session.view()
    }

    pub fn list(&self) -> &ListSyncController<T> {
        &self.list
    }

    /// Loads the first page when a stored credential is already present.
    pub async fn start(&mut self) {
        if self.session.is_authenticated() {
            info!("stored credential found, opening task view");
            let result = self.list.reset_for_session().await;
            self.settle(result);
        }
    }

    pub async fn dispatch(&mut self, command: Command) {
        debug!(command = command.name(), "dispatching command");
        if command.requires_session() && !self.session.is_authenticated() {
            self.notice(Notice::login_required());
            return;
        }

        match command {
            Command::Login { email, password } => {
                match self.session.login(&email, &password).await {
                    Ok(()) => {
                        let result = self.list.reset_for_session().await;
                        self.settle(result);
                    }
                    Err(err) => self.report(NoticeContext::Login, &err),
                }
            }
            Command::Register {
                name,
                email,
                password,
            } => match self.session.register(&name, &email, &password).await {
                Ok(message) => self.notice(Notice::info(NoticeContext::Register, message)),
                Err(err) => self.report(NoticeContext::Register, &err),
            },
            Command::ShowRegister => self.session.show_pane(AuthPane::Register),
            Command::ShowLogin => self.session.show_pane(AuthPane::Login),
            Command::Logout => {
                self.list.clear();
                if let Err(err) = self.session.logout() {
                    self.report(NoticeContext::General, &err);
                }
            }
            Command::Search(term) => {
                let result = self.list.set_filter(FilterChange::Search(term)).await;
                self.settle(result);
            }
            Command::SetStatus(filter) => {
                let result = self.list.set_filter(FilterChange::Status(filter)).await;
                self.settle(result);
            }
            Command::SetPriority(filter) => {
                let result = self.list.set_filter(FilterChange::Priority(filter)).await;
                self.settle(result);
            }
            Command::ApplyFilters(changes) => {
                let result = self.list.set_filters(changes).await;
                self.settle(result);
            }
            Command::GoToPage(page) => {
                let result = self.list.go_to_page(page).await;
                self.settle(result);
            }
            Command::NextPage => {
                let result = self.list.next_page().await;
                self.settle(result);
            }
            Command::PreviousPage => {
                let result = self.list.previous_page().await;
                self.settle(result);
            }
            Command::Refresh => {
                let result = self.list.refresh().await;
                self.settle(result);
            }
            Command::CreateTask(task) => {
                let result = self.list.create_task(task).await;
                self.settle(result);
            }
            Command::UpdateTask { id, patch } => {
                let result = self.list.update_task(id, patch).await;
                self.settle(result);
            }
            Command::DeleteTask(id) => match self.list.delete_task(id).await {
                Ok(DeleteOutcome::Declined) => {
                    self.notice(Notice::info(NoticeContext::DeleteTask, "Deletion cancelled."))
                }
                Ok(DeleteOutcome::Deleted) => {}
                Err(err) => self.after_list_failure(&err),
            },
        }
    }

    /// Runs until the command channel closes, then hands the app back.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Self {
        loop {
            let deadline = self.list.search_deadline();
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.dispatch(command).await,
                    None => break,
                },
                () = sleep_until_deadline(deadline) => {
                    let result = self.list.fire_due_search().await.map(|_| ());
                    self.settle(result);
                }
            }
        }
        debug!("command channel closed, stopping task runtime");
        self
    }

    /// List operations publish their own notices; only the session side effects remain.
    fn settle(&mut self, result: ClientResult<()>) {
        if let Err(err) = result {
            self.after_list_failure(&err);
        }
    }

    fn after_list_failure(&mut self, err: &ClientError) {
        if err.is_auth_expired() {
            self.list.clear();
        }
    }

    fn report(&self, context: NoticeContext, err: &ClientError) {
        tracing::warn!(?context, "command failed: {err}");
        self.notice(Notice::from_error(context, err));
    }

    fn notice(&self, notice: Notice) {
        let _ = self.events.send(ClientEvent::Notice(notice));
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
