//! Client core for the task backend: transport, credential gate, list
//! synchronization and the command runtime that drives them.

pub mod api;
pub mod commands;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod debounce;
pub mod error;
pub mod events;
pub mod gate;
pub mod runtime;
pub mod session;
pub mod transport;
pub mod validation;

pub use api::TaskApi;
pub use commands::Command;
pub use config::{load_settings, ClientSettings};
pub use controller::{
    AlwaysConfirm, ConfirmPrompt, DeleteOutcome, FetchDisposition, FetchTicket, FilterChange,
    ListSyncController, PageResult, QueryState,
};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use debounce::Debouncer;
pub use error::{ClientError, ClientResult};
pub use events::{ClientEvent, Notice, NoticeCategory, NoticeContext, NoticeLevel};
pub use gate::CredentialGate;
pub use runtime::TaskApp;
pub use session::{AuthPane, SessionManager, View};
pub use transport::{ApiMethod, ApiRequest, ApiResponse, HttpTransport, Transport};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
