//! Events published to whatever renders the task list, and user-facing notices.

use crate::{controller::PageResult, error::ClientError};

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A fetch was applied: re-render the list, pagination controls and totals.
    PageLoaded(PageResult),
    LoggedIn,
    LoggedOut {
        expired: bool,
    },
    /// The auth pane switched between login and registration.
    AuthPaneChanged(crate::session::AuthPane),
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeCategory {
    Network,
    Api,
    AuthExpired,
    Validation,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeContext {
    Login,
    Register,
    LoadTasks,
    Pagination,
    CreateTask,
    UpdateTask,
    DeleteTask,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    level: NoticeLevel,
    category: NoticeCategory,
    context: NoticeContext,
    message: String,
}

impl Notice {
    pub fn info(context: NoticeContext, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            category: NoticeCategory::General,
            context,
            message: message.into(),
        }
    }

    pub fn login_required() -> Self {
        Self {
            level: NoticeLevel::Error,
            category: NoticeCategory::AuthExpired,
            context: NoticeContext::General,
            message: "Please log in first.".to_string(),
        }
    }

    pub fn from_error(context: NoticeContext, err: &ClientError) -> Self {
        let (category, message) = match err {
            ClientError::Network(detail) => (NoticeCategory::Network, describe_network_failure(detail)),
            ClientError::Api { message, .. } => (NoticeCategory::Api, message.clone()),
            ClientError::Decode(_) => (
                NoticeCategory::Api,
                "The server sent a response this client could not read.".to_string(),
            ),
            ClientError::AuthExpired(_) => (
                NoticeCategory::AuthExpired,
                "Your session has expired; please log in again.".to_string(),
            ),
            ClientError::Validation(message) => (NoticeCategory::Validation, message.clone()),
            ClientError::PageOutOfRange { requested, last } => (
                NoticeCategory::Validation,
                format!("Page {requested} does not exist (last page is {last})."),
            ),
            ClientError::Credentials(message) | ClientError::Settings(message) => {
                (NoticeCategory::General, message.clone())
            }
        };
        Self {
            level: NoticeLevel::Error,
            category,
            context,
            message,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == NoticeCategory::AuthExpired
    }

    pub fn level(&self) -> NoticeLevel {
        self.level
    }

    pub fn category(&self) -> NoticeCategory {
        self.category
    }

    pub fn context(&self) -> NoticeContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn describe_network_failure(detail: &str) -> String {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        "The server took too long to answer; try again.".to_string()
    } else if lower.contains("connect")
        || lower.contains("connection refused")
        || lower.contains("dns")
    {
        "Server unreachable; check the API URL and your network.".to_string()
    } else {
        format!("Network error: {detail}")
    }
}
