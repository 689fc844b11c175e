//! User actions, one variant per controller operation.

use shared::{
    domain::{PriorityFilter, StatusFilter, TaskId},
    protocol::{NewTask, TaskPatch},
};

use crate::controller::FilterChange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        email: String,
        password: String,
    },
    Register {
        name: String,
        email: String,
        password: String,
    },
    ShowRegister,
    ShowLogin,
    Logout,
    Search(String),
    SetStatus(StatusFilter),
    SetPriority(PriorityFilter),
    /// Several filter changes applied with one refresh.
    ApplyFilters(Vec<FilterChange>),
    GoToPage(u32),
    NextPage,
    PreviousPage,
    Refresh,
    CreateTask(NewTask),
    UpdateTask {
        id: TaskId,
        patch: TaskPatch,
    },
    DeleteTask(TaskId),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Register { .. } => "register",
            Self::ShowRegister => "show_register",
            Self::ShowLogin => "show_login",
            Self::Logout => "logout",
            Self::Search(_) => "search",
            Self::SetStatus(_) => "set_status",
            Self::SetPriority(_) => "set_priority",
            Self::ApplyFilters(_) => "apply_filters",
            Self::GoToPage(_) => "go_to_page",
            Self::NextPage => "next_page",
            Self::PreviousPage => "previous_page",
            Self::Refresh => "refresh",
            Self::CreateTask(_) => "create_task",
            Self::UpdateTask { .. } => "update_task",
            Self::DeleteTask(_) => "delete_task",
        }
    }

    /// Commands that only make sense with a stored credential.
    pub fn requires_session(&self) -> bool {
        !matches!(
            self,
            Self::Login { .. } | Self::Register { .. } | Self::ShowRegister | Self::ShowLogin
        )
    }
}
