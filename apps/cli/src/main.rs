mod prompt;
mod render;
mod shell;

use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, AlwaysConfirm, ClientEvent, Command, ConfirmPrompt, CredentialStore,
    FileCredentialStore, FilterChange, NoticeLevel, TaskApp,
};
use shared::{
    domain::{PriorityFilter, StatusFilter, TaskId, TaskPriority, TaskStatus},
    protocol::{NewTask, TaskPatch},
};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::prompt::StdinConfirm;

#[derive(Parser, Debug)]
#[command(name = "tasks", about = "Client for the paginated task backend")]
struct Cli {
    /// Overrides the configured API base URL, e.g. http://127.0.0.1:5000/api
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        #[arg(long, default_value = "all")]
        priority: PriorityFilter,
    },
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "pending")]
        status: TaskStatus,
        #[arg(long, default_value = "medium")]
        priority: TaskPriority,
    },
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<TaskPriority>,
    },
    Delete {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Interactive session with debounced search.
    Shell,
}

impl CliCommand {
    fn into_commands(self) -> Vec<Command> {
        match self {
            Self::Login { email, password } => vec![Command::Login { email, password }],
            Self::Register {
                name,
                email,
                password,
            } => vec![Command::Register {
                name,
                email,
                password,
            }],
            Self::Logout => vec![Command::Logout],
            Self::List {
                page,
                search,
                status,
                priority,
            } => {
                let mut commands = vec![Command::ApplyFilters(vec![
                    FilterChange::Search(search),
                    FilterChange::Status(status),
                    FilterChange::Priority(priority),
                ])];
                if page > 1 {
                    commands.push(Command::GoToPage(page));
                }
                commands
            }
            Self::Add {
                title,
                description,
                status,
                priority,
            } => vec![Command::CreateTask(NewTask {
                title,
                description,
                status,
                priority,
            })],
            Self::Edit {
                id,
                title,
                description,
                status,
                priority,
            } => vec![Command::UpdateTask {
                id: TaskId(id),
                patch: TaskPatch {
                    title,
                    description,
                    status,
                    priority,
                },
            }],
            Self::Delete { id, .. } => vec![Command::DeleteTask(TaskId(id))],
            Self::Shell => Vec::new(),
        }
    }
}

/// Prints what the commands produced, showing only the final page. Returns
/// whether anything failed.
fn report(events: &mut broadcast::Receiver<ClientEvent>) -> bool {
    let mut failed = false;
    let mut last_page = None;
    while let Ok(event) = events.try_recv() {
        if matches!(event, ClientEvent::PageLoaded(_)) {
            last_page = Some(event);
            continue;
        }
        match &event {
            ClientEvent::Notice(notice) if notice.level() == NoticeLevel::Error => failed = true,
            ClientEvent::LoggedOut { expired: true } => failed = true,
            _ => {}
        }
        render::event(&event).print();
    }
    if let Some(page) = last_page {
        render::event(&page).print();
    }
    failed
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new(
        settings.resolve_credentials_path()?,
    ));
    let confirm: Arc<dyn ConfirmPrompt> = match &cli.command {
        CliCommand::Delete { yes: false, .. } => Arc::new(StdinConfirm),
        _ => Arc::new(AlwaysConfirm),
    };
    let mut app = TaskApp::connect(&settings, store, confirm)
        .with_context(|| format!("failed to set up client for {}", settings.api_url))?;

    if matches!(cli.command, CliCommand::Shell) {
        shell::run(app).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut events = app.subscribe_events();
    for command in cli.command.into_commands() {
        app.dispatch(command).await;
    }
    Ok(if report(&mut events) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
