//! Interactive mode: each line typed at the prompt becomes one command for the
//! task runtime, while a printer task renders whatever the runtime publishes.

use std::sync::Arc;

use anyhow::{Context, Result};
use client_core::{ClientEvent, Command, CredentialGate, HttpTransport, PageResult, TaskApp};
use shared::{
    domain::{PriorityFilter, StatusFilter, TaskId},
    protocol::{NewTask, TaskPatch},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{
        broadcast::{self, error::RecvError},
        mpsc::{self, error::TrySendError},
        Mutex,
    },
};
use tracing::{debug, warn};

use crate::{prompt::is_yes, render};

const COMMAND_QUEUE: usize = 64;

pub const HELP: &str = "\
commands:
  login <email> <password>          register <name> <email> <password>
  register                          show the registration form
  logout
  search [text]                     filter by title/description (debounced)
  status <all|pending|in_progress|done>
  priority <all|low|medium|high>
  page <n>   next   prev   refresh
  add <title> [| <description>]
  edit <id> <title|description|status|priority> <value>
  delete <id>
  help   quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellAction {
    Run(Command),
    /// Deletion is confirmed at the prompt before the command is queued.
    ConfirmDelete(TaskId),
    Help,
    Quit,
    Nothing,
}

fn words<const N: usize>(rest: &str, usage: &str) -> Result<[String; N], String> {
    rest.split_whitespace()
        .map(str::to_string)
        .collect::<Vec<_>>()
        .try_into()
        .map_err(|_| format!("usage: {usage}"))
}

fn task_id(raw: &str) -> Result<TaskId, String> {
    raw.trim()
        .parse::<i64>()
        .map(TaskId)
        .map_err(|_| format!("'{raw}' is not a task id"))
}

pub fn parse_line(line: &str) -> Result<ShellAction, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let action = match word.to_ascii_lowercase().as_str() {
        "" => ShellAction::Nothing,
        "help" | "?" => ShellAction::Help,
        "quit" | "exit" => ShellAction::Quit,
        "login" => {
            let [email, password] = words(rest, "login <email> <password>")?;
            ShellAction::Run(Command::Login { email, password })
        }
        "register" if rest.is_empty() => ShellAction::Run(Command::ShowRegister),
        "register" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [name @ .., email, password] = parts.as_slice() else {
                return Err("usage: register <name> <email> <password>".to_string());
            };
            if name.is_empty() {
                return Err("usage: register <name> <email> <password>".to_string());
            }
            ShellAction::Run(Command::Register {
                name: name.join(" "),
                email: email.to_string(),
                password: password.to_string(),
            })
        }
        "show" => match rest {
            "register" => ShellAction::Run(Command::ShowRegister),
            "login" => ShellAction::Run(Command::ShowLogin),
            _ => return Err("usage: show <login|register>".to_string()),
        },
        "logout" => ShellAction::Run(Command::Logout),
        "search" => ShellAction::Run(Command::Search(rest.to_string())),
        "status" => {
            let filter: StatusFilter = rest.parse().map_err(|err| format!("{err}"))?;
            ShellAction::Run(Command::SetStatus(filter))
        }
        "priority" => {
            let filter: PriorityFilter = rest.parse().map_err(|err| format!("{err}"))?;
            ShellAction::Run(Command::SetPriority(filter))
        }
        "page" => {
            let page = rest
                .parse::<u32>()
                .map_err(|_| "usage: page <n>".to_string())?;
            ShellAction::Run(Command::GoToPage(page))
        }
        "next" => ShellAction::Run(Command::NextPage),
        "prev" | "previous" => ShellAction::Run(Command::PreviousPage),
        "refresh" => ShellAction::Run(Command::Refresh),
        "add" => {
            let (title, description) = match rest.split_once('|') {
                Some((title, description)) => (title.trim(), description.trim()),
                None => (rest, ""),
            };
            if title.is_empty() {
                return Err("usage: add <title> [| <description>]".to_string());
            }
            ShellAction::Run(Command::CreateTask(NewTask {
                description: description.to_string(),
                ..NewTask::titled(title)
            }))
        }
        "edit" => parse_edit(rest)?,
        "delete" => ShellAction::ConfirmDelete(task_id(rest)?),
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(action)
}

fn parse_edit(rest: &str) -> Result<ShellAction, String> {
    const USAGE: &str = "usage: edit <id> <title|description|status|priority> <value>";
    let mut parts = rest.splitn(3, char::is_whitespace);
    let (Some(id), Some(field), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(USAGE.to_string());
    };
    let value = value.trim();
    let mut patch = TaskPatch::default();
    match field.to_ascii_lowercase().as_str() {
        "title" => patch.title = Some(value.to_string()),
        "description" => patch.description = Some(value.to_string()),
        "status" => patch.status = Some(value.parse().map_err(|err| format!("{err}"))?),
        "priority" => patch.priority = Some(value.parse().map_err(|err| format!("{err}"))?),
        _ => return Err(USAGE.to_string()),
    }
    Ok(ShellAction::Run(Command::UpdateTask {
        id: task_id(id)?,
        patch,
    }))
}

pub fn queue_command(tx: &mpsc::Sender<Command>, command: Command) -> Result<(), String> {
    let name = command.name();
    match tx.try_send(command) {
        Ok(()) => {
            debug!(command = name, "queued shell command");
            Ok(())
        }
        Err(TrySendError::Full(_)) => Err("command queue is full; please retry".to_string()),
        Err(TrySendError::Closed(_)) => Err("task runtime stopped; restart the shell".to_string()),
    }
}

pub fn delete_prompt(page: Option<&PageResult>, id: TaskId) -> String {
    match page.and_then(|page| page.items.iter().find(|task| task.id == id)) {
        Some(task) => format!("Delete task '{}'?", task.title),
        None => format!("Delete task {id}?"),
    }
}

async fn print_events(
    mut events: broadcast::Receiver<ClientEvent>,
    last_page: Arc<Mutex<Option<PageResult>>>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                match &event {
                    ClientEvent::PageLoaded(page) => *last_page.lock().await = Some(page.clone()),
                    ClientEvent::LoggedOut { .. } => *last_page.lock().await = None,
                    _ => {}
                }
                render::event(&event).print();
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

pub async fn run(mut app: TaskApp<CredentialGate<HttpTransport>>) -> Result<()> {
    let events = app.subscribe_events();
    app.start().await;

    let last_page = Arc::new(Mutex::new(None));
    let printer = tokio::spawn(print_events(events, Arc::clone(&last_page)));
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
    let runner = tokio::spawn(app.run(rx));

    println!("type 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let queued = match parse_line(&line) {
            Ok(ShellAction::Nothing) => Ok(()),
            Ok(ShellAction::Help) => {
                println!("{HELP}");
                Ok(())
            }
            Ok(ShellAction::Quit) => break,
            Ok(ShellAction::Run(command)) => queue_command(&tx, command),
            Ok(ShellAction::ConfirmDelete(id)) => {
                let prompt = delete_prompt(last_page.lock().await.as_ref(), id);
                println!("{prompt} [y/N]");
                let answer = lines
                    .next_line()
                    .await
                    .context("failed to read stdin")?
                    .unwrap_or_default();
                if is_yes(&answer) {
                    queue_command(&tx, Command::DeleteTask(id))
                } else {
                    println!("Deletion cancelled.");
                    Ok(())
                }
            }
            Err(message) => Err(message),
        };
        if let Err(message) = queued {
            eprintln!("error: {message}");
        }
    }

    drop(tx);
    let app = runner.await.context("task runtime panicked")?;
    drop(app);
    printer.await.context("event printer panicked")?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
