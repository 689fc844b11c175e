//! Plain-text rendering of pages, notices and session changes.

use client_core::{AuthPane, ClientEvent, Notice, NoticeLevel, PageResult};
use shared::domain::Task;

const TITLE_WIDTH: usize = 40;

/// One line of output; errors go to stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub is_error: bool,
}

impl Line {
    fn out(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn err(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    pub fn print(&self) {
        if self.is_error {
            eprintln!("{}", self.text);
        } else {
            println!("{}", self.text);
        }
    }
}

pub fn event(event: &ClientEvent) -> Line {
    match event {
        ClientEvent::PageLoaded(page) => Line::out(page_view(page)),
        ClientEvent::LoggedIn => Line::out("Logged in."),
        ClientEvent::LoggedOut { expired: true } => {
            Line::err("Session expired; log in again.")
        }
        ClientEvent::LoggedOut { expired: false } => Line::out("Logged out."),
        ClientEvent::AuthPaneChanged(AuthPane::Login) => {
            Line::out("Log in with: login <email> <password>")
        }
        ClientEvent::AuthPaneChanged(AuthPane::Register) => {
            Line::out("Register with: register <name> <email> <password>")
        }
        ClientEvent::Notice(notice) => self::notice(notice),
    }
}

pub fn notice(notice: &Notice) -> Line {
    match notice.level() {
        NoticeLevel::Info => Line::out(notice.message()),
        NoticeLevel::Error => Line::err(format!("error: {}", notice.message())),
    }
}

pub fn page_view(page: &PageResult) -> String {
    let mut out = String::new();
    if page.items.is_empty() {
        out.push_str("No tasks found.\n");
    } else {
        out.push_str(&format!(
            "{:>5}  {:<width$}  {:<11}  {:<8}  {}\n",
            "ID",
            "TITLE",
            "STATUS",
            "PRIORITY",
            "CREATED",
            width = TITLE_WIDTH
        ));
        for task in &page.items {
            out.push_str(&task_row(task));
            out.push('\n');
        }
    }
    if page.total_pages > 0 {
        out.push_str(&pagination_bar(page.current_page, page.total_pages));
        out.push('\n');
        out.push_str(&format!(
            "Page {} of {}  ",
            page.current_page, page.total_pages
        ));
    }
    out.push_str(&format!("Total: {}", page.total_items));
    out
}

fn task_row(task: &Task) -> String {
    let created = task
        .created_at
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>5}  {:<width$}  {:<11}  {:<8}  {}",
        task.id.to_string(),
        clip(&task.title, TITLE_WIDTH),
        task.status.as_str(),
        task.priority.as_str(),
        created,
        width = TITLE_WIDTH
    )
}

/// `1 [2] 3`: every page number with the current one bracketed.
pub fn pagination_bar(current: u32, total: u32) -> String {
    (1..=total)
        .map(|page| {
            if page == current {
                format!("[{page}]")
            } else {
                page.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('~');
    clipped
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
