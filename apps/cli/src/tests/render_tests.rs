use super::*;

use client_core::{ClientError, NoticeContext};
use shared::domain::{parse_timestamp, TaskId, TaskPriority, TaskStatus};

fn task(id: i64, title: &str) -> Task {
    Task {
        id: TaskId(id),
        title: title.to_string(),
        description: None,
        status: TaskStatus::InProgress,
        priority: TaskPriority::High,
        created_at: parse_timestamp("2024-05-01T09:30:00"),
    }
}

#[test]
fn pagination_bar_marks_current_page() {
    assert_eq!(pagination_bar(2, 3), "1 [2] 3");
    assert_eq!(pagination_bar(1, 1), "[1]");
    assert_eq!(pagination_bar(1, 0), "");
}

#[test]
fn page_view_lists_tasks_and_totals() {
    let page = PageResult {
        items: vec![task(12, "buy milk"), task(11, &"x".repeat(60))],
        total_items: 12,
        current_page: 1,
        total_pages: 3,
    };
    let text = page_view(&page);
    let lines: Vec<&str> = text.lines().collect();

    assert!(lines[0].contains("TITLE"));
    assert!(lines[1].contains("buy milk"));
    assert!(lines[1].contains("in_progress"));
    assert!(lines[1].contains("2024-05-01 09:30"));
    assert!(lines[2].contains(&format!("{}~", "x".repeat(39))));
    assert!(!lines[2].contains(&"x".repeat(41)));
    assert_eq!(lines[3], "[1] 2 3");
    assert_eq!(lines[4], "Page 1 of 3  Total: 12");
}

#[test]
fn empty_page_says_so() {
    assert_eq!(
        page_view(&PageResult::empty()),
        "No tasks found.\nTotal: 0"
    );
}

#[test]
fn error_notices_go_to_stderr() {
    let failure = Notice::from_error(
        NoticeContext::CreateTask,
        &ClientError::Validation("title must not be empty".to_string()),
    );
    assert_eq!(
        notice(&failure),
        Line {
            text: "error: title must not be empty".to_string(),
            is_error: true,
        }
    );

    let info = Notice::info(NoticeContext::DeleteTask, "Deletion cancelled.");
    assert!(!notice(&info).is_error);
    assert!(event(&ClientEvent::LoggedOut { expired: true }).is_error);
}
