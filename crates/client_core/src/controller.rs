//! List synchronization: keeps the displayed page of tasks consistent with the
//! query state (search text, filters, page) and the backend collection.
//!
//! Every fetch carries a monotonically increasing sequence number. Responses
//! older than the last applied one are discarded, so an overlapping slow
//! fetch can never overwrite fresher state.
//!
//! When a refresh lands past the last page (typically after deleting the only
//! task on the last page) two backend behaviours are handled: a backend that
//! clamps and reports a different page is simply followed, and a backend that
//! answers with an empty out-of-range page is asked once more for its last page.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{PriorityFilter, StatusFilter, Task, TaskId},
    protocol::{NewTask, TaskListQuery, TaskListResponse, TaskPatch},
};
use tokio::{sync::broadcast, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    api::TaskApi,
    debounce::Debouncer,
    error::{ClientError, ClientResult},
    events::{ClientEvent, Notice, NoticeContext},
    transport::Transport,
    validation::{validate_new_task, validate_patch},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    page: u32,
    page_size: u32,
    pub search_term: String,
    pub status_filter: StatusFilter,
    pub priority_filter: PriorityFilter,
}

impl QueryState {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            search_term: String::new(),
            status_filter: StatusFilter::All,
            priority_filter: PriorityFilter::All,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn to_request(&self) -> TaskListQuery {
        TaskListQuery {
            page: self.page,
            per_page: self.page_size,
            q: self.search_term.clone(),
            status: self.status_filter,
            priority: self.priority_filter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub items: Vec<Task>,
    pub total_items: u64,
    pub current_page: u32,
    pub total_pages: u32,
}

impl PageResult {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_items: 0,
            current_page: 1,
            total_pages: 0,
        }
    }

    /// Normalizes a backend page. `total_pages` is recomputed from the totals
    /// when the backend's figure disagrees with them.
    pub fn from_response(response: TaskListResponse, page_size: u32) -> Self {
        let computed = pages_for(response.total, page_size);
        if computed != response.total_pages {
            warn!(
                reported = response.total_pages,
                computed, "backend page count disagrees with totals"
            );
        }
        let mut items = response.data;
        items.truncate(page_size as usize);
        Self {
            items,
            total_items: response.total,
            current_page: response.page.max(1),
            total_pages: computed,
        }
    }

    /// Items lie past the last page (empty page beyond `total_pages`).
    pub fn is_past_end(&self) -> bool {
        self.items.is_empty() && self.total_pages > 0 && self.current_page > self.total_pages
    }
}

pub fn pages_for(total_items: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    u32::try_from(total_items.div_ceil(page_size)).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Search(String),
    Status(StatusFilter),
    Priority(PriorityFilter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

/// Asks the user to confirm a destructive action.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

pub struct AlwaysConfirm;

impl ConfirmPrompt for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: TaskListQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDisposition {
    Applied,
    Stale,
    /// Landed past the last page; the page was moved back and must be fetched again.
    Refetch,
}

pub struct ListSyncController<T: Transport + ?Sized> {
    api: TaskApi<T>,
    query: QueryState,
    cache: Option<PageResult>,
    search_debounce: Debouncer<()>,
    confirm: Arc<dyn ConfirmPrompt>,
    events: broadcast::Sender<ClientEvent>,
    next_seq: u64,
    last_applied_seq: u64,
}

impl<T: Transport + ?Sized> ListSyncController<T> {
    pub fn new(
        api: TaskApi<T>,
        page_size: u32,
        search_quiet: Duration,
        confirm: Arc<dyn ConfirmPrompt>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            api,
            query: QueryState::new(page_size),
            cache: None,
            search_debounce: Debouncer::new(search_quiet),
            confirm,
            events,
            next_seq: 0,
            last_applied_seq: 0,
        }
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    /// The page currently displayed, if any fetch has succeeded.
    pub fn page(&self) -> Option<&PageResult> {
        self.cache.as_ref()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.cache
            .as_ref()
            .and_then(|page| page.items.iter().find(|task| task.id == id))
    }

    /// Highest page `go_to_page` accepts, based on the last successful fetch.
    pub fn last_page(&self) -> u32 {
        self.cache
            .as_ref()
            .map_or(1, |page| page.total_pages.max(1))
    }

    pub fn search_deadline(&self) -> Option<Instant> {
        self.search_debounce.deadline()
    }

    pub fn search_pending(&self) -> bool {
        self.search_debounce.is_pending()
    }

    /// Applies a filter change and resets to page 1. Search text only restarts
    /// the debounce window; status and priority refresh right away.
    pub async fn set_filter(&mut self, change: FilterChange) -> ClientResult<()> {
        self.query.set_page(1);
        match change {
            FilterChange::Search(term) => {
                self.query.search_term = term;
                self.search_debounce.schedule(());
                debug!(term = %self.query.search_term, "search debounce restarted");
                Ok(())
            }
            FilterChange::Status(filter) => {
                self.query.status_filter = filter;
                self.refresh().await
            }
            FilterChange::Priority(filter) => {
                self.query.priority_filter = filter;
                self.refresh().await
            }
        }
    }

    /// Applies several filter changes at once with a single, immediate refresh.
    pub async fn set_filters(
        &mut self,
        changes: impl IntoIterator<Item = FilterChange>,
    ) -> ClientResult<()> {
        self.query.set_page(1);
        for change in changes {
            match change {
                FilterChange::Search(term) => self.query.search_term = term,
                FilterChange::Status(filter) => self.query.status_filter = filter,
                FilterChange::Priority(filter) => self.query.priority_filter = filter,
            }
        }
        self.refresh().await
    }

    /// Refreshes if the search window has elapsed. Returns whether it did.
    pub async fn fire_due_search(&mut self) -> ClientResult<bool> {
        if self.search_debounce.take_due(Instant::now()).is_none() {
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }

    /// Waits out a pending search window, then refreshes. No-op when none is pending.
    pub async fn settle_search(&mut self) -> ClientResult<bool> {
        if !self.search_debounce.is_pending() {
            return Ok(false);
        }
        self.search_debounce.fired().await;
        self.refresh().await?;
        Ok(true)
    }

    pub async fn go_to_page(&mut self, page: u32) -> ClientResult<()> {
        let last = self.last_page();
        if page < 1 || page > last {
            let err = ClientError::PageOutOfRange {
                requested: page,
                last,
            };
            self.notify_error(NoticeContext::Pagination, &err);
            return Err(err);
        }
        self.query.set_page(page);
        self.refresh().await
    }

    pub async fn next_page(&mut self) -> ClientResult<()> {
        self.go_to_page(self.query.page().saturating_add(1)).await
    }

    pub async fn previous_page(&mut self) -> ClientResult<()> {
        self.go_to_page(self.query.page().saturating_sub(1)).await
    }

    /// Back to page 1 with the current filters, e.g. right after login.
    pub async fn reset_for_session(&mut self) -> ClientResult<()> {
        self.query.set_page(1);
        self.refresh().await
    }

    /// Drops the cached page and any pending search, e.g. on logout.
    pub fn clear(&mut self) {
        self.search_debounce.cancel();
        self.cache = None;
        self.query.set_page(1);
    }

    /// Fetches the current query state and replaces the cached page. A pending
    /// search window is dropped: the fetch already carries the search text.
    pub async fn refresh(&mut self) -> ClientResult<()> {
        if self.search_debounce.cancel().is_some() {
            debug!("pending search folded into immediate refresh");
        }
        // A second round covers a refresh that landed past the last page.
        for _ in 0..2 {
            let ticket = self.issue_fetch();
            let result = self.api.list_tasks(&ticket.query).await;
            match self.apply_fetch(ticket.seq, result)? {
                FetchDisposition::Refetch => continue,
                _ => return Ok(()),
            }
        }
        warn!(
            page = self.query.page(),
            "list kept shrinking while refreshing, page not reloaded"
        );
        let _ = self.events.send(ClientEvent::Notice(Notice::info(
            NoticeContext::LoadTasks,
            "The task list changed while loading; refresh to see the latest page.",
        )));
        Ok(())
    }

    /// Reserves a sequence number for a fetch of the current query state.
    pub fn issue_fetch(&mut self) -> FetchTicket {
        self.next_seq += 1;
        FetchTicket {
            seq: self.next_seq,
            query: self.query.to_request(),
        }
    }

    /// Applies the outcome of the fetch tagged `seq`. Errors are surfaced as
    /// notices and returned; the previous page stays displayed.
    pub fn apply_fetch(
        &mut self,
        seq: u64,
        result: ClientResult<TaskListResponse>,
    ) -> ClientResult<FetchDisposition> {
        if seq <= self.last_applied_seq {
            debug!(seq, last_applied = self.last_applied_seq, "discarding stale fetch");
            return Ok(FetchDisposition::Stale);
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                if seq == self.next_seq {
                    self.notify_error(NoticeContext::LoadTasks, &err);
                }
                return Err(err);
            }
        };
        self.last_applied_seq = seq;

        let mut page = PageResult::from_response(response, self.query.page_size());
        if page.is_past_end() {
            info!(
                requested = page.current_page,
                last = page.total_pages,
                "page past the end, moving to last page"
            );
            self.query.set_page(page.total_pages);
            return Ok(FetchDisposition::Refetch);
        }

        if page.total_items == 0 {
            page.current_page = 1;
            self.query.set_page(1);
        } else if page.current_page != self.query.page() {
            debug!(
                requested = self.query.page(),
                served = page.current_page,
                "following page chosen by backend"
            );
            self.query.set_page(page.current_page);
        }

        let _ = self.events.send(ClientEvent::PageLoaded(page.clone()));
        self.cache = Some(page);
        Ok(FetchDisposition::Applied)
    }

    pub async fn create_task(&mut self, task: NewTask) -> ClientResult<()> {
        if let Err(err) = validate_new_task(&task) {
            self.notify_error(NoticeContext::CreateTask, &err);
            return Err(err);
        }
        if let Err(err) = self.api.create_task(&task).await {
            self.notify_error(NoticeContext::CreateTask, &err);
            return Err(err);
        }
        info!(title = %task.title, "task created");
        self.refresh().await
    }

    pub async fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> ClientResult<()> {
        if let Err(err) = validate_patch(&patch) {
            self.notify_error(NoticeContext::UpdateTask, &err);
            return Err(err);
        }
        if let Err(err) = self.api.update_task(id, &patch).await {
            self.notify_error(NoticeContext::UpdateTask, &err);
            return Err(err);
        }
        info!(task_id = id.0, "task updated");
        self.refresh().await
    }

    pub async fn delete_task(&mut self, id: TaskId) -> ClientResult<DeleteOutcome> {
        let prompt = match self.task(id) {
            Some(task) => format!("Delete task '{}'?", task.title),
            None => format!("Delete task {id}?"),
        };
        if !self.confirm.confirm(&prompt) {
            debug!(task_id = id.0, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }
        if let Err(err) = self.api.delete_task(id).await {
            self.notify_error(NoticeContext::DeleteTask, &err);
            return Err(err);
        }
        info!(task_id = id.0, "task deleted");
        self.refresh().await?;
        Ok(DeleteOutcome::Deleted)
    }

    fn notify_error(&self, context: NoticeContext, err: &ClientError) {
        warn!(?context, "task list operation failed: {err}");
        let _ = self
            .events
            .send(ClientEvent::Notice(Notice::from_error(context, err)));
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
