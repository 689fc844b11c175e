//! In-memory stand-in for the task backend plus builders shared by the tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::{json, Value};
use shared::{
    domain::{Task, TaskId, TaskPriority, TaskStatus},
    protocol::{LoginRequest, NewTask, RegisterRequest, TaskPatch, TASKS_ROUTE},
};
use tokio::sync::broadcast;

use crate::{
    api::TaskApi,
    config::ClientSettings,
    controller::{ConfirmPrompt, ListSyncController},
    credentials::{CredentialStore, MemoryCredentialStore},
    error::{ClientError, ClientResult},
    events::ClientEvent,
    gate::CredentialGate,
    runtime::TaskApp,
    transport::{ApiMethod, ApiRequest, ApiResponse, Transport},
};

pub(crate) const TOKEN: &str = "token-alice";

pub(crate) type GatedBackend = CredentialGate<Arc<InMemoryBackend>>;

#[derive(Default)]
struct BackendState {
    tasks: Vec<Task>,
    next_id: i64,
    users: HashMap<String, (String, String)>,
    valid_tokens: HashSet<String>,
    requests: Vec<ApiRequest>,
}

/// Mirrors the backend contract: newest tasks first, `all` filters, and
/// out-of-range pages answered with an empty page unless `clamping` is set.
#[derive(Default)]
pub(crate) struct InMemoryBackend {
    state: Mutex<BackendState>,
    clamping: bool,
}

fn api_error(status: u16, message: &str) -> ClientError {
    ClientError::Api {
        status,
        message: message.to_string(),
    }
}

fn ok(status: u16, body: Value) -> ClientResult<ApiResponse> {
    Ok(ApiResponse { status, body })
}

impl InMemoryBackend {
    pub(crate) fn new() -> Arc<Self> {
        let backend = Self::default();
        backend.issue_token(TOKEN);
        Arc::new(backend)
    }

    pub(crate) fn clamping() -> Arc<Self> {
        let backend = Self {
            clamping: true,
            ..Self::default()
        };
        backend.issue_token(TOKEN);
        Arc::new(backend)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().expect("backend state")
    }

    pub(crate) fn issue_token(&self, token: &str) {
        self.lock().valid_tokens.insert(token.to_string());
    }

    pub(crate) fn revoke_tokens(&self) {
        self.lock().valid_tokens.clear();
    }

    pub(crate) fn add_user(&self, name: &str, email: &str, password: &str) {
        self.lock()
            .users
            .insert(email.to_string(), (name.to_string(), password.to_string()));
    }

    pub(crate) fn insert(&self, title: &str, status: TaskStatus, priority: TaskPriority) -> TaskId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = TaskId(state.next_id);
        state.tasks.push(Task {
            id,
            title: title.to_string(),
            description: Some(String::new()),
            status,
            priority,
            created_at: None,
        });
        id
    }

    /// `count` pending, medium tasks titled `task 1` .. `task N`.
    pub(crate) fn seed(&self, count: usize) -> Vec<TaskId> {
        (1..=count)
            .map(|n| self.insert(&format!("task {n}"), TaskStatus::Pending, TaskPriority::Medium))
            .collect()
    }

    pub(crate) fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    pub(crate) fn list_queries(&self) -> Vec<HashMap<String, String>> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == ApiMethod::Get && request.path == TASKS_ROUTE)
            .map(|request| request.query.into_iter().collect())
            .collect()
    }

    pub(crate) fn mutation_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.path.starts_with(TASKS_ROUTE) && request.method != ApiMethod::Get)
            .count()
    }

    fn authorize(state: &BackendState, request: &ApiRequest) -> ClientResult<()> {
        match &request.bearer {
            None => Err(api_error(401, "Missing Authorization Header")),
            Some(token) if state.valid_tokens.contains(token) => Ok(()),
            Some(_) => Err(api_error(401, "Token has expired")),
        }
    }

    fn handle(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let mut state = self.lock();
        state.requests.push(request.clone());
        let body = request.body.clone().unwrap_or(Value::Null);

        match (request.method, request.path.as_str()) {
            (ApiMethod::Post, "/auth/login") => {
                let login: LoginRequest = serde_json::from_value(body)?;
                match state.users.get(&login.email) {
                    Some((_, password)) if *password == login.password => {
                        let token = format!("token-{}", login.email);
                        state.valid_tokens.insert(token.clone());
                        ok(200, json!({ "access_token": token }))
                    }
                    _ => Err(api_error(401, "Invalid email or password")),
                }
            }
            (ApiMethod::Post, "/auth/register") => {
                let register: RegisterRequest = serde_json::from_value(body)?;
                if state.users.contains_key(&register.email) {
                    return Err(api_error(409, "Email already registered"));
                }
                state
                    .users
                    .insert(register.email, (register.name, register.password));
                ok(201, json!({ "msg": "User created successfully" }))
            }
            (ApiMethod::Get, TASKS_ROUTE) => {
                Self::authorize(&state, &request)?;
                Ok(self.list(&state, &request.query))
            }
            (ApiMethod::Post, TASKS_ROUTE) => {
                Self::authorize(&state, &request)?;
                let new_task: NewTask = serde_json::from_value(body)?;
                state.next_id += 1;
                let task = Task {
                    id: TaskId(state.next_id),
                    title: new_task.title,
                    description: Some(new_task.description),
                    status: new_task.status,
                    priority: new_task.priority,
                    created_at: None,
                };
                state.tasks.push(task.clone());
                ok(201, serde_json::to_value(task)?)
            }
            (method, path) if path.starts_with("/tasks/") => {
                Self::authorize(&state, &request)?;
                let id = path
                    .trim_start_matches("/tasks/")
                    .parse::<i64>()
                    .map(TaskId)
                    .map_err(|_| api_error(404, "Not Found"))?;
                let index = state
                    .tasks
                    .iter()
                    .position(|task| task.id == id)
                    .ok_or_else(|| api_error(404, "Task not found"))?;
                match method {
                    ApiMethod::Put => {
                        let patch: TaskPatch = serde_json::from_value(body)?;
                        let task = &mut state.tasks[index];
                        if let Some(title) = patch.title {
                            task.title = title;
                        }
                        if let Some(description) = patch.description {
                            task.description = Some(description);
                        }
                        if let Some(status) = patch.status {
                            task.status = status;
                        }
                        if let Some(priority) = patch.priority {
                            task.priority = priority;
                        }
                        ok(200, serde_json::to_value(task.clone())?)
                    }
                    ApiMethod::Delete => {
                        state.tasks.remove(index);
                        ok(204, Value::Null)
                    }
                    _ => Err(api_error(405, "Method Not Allowed")),
                }
            }
            _ => Err(api_error(404, "Not Found")),
        }
    }

    fn list(&self, state: &BackendState, query: &[(String, String)]) -> ApiResponse {
        let params: HashMap<&str, &str> = query
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let page = params
            .get("page")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1)
            .max(1);
        let per_page = params
            .get("per_page")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            .max(1);
        let needle = params.get("q").copied().unwrap_or("").to_lowercase();
        let status = params.get("status").copied().unwrap_or("all");
        let priority = params.get("priority").copied().unwrap_or("all");

        let mut matching: Vec<&Task> = state
            .tasks
            .iter()
            .filter(|task| {
                needle.is_empty()
                    || task.title.to_lowercase().contains(&needle)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .filter(|task| status == "all" || task.status.as_str() == status)
            .filter(|task| priority == "all" || task.priority.as_str() == priority)
            .collect();
        matching.sort_by(|a, b| b.id.0.cmp(&a.id.0));

        let total = matching.len() as u64;
        let total_pages = total.div_ceil(per_page);
        let page = if self.clamping && total_pages > 0 && page > total_pages {
            total_pages
        } else {
            page
        };
        let start = ((page - 1) * per_page) as usize;
        let data: Vec<&Task> = matching
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();

        ApiResponse {
            status: 200,
            body: json!({
                "data": data,
                "total": total,
                "page": page,
                "totalPages": total_pages,
            }),
        }
    }
}

#[async_trait]
impl Transport for InMemoryBackend {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        self.handle(request)
    }
}

/// Answers every confirmation with a fixed choice and remembers the prompts.
pub(crate) struct RecordingConfirm {
    answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl RecordingConfirm {
    pub(crate) fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts").clone()
    }
}

impl ConfirmPrompt for RecordingConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().expect("prompts").push(prompt.to_string());
        self.answer
    }
}

pub(crate) fn settings(page_size: u32) -> ClientSettings {
    ClientSettings {
        page_size,
        ..ClientSettings::default()
    }
}

pub(crate) struct Harness {
    pub controller: ListSyncController<GatedBackend>,
    pub events: broadcast::Receiver<ClientEvent>,
    pub store: Arc<MemoryCredentialStore>,
}

/// Controller logged in as `TOKEN`, 500ms search window.
pub(crate) fn harness(
    backend: &Arc<InMemoryBackend>,
    page_size: u32,
    confirm: Arc<dyn ConfirmPrompt>,
) -> Harness {
    let (events_tx, events) = broadcast::channel(256);
    let store = Arc::new(MemoryCredentialStore::with_token(TOKEN));
    let gate = CredentialGate::new(
        Arc::clone(backend),
        Arc::clone(&store) as Arc<dyn CredentialStore>,
        events_tx.clone(),
    );
    let controller = ListSyncController::new(
        TaskApi::new(Arc::new(gate)),
        page_size,
        Duration::from_millis(500),
        confirm,
        events_tx,
    );
    Harness {
        controller,
        events,
        store,
    }
}

pub(crate) fn app(
    backend: &Arc<InMemoryBackend>,
    store: Arc<MemoryCredentialStore>,
    page_size: u32,
    confirm: Arc<dyn ConfirmPrompt>,
) -> TaskApp<GatedBackend> {
    TaskApp::with_transport(Arc::clone(backend), &settings(page_size), store, confirm)
}

pub(crate) fn drain(events: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

pub(crate) fn jwt_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"1","exp":{exp}}}"#));
    format!("{header}.{payload}.signature")
}
