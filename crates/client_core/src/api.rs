use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::TaskId,
    protocol::{
        task_route, LoginRequest, LoginResponse, MessageResponse, MutationAck, NewTask,
        RegisterRequest, TaskListQuery, TaskListResponse, TaskPatch, LOGIN_ROUTE, REGISTER_ROUTE,
        TASKS_ROUTE,
    },
};
use tracing::debug;

use crate::{
    error::{ClientError, ClientResult},
    transport::{ApiRequest, ApiResponse, Transport},
};

/// Typed calls against the task backend. Cheap to clone.
pub struct TaskApi<T: ?Sized> {
    transport: Arc<T>,
}

impl<T: ?Sized> Clone for TaskApi<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

fn encode<B: Serialize>(body: &B) -> ClientResult<Value> {
    serde_json::to_value(body).map_err(ClientError::from)
}

fn decode<R: DeserializeOwned>(response: ApiResponse) -> ClientResult<R> {
    serde_json::from_value(response.body).map_err(ClientError::from)
}

fn decode_ack(response: ApiResponse) -> ClientResult<MutationAck> {
    if response.body.is_null() {
        return Ok(MutationAck::Message(MessageResponse::default()));
    }
    decode(response)
}

impl<T: Transport + ?Sized> TaskApi<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn list_tasks(&self, query: &TaskListQuery) -> ClientResult<TaskListResponse> {
        let response = self
            .transport
            .send(ApiRequest::get(TASKS_ROUTE).with_query(query.to_pairs()))
            .await?;
        let page: TaskListResponse = decode(response)?;
        debug!(
            page = page.page,
            total = page.total,
            total_pages = page.total_pages,
            items = page.data.len(),
            "task page received"
        );
        Ok(page)
    }

    pub async fn create_task(&self, task: &NewTask) -> ClientResult<MutationAck> {
        let response = self
            .transport
            .send(ApiRequest::post(TASKS_ROUTE, encode(task)?))
            .await?;
        decode_ack(response)
    }

    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> ClientResult<MutationAck> {
        let response = self
            .transport
            .send(ApiRequest::put(task_route(id), encode(patch)?))
            .await?;
        decode_ack(response)
    }

    pub async fn delete_task(&self, id: TaskId) -> ClientResult<()> {
        self.transport
            .send(ApiRequest::delete(task_route(id)))
            .await?;
        Ok(())
    }

    pub async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        let response = self
            .transport
            .send(ApiRequest::post(LOGIN_ROUTE, encode(request)?).anonymous())
            .await?;
        decode(response)
    }

    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<MessageResponse> {
        let response = self
            .transport
            .send(ApiRequest::post(REGISTER_ROUTE, encode(request)?).anonymous())
            .await?;
        if response.body.is_null() {
            return Ok(MessageResponse::default());
        }
        decode(response)
    }
}
