//! Typed calls for every backend route
//!
//! One function per path/verb pair. List endpoints validate that the body is
//! a JSON array and report INTERNAL_ERROR otherwise, so stores can keep their
//! previous cache.

use crate::http::ApiClient;
use crate::transport::HttpRequest;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tf_core::{
    ActivityEvent, ApiError, CommentPayload, CreateProjectPayload, CreateTaskPayload, DeleteAck,
    LoginPayload, Project, ProjectId, RegisterPayload, Session, Task, TaskComment, TaskId,
    TaskPatch, TaskStatus, UpdateProjectPayload, User,
};

fn json<T: Serialize + ?Sized>(payload: &T) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|e| ApiError::internal(format!("encode failed: {e}")))
}

/// Decode a list body, rejecting anything that is not an array of `T`
///
/// # Errors
/// INTERNAL_ERROR "Unexpected server response while loading {resource}."
pub fn expect_list<T: DeserializeOwned>(value: Value, resource: &str) -> Result<Vec<T>, ApiError> {
    let malformed =
        || ApiError::internal(format!("Unexpected server response while loading {resource}."));

    if !value.is_array() {
        tracing::warn!(resource, "list endpoint returned a non-array body");
        return Err(malformed());
    }
    serde_json::from_value(value).map_err(|e| {
        tracing::warn!(resource, error = %e, "list entries did not match expected shape");
        malformed()
    })
}

async fn fetch_list<T: DeserializeOwned>(
    client: &ApiClient,
    request: HttpRequest,
    resource: &str,
) -> Result<Vec<T>, ApiError> {
    let value = client.request_value(request, client.defaults()).await?;
    expect_list(value, resource)
}

/// `POST /auth/login`
pub async fn login(client: &ApiClient, payload: &LoginPayload) -> Result<Session, ApiError> {
    client
        .request(HttpRequest::post("/auth/login").with_json(json(payload)?))
        .await
}

/// `POST /auth/register`
pub async fn register(client: &ApiClient, payload: &RegisterPayload) -> Result<Session, ApiError> {
    client
        .request(HttpRequest::post("/auth/register").with_json(json(payload)?))
        .await
}

/// `GET /auth/me`
pub async fn me(client: &ApiClient) -> Result<User, ApiError> {
    client.request(HttpRequest::get("/auth/me")).await
}

/// `GET /users`
pub async fn list_users(client: &ApiClient) -> Result<Vec<User>, ApiError> {
    fetch_list(client, HttpRequest::get("/users"), "users").await
}

/// `GET /projects`
pub async fn list_projects(client: &ApiClient) -> Result<Vec<Project>, ApiError> {
    fetch_list(client, HttpRequest::get("/projects"), "projects").await
}

/// `GET /projects/:id`
pub async fn get_project(client: &ApiClient, id: &ProjectId) -> Result<Project, ApiError> {
    client.request(HttpRequest::get(format!("/projects/{id}"))).await
}

/// `POST /projects`
pub async fn create_project(
    client: &ApiClient,
    payload: &CreateProjectPayload,
) -> Result<Project, ApiError> {
    client
        .request(HttpRequest::post("/projects").with_json(json(payload)?))
        .await
}

/// `PUT /projects/:id`
pub async fn update_project(
    client: &ApiClient,
    id: &ProjectId,
    payload: &UpdateProjectPayload,
) -> Result<Project, ApiError> {
    client
        .request(HttpRequest::put(format!("/projects/{id}")).with_json(json(payload)?))
        .await
}

/// `DELETE /projects/:id`
pub async fn delete_project(client: &ApiClient, id: &ProjectId) -> Result<DeleteAck, ApiError> {
    client
        .request(HttpRequest::delete(format!("/projects/{id}")))
        .await
}

/// `GET /projects/:id/activity`
pub async fn list_project_activity(
    client: &ApiClient,
    project_id: &ProjectId,
) -> Result<Vec<ActivityEvent>, ApiError> {
    fetch_list(
        client,
        HttpRequest::get(format!("/projects/{project_id}/activity")),
        "activity",
    )
    .await
}

/// `GET /projects/:id/tasks`
pub async fn list_tasks(client: &ApiClient, project_id: &ProjectId) -> Result<Vec<Task>, ApiError> {
    fetch_list(
        client,
        HttpRequest::get(format!("/projects/{project_id}/tasks")),
        "tasks",
    )
    .await
}

/// `POST /projects/:id/tasks`
pub async fn create_task(
    client: &ApiClient,
    project_id: &ProjectId,
    payload: &CreateTaskPayload,
) -> Result<Task, ApiError> {
    client
        .request(HttpRequest::post(format!("/projects/{project_id}/tasks")).with_json(json(payload)?))
        .await
}

/// `GET /tasks/:id`
pub async fn get_task(client: &ApiClient, task_id: &TaskId) -> Result<Task, ApiError> {
    client.request(HttpRequest::get(format!("/tasks/{task_id}"))).await
}

/// `PATCH /tasks/:id`
pub async fn update_task(
    client: &ApiClient,
    task_id: &TaskId,
    patch: &TaskPatch,
) -> Result<Task, ApiError> {
    client
        .request(HttpRequest::patch(format!("/tasks/{task_id}")).with_json(json(patch)?))
        .await
}

/// `PATCH /tasks/:id` with only a status
pub async fn move_task(
    client: &ApiClient,
    task_id: &TaskId,
    status: TaskStatus,
) -> Result<Task, ApiError> {
    update_task(client, task_id, &TaskPatch::status(status)).await
}

/// `DELETE /tasks/:id`
pub async fn delete_task(client: &ApiClient, task_id: &TaskId) -> Result<DeleteAck, ApiError> {
    client
        .request(HttpRequest::delete(format!("/tasks/{task_id}")))
        .await
}

/// `GET /tasks/:id/comments`
pub async fn list_comments(
    client: &ApiClient,
    task_id: &TaskId,
) -> Result<Vec<TaskComment>, ApiError> {
    fetch_list(
        client,
        HttpRequest::get(format!("/tasks/{task_id}/comments")),
        "comments",
    )
    .await
}

/// `POST /tasks/:id/comments`
pub async fn add_comment(
    client: &ApiClient,
    task_id: &TaskId,
    message: &str,
) -> Result<TaskComment, ApiError> {
    let payload = CommentPayload {
        message: message.to_string(),
    };
    client
        .request(HttpRequest::post(format!("/tasks/{task_id}/comments")).with_json(json(&payload)?))
        .await
}
