//! Route table
//!
//! Requests are matched on method plus path segments. Everything except
//! login and register needs a valid bearer token; project and task routes
//! additionally need membership of the owning project. Mutations persist the
//! dataset before answering.

use crate::db::{Database, DbState, StoredUser};
use crate::token;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tf_client::transport::{HttpMethod, HttpRequest};
use tf_core::{
    ActivityAction, ActivityEvent, ApiError, CommentId, DueDate, EventId, Project, ProjectId,
    ProjectStatus, Session, Task, TaskComment, TaskId, TaskPriority, TaskStatus, User, UserId,
    UserRole,
};

const NOT_SIGNED_IN: &str = "Not signed in.";
const NO_PROJECT_ACCESS: &str = "No access to this project.";
const PROJECT_NOT_FOUND: &str = "Project not found.";
const TASK_NOT_FOUND: &str = "Task not found.";
const ENDPOINT_NOT_FOUND: &str = "Endpoint not found.";
const INVALID_PROJECT: &str = "Invalid project data.";
const INVALID_TASK: &str = "Invalid task data.";

/// Message of the catch-all 500
pub const SERVER_ERROR_MESSAGE: &str = "Mock server error.";

/// Minimum accepted password length at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Colour given to self-registered users
const REGISTERED_AVATAR_COLOR: &str = "#22c55e";

type Body = Map<String, Value>;

/// Route a request against the dataset
///
/// # Errors
/// The [`ApiError`] the endpoint answers with; its code decides the status.
pub fn dispatch(db: &mut Database, request: &HttpRequest) -> Result<Value, ApiError> {
    let path = request.path.split('?').next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let body = read_body(request.body.as_ref());
    let method = request.method;

    match (method, segments.as_slice()) {
        (HttpMethod::Post, ["auth", "login"]) => return to_json(&login(db, &body)?),
        (HttpMethod::Post, ["auth", "register"]) => return to_json(&register(db, &body)?),
        _ => {}
    }

    let actor = authenticated_user(&db.state, request)
        .ok_or_else(|| ApiError::unauthorized(NOT_SIGNED_IN))?;

    match (method, segments.as_slice()) {
        (HttpMethod::Get, ["auth", "me"]) => to_json(&actor),
        (HttpMethod::Get, ["users"]) => to_json(&db.state.public_users()),
        (HttpMethod::Get, ["projects"]) => {
            let visible: Vec<&Project> = db
                .state
                .projects
                .iter()
                .filter(|p| p.has_member(&actor.id))
                .collect();
            to_json(&visible)
        }
        (HttpMethod::Post, ["projects"]) => create_project(db, &actor, &body),
        (_, ["projects", id]) => project_route(db, &actor, method, &ProjectId::from(*id), &body),
        (_, ["projects", id, "activity"]) => {
            let project_id = ProjectId::from(*id);
            accessible_project(&db.state, &actor, &project_id)?;
            match method {
                HttpMethod::Get => {
                    let feed: Vec<&ActivityEvent> = db
                        .state
                        .activity
                        .iter()
                        .rev()
                        .filter(|e| e.project_id == project_id)
                        .collect();
                    to_json(&feed)
                }
                _ => Err(endpoint_not_found()),
            }
        }
        (_, ["projects", id, "tasks"]) => {
            project_tasks_route(db, &actor, method, &ProjectId::from(*id), &body)
        }
        (_, ["tasks", id, "comments"]) => {
            comments_route(db, &actor, method, &TaskId::from(*id), &body)
        }
        (_, ["tasks", id]) => task_route(db, &actor, method, &TaskId::from(*id), &body),
        _ => Err(endpoint_not_found()),
    }
}

fn endpoint_not_found() -> ApiError {
    ApiError::not_found(ENDPOINT_NOT_FOUND)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "failed to encode response");
        ApiError::internal(SERVER_ERROR_MESSAGE)
    })
}

fn read_body(raw: Option<&Value>) -> Body {
    match raw {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(text)) => match serde_json::from_str(text) {
            Ok(Value::Object(map)) => map,
            _ => Body::new(),
        },
        _ => Body::new(),
    }
}

/// Field as trimmed text; `null` and absent read as `None`
fn text(body: &Body, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

/// Field as non-empty text
fn non_empty(body: &Body, field: &str) -> Option<String> {
    text(body, field).filter(|s| !s.is_empty())
}

/// Typed field; absent or `null` is `Ok(None)`
fn typed<T: DeserializeOwned>(body: &Body, field: &str) -> Result<Option<T>, ()> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|_| ()),
    }
}

fn authenticated_user(state: &DbState, request: &HttpRequest) -> Option<User> {
    let user_id = token::parse(request.bearer_token()?)?;
    state.user(&user_id).map(|u| u.user.clone())
}

fn accessible_project(state: &DbState, actor: &User, id: &ProjectId) -> Result<usize, ApiError> {
    let idx = state
        .projects
        .iter()
        .position(|p| p.id == *id)
        .ok_or_else(|| ApiError::not_found(PROJECT_NOT_FOUND))?;
    if !state.projects[idx].has_member(&actor.id) {
        return Err(ApiError::forbidden(NO_PROJECT_ACCESS));
    }
    Ok(idx)
}

fn accessible_task(state: &DbState, actor: &User, id: &TaskId) -> Result<usize, ApiError> {
    let idx = state
        .tasks
        .iter()
        .position(|t| t.id == *id)
        .ok_or_else(|| ApiError::not_found(TASK_NOT_FOUND))?;
    accessible_project(state, actor, &state.tasks[idx].project_id)?;
    Ok(idx)
}

fn log_activity(
    state: &mut DbState,
    project_id: &ProjectId,
    action: ActivityAction,
    description: String,
    actor: &User,
) {
    tracing::debug!(project = %project_id, ?action, "activity");
    state.activity.push(ActivityEvent {
        id: EventId::generate(),
        project_id: project_id.clone(),
        action,
        description,
        actor_id: actor.id.clone(),
        actor_role: actor.role,
        created_at: Utc::now(),
    });
}

fn assignee_name(state: &DbState, id: &UserId) -> String {
    state
        .user(id)
        .map_or_else(|| "Unknown".to_string(), |u| u.user.name.clone())
}

fn login(db: &Database, body: &Body) -> Result<Session, ApiError> {
    let email = text(body, "email").unwrap_or_default().to_lowercase();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

    match db.state.user_by_email(&email) {
        Some(stored) if stored.password == password => {
            tracing::info!(user = %stored.user.id, "login");
            Ok(Session::new(token::issue(&stored.user.id), stored.user.clone()))
        }
        _ => Err(ApiError::unauthorized("Invalid email or password.")),
    }
}

fn register(db: &mut Database, body: &Body) -> Result<Session, ApiError> {
    let email = text(body, "email").unwrap_or_default().to_lowercase();
    let name = text(body, "name").unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

    if email.is_empty() || name.is_empty() || password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation("Invalid registration data."));
    }
    if db.state.user_by_email(&email).is_some() {
        return Err(ApiError::conflict("This email is already registered."));
    }

    let user = User {
        id: UserId::generate(),
        email,
        name,
        role: UserRole::Member,
        avatar_color: Some(REGISTERED_AVATAR_COLOR.to_string()),
    };
    db.state.users.push(StoredUser {
        user: user.clone(),
        password: password.to_string(),
    });
    db.save();

    tracing::info!(user = %user.id, "registered");
    Ok(Session::new(token::issue(&user.id), user))
}

fn create_project(db: &mut Database, actor: &User, body: &Body) -> Result<Value, ApiError> {
    let Some(name) = non_empty(body, "name") else {
        return Err(ApiError::validation(INVALID_PROJECT).with_detail("name", "Project name is required."));
    };
    let description = text(body, "description").unwrap_or_default();

    let now = Utc::now();
    let project = Project {
        id: ProjectId::generate(),
        name,
        description,
        status: ProjectStatus::Active,
        owner_id: actor.id.clone(),
        member_ids: vec![actor.id.clone()],
        created_at: now,
        updated_at: now,
    };

    db.state.projects.insert(0, project.clone());
    log_activity(
        &mut db.state,
        &project.id,
        ActivityAction::ProjectCreated,
        format!("Project created: {}", project.name),
        actor,
    );
    db.save();
    to_json(&project)
}

fn project_route(
    db: &mut Database,
    actor: &User,
    method: HttpMethod,
    id: &ProjectId,
    body: &Body,
) -> Result<Value, ApiError> {
    let idx = accessible_project(&db.state, actor, id)?;

    match method {
        HttpMethod::Get => to_json(&db.state.projects[idx]),
        HttpMethod::Put => {
            let status = typed::<ProjectStatus>(body, "status").map_err(|()| {
                ApiError::validation(INVALID_PROJECT).with_detail("status", "Unknown project status.")
            })?;
            let members = match body.get("memberIds") {
                Some(Value::Array(_)) => typed::<Vec<UserId>>(body, "memberIds").map_err(|()| {
                    ApiError::validation(INVALID_PROJECT)
                        .with_detail("memberIds", "Members must be user ids.")
                })?,
                _ => None,
            };

            let project = &mut db.state.projects[idx];
            if let Some(name) = text(body, "name") {
                project.name = name;
            }
            if let Some(description) = text(body, "description") {
                project.description = description;
            }
            if let Some(status) = status {
                project.status = status;
            }
            let members = members.unwrap_or_else(|| project.member_ids.clone());
            project.member_ids = Project::member_set(&project.owner_id, &members);
            project.updated_at = Utc::now();

            let updated = project.clone();
            db.save();
            to_json(&updated)
        }
        HttpMethod::Delete => {
            let state = &mut db.state;
            state.projects.remove(idx);
            state.tasks.retain(|t| t.project_id != *id);
            let tasks = &state.tasks;
            state
                .comments
                .retain(|c| tasks.iter().any(|t| t.id == c.task_id));
            db.save();
            tracing::info!(project = %id, "project deleted");
            Ok(json!({ "success": true }))
        }
        _ => Err(endpoint_not_found()),
    }
}

fn project_tasks_route(
    db: &mut Database,
    actor: &User,
    method: HttpMethod,
    project_id: &ProjectId,
    body: &Body,
) -> Result<Value, ApiError> {
    let idx = accessible_project(&db.state, actor, project_id)?;

    match method {
        HttpMethod::Get => {
            let tasks: Vec<&Task> = db
                .state
                .tasks
                .iter()
                .filter(|t| t.project_id == *project_id)
                .collect();
            to_json(&tasks)
        }
        HttpMethod::Post => {
            let invalid = || ApiError::validation(INVALID_TASK);

            let Some(title) = non_empty(body, "title") else {
                return Err(invalid().with_detail("title", "Task title is required."));
            };
            let priority = typed::<TaskPriority>(body, "priority")
                .map_err(|()| invalid().with_detail("priority", "Unknown priority."))?
                .unwrap_or_default();
            let due_date = due_date(body);
            let assignee_id = non_empty(body, "assigneeId").map(UserId::from);

            if let Some(assignee) = &assignee_id {
                if !db.state.projects[idx].has_member(assignee) {
                    return Err(invalid().with_detail("assigneeId", "Assignee must be a project member."));
                }
            }

            let now = Utc::now();
            let task = Task {
                id: TaskId::generate(),
                project_id: project_id.clone(),
                title,
                description: text(body, "description").unwrap_or_default(),
                status: TaskStatus::Todo,
                priority,
                due_date,
                assignee_id,
                created_at: now,
                updated_at: now,
            };

            db.state.tasks.insert(0, task.clone());
            log_activity(
                &mut db.state,
                project_id,
                ActivityAction::TaskCreated,
                format!("Task created: {}", task.title),
                actor,
            );
            if let Some(assignee) = &task.assignee_id {
                let name = assignee_name(&db.state, assignee);
                log_activity(
                    &mut db.state,
                    project_id,
                    ActivityAction::TaskAssigned,
                    format!("Task assigned: {} → {name}", task.title),
                    actor,
                );
            }
            db.save();
            to_json(&task)
        }
        _ => Err(endpoint_not_found()),
    }
}

/// `dueDate` when present and truthy, stored as sent
fn due_date(body: &Body) -> Option<DueDate> {
    match body.get("dueDate")? {
        Value::Bool(false) => None,
        _ => non_empty(body, "dueDate").map(DueDate::new),
    }
}

fn comments_route(
    db: &mut Database,
    actor: &User,
    method: HttpMethod,
    task_id: &TaskId,
    body: &Body,
) -> Result<Value, ApiError> {
    accessible_task(&db.state, actor, task_id)?;

    match method {
        HttpMethod::Get => {
            let comments: Vec<&TaskComment> = db
                .state
                .comments
                .iter()
                .filter(|c| c.task_id == *task_id)
                .collect();
            to_json(&comments)
        }
        HttpMethod::Post => {
            let Some(message) = non_empty(body, "message") else {
                return Err(ApiError::validation("Invalid comment.")
                    .with_detail("message", "Comment cannot be empty."));
            };

            let comment = TaskComment {
                id: CommentId::generate(),
                task_id: task_id.clone(),
                author_id: actor.id.clone(),
                message,
                created_at: Utc::now(),
            };
            db.state.comments.push(comment.clone());
            db.save();
            to_json(&comment)
        }
        _ => Err(endpoint_not_found()),
    }
}

fn task_route(
    db: &mut Database,
    actor: &User,
    method: HttpMethod,
    task_id: &TaskId,
    body: &Body,
) -> Result<Value, ApiError> {
    let idx = accessible_task(&db.state, actor, task_id)?;

    match method {
        HttpMethod::Get => to_json(&db.state.tasks[idx]),
        HttpMethod::Patch => patch_task(db, actor, idx, body),
        HttpMethod::Delete => {
            db.state.tasks.remove(idx);
            db.state.comments.retain(|c| c.task_id != *task_id);
            db.save();
            Ok(json!({ "success": true }))
        }
        _ => Err(endpoint_not_found()),
    }
}

/// Present keys overwrite; `null` or empty clears `dueDate` / `assigneeId`
fn patch_task(db: &mut Database, actor: &User, idx: usize, body: &Body) -> Result<Value, ApiError> {
    let invalid = || ApiError::validation(INVALID_TASK);
    let current = db.state.tasks[idx].clone();

    let status = typed::<TaskStatus>(body, "status")
        .map_err(|()| invalid().with_detail("status", "Unknown status."))?
        .unwrap_or(current.status);
    let priority = typed::<TaskPriority>(body, "priority")
        .map_err(|()| invalid().with_detail("priority", "Unknown priority."))?
        .unwrap_or(current.priority);
    let title = if body.contains_key("title") {
        text(body, "title").unwrap_or_default()
    } else {
        current.title.clone()
    };
    let description = if body.contains_key("description") {
        text(body, "description").unwrap_or_default()
    } else {
        current.description.clone()
    };
    let due = if body.contains_key("dueDate") {
        due_date(body)
    } else {
        current.due_date.clone()
    };
    let assignee_id = if body.contains_key("assigneeId") {
        non_empty(body, "assigneeId").map(UserId::from)
    } else {
        current.assignee_id.clone()
    };

    if title.is_empty() {
        return Err(invalid().with_detail("title", "Task title is required."));
    }
    if let Some(assignee) = &assignee_id {
        let project = db
            .state
            .projects
            .iter()
            .find(|p| p.id == current.project_id)
            .ok_or_else(|| ApiError::not_found(PROJECT_NOT_FOUND))?;
        if !project.has_member(assignee) {
            return Err(invalid().with_detail("assigneeId", "Assignee must be a project member."));
        }
    }

    let task = &mut db.state.tasks[idx];
    task.status = status;
    task.title = title;
    task.description = description;
    task.priority = priority;
    task.due_date = due;
    task.assignee_id = assignee_id;
    task.updated_at = Utc::now();
    let updated = task.clone();

    if current.status != updated.status {
        log_activity(
            &mut db.state,
            &updated.project_id,
            ActivityAction::TaskMoved,
            format!("Task moved: {} → {}", updated.title, updated.status.label()),
            actor,
        );
    }
    if let Some(assignee) = updated.assignee_id.as_ref().filter(|a| current.assignee_id.as_ref() != Some(*a)) {
        let name = assignee_name(&db.state, assignee);
        log_activity(
            &mut db.state,
            &updated.project_id,
            ActivityAction::TaskAssigned,
            format!("Task assigned: {} → {name}", updated.title),
            actor,
        );
    }

    db.save();
    to_json(&updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD, SEED_MEMBER_EMAIL};

    fn signed_in(db: &Database, email: &str) -> String {
        let user = db.state.user_by_email(email).unwrap();
        token::issue(&user.user.id)
    }

    fn call(db: &mut Database, request: HttpRequest, token: Option<&str>) -> Result<Value, ApiError> {
        let request = match token {
            Some(t) => request.with_header("Authorization", format!("Bearer {t}")),
            None => request,
        };
        dispatch(db, &request)
    }

    #[test]
    fn unknown_route_is_not_found() {
        let mut db = Database::ephemeral();
        let token = signed_in(&db, SEED_ADMIN_EMAIL);
        let err = call(&mut db, HttpRequest::get("/nowhere"), Some(&token)).unwrap_err();
        assert_eq!(err.message, ENDPOINT_NOT_FOUND);
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn protected_route_requires_token() {
        let mut db = Database::ephemeral();
        let err = call(&mut db, HttpRequest::get("/projects"), None).unwrap_err();
        assert_eq!(err.http_status(), 401);

        let err = call(&mut db, HttpRequest::get("/projects"), Some("deadbeef")).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn login_is_case_insensitive_on_email() {
        let mut db = Database::ephemeral();
        let body = json!({ "email": "  Admin@TaskFlow.pro ", "password": SEED_ADMIN_PASSWORD });
        let session = call(&mut db, HttpRequest::post("/auth/login").with_json(body), None).unwrap();
        assert_eq!(session["user"]["role"], "admin");
        assert!(session["user"].get("password").is_none());
    }

    #[test]
    fn query_string_is_ignored() {
        let mut db = Database::ephemeral();
        let token = signed_in(&db, SEED_ADMIN_EMAIL);
        let list = call(&mut db, HttpRequest::get("/projects?page=2"), Some(&token)).unwrap();
        assert_eq!(list.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn patch_logs_move_and_assignment() {
        let mut db = Database::ephemeral();
        let token = signed_in(&db, SEED_ADMIN_EMAIL);
        let task = db.state.tasks[2].clone();
        let member = db.state.user_by_email(SEED_MEMBER_EMAIL).unwrap().user.id.clone();

        let body = json!({ "status": "todo", "assigneeId": member.as_str() });
        let patched = call(
            &mut db,
            HttpRequest::patch(format!("/tasks/{}", task.id)).with_json(body),
            Some(&token),
        )
        .unwrap();
        assert_eq!(patched["status"], "todo");

        let actions: Vec<ActivityAction> = db.state.activity.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![ActivityAction::TaskMoved, ActivityAction::TaskAssigned]);
        assert_eq!(
            db.state.activity[0].description,
            "Task moved: Finalize design handoff checklist → To do"
        );
    }

    #[test]
    fn patch_with_null_clears_assignee() {
        let mut db = Database::ephemeral();
        let token = signed_in(&db, SEED_ADMIN_EMAIL);
        let task = db.state.tasks[0].clone();
        assert!(task.assignee_id.is_some());

        let patched = call(
            &mut db,
            HttpRequest::patch(format!("/tasks/{}", task.id)).with_json(json!({ "assigneeId": null })),
            Some(&token),
        )
        .unwrap();
        assert!(patched.get("assigneeId").is_none());
        assert!(db.state.activity.is_empty());
    }

    #[test]
    fn unsupported_method_on_known_resource_is_not_found() {
        let mut db = Database::ephemeral();
        let token = signed_in(&db, SEED_ADMIN_EMAIL);
        let project = db.state.projects[0].id.clone();
        let err = call(&mut db, HttpRequest::patch(format!("/projects/{project}")), Some(&token)).unwrap_err();
        assert_eq!(err.message, ENDPOINT_NOT_FOUND);
    }

    #[test]
    fn project_delete_cascades() {
        let mut db = Database::ephemeral();
        let token = signed_in(&db, SEED_ADMIN_EMAIL);
        let project = db.state.projects[0].id.clone();
        let task = db.state.tasks[0].id.clone();
        call(
            &mut db,
            HttpRequest::post(format!("/tasks/{task}/comments")).with_json(json!({ "message": "hi" })),
            Some(&token),
        )
        .unwrap();

        call(&mut db, HttpRequest::delete(format!("/projects/{project}")), Some(&token)).unwrap();
        assert!(db.state.projects.is_empty());
        assert!(db.state.tasks.is_empty());
        assert!(db.state.comments.is_empty());
    }

    #[test]
    fn due_date_is_stored_as_sent_and_cleared_by_empty() {
        let mut db = Database::ephemeral();
        let token = signed_in(&db, SEED_ADMIN_EMAIL);
        let project = db.state.projects[0].id.clone();

        let created = call(
            &mut db,
            HttpRequest::post(format!("/projects/{project}/tasks"))
                .with_json(json!({ "title": "x", "dueDate": "2025-03-01" })),
            Some(&token),
        )
        .unwrap();
        assert_eq!(created["dueDate"], "2025-03-01");
        let id = created["id"].as_str().unwrap().to_string();

        let kept = call(
            &mut db,
            HttpRequest::patch(format!("/tasks/{id}")).with_json(json!({ "title": "y" })),
            Some(&token),
        )
        .unwrap();
        assert_eq!(kept["dueDate"], "2025-03-01");

        let cleared = call(
            &mut db,
            HttpRequest::patch(format!("/tasks/{id}")).with_json(json!({ "dueDate": "" })),
            Some(&token),
        )
        .unwrap();
        assert!(cleared.get("dueDate").is_none());
    }
}
