//! Domain records and request payloads
//!
//! Every record is owned by the server and mirrored into client caches. The
//! wire format is JSON with camelCase field names.

use crate::ids::{CommentId, EventId, ProjectId, TaskId, UserId};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Records addressable by a string identifier
pub trait Identified {
    /// Identifier as string slice
    fn key(&self) -> &str;
}

/// Role attached to every user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full access
    Admin,
    /// Task-level access only
    Member,
}

impl UserRole {
    /// Wire representation
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

/// Public user record (never carries a password)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_color: Option<String>,
}

impl Identified for User {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

/// Bearer credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub access_token: String,
}

/// Authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: AuthToken,
    pub user: User,
}

impl Session {
    /// Create session from token string and user
    pub fn new(access_token: impl Into<String>, user: User) -> Self {
        Self {
            token: AuthToken {
                access_token: access_token.into(),
            },
            user,
        }
    }

    /// A session is usable only with a non-empty token
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.token.access_token.is_empty()
    }
}

/// Project lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Paused,
    Completed,
}

/// Project record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub owner_id: UserId,
    pub member_ids: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Member list with the owner first and duplicates removed
    ///
    /// Order of first appearance is preserved for everyone else.
    #[must_use]
    pub fn member_set(owner: &UserId, members: &[UserId]) -> Vec<UserId> {
        let mut out: Vec<UserId> = Vec::with_capacity(members.len() + 1);
        for id in std::iter::once(owner).chain(members) {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }

    /// Whether a user belongs to this project
    #[inline]
    #[must_use]
    pub fn has_member(&self, user: &UserId) -> bool {
        self.member_ids.contains(user)
    }
}

impl Identified for Project {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

/// Kanban column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Human-readable column name
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "To do",
            Self::InProgress => "In progress",
            Self::Done => "Done",
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Task due date as sent by the server
///
/// Kept verbatim. Both RFC 3339 timestamps and bare `YYYY-MM-DD` dates
/// occur on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DueDate(String);

impl DueDate {
    /// Wrap a raw value
    #[inline]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw wire value
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar date, from either an RFC 3339 timestamp or `YYYY-MM-DD`
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.0)
            .map(|d| d.with_timezone(&Utc).date_naive())
            .or_else(|_| NaiveDate::parse_from_str(&self.0, "%Y-%m-%d"))
            .ok()
    }
}

impl From<DateTime<Utc>> for DueDate {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl From<&str> for DueDate {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl std::fmt::Display for DueDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for Task {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

/// Comment on a task (immutable once created)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskComment {
    pub id: CommentId,
    pub task_id: TaskId,
    pub author_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Identified for TaskComment {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

/// Kind of audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    ProjectCreated,
    TaskCreated,
    TaskMoved,
    TaskAssigned,
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: EventId,
    pub project_id: ProjectId,
    pub action: ActivityAction,
    pub description: String,
    pub actor_id: UserId,
    pub actor_role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl Identified for ActivityEvent {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

/// `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// `POST /auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// `POST /projects`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectPayload {
    pub name: String,
    pub description: String,
}

/// `PUT /projects/:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectPayload {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub member_ids: Vec<UserId>,
}

impl UpdateProjectPayload {
    /// Payload that keeps every field of an existing project
    #[must_use]
    pub fn from_project(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            description: project.description.clone(),
            status: project.status,
            member_ids: project.member_ids.clone(),
        }
    }

    /// Rename
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace member list
    #[must_use]
    pub fn with_members(mut self, member_ids: Vec<UserId>) -> Self {
        self.member_ids = member_ids;
        self
    }

    /// Replace status
    #[must_use]
    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }
}

/// `POST /projects/:id/tasks`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,
}

impl CreateTaskPayload {
    /// Payload with empty description and no assignee
    pub fn new(title: impl Into<String>, priority: TaskPriority) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority,
            due_date: None,
            assignee_id: None,
        }
    }

    /// With description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With assignee
    #[must_use]
    pub fn with_assignee(mut self, assignee: UserId) -> Self {
        self.assignee_id = Some(assignee);
        self
    }

    /// With due date
    #[must_use]
    pub fn with_due_date(mut self, due: impl Into<DueDate>) -> Self {
        self.due_date = Some(due.into());
        self
    }
}

/// `PATCH /tasks/:id`
///
/// Absent fields are left untouched by the server. For `due_date` and
/// `assignee_id` the outer `Option` is presence and the inner one is the
/// value, so `Some(None)` is sent as `null` and clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub due_date: Option<Option<DueDate>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub assignee_id: Option<Option<UserId>>,
}

impl TaskPatch {
    /// Patch that only moves the task
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Set title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set priority
    #[must_use]
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Assign (`Some`) or unassign (`None`)
    #[must_use]
    pub fn with_assignee(mut self, assignee: Option<UserId>) -> Self {
        self.assignee_id = Some(assignee);
        self
    }
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// `POST /tasks/:id/comments`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentPayload {
    pub message: String,
}

/// Acknowledgement returned by delete endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn member_set_puts_owner_first_and_dedupes() {
        let owner = UserId::from("usr_owner");
        let members = vec![
            UserId::from("usr_b"),
            UserId::from("usr_owner"),
            UserId::from("usr_b"),
            UserId::from("usr_c"),
        ];
        assert_eq!(
            Project::member_set(&owner, &members),
            vec![
                UserId::from("usr_owner"),
                UserId::from("usr_b"),
                UserId::from("usr_c"),
            ]
        );
    }

    #[test]
    fn task_uses_camel_case_and_snake_case_status() {
        let task = Task {
            id: TaskId::from("tsk_1"),
            project_id: ProjectId::from("prj_1"),
            title: "Draft brief".into(),
            description: String::new(),
            status: TaskStatus::InProgress,
            priority: TaskPriority::Medium,
            due_date: None,
            assignee_id: Some(UserId::from("usr_1")),
            created_at: ts(),
            updated_at: ts(),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["projectId"], json!("prj_1"));
        assert_eq!(value["status"], json!("in_progress"));
        assert_eq!(value["assigneeId"], json!("usr_1"));
        assert!(value.get("dueDate").is_none());
    }

    #[test]
    fn date_only_due_date_decodes() {
        let task: Task = serde_json::from_value(json!({
            "id": "tsk_1",
            "projectId": "prj_1",
            "title": "Ship",
            "status": "todo",
            "priority": "low",
            "dueDate": "2025-03-01",
            "createdAt": "2025-01-02T03:04:05Z",
            "updatedAt": "2025-01-02T03:04:05Z",
        }))
        .unwrap();
        let due = task.due_date.unwrap();
        assert_eq!(due.as_str(), "2025-03-01");
        assert_eq!(due.date(), NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn due_date_parses_timestamps_and_keeps_garbage_verbatim() {
        assert_eq!(DueDate::from(ts()).date(), NaiveDate::from_ymd_opt(2025, 1, 2));
        assert_eq!(DueDate::from(ts()).as_str(), "2025-01-02T03:04:05.000Z");

        let odd = DueDate::from("next friday");
        assert_eq!(odd.date(), None);
        assert_eq!(serde_json::to_value(&odd).unwrap(), json!("next friday"));
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let keep = TaskPatch::status(TaskStatus::Done);
        assert_eq!(serde_json::to_value(&keep).unwrap(), json!({ "status": "done" }));

        let clear = TaskPatch::default().with_assignee(None);
        assert_eq!(serde_json::to_value(&clear).unwrap(), json!({ "assigneeId": null }));

        let parsed: TaskPatch = serde_json::from_value(json!({ "assigneeId": null })).unwrap();
        assert_eq!(parsed.assignee_id, Some(None));
        let parsed: TaskPatch = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed.assignee_id, None);
    }

    #[test]
    fn session_round_trips() {
        let session = Session::new(
            "tok",
            User {
                id: UserId::from("usr_1"),
                email: "a@b.c".into(),
                name: "A".into(),
                role: UserRole::Admin,
                avatar_color: None,
            },
        );
        let raw = serde_json::to_string(&session).unwrap();
        assert!(raw.contains("\"accessToken\":\"tok\""));
        let back: Session = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, session);
        assert!(back.is_valid());
    }

    #[test]
    fn status_labels() {
        assert_eq!(TaskStatus::Todo.label(), "To do");
        assert_eq!(TaskStatus::InProgress.label(), "In progress");
        assert_eq!(TaskStatus::Done.label(), "Done");
    }
}
