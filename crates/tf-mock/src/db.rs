//! Mock dataset
//!
//! The whole object graph lives in one [`DbState`] persisted as a single JSON
//! document under [`DB_STORAGE_KEY`]. Loading merges the persisted document
//! over a freshly seeded one, collection by collection.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tf_client::storage::{read_json, write_json, KeyValueStorage};
use tf_core::{
    ActivityEvent, DueDate, Project, ProjectId, ProjectStatus, Task, TaskComment, TaskId,
    TaskPriority, TaskStatus, User, UserId, UserRole,
};

/// Storage key for the dataset
pub const DB_STORAGE_KEY: &str = "taskflow_pro_db_v1";

/// Seeded admin credentials
pub const SEED_ADMIN_EMAIL: &str = "admin@taskflow.pro";
pub const SEED_ADMIN_PASSWORD: &str = "Admin123!";

/// Seeded member credentials
pub const SEED_MEMBER_EMAIL: &str = "member@taskflow.pro";
pub const SEED_MEMBER_PASSWORD: &str = "Member123!";

/// Name of the seeded project
pub const SEED_PROJECT_NAME: &str = "Mobile App Redesign";

/// User record with its password (never leaves the backend)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

/// Entire backend state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbState {
    pub users: Vec<StoredUser>,
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub comments: Vec<TaskComment>,
    pub activity: Vec<ActivityEvent>,
}

/// Persisted document; any collection may be missing
#[derive(Debug, Default, Deserialize)]
struct PersistedDb {
    users: Option<Vec<StoredUser>>,
    projects: Option<Vec<Project>>,
    tasks: Option<Vec<Task>>,
    comments: Option<Vec<TaskComment>>,
    activity: Option<Vec<ActivityEvent>>,
}

impl DbState {
    /// Two users, one project with both as members, three tasks
    #[must_use]
    pub fn seed() -> Self {
        let admin_id = UserId::generate();
        let member_id = UserId::generate();
        let project_id = ProjectId::generate();
        let now = Utc::now();

        let users = vec![
            StoredUser {
                user: User {
                    id: admin_id.clone(),
                    email: SEED_ADMIN_EMAIL.to_string(),
                    name: "Amina Hassan".to_string(),
                    role: UserRole::Admin,
                    avatar_color: Some("#7c3aed".to_string()),
                },
                password: SEED_ADMIN_PASSWORD.to_string(),
            },
            StoredUser {
                user: User {
                    id: member_id.clone(),
                    email: SEED_MEMBER_EMAIL.to_string(),
                    name: "Omar Saeed".to_string(),
                    role: UserRole::Member,
                    avatar_color: Some("#0ea5e9".to_string()),
                },
                password: SEED_MEMBER_PASSWORD.to_string(),
            },
        ];

        let projects = vec![Project {
            id: project_id.clone(),
            name: SEED_PROJECT_NAME.to_string(),
            description: "Plan and execute the Q1 redesign initiative with clear milestones and release scope."
                .to_string(),
            status: ProjectStatus::Active,
            owner_id: admin_id.clone(),
            member_ids: vec![admin_id.clone(), member_id.clone()],
            created_at: now,
            updated_at: now,
        }];

        let task = |title: &str, description: &str, status, priority, due_in: Option<i64>, assignee: Option<&UserId>| Task {
            id: TaskId::generate(),
            project_id: project_id.clone(),
            title: title.to_string(),
            description: description.to_string(),
            status,
            priority,
            due_date: due_in.map(|days| DueDate::from(now + Duration::days(days))),
            assignee_id: assignee.cloned(),
            created_at: now,
            updated_at: now,
        };

        let tasks = vec![
            task(
                "Define success metrics",
                "Align on the KPIs we want to improve (activation, retention, and task completion).",
                TaskStatus::Todo,
                TaskPriority::High,
                Some(6),
                Some(&admin_id),
            ),
            task(
                "Audit current user flows",
                "Identify friction points across onboarding and project creation.",
                TaskStatus::InProgress,
                TaskPriority::Medium,
                Some(9),
                Some(&member_id),
            ),
            task(
                "Finalize design handoff checklist",
                "Create a repeatable checklist for Figma specs, tokens, and accessibility notes.",
                TaskStatus::Done,
                TaskPriority::Low,
                None,
                None,
            ),
        ];

        Self {
            users,
            projects,
            tasks,
            comments: Vec::new(),
            activity: Vec::new(),
        }
    }

    /// Stored user by id
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<&StoredUser> {
        self.users.iter().find(|u| u.user.id == *id)
    }

    /// Stored user by email, case-insensitively
    #[must_use]
    pub fn user_by_email(&self, email: &str) -> Option<&StoredUser> {
        self.users
            .iter()
            .find(|u| u.user.email.eq_ignore_ascii_case(email))
    }

    /// Public user records
    #[must_use]
    pub fn public_users(&self) -> Vec<User> {
        self.users.iter().map(|u| u.user.clone()).collect()
    }
}

/// Dataset plus the storage it is persisted to
#[derive(Debug)]
pub struct Database {
    pub state: DbState,
    storage: Option<Arc<dyn KeyValueStorage>>,
}

impl Database {
    /// Seeded dataset that is never persisted
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            state: DbState::seed(),
            storage: None,
        }
    }

    /// Load from storage, seeding whatever is missing
    ///
    /// Persisted collections win over seeded ones; a missing activity log is
    /// empty rather than seeded. Corrupt data is discarded.
    #[must_use]
    pub fn load(storage: Arc<dyn KeyValueStorage>) -> Self {
        let seeded = DbState::seed();
        let persisted: Option<PersistedDb> = read_json(storage.as_ref(), DB_STORAGE_KEY, None);

        let state = match persisted {
            None => {
                tracing::info!("no persisted dataset, starting from seed");
                seeded
            }
            Some(p) => DbState {
                users: p.users.unwrap_or(seeded.users),
                projects: p.projects.unwrap_or(seeded.projects),
                tasks: p.tasks.unwrap_or(seeded.tasks),
                comments: p.comments.unwrap_or(seeded.comments),
                activity: p.activity.unwrap_or_default(),
            },
        };

        tracing::debug!(
            users = state.users.len(),
            projects = state.projects.len(),
            tasks = state.tasks.len(),
            "dataset loaded"
        );

        Self {
            state,
            storage: Some(storage),
        }
    }

    /// Persist the whole dataset
    pub fn save(&self) {
        if let Some(storage) = &self.storage {
            write_json(storage.as_ref(), DB_STORAGE_KEY, &self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tf_client::storage::MemoryStorage;

    #[test]
    fn seed_shape() {
        let db = DbState::seed();
        assert_eq!(db.users.len(), 2);
        assert_eq!(db.projects.len(), 1);
        assert_eq!(db.tasks.len(), 3);
        assert!(db.comments.is_empty());
        assert!(db.activity.is_empty());

        let project = &db.projects[0];
        assert_eq!(project.name, SEED_PROJECT_NAME);
        assert_eq!(project.member_ids.len(), 2);
        assert!(db.tasks.iter().all(|t| t.project_id == project.id));
    }

    #[test]
    fn stored_user_flattens_password_next_to_user_fields() {
        let db = DbState::seed();
        let value = serde_json::to_value(&db.users[0]).unwrap();
        assert_eq!(value["email"], SEED_ADMIN_EMAIL);
        assert_eq!(value["password"], SEED_ADMIN_PASSWORD);
        assert_eq!(value["avatarColor"], "#7c3aed");
    }

    #[test]
    fn email_lookup_ignores_case() {
        let db = DbState::seed();
        assert!(db.user_by_email("ADMIN@taskflow.PRO").is_some());
        assert!(db.user_by_email("nobody@taskflow.pro").is_none());
    }

    #[test]
    fn load_without_persisted_data_seeds() {
        let storage = Arc::new(MemoryStorage::new());
        let db = Database::load(storage);
        assert_eq!(db.state.users.len(), 2);
    }

    #[test]
    fn load_merges_partial_document_over_seed() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(
                DB_STORAGE_KEY,
                &json!({ "projects": [], "comments": [] }).to_string(),
            )
            .unwrap();

        let db = Database::load(storage);
        assert!(db.state.projects.is_empty());
        assert_eq!(db.state.users.len(), 2);
        assert_eq!(db.state.tasks.len(), 3);
        assert!(db.state.activity.is_empty());
    }

    #[test]
    fn save_then_load_keeps_state() {
        let storage = Arc::new(MemoryStorage::new());
        let db = Database::load(storage.clone());
        db.save();

        let reloaded = Database::load(storage);
        assert_eq!(reloaded.state, db.state);
    }

    #[test]
    fn corrupt_document_falls_back_to_seed() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(DB_STORAGE_KEY, "{not json").unwrap();
        let db = Database::load(storage);
        assert_eq!(db.state.projects.len(), 1);
    }
}
