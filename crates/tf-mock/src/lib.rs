//! Taskflow Mock - stand-in backend
//!
//! Simulates the Taskflow REST API over a seeded, optionally persisted
//! dataset:
//! - [`MockBackend`]: an in-process [`Transport`](tf_client::Transport)
//! - [`server`]: the same backend over real HTTP under `/api`
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tf_client::{MemoryStorage, RequestOptions, Taskflow};
//! use tf_mock::{MockBackend, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let app = Taskflow::with_transport(
//!     Arc::new(MockBackend::ephemeral()),
//!     RequestOptions::no_retry(),
//!     Arc::new(MemoryStorage::new()),
//! );
//! assert!(app.session.login(SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD).await);
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod backend;
pub mod db;
pub mod routes;
pub mod server;
pub mod token;

pub use backend::{MockBackend, DEFAULT_LATENCY};
pub use db::{
    Database, DbState, StoredUser, DB_STORAGE_KEY, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD,
    SEED_MEMBER_EMAIL, SEED_MEMBER_PASSWORD, SEED_PROJECT_NAME,
};
pub use server::{ServerError, API_PREFIX};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
