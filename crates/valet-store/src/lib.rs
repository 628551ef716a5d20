//! # Valet Store
//!
//! Persistence interfaces for the Valet platform. The server core only ever
//! touches storage through the traits defined here, using atomic point
//! reads, point writes, and point upserts keyed by `(user_id, tool_name)`
//! or `(user_id, artifact_id)`:
//!
//! - [`SubscriptionStore`]: which tools a user has enabled
//! - [`CredentialStore`]: stored OAuth tokens per user and tool
//! - [`ArtifactStore`]: user-scoped documents managed by the artifact tools
//!
//! Each trait ships with an in-memory implementation backed by
//! `tokio::sync::RwLock`. These are used by the server binary and by tests;
//! a relational backend is a drop-in trait implementation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use valet_store::{InMemorySubscriptionStore, SubscriptionStore, ToolSubscription};
//!
//! async fn enroll() {
//!     let store = InMemorySubscriptionStore::new();
//!     store
//!         .upsert(ToolSubscription::new("u1", "get_weather"))
//!         .await
//!         .unwrap();
//!
//!     let rows = store.list_for_user("u1").await.unwrap();
//!     assert_eq!(rows.len(), 1);
//! }
//! ```

pub mod artifact;
pub mod credential;
pub mod error;
pub mod subscription;

// Re-export main types
pub use artifact::{Artifact, ArtifactStore, InMemoryArtifactStore};
pub use credential::{Credential, CredentialStore, InMemoryCredentialStore};
pub use error::{StoreError, StoreResult};
pub use subscription::{InMemorySubscriptionStore, SubscriptionStore, ToolSubscription};
