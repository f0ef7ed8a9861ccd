//! # Warden Policy
//!
//! Declarative access policies for the Warden engine.
//!
//! ## Overview
//!
//! The warden-policy crate handles:
//! - **Statements**: the `Effect` / `Resource` / `Action` rule model
//!   of policy JSON documents
//! - **Translation**: the explicit action-to-permission table that
//!   turns statements into settings entries
//! - **Serving**: a [`StatementSource`] implementing
//!   `warden_access::PolicySource`, layering translated statements
//!   UNDER each resource's explicit settings
//!
//! Condition evaluation is out of scope: the surrounding system
//! evaluates policy conditions and attaches only the statements that
//! apply.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_access::{AccessLevel, Engine, MapConfig, MemoryStore, ResourceKind};
//! use warden_policy::{Statement, StatementSource};
//! use serde_json::json;
//!
//! let source = Arc::new(StatementSource::new());
//! source
//!     .attach(
//!         AccessLevel::Visitor,
//!         Statement::from_json(&json!({
//!             "Effect": "deny",
//!             "Resource": "Post:42",
//!             "Action": "read"
//!         })).unwrap(),
//!     )
//!     .unwrap();
//!
//! let engine = Engine::new(Arc::new(MemoryStore::new()), Arc::new(MapConfig::new()))
//!     .with_policies(source);
//! let resource = engine
//!     .resource(&AccessLevel::Visitor, ResourceKind::Post, Some("42"))
//!     .unwrap();
//! assert!(resource.setting("read").is_some());
//! // Policy-derived settings are never explicit.
//! assert!(!resource.is_overwritten(Some("read")));
//! ```

pub mod error;
pub mod source;
pub mod statement;
pub mod translate;

// Re-export main types for convenience
pub use error::{PolicyError, PolicyResult};
pub use source::StatementSource;
pub use statement::{Effect, OneOrMany, ResourcePattern, Statement};
pub use translate::{PermissionBuilder, TranslationTable, GENERAL_ACCESS};
