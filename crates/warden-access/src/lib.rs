//! # Warden Access
//!
//! This crate is the permission resolution core of the Warden
//! engine, shared by every embedding surface (REST layers, CLI
//! tooling, capability checks).
//!
//! ## Overview
//!
//! The warden-access crate handles:
//! - **Access levels**: Default, roles, users, and the anonymous
//!   visitor, with parent lookup for inheritance
//! - **Resources**: typed, optionally instance-scoped permission
//!   containers per access level
//! - **Settings merge**: the deny-wins/allow-wins algorithm that
//!   reconciles inherited permissions with explicit overrides
//! - **URL rules**: normalization, matching with query subset
//!   semantics, and redirect resolution
//! - **Aggregates**: kind-wide indexes of every instance with an
//!   override
//! - **The engine**: the request-scoped context wiring store,
//!   config, membership, policies, cache, and extensions together
//!
//! ## Architecture
//!
//! ```text
//! AccessLevel ──┐
//!               ├──> Resource ──> merge engine ──> effective settings
//! SettingsStore ┘        ▲
//!                        └── PolicySource (warden-policy)
//! ```
//!
//! Inheritance: `User -> its Role(s) -> Default`, with `Visitor ->
//! Default` as a parallel branch. Ties always favor the level
//! closest to the request; the configured preference decides every
//! other conflict.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_access::{AccessLevel, Engine, MapConfig, MemoryStore, ResourceKind, SettingValue};
//!
//! let engine = Engine::new(Arc::new(MemoryStore::new()), Arc::new(MapConfig::new()));
//!
//! // Deny reading post 42 for everyone.
//! let mut resource = engine
//!     .resource(&AccessLevel::Default, ResourceKind::Post, Some("42"))
//!     .unwrap();
//! resource.set_setting("read", SettingValue::Flag(true));
//!
//! // A visitor inherits the denial.
//! let effective = engine
//!     .effective_settings(&AccessLevel::Visitor, ResourceKind::Post, Some("42"))
//!     .unwrap();
//! assert_eq!(effective["read"], SettingValue::Flag(true));
//! ```

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod extension;
pub mod level;
pub mod merge;
pub mod policy;
pub mod redirect;
pub mod resource;
pub mod setting;
pub mod store;
pub mod url;

// Re-export main types for convenience
pub use aggregate::Aggregate;
pub use cache::ObjectCache;
pub use config::{ConfigProvider, MapConfig};
pub use engine::{AllEntities, Engine, EntityDirectory, MemoryDirectory};
pub use error::{AccessError, AccessResult};
pub use extension::ExtensionRegistry;
pub use level::{AccessLevel, MemoryMembership, NoMembership, RoleMembership};
pub use merge::{merge_prefer_base, merge_settings_with, MergePreference};
pub use policy::{NoPolicies, PolicySource};
pub use redirect::Redirect;
pub use resource::{MergeStrategy, Resource, ResourceKind};
pub use setting::{SettingValue, SettingsMap};
pub use store::{MemoryStore, SettingsScope, SettingsStore};
