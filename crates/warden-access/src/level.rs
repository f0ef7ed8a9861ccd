//! Access levels and the inheritance chain
//!
//! An access level identifies *who* a permission set applies to: the
//! site-wide default, a role, a concrete user, or the anonymous
//! visitor. Levels are constructed on demand; their identity doubles
//! as the lookup key into the settings store.
//!
//! Inheritance is resolved bottom-up: `User` inherits from all of its
//! assigned roles, roles and the visitor inherit from `Default`, and
//! `Default` has no parent.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AccessError;

/// The "who" of a permission set.
///
/// # Examples
///
/// ```
/// use warden_access::AccessLevel;
///
/// let level: AccessLevel = "role:editor".parse().unwrap();
/// assert_eq!(level, AccessLevel::Role("editor".into()));
/// assert_eq!(level.storage_key(), "role:editor");
/// assert!(!level.is_default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    /// Site-wide default (root of the inheritance chain).
    Default,
    /// All users holding the named role.
    Role(String),
    /// One concrete user.
    User(u64),
    /// Unauthenticated visitor.
    Visitor,
}

impl AccessLevel {
    /// Construct a role level, validating the slug.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the slug is empty.
    pub fn role(slug: impl Into<String>) -> Result<Self, AccessError> {
        let slug = slug.into();
        if slug.trim().is_empty() {
            return Err(AccessError::InvalidArgument("empty role slug".to_string()));
        }
        Ok(AccessLevel::Role(slug))
    }

    /// The stable identity used to scope persisted settings.
    pub fn storage_key(&self) -> String {
        self.to_string()
    }

    /// `true` for the root of the inheritance chain.
    pub fn is_default(&self) -> bool {
        matches!(self, AccessLevel::Default)
    }

    /// `true` for user-scoped levels.
    pub fn is_user(&self) -> bool {
        matches!(self, AccessLevel::User(_))
    }

    /// Direct parents in the inheritance chain.
    ///
    /// `Default` has none; `Role` and `Visitor` inherit from
    /// `Default`; a user inherits from every role it holds (falling
    /// back to `Default` for users with no roles).
    pub fn parents(&self, membership: &dyn RoleMembership) -> Vec<AccessLevel> {
        match self {
            AccessLevel::Default => Vec::new(),
            AccessLevel::Role(_) | AccessLevel::Visitor => vec![AccessLevel::Default],
            AccessLevel::User(user_id) => {
                let roles = membership.roles_of(*user_id);
                if roles.is_empty() {
                    vec![AccessLevel::Default]
                } else {
                    roles.into_iter().map(AccessLevel::Role).collect()
                }
            }
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Default => write!(f, "default"),
            AccessLevel::Role(slug) => write!(f, "role:{}", slug),
            AccessLevel::User(user_id) => write!(f, "user:{}", user_id),
            AccessLevel::Visitor => write!(f, "visitor"),
        }
    }
}

impl FromStr for AccessLevel {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => return Ok(AccessLevel::Default),
            "visitor" => return Ok(AccessLevel::Visitor),
            _ => {}
        }
        if let Some(slug) = s.strip_prefix("role:") {
            return AccessLevel::role(slug);
        }
        if let Some(id) = s.strip_prefix("user:") {
            return id
                .parse::<u64>()
                .map(AccessLevel::User)
                .map_err(|_| AccessError::InvalidArgument(format!("invalid user id: {}", id)));
        }
        Err(AccessError::InvalidArgument(format!("unknown access level: {}", s)))
    }
}

impl Serialize for AccessLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccessLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(DeError::custom)
    }
}

/// Role membership lookup for resolving a user's parent levels.
///
/// Supplied by the surrounding system; the engine only needs the
/// role slugs a user currently holds.
pub trait RoleMembership: Send + Sync {
    /// Role slugs assigned to the user, in assignment order.
    fn roles_of(&self, user_id: u64) -> Vec<String>;
}

/// Membership source for users with no role assignments.
///
/// Every user inherits straight from `Default`. Useful as a test
/// double and as the engine's fallback.
#[derive(Debug, Default, Clone)]
pub struct NoMembership;

impl RoleMembership for NoMembership {
    fn roles_of(&self, _user_id: u64) -> Vec<String> {
        Vec::new()
    }
}

/// In-memory role membership table.
///
/// # Example
///
/// ```
/// use warden_access::level::{MemoryMembership, RoleMembership};
///
/// let mut membership = MemoryMembership::new();
/// membership.assign(42, "editor");
/// assert_eq!(membership.roles_of(42), vec!["editor".to_string()]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryMembership {
    assignments: std::collections::HashMap<u64, Vec<String>>,
}

impl MemoryMembership {
    /// Create an empty membership table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a role to a user (duplicates ignored).
    pub fn assign(&mut self, user_id: u64, role: impl Into<String>) {
        let role = role.into();
        let roles = self.assignments.entry(user_id).or_default();
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
}

impl RoleMembership for MemoryMembership {
    fn roles_of(&self, user_id: u64) -> Vec<String> {
        self.assignments.get(&user_id).cloned().unwrap_or_default()
    }
}
