//! Policy statement model
//!
//! A statement is one declarative rule in an access policy document:
//! an effect, the resources it addresses, and optionally the actions
//! it covers and a redirect payload. Statements use the PascalCase
//! key convention of the policy JSON format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use warden_access::ResourceKind;

use crate::error::{PolicyError, PolicyResult};

/// The effect a statement applies to its targets.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Restrict the covered actions.
    #[default]
    Deny,
    /// Grant the covered actions (carves exceptions out of broader
    /// denials).
    Allow,
}

impl Effect {
    /// Get the string representation of the effect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deny => "deny",
            Self::Allow => "allow",
        }
    }
}

/// One or many values, the way policy JSON writes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single value.
    One(T),
    /// A list of values.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// View as a slice regardless of shape.
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }
}

/// One declarative policy rule.
///
/// # Examples
///
/// ```
/// use warden_policy::{Effect, Statement};
///
/// let statement: Statement = serde_json::from_str(r#"{
///     "Effect": "deny",
///     "Resource": "Post:42",
///     "Action": ["edit", "delete"]
/// }"#).unwrap();
/// assert_eq!(statement.effect, Effect::Deny);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Allow or deny.
    #[serde(default)]
    pub effect: Effect,

    /// Resource pattern(s) this statement addresses.
    pub resource: OneOrMany<String>,

    /// Actions covered; absent means the resource's general access
    /// permission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<OneOrMany<String>>,

    /// Redirect payload attached to deny rules (URL resources).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Value>,

    /// Opaque condition block; evaluation happens outside this
    /// crate, statements are expected to be pre-filtered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl Statement {
    /// Parse a statement from policy JSON.
    pub fn from_json(value: &Value) -> PolicyResult<Self> {
        serde_json::from_value(value.clone()).map_err(|e| PolicyError::Malformed(e.to_string()))
    }

    /// The parsed resource patterns of this statement.
    pub fn patterns(&self) -> PolicyResult<Vec<ResourcePattern>> {
        self.resource.as_slice().iter().map(|raw| ResourcePattern::parse(raw)).collect()
    }
}

/// A parsed `Kind`, `Kind:id`, or `Kind:*` resource pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePattern {
    /// The resource kind addressed.
    pub kind: ResourceKind,
    /// Concrete instance id, or `None` for singletons and wildcards.
    pub instance: Option<String>,
    /// `true` for `Kind:*` patterns.
    pub wildcard: bool,
}

impl ResourcePattern {
    /// Parse a pattern string.
    ///
    /// Kind names accept both the policy document's PascalCase
    /// (`PostType`) and the internal snake_case (`post_type`).
    ///
    /// # Errors
    ///
    /// `InvalidResource` for unknown kinds or malformed patterns.
    pub fn parse(raw: &str) -> PolicyResult<Self> {
        let (kind_raw, instance) = match raw.split_once(':') {
            Some((kind, rest)) => (kind, Some(rest)),
            None => (raw, None),
        };
        let kind = ResourceKind::parse(&to_snake_case(kind_raw))
            .ok_or_else(|| PolicyError::InvalidResource(raw.to_string()))?;

        match instance {
            None => Ok(Self { kind, instance: None, wildcard: false }),
            Some("*") => Ok(Self { kind, instance: None, wildcard: true }),
            Some("") => Err(PolicyError::InvalidResource(raw.to_string())),
            Some(id) => Ok(Self { kind, instance: Some(id.to_string()), wildcard: false }),
        }
    }

    /// `true` when this pattern addresses the given resource.
    pub fn matches(&self, kind: ResourceKind, instance: Option<&str>) -> bool {
        if self.kind != kind {
            return false;
        }
        if self.wildcard {
            return true;
        }
        match (&self.instance, instance) {
            (None, None) => true,
            (Some(own), Some(other)) => own == other,
            _ => false,
        }
    }
}

fn to_snake_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    for (i, ch) in raw.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
