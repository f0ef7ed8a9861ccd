//! Redirect behaviors
//!
//! A redirect describes what happens when access is denied or when a
//! login/logout/404 flow needs a destination: show the default
//! denial, show a custom message, send the user to a page or URL,
//! invoke a named callback, or bounce to the login screen. The same
//! payload shape is shared by URL rules and the four redirect
//! resource kinds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AccessError, AccessResult};
use crate::setting::RuleMap;

/// A validated redirect instruction.
///
/// # Examples
///
/// ```
/// use warden_access::Redirect;
/// use serde_json::json;
///
/// let redirect = Redirect::from_value(&json!({
///     "type": "url_redirect",
///     "url": "/denied",
///     "status_code": 302
/// })).unwrap();
/// assert_eq!(redirect, Redirect::UrlRedirect { url: "/denied".into(), status_code: Some(302) });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Redirect {
    /// Plain denial with the system default response.
    Default,
    /// Denial with a custom message.
    CustomMessage {
        /// Message shown to the user.
        message: String,
        /// Optional HTTP status override (4xx or 5xx).
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },
    /// Redirect to an internal page.
    PageRedirect {
        /// Target page id.
        page_id: u64,
        /// Optional HTTP status override (3xx).
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },
    /// Redirect to an arbitrary URL.
    UrlRedirect {
        /// Target URL.
        url: String,
        /// Optional HTTP status override (3xx).
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },
    /// Invoke a named callback registered by the embedder.
    TriggerCallback {
        /// Callback identifier.
        callback: String,
    },
    /// Bounce to the login screen.
    LoginRedirect,
}

impl Redirect {
    /// Parse and validate a redirect from its JSON payload.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an unsupported `type`, a missing
    /// payload field, or a status code outside the range the type
    /// allows.
    pub fn from_value(value: &Value) -> AccessResult<Self> {
        let redirect: Redirect = serde_json::from_value(value.clone())
            .map_err(|e| AccessError::InvalidArgument(format!("unsupported redirect: {}", e)))?;
        redirect.validate()?;
        Ok(redirect)
    }

    /// Parse a redirect from a rule's `redirect` attribute.
    pub fn from_rule(rule: &RuleMap) -> AccessResult<Option<Self>> {
        match rule.get("redirect") {
            Some(value) => Self::from_value(value).map(Some),
            None => Ok(None),
        }
    }

    /// Check the payload invariants for this redirect type.
    pub fn validate(&self) -> AccessResult<()> {
        match self {
            Redirect::CustomMessage { message, status_code } => {
                if message.trim().is_empty() {
                    return Err(AccessError::InvalidArgument("empty redirect message".to_string()));
                }
                check_status(*status_code, 400..=599)
            }
            Redirect::PageRedirect { page_id, status_code } => {
                if *page_id == 0 {
                    return Err(AccessError::InvalidArgument("page id must be positive".to_string()));
                }
                check_status(*status_code, 300..=399)
            }
            Redirect::UrlRedirect { url, status_code } => {
                if url.trim().is_empty() {
                    return Err(AccessError::InvalidArgument("empty redirect url".to_string()));
                }
                check_status(*status_code, 300..=399)
            }
            Redirect::TriggerCallback { callback } => {
                if callback.trim().is_empty() {
                    return Err(AccessError::InvalidArgument("empty redirect callback".to_string()));
                }
                Ok(())
            }
            Redirect::Default | Redirect::LoginRedirect => Ok(()),
        }
    }

    /// Serialize back to the JSON payload shape.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn check_status(status: Option<u16>, range: std::ops::RangeInclusive<u16>) -> AccessResult<()> {
    match status {
        Some(code) if !range.contains(&code) => Err(AccessError::InvalidArgument(format!(
            "status code {} outside {}..={}",
            code,
            range.start(),
            range.end()
        ))),
        _ => Ok(()),
    }
}
