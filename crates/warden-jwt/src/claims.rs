//! Token claims and lifetime expressions

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{JwtError, JwtResult};

/// Claim names managed by the issuer; caller-supplied claims cannot
/// shadow them.
pub const RESERVED_CLAIMS: [&str; 7] = ["jti", "iss", "iat", "exp", "nbf", "user_id", "refreshable"];

/// Claims carried by every issued token.
///
/// Standard registered claims plus the owning user and arbitrary
/// caller-supplied claims, which are flattened into the payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Unique token id (UUID v4).
    pub jti: String,

    /// Issuer.
    pub iss: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Not before (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Owning user id.
    pub user_id: u64,

    /// Whether the token may be exchanged for a fresh one.
    #[serde(default)]
    pub refreshable: bool,

    /// Caller-supplied claims.
    #[serde(default, flatten)]
    pub custom: Map<String, Value>,
}

impl TokenClaims {
    /// Assemble claims for a new token.
    ///
    /// Reserved claim names are stripped from `custom`; a
    /// `refreshable` entry there is lifted into the typed field.
    pub fn new(user_id: u64, issuer: impl Into<String>, ttl: Duration, mut custom: Map<String, Value>) -> Self {
        let refreshable = custom
            .get("refreshable")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        for reserved in RESERVED_CLAIMS {
            custom.remove(reserved);
        }

        let now = Utc::now();
        Self {
            jti: Uuid::new_v4().to_string(),
            iss: issuer.into(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: None,
            user_id,
            refreshable,
            custom,
        }
    }

    /// A custom claim by name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.custom.get(name)
    }
}

/// Parse a token lifetime expression.
///
/// Accepts an integer seconds count (`"3600"`, `"-1"`) or a relative
/// expression (`"+24 hours"`, `"+30 minutes"`, `"+7 days"`).
///
/// # Errors
///
/// `InvalidArgument` for anything else.
///
/// # Examples
///
/// ```
/// use warden_jwt::claims::parse_ttl;
/// use chrono::Duration;
///
/// assert_eq!(parse_ttl("+24 hours").unwrap(), Duration::hours(24));
/// assert_eq!(parse_ttl("90").unwrap(), Duration::seconds(90));
/// assert!(parse_ttl("sometime").is_err());
/// ```
pub fn parse_ttl(expression: &str) -> JwtResult<Duration> {
    let trimmed = expression.trim();
    if let Ok(seconds) = trimmed.parse::<i64>() {
        return Ok(Duration::seconds(seconds));
    }

    let relative = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let mut parts = relative.split_whitespace();
    let (Some(amount), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(JwtError::InvalidArgument(format!("unparseable ttl: {}", expression)));
    };
    let amount: i64 = amount
        .parse()
        .map_err(|_| JwtError::InvalidArgument(format!("unparseable ttl: {}", expression)))?;

    match unit.to_lowercase().trim_end_matches('s') {
        "second" => Ok(Duration::seconds(amount)),
        "minute" => Ok(Duration::minutes(amount)),
        "hour" => Ok(Duration::hours(amount)),
        "day" => Ok(Duration::days(amount)),
        "week" => Ok(Duration::weeks(amount)),
        _ => Err(JwtError::InvalidArgument(format!("unknown ttl unit: {}", unit))),
    }
}
