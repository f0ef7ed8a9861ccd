//! # Warden JWT
//!
//! Token issuance and validation for the Warden engine.
//!
//! ## Overview
//!
//! The warden-jwt crate handles:
//! - **Issuance**: signed tokens with `jti`/`iat`/`iss`/`exp` and
//!   caller-supplied claims, with flexible lifetime expressions
//! - **Validation**: short-circuiting checks collapsed into one
//!   opaque invalid-token error (no validation oracle)
//! - **Algorithms**: HS256/384/512, RS256/384/512, ES256/384, EdDSA,
//!   resolved from configuration together with their key material
//! - **ECDSA interop**: ASN.1 DER ⇄ raw `r‖s` signature conversion,
//!   so tokens signed by OpenSSL-style issuers verify cleanly
//!
//! ## Usage
//!
//! ```rust
//! use warden_jwt::JwtService;
//! use serde_json::Map;
//!
//! let service = JwtService::with_secret("a-secret-of-at-least-32-characters!").unwrap();
//!
//! let issued = service.issue(42, Map::new(), Some("+1 hour")).unwrap();
//! assert!(service.is_valid(&issued.token));
//!
//! let claims = service.decode(&issued.token).unwrap();
//! assert_eq!(claims.user_id, 42);
//! ```
//!
//! ## Integration with warden-access
//!
//! Configuration is read through `warden_access::ConfigProvider`
//! (`service.jwt.*` keys), and issued tokens can be tracked and
//! revoked through the engine's token registry resource.

pub mod claims;
pub mod ecdsa;
pub mod error;
pub mod jwt;

// Re-export main types for convenience
pub use claims::{parse_ttl, TokenClaims, RESERVED_CLAIMS};
pub use error::{JwtError, JwtResult};
pub use jwt::{IssuedToken, JwtAlgorithm, JwtConfig, JwtService};
