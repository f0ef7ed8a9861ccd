//! JWT issuance and validation
//!
//! Built on the jsonwebtoken crate. Algorithm and key material are
//! resolved from configuration, not hardcoded; ES256/ES384 tokens
//! whose signature arrives in OpenSSL's ASN.1 DER form are converted
//! to the raw `r‖s` wire format before verification.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use warden_access::config::{keys, ConfigProvider};

use crate::claims::{parse_ttl, TokenClaims};
use crate::ecdsa::{self, ES256_COMPONENT_LEN, ES384_COMPONENT_LEN};
use crate::error::{JwtError, JwtResult};

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// ECDSA using P-256 and SHA-256
    ES256,
    /// ECDSA using P-384 and SHA-384
    ES384,
    /// Edwards-curve signatures (Ed25519)
    EdDSA,
}

impl JwtAlgorithm {
    /// Get the string representation of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::EdDSA => "EdDSA",
        }
    }

    /// Parse an algorithm from its configuration value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "HS256" => Some(Self::HS256),
            "HS384" => Some(Self::HS384),
            "HS512" => Some(Self::HS512),
            "RS256" => Some(Self::RS256),
            "RS384" => Some(Self::RS384),
            "RS512" => Some(Self::RS512),
            "ES256" => Some(Self::ES256),
            "ES384" => Some(Self::ES384),
            "EDDSA" => Some(Self::EdDSA),
            _ => None,
        }
    }

    /// Raw signature component width for EC algorithms.
    fn ec_component_len(&self) -> Option<usize> {
        match self {
            Self::ES256 => Some(ES256_COMPONENT_LEN),
            Self::ES384 => Some(ES384_COMPONENT_LEN),
            _ => None,
        }
    }
}

impl From<JwtAlgorithm> for Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
            JwtAlgorithm::RS256 => Algorithm::RS256,
            JwtAlgorithm::RS384 => Algorithm::RS384,
            JwtAlgorithm::RS512 => Algorithm::RS512,
            JwtAlgorithm::ES256 => Algorithm::ES256,
            JwtAlgorithm::ES384 => Algorithm::ES384,
            JwtAlgorithm::EdDSA => Algorithm::EdDSA,
        }
    }
}

/// JWT configuration for token issuance and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Algorithm to sign and verify with.
    pub algorithm: JwtAlgorithm,

    /// Shared secret for HMAC algorithms.
    pub secret: Option<String>,

    /// Private key (PEM) for RSA/EC/EdDSA algorithms.
    pub private_key: Option<String>,

    /// Public key (PEM) for RSA/EC/EdDSA algorithms.
    pub public_key: Option<String>,

    /// Issuer written into every token.
    pub issuer: String,

    /// Default token lifetime.
    pub default_ttl: Duration,

    /// Validation leeway in seconds for `exp`/`nbf`/`iat`.
    pub leeway: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::HS256,
            secret: None,
            private_key: None,
            public_key: None,
            issuer: "warden".to_string(),
            default_ttl: Duration::hours(24),
            leeway: 0,
        }
    }
}

impl JwtConfig {
    /// Resolve the configuration from a [`ConfigProvider`].
    ///
    /// Key material for asymmetric algorithms is read from the
    /// configured PEM file paths.
    ///
    /// # Errors
    ///
    /// `ConfigError` for an unsupported algorithm or an unreadable
    /// key file; `InvalidArgument` for a bad ttl expression.
    pub fn from_provider(provider: &dyn ConfigProvider) -> JwtResult<Self> {
        let raw_alg = provider.get_str(keys::JWT_ALGORITHM, "HS256");
        let algorithm = JwtAlgorithm::parse(&raw_alg)
            .ok_or_else(|| JwtError::ConfigError(format!("unsupported algorithm: {}", raw_alg)))?;

        let read_key = |key: &str| -> JwtResult<Option<String>> {
            match provider.get(key).and_then(|value| value.as_str().map(str::to_string)) {
                Some(path) => std::fs::read_to_string(&path)
                    .map(Some)
                    .map_err(|e| JwtError::ConfigError(format!("cannot read {}: {}", path, e))),
                None => Ok(None),
            }
        };

        Ok(Self {
            algorithm,
            secret: provider.get(keys::JWT_SECRET).and_then(|value| value.as_str().map(str::to_string)),
            private_key: read_key(keys::JWT_PRIVATE_KEY_PATH)?,
            public_key: read_key(keys::JWT_PUBLIC_KEY_PATH)?,
            issuer: provider.get_str(keys::JWT_ISSUER, "warden"),
            default_ttl: parse_ttl(&provider.get_str(keys::JWT_TTL, "+24 hours"))?,
            leeway: provider.get_i64(keys::JWT_LEEWAY, 0).max(0) as u64,
        })
    }
}

/// A freshly issued token with the claims it carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Encoded compact JWT.
    pub token: String,
    /// The claims signed into it.
    pub claims: TokenClaims,
}

/// JWT service for token operations.
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config.algorithm)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtService {
    /// Create a new JWT service with the given configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the key material required by the
    /// configured algorithm is missing or unparseable.
    pub fn new(config: JwtConfig) -> JwtResult<Self> {
        let encoding_key = Self::create_encoding_key(&config)?;
        let decoding_key = Self::create_decoding_key(&config)?;
        Ok(Self { config, encoding_key, decoding_key })
    }

    /// Create with a shared secret (HS256).
    pub fn with_secret(secret: impl Into<String>) -> JwtResult<Self> {
        let config = JwtConfig {
            secret: Some(secret.into()),
            algorithm: JwtAlgorithm::HS256,
            ..Default::default()
        };
        Self::new(config)
    }

    /// Create from a [`ConfigProvider`].
    pub fn from_provider(provider: &dyn ConfigProvider) -> JwtResult<Self> {
        Self::new(JwtConfig::from_provider(provider)?)
    }

    fn create_encoding_key(config: &JwtConfig) -> JwtResult<EncodingKey> {
        match config.algorithm {
            JwtAlgorithm::HS256 | JwtAlgorithm::HS384 | JwtAlgorithm::HS512 => {
                let secret = config
                    .secret
                    .as_ref()
                    .ok_or_else(|| JwtError::ConfigError("Secret required for HMAC".to_string()))?;
                Ok(EncodingKey::from_secret(secret.as_bytes()))
            }
            JwtAlgorithm::RS256 | JwtAlgorithm::RS384 | JwtAlgorithm::RS512 => {
                let key = config
                    .private_key
                    .as_ref()
                    .ok_or_else(|| JwtError::ConfigError("Private key required for RSA".to_string()))?;
                EncodingKey::from_rsa_pem(key.as_bytes())
                    .map_err(|e| JwtError::ConfigError(format!("Invalid RSA private key: {}", e)))
            }
            JwtAlgorithm::ES256 | JwtAlgorithm::ES384 => {
                let key = config
                    .private_key
                    .as_ref()
                    .ok_or_else(|| JwtError::ConfigError("Private key required for EC".to_string()))?;
                EncodingKey::from_ec_pem(key.as_bytes())
                    .map_err(|e| JwtError::ConfigError(format!("Invalid EC private key: {}", e)))
            }
            JwtAlgorithm::EdDSA => {
                let key = config
                    .private_key
                    .as_ref()
                    .ok_or_else(|| JwtError::ConfigError("Private key required for EdDSA".to_string()))?;
                EncodingKey::from_ed_pem(key.as_bytes())
                    .map_err(|e| JwtError::ConfigError(format!("Invalid EdDSA private key: {}", e)))
            }
        }
    }

    fn create_decoding_key(config: &JwtConfig) -> JwtResult<DecodingKey> {
        match config.algorithm {
            JwtAlgorithm::HS256 | JwtAlgorithm::HS384 | JwtAlgorithm::HS512 => {
                let secret = config
                    .secret
                    .as_ref()
                    .ok_or_else(|| JwtError::ConfigError("Secret required for HMAC".to_string()))?;
                Ok(DecodingKey::from_secret(secret.as_bytes()))
            }
            JwtAlgorithm::RS256 | JwtAlgorithm::RS384 | JwtAlgorithm::RS512 => {
                let key = config
                    .public_key
                    .as_ref()
                    .ok_or_else(|| JwtError::ConfigError("Public key required for RSA".to_string()))?;
                DecodingKey::from_rsa_pem(key.as_bytes())
                    .map_err(|e| JwtError::ConfigError(format!("Invalid RSA public key: {}", e)))
            }
            JwtAlgorithm::ES256 | JwtAlgorithm::ES384 => {
                let key = config
                    .public_key
                    .as_ref()
                    .ok_or_else(|| JwtError::ConfigError("Public key required for EC".to_string()))?;
                DecodingKey::from_ec_pem(key.as_bytes())
                    .map_err(|e| JwtError::ConfigError(format!("Invalid EC public key: {}", e)))
            }
            JwtAlgorithm::EdDSA => {
                let key = config
                    .public_key
                    .as_ref()
                    .ok_or_else(|| JwtError::ConfigError("Public key required for EdDSA".to_string()))?;
                DecodingKey::from_ed_pem(key.as_bytes())
                    .map_err(|e| JwtError::ConfigError(format!("Invalid EdDSA public key: {}", e)))
            }
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Issue a signed token for a user.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owning user
    /// * `custom` - Caller-supplied claims (reserved names stripped)
    /// * `ttl` - Lifetime expression, or `None` for the configured
    ///   default
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a bad ttl expression, `Encoding` when
    /// signing fails.
    pub fn issue(
        &self,
        user_id: u64,
        custom: Map<String, Value>,
        ttl: Option<&str>,
    ) -> JwtResult<IssuedToken> {
        let ttl = match ttl {
            Some(expression) => parse_ttl(expression)?,
            None => self.config.default_ttl,
        };
        let claims = TokenClaims::new(user_id, self.config.issuer.clone(), ttl, custom);
        let token = self.encode_claims(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Sign existing claims into a token.
    pub fn encode_claims(&self, claims: &TokenClaims) -> JwtResult<String> {
        let header = Header::new(self.config.algorithm.into());
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(format!("Token encoding failed: {}", e)))
    }

    /// Validate a token.
    ///
    /// Short-circuits on the first failing check (header, signature,
    /// `nbf`/`iat` in the future, `exp` in the past) and collapses
    /// every failure into the opaque [`JwtError::InvalidToken`].
    pub fn validate(&self, token: &str) -> JwtResult<()> {
        self.verified_claims(token).map(|_| ())
    }

    /// `true` when the token validates.
    pub fn is_valid(&self, token: &str) -> bool {
        self.validate(token).is_ok()
    }

    /// Validate a token and return its claims.
    pub fn decode(&self, token: &str) -> JwtResult<TokenClaims> {
        self.verified_claims(token)
    }

    /// Decode a token without validating (for debugging).
    ///
    /// # Warning
    ///
    /// This should only be used for inspection. Always use `decode`
    /// for production code.
    pub fn decode_insecure(&self, token: &str) -> JwtResult<TokenClaims> {
        let mut validation = Validation::new(self.config.algorithm.into());
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| self.reject("unverified decode failed", &e.to_string()))?;
        Ok(data.claims)
    }

    fn verified_claims(&self, token: &str) -> JwtResult<TokenClaims> {
        let token = self.normalize_signature(token)?;

        let header = decode_header(&token).map_err(|e| self.reject("malformed header", &e.to_string()))?;
        let expected: Algorithm = self.config.algorithm.into();
        if header.alg != expected {
            return Err(self.reject("algorithm mismatch", header_alg_name(header.alg)));
        }

        let mut validation = Validation::new(expected);
        validation.leeway = self.config.leeway;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        let data = decode::<TokenClaims>(&token, &self.decoding_key, &validation)
            .map_err(|e| self.reject("verification failed", &e.to_string()))?;

        // jsonwebtoken covers exp and nbf; a forged future iat is
        // rejected here.
        let now = Utc::now().timestamp();
        if data.claims.iat > now + self.config.leeway as i64 {
            return Err(self.reject("iat in the future", &data.claims.iat.to_string()));
        }

        Ok(data.claims)
    }

    /// Rewrite an ES token whose signature segment is DER-encoded
    /// into the raw `r‖s` wire form.
    fn normalize_signature(&self, token: &str) -> JwtResult<String> {
        let Some(component_len) = self.config.algorithm.ec_component_len() else {
            return Ok(token.to_string());
        };

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(self.reject("token does not have three segments", token));
        }
        let signature = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|e| self.reject("signature segment not base64url", &e.to_string()))?;

        if signature.len() == component_len * 2 {
            return Ok(token.to_string());
        }
        if signature.first() == Some(&0x30) {
            let raw = ecdsa::der_to_raw(&signature, component_len)
                .map_err(|e| self.reject("der signature conversion failed", &e.to_string()))?;
            debug!("converted der-encoded ecdsa signature to raw form");
            return Ok(format!("{}.{}.{}", parts[0], parts[1], URL_SAFE_NO_PAD.encode(raw)));
        }
        Err(self.reject("unexpected ecdsa signature length", &signature.len().to_string()))
    }

    fn reject(&self, reason: &str, detail: &str) -> JwtError {
        debug!(reason, detail, "token rejected");
        JwtError::InvalidToken
    }
}

fn header_alg_name(alg: Algorithm) -> &'static str {
    match alg {
        Algorithm::HS256 => "HS256",
        Algorithm::HS384 => "HS384",
        Algorithm::HS512 => "HS512",
        Algorithm::RS256 => "RS256",
        Algorithm::RS384 => "RS384",
        Algorithm::RS512 => "RS512",
        Algorithm::PS256 => "PS256",
        Algorithm::PS384 => "PS384",
        Algorithm::PS512 => "PS512",
        Algorithm::ES256 => "ES256",
        Algorithm::ES384 => "ES384",
        Algorithm::EdDSA => "EdDSA",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_secret() -> String {
        "test-secret-key-for-jwt-signing-minimum-32-chars".to_string()
    }

    fn service() -> JwtService {
        JwtService::with_secret(test_secret()).unwrap()
    }

    #[test]
    fn test_service_creation() {
        assert_eq!(service().config().algorithm, JwtAlgorithm::HS256);
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let err = JwtService::new(JwtConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_issue_validate_decode() {
        let service = service();
        let mut custom = Map::new();
        custom.insert("foo".to_string(), json!("bar"));

        let issued = service.issue(42, custom, None).unwrap();
        assert!(service.is_valid(&issued.token));

        let claims = service.decode(&issued.token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.claim("foo"), Some(&json!("bar")));
        assert_eq!(claims.iss, "warden");
        // Default lifetime is 24 hours.
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let service = service();
        let issued = service.issue(42, Map::new(), Some("-1")).unwrap();

        assert!(!service.is_valid(&issued.token));
        let err = service.decode(&issued.token).unwrap_err();
        assert!(matches!(err, JwtError::InvalidToken));
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let service = service();
        let issued = service.issue(42, Map::new(), None).unwrap();

        let mut tampered = issued.token.clone();
        tampered.pop();
        tampered.push('A');
        assert!(!service.is_valid(&tampered));
        assert!(!service.is_valid("not-even-a-token"));
    }

    #[test]
    fn test_failures_are_indistinguishable() {
        let service = service();
        let expired = service.issue(1, Map::new(), Some("-1")).unwrap().token;
        let garbage = "a.b.c".to_string();

        let expired_err = service.validate(&expired).unwrap_err();
        let garbage_err = service.validate(&garbage).unwrap_err();
        assert_eq!(expired_err.to_string(), garbage_err.to_string());
    }

    #[test]
    fn test_decode_insecure_reads_expired_tokens() {
        let service = service();
        let issued = service.issue(7, Map::new(), Some("-1")).unwrap();

        let claims = service.decode_insecure(&issued.token).unwrap();
        assert_eq!(claims.user_id, 7);
    }

    #[test]
    fn test_future_nbf_is_invalid() {
        let service = service();
        let mut claims = TokenClaims::new(1, "warden", Duration::hours(1), Map::new());
        claims.nbf = Some(Utc::now().timestamp() + 600);

        let token = service.encode_claims(&claims).unwrap();
        assert!(!service.is_valid(&token));
    }

    #[test]
    fn test_future_iat_is_invalid() {
        let service = service();
        let mut claims = TokenClaims::new(1, "warden", Duration::hours(1), Map::new());
        claims.iat = Utc::now().timestamp() + 600;

        let token = service.encode_claims(&claims).unwrap();
        assert!(!service.is_valid(&token));
    }

    #[test]
    fn test_algorithm_parse_round_trip() {
        for alg in [
            JwtAlgorithm::HS256,
            JwtAlgorithm::HS384,
            JwtAlgorithm::HS512,
            JwtAlgorithm::RS256,
            JwtAlgorithm::RS384,
            JwtAlgorithm::RS512,
            JwtAlgorithm::ES256,
            JwtAlgorithm::ES384,
            JwtAlgorithm::EdDSA,
        ] {
            assert_eq!(JwtAlgorithm::parse(alg.as_str()), Some(alg));
        }
        assert_eq!(JwtAlgorithm::parse("none"), None);
    }

    #[test]
    fn test_config_from_provider() {
        use warden_access::MapConfig;

        let config = MapConfig::from_entries([
            (keys::JWT_ALGORITHM, json!("HS512")),
            (keys::JWT_SECRET, json!(test_secret())),
            (keys::JWT_ISSUER, json!("https://example.test")),
            (keys::JWT_TTL, json!("+1 hour")),
            (keys::JWT_LEEWAY, json!(0)),
        ]);

        let service = JwtService::from_provider(&config).unwrap();
        let issued = service.issue(9, Map::new(), None).unwrap();
        assert_eq!(issued.claims.iss, "https://example.test");
        assert_eq!(issued.claims.exp - issued.claims.iat, 3600);
        assert!(service.is_valid(&issued.token));
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        use warden_access::MapConfig;

        let config = MapConfig::from_entries([(keys::JWT_ALGORITHM, json!("XS256"))]);
        let err = JwtConfig::from_provider(&config).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }
}
