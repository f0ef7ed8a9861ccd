//! Issue/validate round trips for every supported algorithm, plus
//! DER-signature interop for the EC algorithms.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Map};
use warden_jwt::ecdsa::{raw_to_der, ES256_COMPONENT_LEN, ES384_COMPONENT_LEN};
use warden_jwt::{JwtAlgorithm, JwtConfig, JwtService};

const RSA_PRIVATE: &str = include_str!("fixtures/rsa_private.pem");
const RSA_PUBLIC: &str = include_str!("fixtures/rsa_public.pem");
const ES256_PRIVATE: &str = include_str!("fixtures/es256_private.pem");
const ES256_PUBLIC: &str = include_str!("fixtures/es256_public.pem");
const ES384_PRIVATE: &str = include_str!("fixtures/es384_private.pem");
const ES384_PUBLIC: &str = include_str!("fixtures/es384_public.pem");
const ED25519_PRIVATE: &str = include_str!("fixtures/ed25519_private.pem");
const ED25519_PUBLIC: &str = include_str!("fixtures/ed25519_public.pem");

fn service_for(algorithm: JwtAlgorithm) -> JwtService {
    let (secret, private_key, public_key) = match algorithm {
        JwtAlgorithm::HS256 | JwtAlgorithm::HS384 | JwtAlgorithm::HS512 => {
            (Some("round-trip-secret-of-sufficient-length!".to_string()), None, None)
        }
        JwtAlgorithm::RS256 | JwtAlgorithm::RS384 | JwtAlgorithm::RS512 => {
            (None, Some(RSA_PRIVATE.to_string()), Some(RSA_PUBLIC.to_string()))
        }
        JwtAlgorithm::ES256 => (None, Some(ES256_PRIVATE.to_string()), Some(ES256_PUBLIC.to_string())),
        JwtAlgorithm::ES384 => (None, Some(ES384_PRIVATE.to_string()), Some(ES384_PUBLIC.to_string())),
        JwtAlgorithm::EdDSA => {
            (None, Some(ED25519_PRIVATE.to_string()), Some(ED25519_PUBLIC.to_string()))
        }
    };
    JwtService::new(JwtConfig { algorithm, secret, private_key, public_key, ..Default::default() })
        .unwrap()
}

#[test]
fn every_algorithm_round_trips() {
    for algorithm in [
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
        let service = service_for(algorithm);
        let mut custom = Map::new();
        custom.insert("foo".to_string(), json!("bar"));

        let issued = service.issue(42, custom, None).unwrap();
        assert!(service.is_valid(&issued.token), "{} token should validate", algorithm.as_str());

        let claims = service.decode(&issued.token).unwrap();
        assert_eq!(claims.user_id, 42, "{}", algorithm.as_str());
        assert_eq!(claims.claim("foo"), Some(&json!("bar")), "{}", algorithm.as_str());
        assert_eq!(claims.jti, issued.claims.jti, "{}", algorithm.as_str());
    }
}

#[test]
fn expired_tokens_fail_for_asymmetric_algorithms() {
    for algorithm in [JwtAlgorithm::RS256, JwtAlgorithm::ES256, JwtAlgorithm::EdDSA] {
        let service = service_for(algorithm);
        let issued = service.issue(1, Map::new(), Some("-1")).unwrap();
        assert!(!service.is_valid(&issued.token), "{}", algorithm.as_str());
    }
}

#[test]
fn cross_algorithm_tokens_are_rejected() {
    let hs = service_for(JwtAlgorithm::HS256);
    let rs = service_for(JwtAlgorithm::RS256);

    let issued = hs.issue(1, Map::new(), None).unwrap();
    assert!(!rs.is_valid(&issued.token));
}

fn with_der_signature(token: &str, component_len: usize) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    let raw = URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
    assert_eq!(raw.len(), component_len * 2);
    let der = raw_to_der(&raw).unwrap();
    format!("{}.{}.{}", parts[0], parts[1], URL_SAFE_NO_PAD.encode(der))
}

#[test]
fn der_signed_es256_tokens_are_accepted() {
    let service = service_for(JwtAlgorithm::ES256);
    let issued = service.issue(7, Map::new(), None).unwrap();

    // Rewrite the signature the way an OpenSSL-based issuer emits it.
    let der_token = with_der_signature(&issued.token, ES256_COMPONENT_LEN);
    assert_ne!(der_token, issued.token);
    assert!(service.is_valid(&der_token));
    assert_eq!(service.decode(&der_token).unwrap().user_id, 7);
}

#[test]
fn der_signed_es384_tokens_are_accepted() {
    let service = service_for(JwtAlgorithm::ES384);
    let issued = service.issue(7, Map::new(), None).unwrap();

    let der_token = with_der_signature(&issued.token, ES384_COMPONENT_LEN);
    assert!(service.is_valid(&der_token));
}

#[test]
fn corrupted_der_signature_is_rejected() {
    let service = service_for(JwtAlgorithm::ES256);
    let issued = service.issue(7, Map::new(), None).unwrap();

    let mut der_token = with_der_signature(&issued.token, ES256_COMPONENT_LEN);
    der_token.truncate(der_token.len() - 4);
    assert!(!service.is_valid(&der_token));
}
