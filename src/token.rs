/// Signed email-verification and password-reset tokens
///
/// Both flows share one primitive: an HS256 JWT carrying the target
/// account's email, a purpose tag, a unique token id (jti), and an
/// expiry. The purpose tag binds a token to exactly one redemption
/// endpoint; the jti lets reset redemption persist a single-use marker.
use crate::error::{LibrisError, LibrisResult};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which flow a token was minted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Verify,
    Reset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Verify => "verify",
            TokenPurpose::Reset => "reset",
        }
    }
}

impl std::fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried inside a signed token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Target account's email
    pub sub: String,
    pub purpose: TokenPurpose,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Why a presented token was rejected
///
/// Callers collapse all of these into one generic authentication
/// failure before anything reaches the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token purpose mismatch")]
    WrongPurpose,
}

/// Issues and verifies purpose-bound signed tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    verify_ttl_secs: u64,
    reset_ttl_secs: u64,
}

impl TokenService {
    pub fn new(secret: &str, verify_ttl_secs: u64, reset_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            verify_ttl_secs,
            reset_ttl_secs,
        }
    }

    /// Lifetime applied to newly issued tokens of the given purpose
    pub fn ttl_secs(&self, purpose: TokenPurpose) -> u64 {
        match purpose {
            TokenPurpose::Verify => self.verify_ttl_secs,
            TokenPurpose::Reset => self.reset_ttl_secs,
        }
    }

    /// Mint a signed token for the given email and purpose
    pub fn issue(&self, email: &str, purpose: TokenPurpose) -> LibrisResult<String> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: email.to_string(),
            purpose,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.ttl_secs(purpose) as i64,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| LibrisError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify a presented token against the expected purpose
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Allow some clock skew (5 minutes)
        validation.leeway = 300;

        let data =
            decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::BadSignature,
                    _ => TokenError::Malformed,
                }
            })?;

        if data.claims.purpose != expected {
            return Err(TokenError::WrongPurpose);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-token-secret-0123456789abcdef";

    fn service() -> TokenService {
        TokenService::new(SECRET, 86400, 3600)
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let svc = service();
        let token = svc.issue("ada@example.com", TokenPurpose::Verify).unwrap();
        let claims = svc.verify(&token, TokenPurpose::Verify).unwrap();

        assert_eq!(claims.sub, "ada@example.com");
        assert_eq!(claims.purpose, TokenPurpose::Verify);
        assert!(!claims.jti.is_empty());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_jti_is_unique_per_issuance() {
        let svc = service();
        let first = svc.issue("ada@example.com", TokenPurpose::Reset).unwrap();
        let second = svc.issue("ada@example.com", TokenPurpose::Reset).unwrap();

        let first = svc.verify(&first, TokenPurpose::Reset).unwrap();
        let second = svc.verify(&second, TokenPurpose::Reset).unwrap();
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_wrong_purpose_rejected() {
        let svc = service();
        let token = svc.issue("ada@example.com", TokenPurpose::Verify).unwrap();
        assert_eq!(
            svc.verify(&token, TokenPurpose::Reset),
            Err(TokenError::WrongPurpose)
        );
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let svc = service();
        let other = TokenService::new("another-secret-0123456789abcdefgh", 86400, 3600);
        let token = other.issue("ada@example.com", TokenPurpose::Verify).unwrap();
        assert_eq!(
            svc.verify(&token, TokenPurpose::Verify),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let svc = service();
        assert_eq!(
            svc.verify("not-a-token", TokenPurpose::Verify),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service();

        // Craft a token whose expiry is further in the past than the
        // verification leeway.
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: "ada@example.com".to_string(),
            purpose: TokenPurpose::Reset,
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            svc.verify(&token, TokenPurpose::Reset),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_ttl_per_purpose() {
        let svc = service();
        assert_eq!(svc.ttl_secs(TokenPurpose::Verify), 86400);
        assert_eq!(svc.ttl_secs(TokenPurpose::Reset), 3600);
    }
}
