/// Password hashing and verification (Argon2id)
///
/// Hashes carry their own salt and parameters as PHC strings, so
/// verification keeps working after the configured work factor changes.
use crate::error::{LibrisError, LibrisResult};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// One-way password hasher with a configurable iteration count
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Create a hasher with the given work factor (Argon2id iterations)
    pub fn new(work_factor: u32) -> LibrisResult<Self> {
        let params = Params::new(
            Params::DEFAULT_M_COST,
            work_factor,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| LibrisError::Internal(format!("Invalid hashing parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password with a fresh random salt
    pub fn hash(&self, plaintext: &str) -> LibrisResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| LibrisError::Internal(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored PHC-format hash
    ///
    /// Returns false on mismatch; a malformed stored hash is an internal
    /// error, not a mismatch.
    pub fn verify(&self, plaintext: &str, hash: &str) -> LibrisResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| LibrisError::Internal(format!("Invalid stored password hash: {}", e)))?;

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(LibrisError::Internal(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_not_plaintext() {
        let hasher = PasswordHasher::new(1).unwrap();
        let hash = hasher.hash("engine123").unwrap();
        assert_ne!(hash, "engine123");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_verify_round_trip() {
        let hasher = PasswordHasher::new(1).unwrap();
        let hash = hasher.hash("engine123").unwrap();
        assert!(hasher.verify("engine123", &hash).unwrap());
        assert!(!hasher.verify("engine124", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ_between_hashes() {
        let hasher = PasswordHasher::new(1).unwrap();
        let first = hasher.hash("engine123").unwrap();
        let second = hasher.hash("engine123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_survives_work_factor_change() {
        let old = PasswordHasher::new(1).unwrap();
        let hash = old.hash("engine123").unwrap();

        // Parameters ride along in the PHC string.
        let new = PasswordHasher::new(2).unwrap();
        assert!(new.verify("engine123", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let hasher = PasswordHasher::new(1).unwrap();
        assert!(hasher.verify("engine123", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_zero_work_factor_rejected() {
        assert!(PasswordHasher::new(0).is_err());
    }
}
