// ABOUTME: Credential verifier seam for login, with a salted Argon2id implementation
// ABOUTME: Stored passwords are PHC-format hashes; plaintext is never persisted or compared

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AppError, Result};

pub trait CredentialVerifier: Send + Sync {
    /// Produce a salted hash suitable for the `users.password` column.
    fn hash(&self, password: &str) -> Result<String>;

    /// `Ok(false)` on mismatch, `Err` only when the stored hash is malformed.
    fn verify(&self, password: &str, stored: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct Argon2Verifier {
    argon2: Argon2<'static>,
}

impl Default for Argon2Verifier {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl Argon2Verifier {
    /// Cheap parameters for tests and local tooling.
    pub fn low_cost() -> Result<Self> {
        let params = Params::new(8, 1, 1, None)
            .map_err(|e| AppError::Internal(format!("Invalid argon2 params: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, stored: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
