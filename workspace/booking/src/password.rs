use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;

use crate::error::{BookingError, Result};

/// Salted Argon2 password hashing.
///
/// Hashes are stored as PHC strings, which embed the parameters they were
/// produced with, so verification works regardless of how this instance is
/// tuned.
#[derive(Clone)]
pub struct PasswordHashing {
    argon2: Argon2<'static>,
}

impl Default for PasswordHashing {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl std::fmt::Debug for PasswordHashing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHashing").finish_non_exhaustive()
    }
}

impl PasswordHashing {
    /// Argon2id with explicit cost parameters (memory in KiB, iterations,
    /// parallelism).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| BookingError::PasswordHash(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| BookingError::PasswordHash(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    /// Returns `Ok(false)` on mismatch; errors only when the stored hash is
    /// unreadable.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| BookingError::PasswordHash(e.to_string()))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted_and_verifiable() {
        let hashing = PasswordHashing::with_params(8, 1, 1).unwrap();

        let first = hashing.hash("s3cret!").unwrap();
        let second = hashing.hash("s3cret!").unwrap();

        assert_ne!(first, second);
        assert!(!first.contains("s3cret!"));
        assert!(hashing.verify("s3cret!", &first).unwrap());
        assert!(!hashing.verify("wrong", &first).unwrap());
    }

    #[test]
    fn test_verify_uses_parameters_from_hash() {
        let cheap = PasswordHashing::with_params(8, 1, 1).unwrap();
        let hash = cheap.hash("password").unwrap();

        assert!(PasswordHashing::default().verify("password", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let hashing = PasswordHashing::default();
        assert!(matches!(
            hashing.verify("password", "plaintext"),
            Err(BookingError::PasswordHash(_))
        ));
    }
}
