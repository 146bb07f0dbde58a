//! Argon2 credential used to elevate a session to administrator.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::error::{DomainError, DomainResult};

/// Hashed password. Never holds the plain text.
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a plain text password of at least `MIN_PASSWORD_LENGTH` characters.
    pub fn new(plain_text: &str) -> DomainResult<Self> {
        if plain_text.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::validation(format!("Password hash failed: {}", e)))?;
        Ok(Self {
            hash: hash.to_string(),
        })
    }

    /// Wrap a stored PHC hash string, rejecting anything that does not parse.
    pub fn from_hash(hash: impl Into<String>) -> DomainResult<Self> {
        let hash = hash.into();
        PasswordHash::new(&hash)
            .map_err(|e| DomainError::validation(format!("Invalid hash format: {}", e)))?;
        Ok(Self { hash })
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn verify(&self, plain_text: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let password = Password::new("correct-horse").unwrap();

        assert!(password.verify("correct-horse"));
        assert!(!password.verify("battery-staple"));
    }

    #[test]
    fn test_password_from_hash() {
        let password = Password::new("correct-horse").unwrap();
        let restored = Password::from_hash(password.as_str()).unwrap();

        assert!(restored.verify("correct-horse"));
    }

    #[test]
    fn test_malformed_hash_rejected() {
        assert!(Password::from_hash("not-a-phc-string").is_err());
    }

    #[test]
    fn test_password_too_short() {
        assert!(Password::new("short").is_err());
        assert!(Password::new("12345678").is_ok());
    }

    #[test]
    fn test_debug_redacts_hash() {
        let password = Password::new("correct-horse").unwrap();
        let debug = format!("{:?}", password);

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(password.as_str()));
    }
}
