//! Seeded privileged credentials for admin elevation.

use std::collections::HashMap;

use common::{AppError, AppResult};
use domain::Password;

/// Argon2 hashes of the accounts allowed to elevate to admin, keyed by email
#[derive(Debug, Clone, Default)]
pub struct AdminCredentials {
    entries: HashMap<String, Password>,
}

impl AdminCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, email: &str, password: Password) -> Self {
        self.entries.insert(normalize(email), password);
        self
    }

    /// Parse `email:phc-hash` pairs separated by `;`.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let mut credentials = Self::new();

        for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (email, hash) = pair.split_once(':').ok_or_else(|| {
                AppError::validation("Admin credentials must be `email:hash` pairs")
            })?;
            if email.trim().is_empty() {
                return Err(AppError::validation("Admin credential email cannot be empty"));
            }
            credentials = credentials.with(email, Password::from_hash(hash.trim())?);
        }

        Ok(credentials)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn verify(&self, email: &str, password: &str) -> bool {
        self.entries
            .get(&normalize(email))
            .is_some_and(|stored| stored.verify(password))
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_verifies_seeded_pairs() {
        let first = Password::new("first-secret").unwrap();
        let second = Password::new("second-secret").unwrap();
        let raw = format!(
            "ops@example.com:{}; audit@example.com:{}",
            first.as_str(),
            second.as_str()
        );

        let credentials = AdminCredentials::parse(&raw).unwrap();

        assert_eq!(credentials.len(), 2);
        assert!(credentials.verify("OPS@example.com", "first-secret"));
        assert!(!credentials.verify("ops@example.com", "second-secret"));
        assert!(!credentials.verify("nobody@example.com", "first-secret"));
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!(AdminCredentials::parse("ops@example.com").is_err());
        assert!(AdminCredentials::parse("ops@example.com:not-a-hash").is_err());
        assert!(AdminCredentials::parse("").unwrap().is_empty());
    }
}
