use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::ApiError;

const MIN_LEN: usize = 8;

/// Rejects passwords that are too short to be stored.
pub fn check_strength(plain: &str) -> Result<(), ApiError> {
    if plain.chars().count() < MIN_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_LEN} characters"
        )));
    }
    Ok(())
}

fn argon_failure(stage: &'static str, e: password_hash::Error) -> anyhow::Error {
    error!(error = %e, stage, "argon2 failure");
    anyhow::anyhow!("argon2 {stage}: {e}")
}

pub fn hash(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| argon_failure("hash", e))
}

/// `Ok(false)` on a mismatch; `Err` only when the stored hash is unreadable.
pub fn matches(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| argon_failure("parse", e))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_matches_only_its_password() {
        let stored = hash("correct-horse").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(matches("correct-horse", &stored).unwrap());
        assert!(!matches("correct-horsf", &stored).unwrap());
    }

    #[test]
    fn salts_differ_per_hash() {
        assert_ne!(hash("repeat-me").unwrap(), hash("repeat-me").unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(matches("whatever", "plaintext-in-db").is_err());
    }

    #[test]
    fn short_passwords_fail_strength_check() {
        assert!(matches!(check_strength("seven77"), Err(ApiError::Validation(_))));
        assert!(check_strength("eight888").is_ok());
    }
}
