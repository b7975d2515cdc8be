// Password hashing for the credential store (Argon2id, PHC string format).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::OnceLock;

/// Hashes a password with a fresh random salt. Output is a `$argon2id$...` PHC string.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Checks a password against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Runs a full verification against a throwaway hash so that a missing account costs
/// the same as a wrong password.
pub fn burn_verification(password: &str) {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    if let Some(stored) = DUMMY.get_or_init(|| hash_password("campus-admin-dummy").ok()) {
        let _ = verify_password(password, stored);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("correct horse").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("correct h0rse", &stored));
    }

    #[test]
    fn salts_differ_between_calls() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn malformed_hashes_are_rejected() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "no-dollar-sign"));
        assert!(!verify_password("x", "$argon2id$"));
        // Legacy salted SHA-256 format is not accepted.
        assert!(!verify_password("x", "abcd$0123"));
    }

    #[test]
    fn burn_verification_does_not_panic() {
        burn_verification("anything");
        burn_verification("");
    }
}
