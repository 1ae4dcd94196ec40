use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Hashes a secret (password or verification code) with a fresh salt.
pub fn hash_secret(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Constant-time comparison is delegated to argon2. A malformed stored hash
/// verifies as false rather than erroring; only the hashing stage can fail.
pub fn verify_secret(plain: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_secret(password).expect("hashing should succeed");
        assert!(verify_secret(password, &hash));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let password = "correct-horse-battery-staple";
        let hash = hash_secret(password).expect("hashing should succeed");
        assert!(!verify_secret("wrong-password", &hash));
    }

    #[test]
    fn verify_rejects_another_secrets_hash() {
        let hash = hash_secret("first").expect("hashing should succeed");
        let other = hash_secret("second").expect("hashing should succeed");
        assert_ne!(hash, other);
        assert!(!verify_secret("first", &other));
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!verify_secret("anything", "not-a-valid-hash"));
        assert!(!verify_secret("anything", ""));
    }

    #[test]
    fn short_numeric_codes_hash_like_passwords() {
        let hash = hash_secret("0042").expect("hashing should succeed");
        assert!(verify_secret("0042", &hash));
        assert!(!verify_secret("0043", &hash));
    }
}
