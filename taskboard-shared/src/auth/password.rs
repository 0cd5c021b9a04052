/// Password hashing and strength policy
///
/// User passwords are hashed with Argon2id before they reach a repository.
/// The stored value is a PHC string, which embeds the algorithm, version,
/// cost parameters and salt, so verification needs nothing but the string.
///
/// # Parameters
///
/// - Memory: 64 MB (65536 KB)
/// - Iterations: 3
/// - Lanes: 4
/// - Output: 32 bytes
/// - Salt: 16 random bytes from the OS RNG
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{hash_password, validate_password_strength, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// validate_password_strength("Kanban#2025")?;
/// let hash = hash_password("Kanban#2025")?;
/// assert!(verify_password("Kanban#2025", &hash)?);
/// assert!(!verify_password("kanban#2025", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, ParamsBuilder, Version,
};

/// Shortest accepted password, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Hashing failed
    #[error("Failed to hash password: {0}")]
    Hash(String),

    /// The stored value is not a PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// Verification failed for a reason other than a wrong password
    #[error("Failed to verify password: {0}")]
    Verify(String),
}

fn params() -> Result<Params, PasswordError> {
    ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::Hash(format!("invalid parameters: {}", e)))
}

/// Hashes a password with Argon2id
///
/// # Errors
///
/// Returns `PasswordError::Hash` if the parameters are rejected or hashing
/// fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params()?);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Checks a password against a stored PHC string
///
/// Returns `Ok(false)` for a wrong password; errors are reserved for
/// malformed hashes and internal failures.
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if `hash` cannot be parsed, or
/// `PasswordError::Verify` for any other failure.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verify(e.to_string())),
    }
}

/// Applies the password strength policy
///
/// A password needs at least [`MIN_PASSWORD_LENGTH`] characters and at least
/// one upper-case letter, one lower-case letter, one digit and one
/// character that is neither. The first unmet requirement is reported.
///
/// # Errors
///
/// Returns a user-facing description of the first unmet requirement.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    let checks: [(fn(char) -> bool, &str); 4] = [
        (char::is_uppercase, "Password must contain at least one uppercase letter"),
        (char::is_lowercase, "Password must contain at least one lowercase letter"),
        (|c| c.is_ascii_digit(), "Password must contain at least one digit"),
        (|c| !c.is_alphanumeric(), "Password must contain at least one special character"),
    ];

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }

    for (check, message) in checks {
        if !password.chars().any(check) {
            return Err(message.to_string());
        }
    }

    Ok(())
}
