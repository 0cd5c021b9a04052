//! Credential handling
//!
//! - [`password`]: Argon2id hashing, verification and the strength policy
//!   applied by the user validators

pub mod password;
