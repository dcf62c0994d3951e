use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Stored in place of a hash for accounts created without a password.
pub const UNUSABLE_PASSWORD_PREFIX: &str = "!";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::internal(format!("failed to hash password: {err}")))
}

pub fn unusable_password() -> String {
    format!("{UNUSABLE_PASSWORD_PREFIX}{}", random_hex(20))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    if password_hash.starts_with(UNUSABLE_PASSWORD_PREFIX) {
        return Ok(false);
    }

    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|err| AppError::internal(format!("invalid password hash: {err}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Lowercase hex of `bytes` random bytes from the OS generator.
pub fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Path ids that are not UUIDs cannot match any row.
pub fn parse_path_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::missing())
}

/// Exact-id query filters reject malformed ids instead of silently matching nothing.
pub fn parse_filter_id(field: &str, raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::bad_request(format!("{field}: Enter a valid id.")))
}

/// Splits a free-text search the way the list endpoints expect: on whitespace and commas.
pub fn search_terms(search: &str) -> Vec<String> {
    search
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}
