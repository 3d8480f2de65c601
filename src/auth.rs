//! Credential store: username to Argon2id password hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{CareError, Result};
use crate::models::User;

/// Hash a password with a fresh random salt. Returns a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CareError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| CareError::integrity(format!("stored password hash is invalid: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CareError::PasswordHash(e.to_string())),
    }
}

fn require_credentials(username: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(CareError::MissingCredentials);
    }
    Ok(())
}

/// Returns false when the username is already taken.
pub async fn create_user(pool: &PgPool, username: &str, password: &str) -> Result<bool> {
    require_credentials(username, password)?;
    let password_hash = hash_password(password)?;

    let mut tx = pool.begin().await?;
    let created = sqlx::query(
        r#"
        INSERT INTO campus_care.users (id, username, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (username) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(&password_hash)
    .fetch_optional(&mut *tx)
    .await?;
    tx.commit().await?;

    match created {
        Some(_) => {
            tracing::info!(username, "created user");
            Ok(true)
        }
        None => {
            tracing::debug!(username, "username already taken");
            Ok(false)
        }
    }
}

pub async fn validate_user(pool: &PgPool, username: &str, password: &str) -> Result<bool> {
    let row = sqlx::query("SELECT password_hash FROM campus_care.users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let hash: String = row.get("password_hash");
            verify_password(password, &hash)
        }
        None => Ok(false),
    }
}

pub async fn get_user_id(pool: &PgPool, username: &str) -> Result<Option<Uuid>> {
    let row = sqlx::query("SELECT id FROM campus_care.users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("id")))
}

/// Validate credentials and resolve the user in one step.
pub async fn log_in(pool: &PgPool, username: &str, password: &str) -> Result<User> {
    require_credentials(username, password)?;
    if !validate_user(pool, username, password).await? {
        tracing::warn!(username, "rejected login");
        return Err(CareError::InvalidCredentials);
    }
    let id = get_user_id(pool, username)
        .await?
        .ok_or(CareError::InvalidCredentials)?;
    tracing::info!(username, user_id = %id, "user logged in");
    Ok(User {
        id,
        username: username.to_string(),
    })
}

pub async fn sign_up(pool: &PgPool, username: &str, password: &str) -> Result<()> {
    if create_user(pool, username, password).await? {
        Ok(())
    } else {
        Err(CareError::UsernameTaken(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_per_call() {
        let first = hash_password("calm-mind").unwrap();
        let second = hash_password("calm-mind").unwrap();
        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
    }

    #[test]
    fn verifies_only_the_hashed_password() {
        let hash = hash_password("calm-mind").unwrap();
        assert!(verify_password("calm-mind", &hash).unwrap());
        assert!(!verify_password("calm-mind!", &hash).unwrap());
    }

    #[test]
    fn plaintext_is_never_stored() {
        let hash = hash_password("calm-mind").unwrap();
        assert!(!hash.contains("calm-mind"));
    }

    #[test]
    fn corrupt_hash_is_an_error_not_a_match() {
        assert!(verify_password("calm-mind", "plain-text").is_err());
    }

    #[test]
    fn hasher_failures_stay_in_the_auth_family() {
        // Parses as a PHC string but names an algorithm Argon2 cannot verify.
        let foreign = "$pbkdf2-sha256$i=1000$c2FsdHNhbHQ$aGFzaGhhc2hoYXNoaGFzaA";
        let err = verify_password("calm-mind", foreign).unwrap_err();
        assert!(matches!(err, CareError::PasswordHash(_)));
        assert_eq!(err.category(), "auth");
    }

    #[test]
    fn blank_credentials_are_rejected() {
        assert!(matches!(
            require_credentials("  ", "secret"),
            Err(CareError::MissingCredentials)
        ));
        assert!(matches!(
            require_credentials("kai", ""),
            Err(CareError::MissingCredentials)
        ));
        assert!(require_credentials("kai", "secret").is_ok());
    }
}
