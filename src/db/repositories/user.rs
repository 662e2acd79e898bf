use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users;

/// User data returned from the repository (without the password hash).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

/// Outcome of a registration attempt. The username/email uniqueness
/// constraints live in the store; a violation on insert (a concurrent
/// registration race slipping past the pre-check) maps to `IdentityTaken`
/// the same as the pre-check itself.
#[derive(Debug)]
pub enum RegisterOutcome {
    Created(User),
    IdentityTaken,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")?;

        Ok(user.map(User::from))
    }

    /// Combined lookup: is the username or the (lowercased) email taken?
    pub async fn identity_taken(&self, username: &str, email: &str) -> Result<bool> {
        let existing = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(username))
                    .add(users::Column::Email.eq(email.to_lowercase())),
            )
            .one(&self.conn)
            .await
            .context("Failed to query user by username/email")?;

        Ok(existing.is_some())
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
    ) -> Result<RegisterOutcome> {
        if self.identity_taken(username, email).await? {
            return Ok(RegisterOutcome::IdentityTaken);
        }

        let active = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_lowercase()),
            password_hash: Set(password_hash),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(RegisterOutcome::Created(User::from(model))),
            Err(e)
                if matches!(
                    e.sql_err(),
                    Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                ) =>
            {
                Ok(RegisterOutcome::IdentityTaken)
            }
            Err(e) => Err(e).context("Failed to insert user"),
        }
    }

    /// Verify credentials for a username-or-email identifier.
    ///
    /// Returns `None` for both an unknown identifier and a wrong password
    /// so callers cannot distinguish which field was wrong.
    ///
    /// Note: Argon2 verification is CPU-intensive and runs in
    /// `spawn_blocking` so it does not stall the async runtime.
    pub async fn verify_credentials(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(identifier))
                    .add(users::Column::Email.eq(identifier.to_lowercase())),
            )
            .one(&self.conn)
            .await
            .context("Failed to query user for credential verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid.then(|| User::from(user)))
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the crate defaults.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_roundtrip() {
        let hash = hash_password("secret1", None).unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"secret1", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong1", &parsed)
                .is_err()
        );
    }

    #[test]
    fn test_hash_password_with_config() {
        let cfg = SecurityConfig::default();
        let hash = hash_password("secret1", Some(&cfg)).unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }
}
