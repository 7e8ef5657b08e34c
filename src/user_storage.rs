use crate::collection::Collection;
use crate::error::AppError;
use crate::user_models::User;
use anyhow::{Context, Result};
use std::path::Path;

const USERS_FILE: &str = "users.json";

pub struct UserStorage {
    users: Collection<User>,
    hash_cost: u32,
}

impl UserStorage {
    pub fn new(data_dir: &Path, hash_cost: u32) -> Result<Self> {
        Ok(Self {
            users: Collection::open(data_dir.join(USERS_FILE))?,
            hash_cost,
        })
    }

    pub async fn find_by_username(&self, username: &str) -> Option<User> {
        let users = self.users.read().await;
        users.iter().find(|u| u.username == username).cloned()
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<User, AppError> {
        require_credentials(username, password)?;

        if self.find_by_username(username).await.is_some() {
            return Err(AppError::DuplicateUser);
        }

        let password_hash = hash_password(password.to_string(), self.hash_cost).await?;
        let user = User::new(username.to_string(), password_hash);

        let mut users = self.users.write().await;
        // A concurrent registration may have landed while we were hashing.
        if users.iter().any(|u| u.username == user.username) {
            return Err(AppError::DuplicateUser);
        }

        self.users.push_and_save(&mut users, user.clone()).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        require_credentials(username, password)?;

        let Some(user) = self.find_by_username(username).await else {
            tracing::warn!(username, "Login failed");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            tracing::warn!(username, "Login failed");
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }
}

fn require_credentials(username: &str, password: &str) -> Result<(), AppError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(AppError::MissingCredentials);
    }
    Ok(())
}

async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("Password hashing task failed")?
        .context("Failed to hash password")
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("Password verification task failed")?
        .context("Failed to verify password")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_COST: u32 = 4;

    fn storage(dir: &TempDir) -> UserStorage {
        UserStorage::new(dir.path(), TEST_COST).unwrap()
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let users = storage(&temp_dir);

        users.register("alice", "secret").await.unwrap();
        let second = users.register("alice", "other").await;

        assert!(matches!(second, Err(AppError::DuplicateUser)));
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let temp_dir = TempDir::new().unwrap();
        let users = storage(&temp_dir);

        let user = users.register("bob", "hunter2").await.unwrap();

        assert_ne!(user.password_hash, "hunter2");
        assert!(bcrypt::verify("hunter2", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let temp_dir = TempDir::new().unwrap();
        let users = storage(&temp_dir);
        users.register("carol", "right").await.unwrap();

        let wrong_password = users.authenticate("carol", "wrong").await.unwrap_err();
        let unknown_user = users.authenticate("nobody", "right").await.unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_user, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn correct_password_authenticates() {
        let temp_dir = TempDir::new().unwrap();
        let users = storage(&temp_dir);
        users.register("dave", "pw").await.unwrap();

        let user = users.authenticate("dave", "pw").await.unwrap();
        assert_eq!(user.username, "dave");
    }

    #[tokio::test]
    async fn empty_credentials_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let users = storage(&temp_dir);

        assert!(matches!(
            users.register("", "pw").await,
            Err(AppError::MissingCredentials)
        ));
        assert!(matches!(
            users.authenticate("erin", "").await,
            Err(AppError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn failed_save_does_not_register() {
        let temp_dir = TempDir::new().unwrap();
        let users = storage(&temp_dir);
        let users_file = temp_dir.path().join(USERS_FILE);
        std::fs::create_dir(&users_file).unwrap();

        assert!(matches!(
            users.register("ghost", "pw").await,
            Err(AppError::Internal(_))
        ));
        assert!(users.find_by_username("ghost").await.is_none());
        assert!(matches!(
            users.authenticate("ghost", "pw").await,
            Err(AppError::InvalidCredentials)
        ));

        std::fs::remove_dir(&users_file).unwrap();
        users.register("ghost", "pw").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_registrations_admit_one() {
        let temp_dir = TempDir::new().unwrap();
        let users = storage(&temp_dir);

        let (a, b) = tokio::join!(users.register("race", "x"), users.register("race", "y"));

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(
            matches!(a, Err(AppError::DuplicateUser)) || matches!(b, Err(AppError::DuplicateUser))
        );
    }

    #[tokio::test]
    async fn accounts_survive_reload() {
        let temp_dir = TempDir::new().unwrap();
        storage(&temp_dir).register("frank", "pw").await.unwrap();

        let reloaded = storage(&temp_dir);
        assert!(reloaded.find_by_username("frank").await.is_some());
        assert!(matches!(
            reloaded.register("frank", "pw").await,
            Err(AppError::DuplicateUser)
        ));
    }
}
