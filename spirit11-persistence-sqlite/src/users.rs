use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use spirit11_core::INITIAL_BUDGET;
use spirit11_server_domain::{
    ServiceError, ServiceResult, UserId,
    account::{NewUser, User, UserRepository},
};

use crate::is_unique_violation;

pub struct SqliteUserRepository {
    pool: Pool<Sqlite>,
}

impl SqliteUserRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn user_from_row(row: &SqliteRow) -> sqlx::Result<User> {
        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            is_admin: row.try_get("is_admin")?,
            university: row.try_get("university")?,
            budget: row.try_get("budget")?,
            team_points: row.try_get("team_points")?,
        })
    }

    fn optional_user(row: Option<SqliteRow>) -> ServiceResult<Option<User>> {
        row.map(|row| Self::user_from_row(&row))
            .transpose()
            .map_err(|e| ServiceError::Internal(e.to_string()))
    }
}

#[async_trait::async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_user(&self, user: &NewUser) -> ServiceResult<UserId> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, is_admin, university, budget, team_points) VALUES (?, ?, ?, ?, ?, 0)",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(&user.university)
        .bind(INITIAL_BUDGET)
        .execute(&self.pool)
        .await;

        match result {
            Ok(result) => Ok(result.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => {
                ServiceError::not_possible("Username already exists")
            }
            Err(e) => Err(ServiceError::Internal(e.to_string())),
        }
    }

    async fn get_user(&self, id: UserId) -> ServiceResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Self::optional_user(row)
    }

    async fn get_user_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Self::optional_user(row)
    }

    async fn get_users(&self) -> ServiceResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        rows.iter()
            .map(|row| Self::user_from_row(row).map_err(|e| ServiceError::Internal(e.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::memory_pool;

    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            is_admin: false,
            university: Some("University of Jaffna".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let repo = SqliteUserRepository::new(memory_pool().await);
        let id = repo.create_user(&new_user("spiritx_2025")).await.unwrap();

        let user = repo.get_user(id).await.unwrap().unwrap();
        assert_eq!(user.username, "spiritx_2025");
        assert_eq!(user.budget, INITIAL_BUDGET);
        assert_eq!(user.team_points, 0.0);
        assert_eq!(user.university.as_deref(), Some("University of Jaffna"));

        let by_name = repo
            .get_user_by_username("spiritx_2025")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name, user);
        assert!(repo.get_user(id + 1).await.unwrap().is_none());
        assert!(repo.get_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let repo = SqliteUserRepository::new(memory_pool().await);
        repo.create_user(&new_user("spiritx_2025")).await.unwrap();
        assert!(matches!(
            repo.create_user(&new_user("spiritx_2025")).await,
            Err(ServiceError::NotPossible(_))
        ));
    }

    #[tokio::test]
    async fn test_users_ordered_by_id() {
        let repo = SqliteUserRepository::new(memory_pool().await);
        let b = repo.create_user(&new_user("second_user")).await.unwrap();
        let a = repo.create_user(&new_user("first_user_")).await.unwrap();
        let ids: Vec<UserId> = repo.get_users().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![b, a]);
    }
}
