use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{NewUser, User};
use crate::error::AppResult;
use crate::geo::Coordinates;

const USER_COLUMNS: &str = "id, name, email, password_hash, root_latitude, root_longitude, \
                            temp_latitude, temp_longitude, last_updated";

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Insert a registered user. A taken email yields `AppError::EmailTaken`.
    async fn create(&self, new_user: NewUser) -> AppResult<User>;

    /// Overwrite the current location and its timestamp.
    async fn update_temp_location(
        &self,
        id: i64,
        location: Coordinates,
        last_updated: &str,
    ) -> AppResult<()>;

    /// All users with a current location, in storage order.
    async fn list_with_temp_location(&self) -> AppResult<Vec<User>>;
}

/// Postgres-backed repository. Each call checks out its own pooled connection.
#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, root_latitude, root_longitude)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.root.latitude)
        .bind(new_user.root.longitude)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_temp_location(
        &self,
        id: i64,
        location: Coordinates,
        last_updated: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET temp_latitude = $2, temp_longitude = $3, last_updated = $4
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(last_updated)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_with_temp_location(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE temp_latitude IS NOT NULL AND temp_longitude IS NOT NULL
             ORDER BY id
            "#
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
