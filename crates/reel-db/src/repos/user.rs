use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub description: String,
    pub profile_pic: Option<String>,
    pub refresh_tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
}

const USER_COLUMNS: &str =
    "user_id, email, username, password_hash, description, profile_pic, refresh_tokens, created_at";

pub struct UserRepo;

impl UserRepo {
    /// `password_hash` is None for accounts without a password (Google-only
    /// logins, the AI bot).
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        email: &str,
        username: &str,
        password_hash: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO "user" (user_id, email, username, password_hash) VALUES ($1, $2, $3, $4)"#,
        )
        .bind(user_id)
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .execute(pool)
        .await
        .context("Failed to create user")?;
        Ok(())
    }

    pub async fn get_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" WHERE user_id = $1"#
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by id")?;
        Ok(row)
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" WHERE email = $1"#
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;
        Ok(row)
    }

    pub async fn get_by_username(pool: &PgPool, username: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" WHERE username = $1"#
        ))
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;
        Ok(row)
    }

    /// Uniqueness check for registration and profile updates. `exclude`
    /// skips the row being updated so a self-match does not count as a
    /// collision.
    pub async fn username_taken(
        pool: &PgPool,
        username: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM "user" WHERE username = $1 AND ($2::uuid IS NULL OR user_id <> $2))"#,
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(pool)
        .await
        .context("Failed to check username uniqueness")?;
        Ok(taken)
    }

    pub async fn email_taken(pool: &PgPool, email: &str, exclude: Option<Uuid>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM "user" WHERE email = $1 AND ($2::uuid IS NULL OR user_id <> $2))"#,
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(pool)
        .await
        .context("Failed to check email uniqueness")?;
        Ok(taken)
    }

    /// Update the non-identity profile fields. A None leaves the column
    /// unchanged; username changes go through `IdentityPropagator` instead.
    pub async fn update_profile(
        pool: &PgPool,
        user_id: Uuid,
        email: Option<&str>,
        description: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE "user"
               SET email = COALESCE($2, email),
                   description = COALESCE($3, description),
                   profile_pic = COALESCE($4, profile_pic)
               WHERE user_id = $1"#,
        )
        .bind(user_id)
        .bind(email)
        .bind(description)
        .bind(profile_pic)
        .execute(pool)
        .await
        .context("Failed to update user profile")?;
        Ok(())
    }

    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" ORDER BY created_at DESC LIMIT $1 OFFSET $2"#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;
        Ok(rows)
    }
}
