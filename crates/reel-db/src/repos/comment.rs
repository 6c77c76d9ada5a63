use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub comment_id: Uuid,
    /// Reference by id; the post's existence is checked at creation time,
    /// not enforced by the schema.
    pub post_id: Uuid,
    pub sender: String,
    pub sender_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

const COMMENT_COLUMNS: &str = "comment_id, post_id, sender, sender_id, content, created_at";

pub struct CommentRepo;

impl CommentRepo {
    pub async fn create(
        pool: &PgPool,
        comment_id: Uuid,
        post_id: Uuid,
        sender: &str,
        sender_id: Option<Uuid>,
        content: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO comment (comment_id, post_id, sender, sender_id, content)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(comment_id)
        .bind(post_id)
        .bind(sender)
        .bind(sender_id)
        .bind(content)
        .execute(pool)
        .await
        .context("Failed to create comment")?;
        Ok(())
    }

    pub async fn get_by_id(pool: &PgPool, comment_id: Uuid) -> Result<Option<CommentRow>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comment WHERE comment_id = $1"
        ))
        .bind(comment_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;
        Ok(row)
    }

    pub async fn list_by_post(pool: &PgPool, post_id: Uuid) -> Result<Vec<CommentRow>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comment WHERE post_id = $1 ORDER BY created_at"
        ))
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments by post")?;
        Ok(rows)
    }

    pub async fn list_by_sender(pool: &PgPool, sender: &str) -> Result<Vec<CommentRow>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comment WHERE sender = $1 ORDER BY created_at"
        ))
        .bind(sender)
        .fetch_all(pool)
        .await
        .context("Failed to list comments by sender")?;
        Ok(rows)
    }

    /// Returns false when the comment does not exist.
    pub async fn update(pool: &PgPool, comment_id: Uuid, content: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE comment SET content = $2 WHERE comment_id = $1")
            .bind(comment_id)
            .bind(content)
            .execute(pool)
            .await
            .context("Failed to update comment")?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(pool: &PgPool, comment_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comment WHERE comment_id = $1")
            .bind(comment_id)
            .execute(pool)
            .await
            .context("Failed to delete comment")?;
        Ok(result.rows_affected() == 1)
    }
}
