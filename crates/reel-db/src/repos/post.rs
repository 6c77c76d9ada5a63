use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub post_id: Uuid,
    pub title: Option<String>,
    pub content: String,
    /// Denormalized username copy; rewritten by the identity propagator.
    pub sender: String,
    pub sender_id: Option<Uuid>,
    pub likes: Vec<Uuid>,
    pub image_url: Option<String>,
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
}

const POST_COLUMNS: &str =
    "post_id, title, content, sender, sender_id, likes, image_url, profile_pic, created_at";

pub struct PostRepo;

impl PostRepo {
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        pool: &PgPool,
        post_id: Uuid,
        title: Option<&str>,
        content: &str,
        sender: &str,
        sender_id: Option<Uuid>,
        image_url: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO post (post_id, title, content, sender, sender_id, image_url, profile_pic)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(post_id)
        .bind(title)
        .bind(content)
        .bind(sender)
        .bind(sender_id)
        .bind(image_url)
        .bind(profile_pic)
        .execute(pool)
        .await
        .context("Failed to create post")?;
        Ok(())
    }

    pub async fn get_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<PostRow>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM post WHERE post_id = $1"
        ))
        .bind(post_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post")?;
        Ok(row)
    }

    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<PostRow>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM post ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;
        Ok(rows)
    }

    pub async fn list_by_sender(pool: &PgPool, sender: &str) -> Result<Vec<PostRow>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM post WHERE sender = $1 ORDER BY created_at DESC"
        ))
        .bind(sender)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by sender")?;
        Ok(rows)
    }

    /// Returns false when the post does not exist.
    pub async fn update(
        pool: &PgPool,
        post_id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE post
             SET title = COALESCE($2, title),
                 content = COALESCE($3, content),
                 image_url = COALESCE($4, image_url)
             WHERE post_id = $1",
        )
        .bind(post_id)
        .bind(title)
        .bind(content)
        .bind(image_url)
        .execute(pool)
        .await
        .context("Failed to update post")?;
        Ok(result.rows_affected() == 1)
    }

    /// Add a like with set semantics: the guard keeps a user id from
    /// appearing twice. Returns false when the like was already present (or
    /// the post is gone).
    pub async fn add_like(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE post SET likes = array_append(likes, $2)
             WHERE post_id = $1 AND NOT likes @> ARRAY[$2]",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to add like")?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn remove_like(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE post SET likes = array_remove(likes, $2)
             WHERE post_id = $1 AND likes @> ARRAY[$2]",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to remove like")?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn is_liked(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<Option<bool>> {
        let liked = sqlx::query_scalar::<_, bool>(
            "SELECT likes @> ARRAY[$2] FROM post WHERE post_id = $1",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to check like")?;
        Ok(liked)
    }

    /// Delete a post together with its comments. Comments reference the post
    /// by id without a foreign key, so the cleanup is explicit; one
    /// transaction keeps a crash from stranding orphaned comments.
    pub async fn delete_with_comments(pool: &PgPool, post_id: Uuid) -> Result<bool> {
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query("DELETE FROM comment WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete post comments")?;
        let result = sqlx::query("DELETE FROM post WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete post")?;
        tx.commit().await.context("Failed to commit post deletion")?;
        Ok(result.rows_affected() == 1)
    }
}
