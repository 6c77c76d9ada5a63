use anyhow::{bail, Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

/// Keeps the denormalized `sender` copies on posts and comments consistent
/// with user identity changes. Posts and comments store the username, not a
/// live join, so a rename or account deletion must rewrite every dependent
/// row.
///
/// Each operation runs in one transaction. The system this replaces wrote
/// the user row and the dependent rows sequentially, so a crash in between
/// could strand content under a username that no longer exists.
pub struct IdentityPropagator;

impl IdentityPropagator {
    /// Rename a user and rewrite `sender` on all of their posts and
    /// comments. When the same profile update also supplied a new picture,
    /// the denormalized copy on every affected post is refreshed as well.
    ///
    /// The caller is responsible for the uniqueness check on the new
    /// username (excluding this user); the unique constraint aborts the
    /// transaction if the check was stale.
    pub async fn rename_user(
        pool: &PgPool,
        user_id: Uuid,
        new_username: &str,
        new_profile_pic: Option<&str>,
    ) -> Result<()> {
        let mut tx = pool.begin().await.context("Failed to begin rename")?;

        let old_username: Option<String> =
            sqlx::query_scalar(r#"SELECT username FROM "user" WHERE user_id = $1 FOR UPDATE"#)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to load user for rename")?;
        let Some(old_username) = old_username else {
            bail!("user {user_id} not found");
        };

        sqlx::query(
            r#"UPDATE "user" SET username = $2, profile_pic = COALESCE($3, profile_pic) WHERE user_id = $1"#,
        )
        .bind(user_id)
        .bind(new_username)
        .bind(new_profile_pic)
        .execute(&mut *tx)
        .await
        .context("Failed to rename user")?;

        sqlx::query(
            "UPDATE post SET sender = $2, profile_pic = COALESCE($3, profile_pic) WHERE sender = $1",
        )
        .bind(&old_username)
        .bind(new_username)
        .bind(new_profile_pic)
        .execute(&mut *tx)
        .await
        .context("Failed to propagate rename to posts")?;

        sqlx::query("UPDATE comment SET sender = $2 WHERE sender = $1")
            .bind(&old_username)
            .bind(new_username)
            .execute(&mut *tx)
            .await
            .context("Failed to propagate rename to comments")?;

        tx.commit().await.context("Failed to commit rename")?;
        Ok(())
    }

    /// Delete a user together with every post and comment they sent, so no
    /// orphaned content referencing the dead identity remains queryable.
    /// Returns false when the user does not exist.
    pub async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<bool> {
        let mut tx = pool.begin().await.context("Failed to begin deletion")?;

        let username: Option<String> =
            sqlx::query_scalar(r#"SELECT username FROM "user" WHERE user_id = $1 FOR UPDATE"#)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to load user for deletion")?;
        let Some(username) = username else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM comment WHERE sender = $1")
            .bind(&username)
            .execute(&mut *tx)
            .await
            .context("Failed to delete user comments")?;

        sqlx::query("DELETE FROM post WHERE sender = $1")
            .bind(&username)
            .execute(&mut *tx)
            .await
            .context("Failed to delete user posts")?;

        sqlx::query(r#"DELETE FROM "user" WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete user")?;

        tx.commit().await.context("Failed to commit deletion")?;
        Ok(true)
    }
}
