use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

/// Per-user list of currently-valid refresh token hashes, kept on the user
/// row itself (`refresh_tokens TEXT[]`). Every operation is a single
/// statement, so the list never needs cross-row coordination.
pub struct RefreshTokenStore;

impl RefreshTokenStore {
    /// Append a newly issued refresh token hash to the owner's list.
    pub async fn push(pool: &PgPool, user_id: Uuid, token_hash: &str) -> Result<()> {
        sqlx::query(
            r#"UPDATE "user" SET refresh_tokens = array_append(refresh_tokens, $2) WHERE user_id = $1"#,
        )
        .bind(user_id)
        .bind(token_hash)
        .execute(pool)
        .await
        .context("Failed to store refresh token")?;
        Ok(())
    }

    /// Rotation: swap `old_hash` for `new_hash` in one guarded statement.
    /// Returns false when `old_hash` was not present -- the token was
    /// already consumed or never stored, which the caller must treat as a
    /// replay.
    pub async fn replace(
        pool: &PgPool,
        user_id: Uuid,
        old_hash: &str,
        new_hash: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE "user"
               SET refresh_tokens = array_append(array_remove(refresh_tokens, $2), $3)
               WHERE user_id = $1 AND refresh_tokens @> ARRAY[$2]"#,
        )
        .bind(user_id)
        .bind(old_hash)
        .bind(new_hash)
        .execute(pool)
        .await
        .context("Failed to rotate refresh token")?;
        Ok(result.rows_affected() == 1)
    }

    /// Remove one matching token from the owner's list (logout). Hashes are
    /// unique per mint, so removing by value removes at most one entry.
    pub async fn remove(pool: &PgPool, user_id: Uuid, token_hash: &str) -> Result<()> {
        sqlx::query(
            r#"UPDATE "user" SET refresh_tokens = array_remove(refresh_tokens, $2) WHERE user_id = $1"#,
        )
        .bind(user_id)
        .bind(token_hash)
        .execute(pool)
        .await
        .context("Failed to remove refresh token")?;
        Ok(())
    }

    /// Defensive full revocation: invalidate every refresh token the user
    /// holds. Used when an already-consumed token is presented again.
    pub async fn clear(pool: &PgPool, user_id: Uuid) -> Result<()> {
        sqlx::query(r#"UPDATE "user" SET refresh_tokens = '{}' WHERE user_id = $1"#)
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to clear refresh tokens")?;
        Ok(())
    }

    pub async fn contains(pool: &PgPool, user_id: Uuid, token_hash: &str) -> Result<bool> {
        let present = sqlx::query_scalar::<_, bool>(
            r#"SELECT refresh_tokens @> ARRAY[$2] FROM "user" WHERE user_id = $1"#,
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_optional(pool)
        .await
        .context("Failed to check refresh token")?;
        Ok(present.unwrap_or(false))
    }
}
