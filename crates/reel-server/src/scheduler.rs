use crate::ai::{OpenAiClient, POST_SUBJECTS};
use crate::config::AiConfig;
use crate::state::AppState;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use croner::parser::{CronParser, Seconds};
use croner::Cron;
use rand::seq::SliceRandom;
use reel_db::{PostRepo, UserRepo, UserRow};
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn the AI posting background task.
///
/// Fires on the configured cron schedule, generates a description for a
/// random subject and publishes it under the bot account. Exits immediately
/// when no ai config section is present; shuts down cleanly via
/// CancellationToken.
pub fn start(state: AppState, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_loop(state, cancel).await;
    })
}

async fn run_loop(state: AppState, cancel: CancellationToken) {
    let (ai_config, client) = match (state.config.ai.clone(), state.ai.clone()) {
        (Some(cfg), Some(client)) => (cfg, client),
        _ => {
            tracing::info!("AI posting disabled (no ai config)");
            return;
        }
    };

    let cron = match CronParser::builder()
        .seconds(Seconds::Optional)
        .build()
        .parse(&ai_config.cron)
    {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("AI posting disabled: invalid cron '{}': {}", ai_config.cron, e);
            return;
        }
    };

    tracing::info!("AI post scheduler started (cron '{}')", ai_config.cron);

    loop {
        let now = Utc::now();
        let next = match compute_next_run(&cron, now) {
            Some(n) => n,
            None => {
                tracing::warn!("AI post scheduler found no next occurrence, stopping");
                return;
            }
        };

        let sleep_duration = (next - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(1));

        tracing::debug!("AI post scheduler sleeping for {:?}", sleep_duration);

        tokio::select! {
            _ = tokio::time::sleep(sleep_duration) => {},
            _ = cancel.cancelled() => {
                tracing::info!("AI post scheduler shutting down");
                return;
            }
        }

        if let Err(e) = publish_ai_post(&state.pool, &client, &ai_config).await {
            tracing::error!("Scheduled AI post failed: {:#}", e);
        }
    }
}

/// Compute the next fire time for the schedule.
fn compute_next_run(cron: &Cron, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match cron.find_next_occurrence(&now, false) {
        Ok(next) => Some(next),
        Err(e) => {
            tracing::warn!("Failed to compute next occurrence: {:#}", e);
            None
        }
    }
}

async fn publish_ai_post(pool: &PgPool, client: &OpenAiClient, cfg: &AiConfig) -> Result<()> {
    let bot = ensure_bot_user(pool, &cfg.bot_username).await?;
    let subject = pick_subject();
    let content = client.post_description(subject).await?;

    PostRepo::create(
        pool,
        uuid::Uuid::new_v4(),
        Some(subject),
        &content,
        &bot.username,
        Some(bot.user_id),
        None,
        bot.profile_pic.as_deref(),
    )
    .await?;

    tracing::info!("Published AI post about '{}'", subject);
    Ok(())
}

/// The bot account is a regular passwordless user, created lazily so the
/// sender invariant on posts holds for generated content too.
async fn ensure_bot_user(pool: &PgPool, username: &str) -> Result<UserRow> {
    if let Some(user) = UserRepo::get_by_username(pool, username).await? {
        return Ok(user);
    }

    let email = format!("{}@bot.reel.invalid", username);
    UserRepo::create(pool, uuid::Uuid::new_v4(), &email, username, None).await?;
    UserRepo::get_by_username(pool, username)
        .await?
        .context("Bot user missing after creation")
}

fn pick_subject() -> &'static str {
    POST_SUBJECTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Inception")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbConfig, ServerConfig};

    #[test]
    fn test_cron_parse_standard() {
        // 5-field: daily at midnight (the default schedule)
        let cron = CronParser::builder()
            .seconds(Seconds::Optional)
            .build()
            .parse("0 0 * * *");
        assert!(cron.is_ok());
    }

    #[test]
    fn test_cron_parse_with_seconds() {
        let cron = CronParser::builder()
            .seconds(Seconds::Optional)
            .build()
            .parse("*/10 * * * * *");
        assert!(cron.is_ok());
    }

    #[test]
    fn test_cron_invalid_expression() {
        let cron: Result<Cron, _> = "not a cron".parse();
        assert!(cron.is_err());
    }

    #[test]
    fn test_compute_next_run_finds_future_time() {
        let cron: Cron = "* * * * *".parse().unwrap();
        let now = Utc::now();
        let next = compute_next_run(&cron, now);
        assert!(next.is_some());
        assert!(next.unwrap() > now);
    }

    #[test]
    fn test_pick_subject_from_list() {
        for _ in 0..20 {
            assert!(POST_SUBJECTS.contains(&pick_subject()));
        }
    }

    #[tokio::test]
    async fn test_scheduler_exits_without_ai_config() {
        let config = ServerConfig {
            listen: "127.0.0.1:0".to_string(),
            db: DbConfig {
                url: "postgres://invalid:5432/db".to_string(),
            },
            auth: None,
            ai: None,
        };
        // The pool is never used: the loop exits before any query
        let pool = sqlx::PgPool::connect_lazy("postgres://invalid:5432/db").unwrap();
        let state = AppState::new(pool, config);

        let cancel = CancellationToken::new();
        let handle = start(state, cancel);

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        assert!(result.is_ok(), "Scheduler should exit without ai config");
    }

    #[tokio::test]
    async fn test_scheduler_cancellation() {
        use crate::config::AiConfig;

        let config = ServerConfig {
            listen: "127.0.0.1:0".to_string(),
            db: DbConfig {
                url: "postgres://invalid:5432/db".to_string(),
            },
            auth: None,
            ai: Some(AiConfig {
                api_key: "sk-test".to_string(),
                model: "gpt-4o-mini".to_string(),
                // Far enough out that the loop is guaranteed to be sleeping
                cron: "0 0 1 1 *".to_string(),
                bot_username: "reelbot".to_string(),
            }),
        };
        let pool = sqlx::PgPool::connect_lazy("postgres://invalid:5432/db").unwrap();
        let state = AppState::new(pool, config);

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let handle = start(state, cancel);

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            cancel_clone.cancel();
        });

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        assert!(
            result.is_ok(),
            "Scheduler should have stopped after cancellation"
        );
    }
}
