use crate::ai::OpenAiClient;
use crate::config::ServerConfig;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
    /// Present only when the ai config section is set
    pub ai: Option<Arc<OpenAiClient>>,
    /// Outbound client for the Google tokeninfo endpoint
    pub http: reqwest::Client,
}

impl AppState {
    /// Create a new app state
    pub fn new(pool: PgPool, config: ServerConfig) -> Self {
        let ai = config.ai.as_ref().map(|cfg| Arc::new(OpenAiClient::new(cfg)));
        Self {
            pool,
            config: Arc::new(config),
            ai,
            http: reqwest::Client::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AiConfig, DbConfig};

    fn base_config() -> ServerConfig {
        ServerConfig {
            listen: "127.0.0.1:0".to_string(),
            db: DbConfig {
                url: "postgres://invalid:5432/db".to_string(),
            },
            auth: None,
            ai: None,
        }
    }

    #[tokio::test]
    async fn test_ai_client_absent_without_config() {
        let pool = PgPool::connect_lazy("postgres://invalid:5432/db").unwrap();
        let state = AppState::new(pool, base_config());
        assert!(state.ai.is_none());
    }

    #[tokio::test]
    async fn test_ai_client_built_from_config() {
        let pool = PgPool::connect_lazy("postgres://invalid:5432/db").unwrap();
        let mut config = base_config();
        config.ai = Some(AiConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            cron: "0 0 * * *".to_string(),
            bot_username: "reelbot".to_string(),
        });
        let state = AppState::new(pool, config);
        assert!(state.ai.is_some());
    }
}
