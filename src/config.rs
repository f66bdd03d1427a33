//! Application configuration loaded from environment variables.

use anyhow::{Context, Result};
use std::env;

use crate::llm::LlmConfig;

/// Runtime configuration shared by both bot binaries.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from the environment (after `dotenv` has run).
    ///
    /// `TELEGRAM_BOT_TOKEN`, `DATABASE_URL` and `DEEPSEEK_API_KEY` are
    /// required; the remaining LLM settings have sensible defaults.
    pub fn from_env() -> Result<Self> {
        let bot_token =
            env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN must be set")?;
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let api_key = env::var("DEEPSEEK_API_KEY").context("DEEPSEEK_API_KEY must be set")?;

        let base_url = env::var("DEEPSEEK_BASE_URL")
            .unwrap_or_else(|_| "https://api.deepseek.com".to_string());
        let model = env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string());
        let temperature = env::var("DEEPSEEK_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.7);
        let max_tokens = env::var("DEEPSEEK_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4000);

        Ok(Self {
            bot_token,
            database_url,
            llm: LlmConfig {
                api_key,
                base_url,
                model,
                temperature,
                max_tokens,
            },
        })
    }
}
