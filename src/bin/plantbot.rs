//! Plant bot entry point: task capture plus the reminder poller.

use anyhow::Result;
use dietbot::config::Config;
use dietbot::db;
use dietbot::llm::LlmClient;
use dietbot::plant;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url).await?;
    plant::store::init_schema(&pool).await?;

    let llm = LlmClient::new(config.llm.clone())?;
    let bot = Bot::new(&config.bot_token);

    info!("Starting the plant bot...");

    tokio::spawn(plant::reminder::run(bot.clone(), pool.clone()));

    let handler = Update::filter_message().endpoint(plant::message_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::new(pool), Arc::new(llm)])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
