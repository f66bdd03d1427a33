//! Diet bot entry point: interview → meal plan → saved plans.

use anyhow::Result;
use dietbot::bot;
use dietbot::config::Config;
use dietbot::db;
use dietbot::dialogue::DietState;
use dietbot::llm::LlmClient;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
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
    db::init_schema(&pool).await?;

    let llm = LlmClient::new(config.llm.clone())?;
    let bot = Bot::new(&config.bot_token);

    info!("Starting the diet bot...");

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<DietState>, DietState>()
                .endpoint(bot::message_handler),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<DietState>, DietState>()
                .endpoint(bot::callback_handler),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![
            InMemStorage::<DietState>::new(),
            Arc::new(pool),
            Arc::new(llm)
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
