//! Plant care reminder bot.
//!
//! A much smaller surface than the diet bot: free text goes through LLM
//! task extraction and straight into the tasks table, and a background
//! poller delivers due reminders.

pub mod extract;
pub mod reminder;
pub mod store;

use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::llm::LlmClient;

const WELCOME: &str = "🌱 Hi! I keep track of your plant care.\n\n\
    Tell me things like \"water the ficus every 3 days\" or \
    \"repot the monstera on 2026-09-15\" and I'll remind you when it's due.";

/// Route one incoming message: `/start` registers the chat, anything else
/// is treated as a care task description.
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    pool: Arc<PgPool>,
    llm: Arc<LlmClient>,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    let trimmed = text.trim();
    if trimmed == "/start" {
        store::register_chat(&pool, chat_id.0).await?;
        bot.send_message(chat_id, WELCOME).await?;
        return Ok(());
    }
    // Other commands are not care tasks; answer with the usage text
    // instead of feeding them to extraction.
    if trimmed.starts_with('/') {
        bot.send_message(chat_id, WELCOME).await?;
        return Ok(());
    }

    let draft = match extract::extract_task(&llm, text).await {
        Ok(draft) => draft,
        Err(e) => {
            warn!(error = %e, "Task extraction failed");
            bot.send_message(
                chat_id,
                "😕 Sorry, I couldn't understand that reminder. Try rephrasing it.",
            )
            .await?;
            return Ok(());
        }
    };

    match store::save_task(&pool, chat_id.0, &draft).await {
        Ok(_) => {
            info!(chat_id = chat_id.0, plant = %draft.plant(), "Plant task saved");
            bot.send_message(
                chat_id,
                format!("✅ Task saved: {} for {}.", draft.task(), draft.plant()),
            )
            .await?;
        }
        Err(e) => {
            warn!(error = %e, "Failed to save plant task");
            bot.send_message(
                chat_id,
                "⚠️ I couldn't save that task. Please try again in a moment.",
            )
            .await?;
        }
    }

    Ok(())
}
