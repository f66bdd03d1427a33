//! Entry point for incoming messages.

use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info};

use crate::bot::dialogue_manager;
use crate::bot::ui_builder;
use crate::bot::MSG_GENERIC_FAILURE;
use crate::db;
use crate::dialogue::{DietDialogue, DietState};
use crate::interview::{Interview, MSG_ASK_NAME};
use crate::llm::LlmClient;

const HELP_TEXT: &str = "🤖 I build one-day meal plans for competing athletes.\n\n\
    /start - begin or return to the main menu\n\
    /help - show this message\n\n\
    Answer the interview questions one by one; the buttons below the \
    messages drive everything else.";

/// Route one incoming message: commands first, then free text into the
/// interview state machine.
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: DietDialogue,
    pool: Arc<PgPool>,
    llm: Arc<LlmClient>,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    match text.trim() {
        "/start" => handle_start(&bot, &msg, &dialogue, &pool).await,
        "/help" => {
            bot.send_message(msg.chat.id, HELP_TEXT).await?;
            Ok(())
        }
        input => {
            let state = dialogue.get().await?.unwrap_or_default();
            match state {
                DietState::Start => {
                    bot.send_message(msg.chat.id, "Press /start to begin 🚀")
                        .await?;
                    Ok(())
                }
                state => {
                    dialogue_manager::handle_interview_input(
                        &bot, &msg, &dialogue, &pool, &llm, state, input,
                    )
                    .await
                }
            }
        }
    }
}

/// `/start`: returning athletes land in the main menu, new ones begin the
/// profile interview.
async fn handle_start(
    bot: &Bot,
    msg: &Message,
    dialogue: &DietDialogue,
    pool: &PgPool,
) -> Result<()> {
    let telegram_id = msg
        .from
        .as_ref()
        .map(|user| user.id.0 as i64)
        .unwrap_or(msg.chat.id.0);

    let athlete = match db::get_athlete(pool, telegram_id).await {
        Ok(athlete) => athlete,
        Err(e) => {
            error!(error = %e, "Athlete lookup failed on /start");
            bot.send_message(msg.chat.id, MSG_GENERIC_FAILURE).await?;
            return Ok(());
        }
    };

    match athlete {
        Some(athlete) => {
            info!(telegram_id, "Returning athlete opened the main menu");
            bot.send_message(
                msg.chat.id,
                format!("👋 Welcome back, {}! What would you like to do?", athlete.name),
            )
            .reply_markup(ui_builder::main_menu_keyboard())
            .await?;
            dialogue.update(DietState::MainMenu).await?;
        }
        None => {
            info!(telegram_id, "New athlete, starting the profile interview");
            bot.send_message(
                msg.chat.id,
                "👋 Hi! I'm your nutrition assistant for competition prep.\n\
                 Let's set up your profile first.",
            )
            .await?;
            bot.send_message(msg.chat.id, MSG_ASK_NAME).await?;
            dialogue
                .update(DietState::CollectingName {
                    data: Interview::default(),
                })
                .await?;
        }
    }

    Ok(())
}
