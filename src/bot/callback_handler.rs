//! Inline-button dispatch for the menu and plan review flows.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::{error, info, warn};

use crate::bot::ui_builder;
use crate::bot::MSG_GENERIC_FAILURE;
use crate::db;
use crate::dialogue::{DietDialogue, DietState};
use crate::interview::Interview;
use crate::llm::LlmClient;
use crate::plan;

/// Route one callback query by its data payload.
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: DietDialogue,
    pool: Arc<PgPool>,
    llm: Arc<LlmClient>,
) -> Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        return Ok(());
    };
    let telegram_id = q.from.id.0 as i64;

    info!(telegram_id, data, "Callback received");

    match data {
        "create_plan" | "start_interview" => {
            start_training_interview(&bot, chat_id, &dialogue, &pool, &llm, telegram_id).await
        }
        "saved_plans" => show_saved_plans(&bot, chat_id, &dialogue, &pool, telegram_id).await,
        "back_to_menu" => {
            bot.send_message(chat_id, "🏠 Main menu. What would you like to do?")
                .reply_markup(ui_builder::main_menu_keyboard())
                .await?;
            dialogue.update(DietState::MainMenu).await?;
            Ok(())
        }
        "cancel" => {
            bot.send_message(
                chat_id,
                "❌ Okay, stopping here. Your unsaved answers were discarded.",
            )
            .reply_markup(ui_builder::main_menu_keyboard())
            .await?;
            dialogue.update(DietState::MainMenu).await?;
            Ok(())
        }
        "finish_session" => {
            bot.send_message(
                chat_id,
                "👋 Good luck with your prep! Press /start anytime to come back.",
            )
            .await?;
            dialogue.exit().await?;
            Ok(())
        }
        other if other.starts_with("view_plan_") => {
            show_plan_by_meal_id(&bot, chat_id, &dialogue, &pool, telegram_id, other).await
        }
        other if other.starts_with("saved_") => {
            show_saved_plan(&bot, chat_id, &dialogue, &pool, telegram_id, other).await
        }
        other => {
            warn!(data = other, "Unknown callback payload, ignoring");
            Ok(())
        }
    }
}

/// Kick off the training sub-chain; the opening question is LLM-phrased
/// with a fixed fallback.
async fn start_training_interview(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &DietDialogue,
    pool: &PgPool,
    llm: &LlmClient,
    telegram_id: i64,
) -> Result<()> {
    match db::get_athlete(pool, telegram_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            bot.send_message(
                chat_id,
                "⚠️ I need your profile first. Press /start to set it up.",
            )
            .await?;
            dialogue.update(DietState::Start).await?;
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, "Athlete lookup failed before the training interview");
            bot.send_message(chat_id, MSG_GENERIC_FAILURE).await?;
            return Ok(());
        }
    }

    let question = llm.training_question().await;
    bot.send_message(chat_id, question).await?;
    dialogue
        .update(DietState::TrainingSessions {
            data: Interview::default(),
        })
        .await?;
    Ok(())
}

async fn show_saved_plans(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &DietDialogue,
    pool: &PgPool,
    telegram_id: i64,
) -> Result<()> {
    let plans = match db::get_athlete_plans(pool, telegram_id, 10).await {
        Ok(plans) => plans,
        Err(e) => {
            error!(error = %e, "Saved-plan listing failed");
            bot.send_message(chat_id, MSG_GENERIC_FAILURE).await?;
            return Ok(());
        }
    };

    if plans.is_empty() {
        bot.send_message(chat_id, "📭 You have no saved plans yet.")
            .reply_markup(ui_builder::main_menu_keyboard())
            .await?;
        dialogue.update(DietState::MainMenu).await?;
    } else {
        bot.send_message(chat_id, "📋 Your saved plans:")
            .reply_markup(ui_builder::saved_plans_keyboard(&plans))
            .await?;
        dialogue.update(DietState::ViewingSavedPlans).await?;
    }

    Ok(())
}

/// `view_plan_{meal_id}`: resolve the meal row back to its plan key and
/// render the full plan.
async fn show_plan_by_meal_id(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &DietDialogue,
    pool: &PgPool,
    telegram_id: i64,
    data: &str,
) -> Result<()> {
    let meal_id = data
        .trim_start_matches("view_plan_")
        .parse::<i64>()
        .unwrap_or(0);

    let key = match db::get_plan_key(pool, meal_id).await {
        Ok(key) => key,
        Err(e) => {
            error!(error = %e, meal_id, "Plan key lookup failed");
            bot.send_message(chat_id, MSG_GENERIC_FAILURE).await?;
            return Ok(());
        }
    };
    let Some((plan_date, plan_name)) = key else {
        warn!(meal_id, "Callback references a missing plan");
        bot.send_message(chat_id, "⚠️ That plan isn't available anymore.")
            .reply_markup(ui_builder::main_menu_keyboard())
            .await?;
        dialogue.update(DietState::MainMenu).await?;
        return Ok(());
    };

    render_plan(bot, chat_id, dialogue, pool, telegram_id, plan_date, &plan_name).await
}

/// `saved_{date}_{name}`: the plan key is carried in the payload itself.
async fn show_saved_plan(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &DietDialogue,
    pool: &PgPool,
    telegram_id: i64,
    data: &str,
) -> Result<()> {
    let rest = data.trim_start_matches("saved_");
    let Some((date_str, plan_name)) = rest.split_once('_') else {
        warn!(data, "Malformed saved-plan payload");
        return Ok(());
    };
    let Ok(plan_date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
        warn!(data, "Malformed date in saved-plan payload");
        return Ok(());
    };

    render_plan(bot, chat_id, dialogue, pool, telegram_id, plan_date, plan_name).await
}

async fn render_plan(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &DietDialogue,
    pool: &PgPool,
    telegram_id: i64,
    plan_date: NaiveDate,
    plan_name: &str,
) -> Result<()> {
    let athlete_id = match db::athlete_id_for(pool, telegram_id).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            bot.send_message(chat_id, "⚠️ I couldn't find your profile. Press /start.")
                .await?;
            dialogue.update(DietState::Start).await?;
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, "Athlete lookup failed while rendering a plan");
            bot.send_message(chat_id, MSG_GENERIC_FAILURE).await?;
            return Ok(());
        }
    };

    let meals = match db::get_meals_for_plan(pool, athlete_id, plan_date, plan_name).await {
        Ok(meals) => meals,
        Err(e) => {
            error!(error = %e, "Plan read failed");
            bot.send_message(chat_id, MSG_GENERIC_FAILURE).await?;
            return Ok(());
        }
    };
    if meals.is_empty() {
        bot.send_message(chat_id, "⚠️ That plan isn't available anymore.")
            .reply_markup(ui_builder::main_menu_keyboard())
            .await?;
        dialogue.update(DietState::MainMenu).await?;
        return Ok(());
    }

    bot.send_message(chat_id, plan::format_plan(plan_name, &meals))
        .reply_markup(ui_builder::view_plan_keyboard())
        .await?;
    dialogue.update(DietState::ViewingPlan).await?;
    Ok(())
}
