//! Executes interview transitions and their persistence effects.
//!
//! The state machine itself is pure; this module runs one `advance` step,
//! sends its reply, performs the requested database work and stores the
//! resulting state. Workout and activity persistence failures are logged
//! but never interrupt the conversation; only a failed profile save or a
//! failed plan save is surfaced to the athlete.

use anyhow::Result;
use chrono::{Days, Utc};
use sqlx::PgPool;
use teloxide::prelude::*;
use tracing::{error, info, warn};

use crate::bot::ui_builder;
use crate::db;
use crate::dialogue::{DietDialogue, DietState};
use crate::interview::{self, Effect, Interview};
use crate::llm::LlmClient;
use crate::plan;

/// Dispatch one free-text input against the interview state machine and
/// carry out whatever the transition asks for.
pub async fn handle_interview_input(
    bot: &Bot,
    msg: &Message,
    dialogue: &DietDialogue,
    pool: &PgPool,
    llm: &LlmClient,
    state: DietState,
    input: &str,
) -> Result<()> {
    let today = Utc::now().date_naive();
    let step = interview::advance(state, input, today);

    match step.effect {
        None => {
            bot.send_message(msg.chat.id, step.reply).await?;
            dialogue.update(step.next).await?;
        }
        Some(Effect::SaveProfile(data)) => {
            save_profile(bot, msg, dialogue, pool, &step.reply, data).await?;
        }
        Some(Effect::SaveWorkout(data)) => {
            save_workout(pool, telegram_id(msg), &data).await;
            bot.send_message(msg.chat.id, step.reply).await?;
            // The activity sub-chain opens with an LLM-phrased question,
            // fixed fallback on any error.
            bot.send_message(msg.chat.id, llm.activity_question().await).await?;
            dialogue.update(step.next).await?;
        }
        Some(Effect::SaveActivityAndGeneratePlan(data)) => {
            bot.send_message(msg.chat.id, step.reply).await?;
            save_activity_and_generate(bot, msg, dialogue, pool, llm, data).await?;
        }
    }

    Ok(())
}

fn telegram_id(msg: &Message) -> i64 {
    msg.from
        .as_ref()
        .map(|user| user.id.0 as i64)
        .unwrap_or(msg.chat.id.0)
}

async fn save_profile(
    bot: &Bot,
    msg: &Message,
    dialogue: &DietDialogue,
    pool: &PgPool,
    reply: &str,
    data: Interview,
) -> Result<()> {
    match db::create_athlete(pool, telegram_id(msg), &data).await {
        Ok(athlete_id) => {
            info!(athlete_id, "Profile chain complete");
            bot.send_message(msg.chat.id, reply)
                .reply_markup(ui_builder::interview_start_keyboard())
                .await?;
            dialogue.update(DietState::MainMenu).await?;
        }
        Err(e) => {
            error!(error = %e, "Failed to save athlete profile");
            bot.send_message(
                msg.chat.id,
                "⚠️ Something went wrong saving your data. Press /start to try again.",
            )
            .await?;
            dialogue.update(DietState::Start).await?;
        }
    }

    Ok(())
}

/// Workout persistence is best-effort: the interview continues either way.
async fn save_workout(pool: &PgPool, telegram_id: i64, data: &Interview) {
    let athlete_id = match db::athlete_id_for(pool, telegram_id).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            warn!(telegram_id, "No athlete profile for workout, skipping save");
            return;
        }
        Err(e) => {
            warn!(error = %e, "Athlete lookup failed, skipping workout save");
            return;
        }
    };

    if let Err(e) = db::save_workout(pool, athlete_id, data).await {
        warn!(error = %e, "Failed to save workout, continuing the interview");
    }
}

/// Final interview step: persist the activity record, generate tomorrow's
/// plan (with fallback) and store it. Only the plan save can fail the flow.
async fn save_activity_and_generate(
    bot: &Bot,
    msg: &Message,
    dialogue: &DietDialogue,
    pool: &PgPool,
    llm: &LlmClient,
    data: Interview,
) -> Result<()> {
    let telegram_id = telegram_id(msg);

    let athlete = match db::get_athlete(pool, telegram_id).await {
        Ok(Some(athlete)) => athlete,
        Ok(None) => {
            warn!(telegram_id, "No athlete profile at plan generation time");
            bot.send_message(
                msg.chat.id,
                "⚠️ I couldn't find your profile. Press /start to set it up again.",
            )
            .await?;
            dialogue.update(DietState::Start).await?;
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, "Athlete lookup failed before plan generation");
            bot.send_message(
                msg.chat.id,
                "⚠️ Something went wrong. Please try again from the menu.",
            )
            .reply_markup(ui_builder::main_menu_keyboard())
            .await?;
            dialogue.update(DietState::MainMenu).await?;
            return Ok(());
        }
    };

    if let Err(e) = db::save_activity(pool, athlete.athlete_id, &data).await {
        warn!(error = %e, "Failed to save activity, continuing to plan generation");
    }

    bot.send_message(msg.chat.id, "🧑‍🍳 Working on your meal plan, one moment...")
        .await?;

    let plan = plan::generate(llm, &athlete).await;
    let plan_date = Utc::now().date_naive() + Days::new(1);
    let plan_name = plan::plan_name_for(plan_date);

    match db::save_meal_plan(pool, athlete.athlete_id, &plan, plan_date, &plan_name).await {
        Ok(meal_id) => {
            bot.send_message(msg.chat.id, "🎉 Your meal plan for tomorrow is ready!")
                .reply_markup(ui_builder::plan_ready_keyboard(meal_id))
                .await?;
            dialogue.update(DietState::ViewingPlan).await?;
        }
        Err(e) => {
            error!(error = %e, "Failed to persist meal plan");
            bot.send_message(
                msg.chat.id,
                "⚠️ I couldn't save your plan. Please try again from the menu.",
            )
            .reply_markup(ui_builder::main_menu_keyboard())
            .await?;
            dialogue.update(DietState::MainMenu).await?;
        }
    }

    Ok(())
}
