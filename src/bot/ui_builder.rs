//! Inline keyboard construction.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::db::PlanSummary;

/// Main menu hub.
pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "🍽 Create meal plan",
            "create_plan",
        )],
        vec![InlineKeyboardButton::callback(
            "📋 Saved plans",
            "saved_plans",
        )],
    ])
}

/// Offered right after the profile chain completes.
pub fn interview_start_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "🏋️ Answer training questions",
            "start_interview",
        )],
        vec![InlineKeyboardButton::callback("⏸ Later", "cancel")],
    ])
}

/// Offered once a freshly generated plan has been saved.
pub fn plan_ready_keyboard(meal_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "📋 View plan",
            format!("view_plan_{meal_id}"),
        )],
        vec![InlineKeyboardButton::callback("🏠 Main menu", "back_to_menu")],
    ])
}

/// Shown under a rendered plan.
pub fn view_plan_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("🏠 Main menu", "back_to_menu")],
        vec![InlineKeyboardButton::callback("✅ Finish", "finish_session")],
    ])
}

/// One button per saved plan, newest first, plus a way back.
pub fn saved_plans_keyboard(plans: &[PlanSummary]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = plans
        .iter()
        .map(|plan| {
            vec![InlineKeyboardButton::callback(
                format!("{} · {} kcal", plan.plan_name, plan.total_calories),
                format!(
                    "saved_{}_{}",
                    plan.plan_date.format("%Y-%m-%d"),
                    plan.plan_name
                ),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        "🏠 Main menu",
        "back_to_menu",
    )]);
    InlineKeyboardMarkup::new(rows)
}
