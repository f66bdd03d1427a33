//! Meal plan synthesis pipeline.
//!
//! Prompt build → LLM call → parse → persist, with a deterministic fallback
//! plan so plan generation never hard-fails once a profile exists. Only the
//! persistence step can surface an error to the user.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::db::Athlete;
use crate::interview::Gender;
use crate::llm::{extract_json, LlmClient, LlmError, PLAN_TIMEOUT};

const SYSTEM_PROMPT: &str =
    "You are a professional dietitian specializing in sports nutrition. Create a detailed \
     one-day meal plan for an athlete based on their data.";

/// One meal of a generated plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub meal_type: String,
    pub calories: i32,
    pub proteins: f64,
    pub fats: f64,
    pub carbs: f64,
    pub description: String,
}

/// A one-day meal plan, either LLM-generated or computed as a fallback.
///
/// `plan_date` inside the LLM payload is ignored; the pipeline always
/// attaches the next calendar day when persisting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub total_calories: i32,
    pub total_proteins: f64,
    pub total_fats: f64,
    pub total_carbs: f64,
    pub meals: Vec<Meal>,
}

/// Human-readable name a plan is stored and listed under.
pub fn plan_name_for(plan_date: NaiveDate) -> String {
    format!("Plan for {}", plan_date.format("%d.%m.%Y"))
}

/// Prompt requesting a single day's plan as JSON with a fixed schema.
pub fn build_prompt(athlete: &Athlete) -> String {
    format!(
        r#"Create a detailed one-day meal plan for an athlete with the following data:

Athlete data:
- Sex: {gender}
- Height: {height} cm
- Current weight: {current_weight} kg
- Target weight: {target_weight} kg
- Competition date: {competition_date}

PLAN REQUIREMENTS:
1. The plan covers ONE day (tomorrow).
2. Exactly 3 meals: breakfast, lunch, dinner.
3. For every meal give a detailed description (foods and amounts),
   calories (kcal), proteins (g), fats (g) and carbs (g).
4. Total daily calories must match the athlete's goal.
5. Macro balance: proteins 30-40%, fats 20-30%, carbs 30-50%.
6. Account for the difference between current and target weight.
7. Keep the plan varied and balanced.

IMPORTANT: Reply with ONLY a JSON object, no extra text.

JSON structure:
{{
    "total_calories": 2500,
    "total_proteins": 180.0,
    "total_fats": 70.0,
    "total_carbs": 250.0,
    "meals": [
        {{
            "meal_type": "breakfast",
            "calories": 600,
            "proteins": 40.0,
            "fats": 20.0,
            "carbs": 70.0,
            "description": "Oatmeal with berries and nuts, two boiled eggs"
        }},
        {{
            "meal_type": "lunch",
            "calories": 800,
            "proteins": 60.0,
            "fats": 30.0,
            "carbs": 80.0,
            "description": "Buckwheat with grilled chicken breast, vegetable salad"
        }},
        {{
            "meal_type": "dinner",
            "calories": 600,
            "proteins": 50.0,
            "fats": 20.0,
            "carbs": 60.0,
            "description": "Cottage cheese with walnuts, a glass of kefir"
        }}
    ]
}}"#,
        gender = athlete.gender,
        height = athlete.height,
        current_weight = athlete.current_weight,
        target_weight = athlete.target_weight,
        competition_date = athlete.competition_date,
    )
}

/// Parse the LLM response into a plan, requiring at least one meal.
pub fn parse_plan(text: &str) -> Result<MealPlan, LlmError> {
    let candidate = extract_json(text);
    let plan: MealPlan =
        serde_json::from_str(&candidate).map_err(|e| LlmError::Parse(e.to_string()))?;
    if plan.meals.is_empty() {
        return Err(LlmError::Parse("plan contains no meals".to_string()));
    }
    Ok(plan)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Deterministic plan used whenever generation or parsing fails.
///
/// Base calories by sex (2500 M / 2000 F), adjusted 100 kcal per kg of
/// weight difference (deficit when cutting, surplus when gaining). Meals
/// split 30/40/30 with dinner taking the rounding remainder, so the daily
/// total always equals the sum of the meals. Macros: 35% protein-by-calories
/// /4, 25% fat /9, 40% carb /4.
pub fn fallback_plan(gender: Gender, current_weight: f64, target_weight: f64) -> MealPlan {
    let base = match gender {
        Gender::Male => 2500.0,
        Gender::Female => 2000.0,
    };
    let base = base - (current_weight - target_weight) * 100.0;

    let total_calories = base.round() as i32;
    let breakfast_cal = (base * 0.3).round() as i32;
    let lunch_cal = (base * 0.4).round() as i32;
    let dinner_cal = total_calories - breakfast_cal - lunch_cal;

    let meal = |meal_type: &str, calories: i32, description: &str| Meal {
        meal_type: meal_type.to_string(),
        calories,
        proteins: round1(f64::from(calories) * 0.35 / 4.0),
        fats: round1(f64::from(calories) * 0.25 / 9.0),
        carbs: round1(f64::from(calories) * 0.4 / 4.0),
        description: description.to_string(),
    };

    MealPlan {
        total_calories,
        total_proteins: round1(base * 0.35 / 4.0),
        total_fats: round1(base * 0.25 / 9.0),
        total_carbs: round1(base * 0.4 / 4.0),
        meals: vec![
            meal(
                "breakfast",
                breakfast_cal,
                "Oatmeal with berries and nuts, two boiled eggs",
            ),
            meal(
                "lunch",
                lunch_cal,
                "Buckwheat with grilled chicken breast, vegetable salad",
            ),
            meal(
                "dinner",
                dinner_cal,
                "Cottage cheese with walnuts, a glass of kefir",
            ),
        ],
    }
}

fn fallback_for(athlete: &Athlete) -> MealPlan {
    let gender = Gender::from_db(&athlete.gender).unwrap_or(Gender::Male);
    fallback_plan(gender, athlete.current_weight, athlete.target_weight)
}

/// Generate a plan for the athlete. Never fails: LLM errors and unparseable
/// responses degrade to the deterministic fallback.
pub async fn generate(llm: &LlmClient, athlete: &Athlete) -> MealPlan {
    let prompt = build_prompt(athlete);

    let response = match llm.complete(SYSTEM_PROMPT, &prompt, PLAN_TIMEOUT).await {
        Ok(text) => text,
        Err(e) => {
            match &e {
                LlmError::InvalidApiKey => error!("Plan generation failed: invalid API key"),
                LlmError::RateLimited => error!("Plan generation failed: rate limited"),
                LlmError::Upstream(status) => {
                    error!(status, "Plan generation failed: upstream error")
                }
                other => error!(error = %other, "Plan generation failed"),
            }
            info!("Using fallback meal plan");
            return fallback_for(athlete);
        }
    };

    match parse_plan(&response) {
        Ok(plan) => {
            info!("LLM meal plan parsed successfully");
            plan
        }
        Err(e) => {
            warn!(error = %e, "Could not parse LLM meal plan, using fallback");
            fallback_for(athlete)
        }
    }
}

/// Render a stored plan for the chat, with per-day totals.
pub fn format_plan(plan_name: &str, meals: &[crate::db::MealRow]) -> String {
    let mut text = format!("📋 {plan_name}:\n\n");

    let mut total_calories = 0i64;
    let mut total_proteins = 0.0;
    let mut total_fats = 0.0;
    let mut total_carbs = 0.0;

    for meal in meals {
        text.push_str(&format!(
            "🍽 {}: {}\n   📊 {} kcal (P:{}g, F:{}g, C:{}g)\n\n",
            capitalize(&meal.meal_type),
            meal.description,
            meal.calories,
            meal.proteins,
            meal.fats,
            meal.carbs
        ));
        total_calories += i64::from(meal.calories);
        total_proteins += meal.proteins;
        total_fats += meal.fats;
        total_carbs += meal.carbs;
    }

    text.push_str(&format!(
        "📈 Daily total: {total_calories} kcal (P:{total_proteins:.1}g, F:{total_fats:.1}g, C:{total_carbs:.1}g)"
    ));
    text
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_base_calories_for_cutting_male() {
        let plan = fallback_plan(Gender::Male, 70.0, 65.0);
        assert_eq!(plan.total_calories, 2000);
    }

    #[test]
    fn test_fallback_surplus_when_gaining() {
        let plan = fallback_plan(Gender::Male, 65.0, 70.0);
        assert_eq!(plan.total_calories, 3000);
    }

    #[test]
    fn test_fallback_female_baseline() {
        let plan = fallback_plan(Gender::Female, 60.0, 60.0);
        assert_eq!(plan.total_calories, 2000);
    }

    #[test]
    fn test_fallback_calories_sum_exactly() {
        // Fractional weight difference exercises the rounding remainder.
        let plan = fallback_plan(Gender::Male, 82.3, 79.1);
        let meal_sum: i32 = plan.meals.iter().map(|m| m.calories).sum();
        assert_eq!(plan.total_calories, meal_sum);
        assert_eq!(plan.meals.len(), 3);
    }

    #[test]
    fn test_fallback_macros_sum_within_tolerance() {
        let plan = fallback_plan(Gender::Female, 58.4, 55.7);
        let proteins: f64 = plan.meals.iter().map(|m| m.proteins).sum();
        let fats: f64 = plan.meals.iter().map(|m| m.fats).sum();
        let carbs: f64 = plan.meals.iter().map(|m| m.carbs).sum();
        assert!((plan.total_proteins - proteins).abs() < 0.3);
        assert!((plan.total_fats - fats).abs() < 0.3);
        assert!((plan.total_carbs - carbs).abs() < 0.3);
    }

    #[test]
    fn test_parse_plan_from_fenced_response() {
        let response = r#"Here you go:
```json
{
  "total_calories": 2100,
  "total_proteins": 180.0,
  "total_fats": 58.0,
  "total_carbs": 210.0,
  "meals": [
    {"meal_type": "breakfast", "calories": 630, "proteins": 54.0,
     "fats": 17.0, "carbs": 63.0, "description": "Oatmeal"}
  ]
}
```"#;
        let plan = parse_plan(response).unwrap();
        assert_eq!(plan.total_calories, 2100);
        assert_eq!(plan.meals[0].meal_type, "breakfast");
    }

    #[test]
    fn test_parse_plan_rejects_prose() {
        assert!(parse_plan("I cannot produce a plan right now.").is_err());
    }

    #[test]
    fn test_parse_plan_rejects_empty_meals() {
        let response = r#"{"total_calories": 2000, "total_proteins": 1.0,
            "total_fats": 1.0, "total_carbs": 1.0, "meals": []}"#;
        assert!(parse_plan(response).is_err());
    }

    #[test]
    fn test_plan_name_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert_eq!(plan_name_for(date), "Plan for 30.08.2026");
    }

    #[test]
    fn test_prompt_embeds_profile_fields() {
        let athlete = Athlete {
            athlete_id: 1,
            telegram_id: 42,
            name: "Anna".to_string(),
            gender: "F".to_string(),
            height: 172.0,
            current_weight: 63.0,
            target_weight: 61.0,
            competition_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        };
        let prompt = build_prompt(&athlete);
        assert!(prompt.contains("172"));
        assert!(prompt.contains("63"));
        assert!(prompt.contains("61"));
        assert!(prompt.contains("2026-10-01"));
        assert!(prompt.contains("breakfast"));
    }
}
