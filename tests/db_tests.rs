//! Database integration tests.
//!
//! Run with `TEST_DATABASE_URL` pointing at a scratch Postgres instance:
//! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::NaiveDate;
use dietbot::db;
use dietbot::interview::{Gender, Interview};
use dietbot::plan::{Meal, MealPlan};
use dietbot::plant::extract::TaskDraft;
use dietbot::plant::store;
use sqlx::PgPool;

async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for database tests");
    let pool = db::connect(&url).await.expect("failed to connect");
    db::init_schema(&pool).await.expect("failed to init schema");
    pool
}

fn profile() -> Interview {
    Interview {
        name: Some("Ivan".to_string()),
        competition_date: NaiveDate::from_ymd_opt(2026, 10, 15),
        gender: Some(Gender::Male),
        height: Some(180.0),
        current_weight: Some(70.0),
        target_weight: Some(67.0),
        ..Interview::default()
    }
}

fn two_meal_plan() -> MealPlan {
    let meal = |meal_type: &str, calories: i32| Meal {
        meal_type: meal_type.to_string(),
        calories,
        proteins: 50.0,
        fats: 15.0,
        carbs: 55.0,
        description: format!("test {meal_type}"),
    };
    MealPlan {
        total_calories: 1100,
        total_proteins: 100.0,
        total_fats: 30.0,
        total_carbs: 110.0,
        meals: vec![meal("breakfast", 600), meal("dinner", 500)],
    }
}

#[tokio::test]
#[ignore]
async fn athlete_upsert_roundtrip() {
    let pool = test_pool().await;
    let telegram_id = 910_001;

    let id_one = db::create_athlete(&pool, telegram_id, &profile())
        .await
        .expect("first insert failed");

    let mut updated = profile();
    updated.current_weight = Some(69.5);
    let id_two = db::create_athlete(&pool, telegram_id, &updated)
        .await
        .expect("upsert failed");

    assert_eq!(id_one, id_two);

    let athlete = db::get_athlete(&pool, telegram_id)
        .await
        .expect("read failed")
        .expect("athlete missing");
    assert_eq!(athlete.name, "Ivan");
    assert_eq!(athlete.current_weight, 69.5);
}

#[tokio::test]
#[ignore]
async fn saving_a_plan_twice_replaces_it() {
    let pool = test_pool().await;
    let telegram_id = 910_002;

    let athlete_id = db::create_athlete(&pool, telegram_id, &profile())
        .await
        .expect("insert failed");

    let plan = two_meal_plan();
    let plan_date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
    let plan_name = "Plan for 30.08.2026";

    db::save_meal_plan(&pool, athlete_id, &plan, plan_date, plan_name)
        .await
        .expect("first save failed");
    db::save_meal_plan(&pool, athlete_id, &plan, plan_date, plan_name)
        .await
        .expect("second save failed");

    let meals = db::get_meals_for_plan(&pool, athlete_id, plan_date, plan_name)
        .await
        .expect("read failed");
    assert_eq!(meals.len(), 2);
    assert_eq!(meals[0].meal_type, "breakfast");
    assert_eq!(meals[1].meal_type, "dinner");
}

#[tokio::test]
#[ignore]
async fn plan_listing_aggregates_per_key() {
    let pool = test_pool().await;
    let telegram_id = 910_003;

    let athlete_id = db::create_athlete(&pool, telegram_id, &profile())
        .await
        .expect("insert failed");

    let plan = two_meal_plan();
    let plan_date = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
    let plan_name = "Plan for 31.08.2026";
    let meal_id = db::save_meal_plan(&pool, athlete_id, &plan, plan_date, plan_name)
        .await
        .expect("save failed");

    let plans = db::get_athlete_plans(&pool, telegram_id, 10)
        .await
        .expect("listing failed");
    let entry = plans
        .iter()
        .find(|p| p.plan_name == plan_name)
        .expect("plan missing from listing");
    assert_eq!(entry.total_calories, 1100);

    let key = db::get_plan_key(&pool, meal_id)
        .await
        .expect("key lookup failed")
        .expect("key missing");
    assert_eq!(key, (plan_date, plan_name.to_string()));
}

#[tokio::test]
#[ignore]
async fn task_for_an_unregistered_chat_is_saved() {
    let pool = test_pool().await;
    store::init_schema(&pool).await.expect("failed to init plant schema");

    // No register_chat call beforehand: the chat row must be created
    // on the fly.
    let draft = TaskDraft {
        plant_name: Some("ficus".to_string()),
        task_name: Some("water".to_string()),
        due_date: Some("2026-09-01".to_string()),
        frequency_days: None,
    };
    let task_id = store::save_task(&pool, 910_004, &draft)
        .await
        .expect("save for a fresh chat failed");
    assert!(task_id > 0);
}
