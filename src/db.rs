//! Persistence adapter for the diet bot.
//!
//! Parameterized queries against Postgres through a shared `sqlx` pool.
//! Multi-row writes (a full meal plan) run inside one transaction so a
//! failure partway through never leaves partial rows. `with_retry` is the
//! opt-in wrapper for transient connection errors.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::interview::Interview;
use crate::plan::MealPlan;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Athlete profile as stored.
#[derive(Debug, Clone, FromRow)]
pub struct Athlete {
    pub athlete_id: i64,
    pub telegram_id: i64,
    pub name: String,
    pub gender: String,
    pub height: f64,
    pub current_weight: f64,
    pub target_weight: f64,
    pub competition_date: NaiveDate,
}

/// One saved plan in the saved-plans listing, aggregated per
/// (date, name) key.
#[derive(Debug, Clone, FromRow)]
pub struct PlanSummary {
    pub plan_date: NaiveDate,
    pub plan_name: String,
    pub total_calories: i64,
}

/// One meal row of a saved plan.
#[derive(Debug, Clone, FromRow)]
pub struct MealRow {
    pub meal_type: String,
    pub calories: i32,
    pub proteins: f64,
    pub fats: f64,
    pub carbs: f64,
    pub description: String,
}

/// Open a bounded connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .context("Failed to connect to the database")
}

/// Create the diet bot tables if they don't exist yet.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS athletes (
            athlete_id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            gender TEXT NOT NULL,
            height DOUBLE PRECISION NOT NULL,
            current_weight DOUBLE PRECISION NOT NULL,
            target_weight DOUBLE PRECISION NOT NULL,
            competition_date DATE NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create athletes table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS workouts (
            workout_id BIGSERIAL PRIMARY KEY,
            athlete_id BIGINT NOT NULL REFERENCES athletes(athlete_id),
            sessions_per_week INT NOT NULL,
            exercises TEXT NOT NULL,
            equipment_weight DOUBLE PRECISION NOT NULL,
            reps INT NOT NULL,
            sets INT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create workouts table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS activities (
            activity_id BIGSERIAL PRIMARY KEY,
            athlete_id BIGINT NOT NULL REFERENCES athletes(athlete_id),
            steps_per_day BIGINT NOT NULL,
            work_type TEXT NOT NULL,
            additional_activity TEXT,
            activity_hours DOUBLE PRECISION NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create activities table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS meal_plans (
            meal_id BIGSERIAL PRIMARY KEY,
            athlete_id BIGINT NOT NULL REFERENCES athletes(athlete_id),
            meal_type TEXT NOT NULL,
            calories INT NOT NULL,
            proteins DOUBLE PRECISION NOT NULL,
            fats DOUBLE PRECISION NOT NULL,
            carbs DOUBLE PRECISION NOT NULL,
            description TEXT NOT NULL,
            plan_date DATE NOT NULL,
            plan_name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (athlete_id, plan_date, plan_name, meal_type)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create meal_plans table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// True for errors worth a reconnect-and-retry; query/data errors are not.
fn is_transient(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

/// Run `op` up to 3 times with a fixed delay, retrying only transient
/// connection errors. The pool re-establishes connections between attempts.
pub async fn with_retry<T, F, Fut>(op: F) -> Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) && attempt < MAX_RETRIES => {
                warn!(attempt, error = %e, "Transient database error, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub async fn get_athlete(pool: &PgPool, telegram_id: i64) -> Result<Option<Athlete>> {
    let athlete = with_retry(|| {
        sqlx::query_as::<_, Athlete>(
            "SELECT athlete_id, telegram_id, name, gender, height,
                    current_weight, target_weight, competition_date
             FROM athletes WHERE telegram_id = $1",
        )
        .bind(telegram_id)
        .fetch_optional(pool)
    })
    .await
    .context("Failed to read athlete")?;

    Ok(athlete)
}

pub async fn athlete_id_for(pool: &PgPool, telegram_id: i64) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT athlete_id FROM athletes WHERE telegram_id = $1",
    )
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to look up athlete id")?;

    Ok(id)
}

/// Create the athlete record from a completed profile chain.
///
/// Missing fields are a data-integrity error and abort this operation only.
pub async fn create_athlete(pool: &PgPool, telegram_id: i64, data: &Interview) -> Result<i64> {
    info!(telegram_id, "Creating athlete profile");

    let name = data.name.as_deref().context("profile is missing a name")?;
    let gender = data.gender.context("profile is missing a gender")?;
    let height = data.height.context("profile is missing a height")?;
    let current_weight = data
        .current_weight
        .context("profile is missing a current weight")?;
    let target_weight = data
        .target_weight
        .context("profile is missing a target weight")?;
    let competition_date = data
        .competition_date
        .context("profile is missing a competition date")?;

    let athlete_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO athletes (
            telegram_id, name, gender, height, current_weight,
            target_weight, competition_date
         ) VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (telegram_id) DO UPDATE SET
            name = EXCLUDED.name,
            gender = EXCLUDED.gender,
            height = EXCLUDED.height,
            current_weight = EXCLUDED.current_weight,
            target_weight = EXCLUDED.target_weight,
            competition_date = EXCLUDED.competition_date
         RETURNING athlete_id",
    )
    .bind(telegram_id)
    .bind(name)
    .bind(gender.as_db())
    .bind(height)
    .bind(current_weight)
    .bind(target_weight)
    .bind(competition_date)
    .fetch_one(pool)
    .await
    .context("Failed to insert athlete")?;

    info!(athlete_id, "Athlete profile created");
    Ok(athlete_id)
}

pub async fn save_workout(pool: &PgPool, athlete_id: i64, data: &Interview) -> Result<i64> {
    info!(athlete_id, "Saving workout record");

    let workout_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO workouts (
            athlete_id, sessions_per_week, exercises, equipment_weight, reps, sets
         ) VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING workout_id",
    )
    .bind(athlete_id)
    .bind(data.sessions_per_week.context("workout is missing sessions")?)
    .bind(data.exercises.as_deref().context("workout is missing exercises")?)
    .bind(
        data.equipment_weight
            .context("workout is missing equipment weight")?,
    )
    .bind(data.reps.context("workout is missing reps")?)
    .bind(data.sets.context("workout is missing sets")?)
    .fetch_one(pool)
    .await
    .context("Failed to insert workout")?;

    info!(workout_id, "Workout record saved");
    Ok(workout_id)
}

pub async fn save_activity(pool: &PgPool, athlete_id: i64, data: &Interview) -> Result<i64> {
    info!(athlete_id, "Saving activity record");

    let activity_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO activities (
            athlete_id, steps_per_day, work_type, additional_activity, activity_hours
         ) VALUES ($1, $2, $3, $4, $5)
         RETURNING activity_id",
    )
    .bind(athlete_id)
    .bind(data.steps_per_day.context("activity is missing steps")?)
    .bind(data.work_type.as_deref().context("activity is missing work type")?)
    .bind(data.extra_activity.as_deref())
    .bind(data.activity_hours.context("activity is missing hours")?)
    .fetch_one(pool)
    .await
    .context("Failed to insert activity")?;

    info!(activity_id, "Activity record saved");
    Ok(activity_id)
}

/// Persist a meal plan atomically under its (athlete, date, name) key.
///
/// Any prior rows for the same key are removed in the same transaction, so
/// saving twice leaves exactly one set of meal rows. Returns the first
/// inserted meal id.
pub async fn save_meal_plan(
    pool: &PgPool,
    athlete_id: i64,
    plan: &MealPlan,
    plan_date: NaiveDate,
    plan_name: &str,
) -> Result<i64> {
    info!(athlete_id, %plan_date, plan_name, "Saving meal plan");
    anyhow::ensure!(!plan.meals.is_empty(), "meal plan contains no meals");

    let mut tx = pool.begin().await.context("Failed to open transaction")?;

    sqlx::query(
        "DELETE FROM meal_plans
         WHERE athlete_id = $1 AND plan_date = $2 AND plan_name = $3",
    )
    .bind(athlete_id)
    .bind(plan_date)
    .bind(plan_name)
    .execute(&mut *tx)
    .await
    .context("Failed to delete previous plan rows")?;

    let mut first_meal_id = None;
    for meal in &plan.meals {
        let meal_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO meal_plans (
                athlete_id, meal_type, calories, proteins, fats, carbs,
                description, plan_date, plan_name
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING meal_id",
        )
        .bind(athlete_id)
        .bind(&meal.meal_type)
        .bind(meal.calories)
        .bind(meal.proteins)
        .bind(meal.fats)
        .bind(meal.carbs)
        .bind(&meal.description)
        .bind(plan_date)
        .bind(plan_name)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert meal '{}'", meal.meal_type))?;

        first_meal_id.get_or_insert(meal_id);
    }

    tx.commit().await.context("Failed to commit meal plan")?;

    let meal_id = first_meal_id.context("meal plan contains no meals")?;
    info!(meal_id, "Meal plan saved");
    Ok(meal_id)
}

/// List an athlete's saved plans, newest first, one entry per
/// (date, name) key.
pub async fn get_athlete_plans(
    pool: &PgPool,
    telegram_id: i64,
    limit: i64,
) -> Result<Vec<PlanSummary>> {
    let plans = sqlx::query_as::<_, PlanSummary>(
        "SELECT mp.plan_date, mp.plan_name, SUM(mp.calories)::BIGINT AS total_calories
         FROM meal_plans mp
         JOIN athletes a ON mp.athlete_id = a.athlete_id
         WHERE a.telegram_id = $1
         GROUP BY mp.plan_date, mp.plan_name
         ORDER BY mp.plan_date DESC, mp.plan_name
         LIMIT $2",
    )
    .bind(telegram_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list saved plans")?;

    Ok(plans)
}

/// Meal rows for one plan key, in insertion order
/// (breakfast, lunch, dinner).
pub async fn get_meals_for_plan(
    pool: &PgPool,
    athlete_id: i64,
    plan_date: NaiveDate,
    plan_name: &str,
) -> Result<Vec<MealRow>> {
    let meals = sqlx::query_as::<_, MealRow>(
        "SELECT meal_type, calories, proteins, fats, carbs, description
         FROM meal_plans
         WHERE athlete_id = $1 AND plan_date = $2 AND plan_name = $3
         ORDER BY meal_id",
    )
    .bind(athlete_id)
    .bind(plan_date)
    .bind(plan_name)
    .fetch_all(pool)
    .await
    .context("Failed to read plan meals")?;

    Ok(meals)
}

/// Resolve a meal row id back to its plan key.
pub async fn get_plan_key(pool: &PgPool, meal_id: i64) -> Result<Option<(NaiveDate, String)>> {
    let key = sqlx::query_as::<_, (NaiveDate, String)>(
        "SELECT plan_date, plan_name FROM meal_plans WHERE meal_id = $1",
    )
    .bind(meal_id)
    .fetch_optional(pool)
    .await
    .context("Failed to resolve plan key")?;

    Ok(key)
}
