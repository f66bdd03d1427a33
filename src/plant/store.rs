//! Persistence for the plant bot: registered chats and their care tasks.

use anyhow::{Context, Result};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::info;

use crate::plant::extract::TaskDraft;

/// Create the plant bot tables if they don't exist yet.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing plant bot schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS plant_users (
            chat_id BIGINT PRIMARY KEY,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create plant_users table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS plant_tasks (
            task_id BIGSERIAL PRIMARY KEY,
            chat_id BIGINT NOT NULL REFERENCES plant_users(chat_id),
            plant_name TEXT NOT NULL,
            task_name TEXT NOT NULL,
            due_date DATE,
            frequency_days INT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create plant_tasks table")?;

    info!("Plant bot schema initialized");
    Ok(())
}

/// Register a chat; re-registering is a no-op.
pub async fn register_chat(pool: &PgPool, chat_id: i64) -> Result<()> {
    sqlx::query("INSERT INTO plant_users (chat_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(chat_id)
        .execute(pool)
        .await
        .context("Failed to register chat")?;
    Ok(())
}

/// Persist a task, registering the chat on the fly so a task sent before
/// `/start` never trips the chat foreign key.
pub async fn save_task(pool: &PgPool, chat_id: i64, draft: &TaskDraft) -> Result<i64> {
    register_chat(pool, chat_id).await?;
    create_task(pool, chat_id, draft).await
}

pub async fn create_task(pool: &PgPool, chat_id: i64, draft: &TaskDraft) -> Result<i64> {
    let task_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO plant_tasks (chat_id, plant_name, task_name, due_date, frequency_days)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING task_id",
    )
    .bind(chat_id)
    .bind(draft.plant())
    .bind(draft.task())
    .bind(draft.due())
    .bind(draft.frequency_days)
    .fetch_one(pool)
    .await
    .context("Failed to insert plant task")?;

    info!(task_id, chat_id, "Plant task created");
    Ok(task_id)
}

/// A task whose reminder should fire.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DueTask {
    pub chat_id: i64,
    pub plant_name: String,
    pub task_name: String,
}

/// All tasks due today or earlier. Tasks without a due date never fire.
pub async fn due_tasks(pool: &PgPool) -> Result<Vec<DueTask>> {
    let tasks = sqlx::query_as::<_, DueTask>(
        "SELECT chat_id, plant_name, task_name
         FROM plant_tasks
         WHERE due_date IS NOT NULL AND due_date <= CURRENT_DATE
         ORDER BY task_id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to read due tasks")?;

    Ok(tasks)
}
