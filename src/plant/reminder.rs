//! Background poller that delivers due reminders once a minute.

use anyhow::Result;
use sqlx::PgPool;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::{debug, error, info, warn};

use crate::plant::store::{self, DueTask};

const POLL_INTERVAL: Duration = Duration::from_secs(60);
const ERROR_BACKOFF: Duration = Duration::from_secs(30);

/// Delivery seam, so the notification pass is testable without Telegram.
pub trait Notifier {
    async fn notify(&self, chat_id: i64, text: &str) -> Result<()>;
}

impl Notifier for Bot {
    async fn notify(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }
}

pub fn reminder_text(task: &DueTask) -> String {
    format!("🔔 Reminder: {} for {}", task.task_name, task.plant_name)
}

/// Send one reminder per due task. A failed delivery is logged and the
/// pass moves on to the next task.
pub async fn notify_due<N: Notifier>(notifier: &N, tasks: &[DueTask]) {
    for task in tasks {
        if let Err(e) = notifier.notify(task.chat_id, &reminder_text(task)).await {
            warn!(chat_id = task.chat_id, error = %e, "Reminder delivery failed");
        }
    }
}

/// Poll loop: query due tasks every minute and notify their chats.
/// Never returns; a failed cycle backs off and the loop continues.
pub async fn run(bot: Bot, pool: PgPool) {
    info!("Reminder poller started");

    loop {
        match store::due_tasks(&pool).await {
            Ok(tasks) => {
                if !tasks.is_empty() {
                    debug!(count = tasks.len(), "Delivering due reminders");
                }
                notify_due(&bot, &tasks).await;
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(e) => {
                error!(error = %e, "Reminder cycle failed, backing off");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_text() {
        let task = DueTask {
            chat_id: 1,
            plant_name: "ficus".to_string(),
            task_name: "water".to_string(),
        };
        assert_eq!(reminder_text(&task), "🔔 Reminder: water for ficus");
    }
}
