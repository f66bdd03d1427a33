//! LLM extraction of a structured care task from free text.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::llm::{extract_json, LlmClient, LlmError, REQUEST_TIMEOUT};

const SYSTEM_PROMPT: &str =
    "You extract structured plant care tasks from short user messages. \
     Reply with ONLY a JSON object, no extra text.";

/// Task fields as the LLM reports them. Everything is optional; accessors
/// substitute defaults so a sparse extraction still produces a usable task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskDraft {
    pub plant_name: Option<String>,
    pub task_name: Option<String>,
    pub due_date: Option<String>,
    pub frequency_days: Option<i32>,
}

impl TaskDraft {
    pub fn plant(&self) -> &str {
        self.plant_name.as_deref().unwrap_or("Unnamed Plant")
    }

    pub fn task(&self) -> &str {
        self.task_name.as_deref().unwrap_or("Plant Task")
    }

    /// The due date, if the LLM produced a well-formed one.
    pub fn due(&self) -> Option<NaiveDate> {
        self.due_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

fn build_prompt(text: &str, today: NaiveDate) -> String {
    format!(
        r#"Today is {today}. Extract a plant care task from this message:

"{text}"

JSON structure (use null for anything the message doesn't say):
{{
    "plant_name": "ficus",
    "task_name": "water",
    "due_date": "2026-09-01",
    "frequency_days": 3
}}

Rules:
- "due_date" must be YYYY-MM-DD or null.
- "frequency_days" is the repeat interval in days, or null for one-off tasks.
- Resolve relative dates ("tomorrow", "in two days") against today's date."#
    )
}

/// Extract a task from one message. No fallback here: if the LLM is down
/// or returns garbage the caller tells the user to rephrase.
pub async fn extract_task(llm: &LlmClient, text: &str) -> Result<TaskDraft, LlmError> {
    let today = chrono::Utc::now().date_naive();
    let response = llm
        .complete(SYSTEM_PROMPT, &build_prompt(text, today), REQUEST_TIMEOUT)
        .await?;

    let candidate = extract_json(&response);
    serde_json::from_str(&candidate).map_err(|e| LlmError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_defaults() {
        let draft = TaskDraft::default();
        assert_eq!(draft.plant(), "Unnamed Plant");
        assert_eq!(draft.task(), "Plant Task");
        assert!(draft.due().is_none());
    }

    #[test]
    fn test_draft_parses_well_formed_date() {
        let draft = TaskDraft {
            due_date: Some("2026-09-15".to_string()),
            ..TaskDraft::default()
        };
        assert_eq!(draft.due(), NaiveDate::from_ymd_opt(2026, 9, 15));
    }

    #[test]
    fn test_draft_ignores_malformed_date() {
        let draft = TaskDraft {
            due_date: Some("next Tuesday".to_string()),
            ..TaskDraft::default()
        };
        assert!(draft.due().is_none());
    }

    #[test]
    fn test_sparse_json_deserializes() {
        let draft: TaskDraft = serde_json::from_str(r#"{"plant_name": "ficus"}"#).unwrap();
        assert_eq!(draft.plant(), "ficus");
        assert_eq!(draft.task(), "Plant Task");
    }

    #[test]
    fn test_prompt_embeds_message_and_today() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let prompt = build_prompt("water the ficus", today);
        assert!(prompt.contains("water the ficus"));
        assert!(prompt.contains("2026-08-29"));
    }
}
