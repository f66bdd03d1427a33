//! The athlete interview state machine.
//!
//! `advance` is a single pure dispatch: given the current dialogue state and
//! one free-text input it produces the reply, the next state and an optional
//! side effect for the transport layer to execute. Invalid input re-prompts
//! in place. This keeps the whole chain auditable and testable without
//! spinning up the messaging transport.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dialogue::DietState;

/// Normalized biological sex category used for calorie baselines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Single-letter form stored in the database.
    pub fn as_db(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Data accumulated over one interview session. Fields fill in as the
/// chain advances; nothing is persisted until a sub-chain completes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub name: Option<String>,
    pub competition_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub height: Option<f64>,
    pub current_weight: Option<f64>,
    pub target_weight: Option<f64>,

    pub sessions_per_week: Option<i32>,
    pub exercises: Option<String>,
    pub equipment_weight: Option<f64>,
    pub reps: Option<i32>,
    pub sets: Option<i32>,

    pub steps_per_day: Option<i64>,
    pub work_type: Option<String>,
    pub extra_activity: Option<String>,
    pub activity_hours: Option<f64>,
}

/// Side effect requested by a completed transition, executed by the
/// transport layer against the persistence adapter.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Profile chain complete: create the athlete record.
    SaveProfile(Interview),
    /// Training sub-chain complete: persist the workout record.
    SaveWorkout(Interview),
    /// Activity sub-chain complete: persist the activity record, then
    /// run meal plan generation.
    SaveActivityAndGeneratePlan(Interview),
}

/// Outcome of one dispatch step.
#[derive(Clone, Debug)]
pub struct Step {
    pub reply: String,
    pub next: DietState,
    pub effect: Option<Effect>,
}

impl Step {
    fn stay(reply: impl Into<String>, state: DietState) -> Self {
        Self {
            reply: reply.into(),
            next: state,
            effect: None,
        }
    }

    fn advance(reply: impl Into<String>, next: DietState) -> Self {
        Self {
            reply: reply.into(),
            next,
            effect: None,
        }
    }
}

pub const MSG_ASK_NAME: &str = "👤 What's your name?";
pub const MSG_ASK_DATE: &str = "📅 When is your competition? (DD.MM.YYYY)";
pub const MSG_ASK_GENDER: &str = "👫 What's your biological sex? (M/F)";
pub const MSG_ASK_HEIGHT: &str = "📏 How tall are you (in cm)?";
pub const MSG_ASK_CURRENT_WEIGHT: &str = "⚖️ What's your current weight (in kg)?";
pub const MSG_ASK_TARGET_WEIGHT: &str = "🎯 What's your target weight (in kg)?";
pub const MSG_PROFILE_SAVED: &str =
    "✅ Parameters saved! Next up: a few questions about your training 🏋️";
pub const MSG_ASK_EXERCISES: &str = "🏋️ Which exercises do you do in your sessions?";
pub const MSG_ASK_EQUIPMENT_WEIGHT: &str = "⚖️ What equipment weight do you use (in kg)?";
pub const MSG_ASK_REPS: &str = "🔄 How many reps per set (enter a number)?";
pub const MSG_ASK_SETS: &str = "🔄 How many sets do you do (enter a number)?";
pub const MSG_TRAINING_SAVED: &str =
    "✅ Training data saved! Now a few questions about your daily activity.";
pub const MSG_ASK_WORK_TYPE: &str = "💼 What kind of work do you do (desk job, on your feet)?";
pub const MSG_ASK_EXTRA_ACTIVITY: &str =
    "🏊 Any additional activity - swimming, running, cycling (one answer)?";
pub const MSG_ASK_ACTIVITY_HOURS: &str =
    "⏰ How many hours per week does that activity take (enter a number)?";
pub const MSG_ALL_SAVED: &str = "✅ All data saved! Generating your meal plan 🍽️";
pub const MSG_USE_MENU: &str = "Use the buttons below to pick an action 🏠";

/// Parse a decimal number, accepting a comma as the decimal separator.
pub fn parse_number(input: &str) -> Option<f64> {
    input.trim().replace(',', ".").parse::<f64>().ok()
}

/// A display name needs at least two characters after trimming.
pub fn validate_name(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.chars().count() >= 2 {
        Some(trimmed.to_string())
    } else {
        None
    }
}

pub fn parse_competition_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%d.%m.%Y").ok()
}

/// The competition must be at least a week away.
pub fn competition_date_ok(date: NaiveDate, today: NaiveDate) -> bool {
    date >= today + Days::new(7)
}

pub fn parse_gender(input: &str) -> Option<Gender> {
    match input.trim().to_lowercase().as_str() {
        "m" | "male" | "м" | "муж" => Some(Gender::Male),
        "f" | "female" | "ж" | "жен" => Some(Gender::Female),
        _ => None,
    }
}

pub fn height_ok(height: f64) -> bool {
    (100.0..=250.0).contains(&height)
}

pub fn weight_ok(weight: f64) -> bool {
    (30.0..=200.0).contains(&weight)
}

/// Target and current weight may differ by at most 5% of the current weight.
pub fn weight_difference_ok(current: f64, target: f64) -> bool {
    if current <= 0.0 || target <= 0.0 {
        return false;
    }
    (current - target).abs() / current <= 0.05
}

/// Dispatch one free-text input against the current state.
///
/// `today` is passed in so date validation stays deterministic under test.
pub fn advance(state: DietState, input: &str, today: NaiveDate) -> Step {
    match state {
        DietState::CollectingName { mut data } => match validate_name(input) {
            Some(name) => {
                data.name = Some(name);
                Step::advance(MSG_ASK_DATE, DietState::CollectingCompetitionDate { data })
            }
            None => Step::stay(
                "❌ Your name must be at least 2 characters long. Please enter your name:",
                DietState::CollectingName { data },
            ),
        },

        DietState::CollectingCompetitionDate { mut data } => {
            match parse_competition_date(input) {
                Some(date) if competition_date_ok(date, today) => {
                    data.competition_date = Some(date);
                    Step::advance(MSG_ASK_GENDER, DietState::CollectingGender { data })
                }
                Some(_) => Step::stay(
                    "❌ The competition must be at least a week away.\n\
                     💡 Consider targeting the next event instead!\n\n\
                     Please enter another date:",
                    DietState::CollectingCompetitionDate { data },
                ),
                None => Step::stay(
                    "❌ That doesn't look like a date. Please use the DD.MM.YYYY format:",
                    DietState::CollectingCompetitionDate { data },
                ),
            }
        }

        DietState::CollectingGender { mut data } => match parse_gender(input) {
            Some(gender) => {
                data.gender = Some(gender);
                Step::advance(MSG_ASK_HEIGHT, DietState::CollectingHeight { data })
            }
            None => Step::stay(
                "❌ Please answer M or F:",
                DietState::CollectingGender { data },
            ),
        },

        DietState::CollectingHeight { mut data } => match parse_number(input) {
            Some(height) if height_ok(height) => {
                data.height = Some(height);
                Step::advance(
                    MSG_ASK_CURRENT_WEIGHT,
                    DietState::CollectingCurrentWeight { data },
                )
            }
            Some(_) => Step::stay(
                "❌ Height must be between 100 and 250 cm. Please check your input:",
                DietState::CollectingHeight { data },
            ),
            None => Step::stay(
                "❌ That doesn't look like a number. Please enter your height in cm:",
                DietState::CollectingHeight { data },
            ),
        },

        DietState::CollectingCurrentWeight { mut data } => match parse_number(input) {
            Some(weight) if weight_ok(weight) => {
                data.current_weight = Some(weight);
                Step::advance(
                    MSG_ASK_TARGET_WEIGHT,
                    DietState::CollectingTargetWeight { data },
                )
            }
            Some(_) => Step::stay(
                "❌ Weight must be between 30 and 200 kg. Please check your input:",
                DietState::CollectingCurrentWeight { data },
            ),
            None => Step::stay(
                "❌ That doesn't look like a number. Please enter your weight in kg:",
                DietState::CollectingCurrentWeight { data },
            ),
        },

        DietState::CollectingTargetWeight { mut data } => match parse_number(input) {
            Some(target) if weight_ok(target) => {
                let current = data.current_weight.unwrap_or_default();
                if weight_difference_ok(current, target) {
                    data.target_weight = Some(target);
                    Step {
                        reply: MSG_PROFILE_SAVED.to_string(),
                        next: DietState::MainMenu,
                        effect: Some(Effect::SaveProfile(data)),
                    }
                } else {
                    Step::stay(
                        "❌ The difference between current and target weight must stay \
                         within 5%.\nPlease enter a realistic target weight:",
                        DietState::CollectingTargetWeight { data },
                    )
                }
            }
            Some(_) => Step::stay(
                "❌ Weight must be between 30 and 200 kg. Please check your input:",
                DietState::CollectingTargetWeight { data },
            ),
            None => Step::stay(
                "❌ That doesn't look like a number. Please enter your weight in kg:",
                DietState::CollectingTargetWeight { data },
            ),
        },

        DietState::TrainingSessions { mut data } => match input.trim().parse::<i32>() {
            Ok(sessions) if (1..=14).contains(&sessions) => {
                data.sessions_per_week = Some(sessions);
                Step::advance(MSG_ASK_EXERCISES, DietState::TrainingExercises { data })
            }
            Ok(_) => Step::stay(
                "❌ Training sessions must be between 1 and 14 per week. \
                 Please enter a valid number:",
                DietState::TrainingSessions { data },
            ),
            Err(_) => Step::stay(
                "❌ That doesn't look like a number. Please enter your weekly session count:",
                DietState::TrainingSessions { data },
            ),
        },

        DietState::TrainingExercises { mut data } => {
            data.exercises = Some(input.trim().to_string());
            Step::advance(MSG_ASK_EQUIPMENT_WEIGHT, DietState::TrainingWeight { data })
        }

        DietState::TrainingWeight { mut data } => match parse_number(input) {
            Some(weight) if weight > 0.0 => {
                data.equipment_weight = Some(weight);
                Step::advance(MSG_ASK_REPS, DietState::TrainingReps { data })
            }
            Some(_) => Step::stay(
                "❌ Equipment weight must be a positive number. Please enter a valid value:",
                DietState::TrainingWeight { data },
            ),
            None => Step::stay(
                "❌ That doesn't look like a number. Please enter the weight in kg:",
                DietState::TrainingWeight { data },
            ),
        },

        DietState::TrainingReps { mut data } => match input.trim().parse::<i32>() {
            Ok(reps) if reps > 0 => {
                data.reps = Some(reps);
                Step::advance(MSG_ASK_SETS, DietState::TrainingSets { data })
            }
            Ok(_) => Step::stay(
                "❌ Reps must be a positive number. Please enter a valid value:",
                DietState::TrainingReps { data },
            ),
            Err(_) => Step::stay(
                "❌ That doesn't look like a number. Please enter your rep count:",
                DietState::TrainingReps { data },
            ),
        },

        DietState::TrainingSets { mut data } => match input.trim().parse::<i32>() {
            Ok(sets) if sets > 0 => {
                data.sets = Some(sets);
                Step {
                    reply: MSG_TRAINING_SAVED.to_string(),
                    next: DietState::ActivitySteps { data: data.clone() },
                    effect: Some(Effect::SaveWorkout(data)),
                }
            }
            Ok(_) => Step::stay(
                "❌ Sets must be a positive number. Please enter a valid value:",
                DietState::TrainingSets { data },
            ),
            Err(_) => Step::stay(
                "❌ That doesn't look like a number. Please enter your set count:",
                DietState::TrainingSets { data },
            ),
        },

        DietState::ActivitySteps { mut data } => match input.trim().parse::<i64>() {
            Ok(steps) if steps >= 0 => {
                data.steps_per_day = Some(steps);
                Step::advance(MSG_ASK_WORK_TYPE, DietState::ActivityWorkType { data })
            }
            Ok(_) => Step::stay(
                "❌ Steps can't be negative. Please enter a valid value:",
                DietState::ActivitySteps { data },
            ),
            Err(_) => Step::stay(
                "❌ That doesn't look like a number. Please enter your daily step count:",
                DietState::ActivitySteps { data },
            ),
        },

        DietState::ActivityWorkType { mut data } => {
            data.work_type = Some(input.trim().to_string());
            Step::advance(MSG_ASK_EXTRA_ACTIVITY, DietState::ActivityExtra { data })
        }

        DietState::ActivityExtra { mut data } => {
            data.extra_activity = Some(input.trim().to_string());
            Step::advance(MSG_ASK_ACTIVITY_HOURS, DietState::ActivityHours { data })
        }

        DietState::ActivityHours { mut data } => match parse_number(input) {
            Some(hours) if hours >= 0.0 => {
                data.activity_hours = Some(hours);
                Step {
                    reply: MSG_ALL_SAVED.to_string(),
                    // The transport decides the final state once plan
                    // generation and persistence have run.
                    next: DietState::MainMenu,
                    effect: Some(Effect::SaveActivityAndGeneratePlan(data)),
                }
            }
            Some(_) => Step::stay(
                "❌ Activity hours can't be negative. Please enter a valid value:",
                DietState::ActivityHours { data },
            ),
            None => Step::stay(
                "❌ That doesn't look like a number. Please enter the weekly hours:",
                DietState::ActivityHours { data },
            ),
        },

        // Non-collecting states: text input is answered with a menu hint.
        other => Step::stay(MSG_USE_MENU, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 29).unwrap()
    }

    #[test]
    fn test_name_validation() {
        assert_eq!(validate_name("  Anna  ").as_deref(), Some("Anna"));
        assert!(validate_name("A").is_none());
        assert!(validate_name("   ").is_none());
    }

    #[test]
    fn test_competition_date_boundary() {
        let base = today();
        assert!(!competition_date_ok(base + Days::new(6), base));
        assert!(competition_date_ok(base + Days::new(7), base));
    }

    #[test]
    fn test_weight_difference_boundary() {
        assert!(weight_difference_ok(100.0, 95.0));
        assert!(!weight_difference_ok(100.0, 94.9));
        assert!(weight_difference_ok(100.0, 105.0));
        assert!(!weight_difference_ok(0.0, 50.0));
    }

    #[test]
    fn test_gender_tokens() {
        assert_eq!(parse_gender("M"), Some(Gender::Male));
        assert_eq!(parse_gender("male"), Some(Gender::Male));
        assert_eq!(parse_gender(" F "), Some(Gender::Female));
        assert_eq!(parse_gender("Female"), Some(Gender::Female));
        assert_eq!(parse_gender("x"), None);
    }

    #[test]
    fn test_comma_decimal_separator() {
        assert_eq!(parse_number("72,5"), Some(72.5));
        assert_eq!(parse_number(" 180.5 "), Some(180.5));
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_invalid_input_keeps_state_and_data() {
        let data = Interview {
            name: Some("Anna".to_string()),
            ..Interview::default()
        };
        let step = advance(
            DietState::CollectingHeight { data: data.clone() },
            "three hundred",
            today(),
        );
        assert!(step.effect.is_none());
        match step.next {
            DietState::CollectingHeight { data: kept } => assert_eq!(kept, data),
            other => panic!("expected to stay in CollectingHeight, got {other:?}"),
        }
    }

    #[test]
    fn test_training_sets_completion_saves_workout() {
        let data = Interview {
            sessions_per_week: Some(4),
            exercises: Some("squats, bench press".to_string()),
            equipment_weight: Some(60.0),
            reps: Some(8),
            ..Interview::default()
        };
        let step = advance(DietState::TrainingSets { data }, "5", today());
        match step.effect {
            Some(Effect::SaveWorkout(saved)) => assert_eq!(saved.sets, Some(5)),
            other => panic!("expected SaveWorkout, got {other:?}"),
        }
        assert!(matches!(step.next, DietState::ActivitySteps { .. }));
    }

    #[test]
    fn test_activity_hours_completion_triggers_generation() {
        let data = Interview {
            steps_per_day: Some(8000),
            work_type: Some("desk job".to_string()),
            extra_activity: Some("swimming".to_string()),
            ..Interview::default()
        };
        let step = advance(DietState::ActivityHours { data }, "3,5", today());
        match step.effect {
            Some(Effect::SaveActivityAndGeneratePlan(saved)) => {
                assert_eq!(saved.activity_hours, Some(3.5));
            }
            other => panic!("expected SaveActivityAndGeneratePlan, got {other:?}"),
        }
    }

    #[test]
    fn test_menu_states_hint_at_buttons() {
        let step = advance(DietState::MainMenu, "hello", today());
        assert_eq!(step.reply, MSG_USE_MENU);
        assert!(matches!(step.next, DietState::MainMenu));
    }
}
