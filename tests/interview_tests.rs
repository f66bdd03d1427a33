//! End-to-end tests for the interview state machine.

use chrono::{Days, NaiveDate};
use dietbot::dialogue::DietState;
use dietbot::interview::{advance, Effect, Gender, Interview};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 29).unwrap()
}

fn step_through(mut state: DietState, inputs: &[&str]) -> (DietState, Option<Effect>) {
    let mut last_effect = None;
    for input in inputs {
        let step = advance(state, input, today());
        state = step.next;
        last_effect = step.effect;
    }
    (state, last_effect)
}

#[test]
fn full_profile_chain_collects_all_six_fields() {
    let start = DietState::CollectingName {
        data: Interview::default(),
    };
    let (state, effect) = step_through(
        start,
        &["Anna", "15.10.2026", "F", "172", "63,0", "61"],
    );

    assert!(matches!(state, DietState::MainMenu));
    match effect {
        Some(Effect::SaveProfile(data)) => {
            assert_eq!(data.name.as_deref(), Some("Anna"));
            assert_eq!(
                data.competition_date,
                NaiveDate::from_ymd_opt(2026, 10, 15)
            );
            assert_eq!(data.gender, Some(Gender::Female));
            assert_eq!(data.height, Some(172.0));
            assert_eq!(data.current_weight, Some(63.0));
            assert_eq!(data.target_weight, Some(61.0));
        }
        other => panic!("expected SaveProfile, got {other:?}"),
    }
}

#[test]
fn rejected_date_reprompts_then_accepts_boundary() {
    let data = Interview {
        name: Some("Anna".to_string()),
        ..Interview::default()
    };

    // Six days out is too close.
    let too_close = (today() + Days::new(6)).format("%d.%m.%Y").to_string();
    let step = advance(
        DietState::CollectingCompetitionDate { data: data.clone() },
        &too_close,
        today(),
    );
    assert!(matches!(
        step.next,
        DietState::CollectingCompetitionDate { .. }
    ));

    // Exactly one week out is accepted.
    let boundary = (today() + Days::new(7)).format("%d.%m.%Y").to_string();
    let step = advance(
        DietState::CollectingCompetitionDate { data },
        &boundary,
        today(),
    );
    assert!(matches!(step.next, DietState::CollectingGender { .. }));
}

#[test]
fn target_weight_respects_five_percent_boundary() {
    let data = Interview {
        current_weight: Some(70.0),
        ..Interview::default()
    };

    // 3.5 kg is exactly 5% of 70 kg.
    let step = advance(
        DietState::CollectingTargetWeight { data: data.clone() },
        "66.5",
        today(),
    );
    assert!(matches!(step.effect, Some(Effect::SaveProfile(_))));

    let step = advance(DietState::CollectingTargetWeight { data }, "66.4", today());
    assert!(step.effect.is_none());
    assert!(matches!(
        step.next,
        DietState::CollectingTargetWeight { .. }
    ));
}

#[test]
fn training_chain_ends_with_workout_effect() {
    let start = DietState::TrainingSessions {
        data: Interview::default(),
    };
    let (state, effect) = step_through(start, &["4", "squats, bench press", "60", "8", "5"]);

    assert!(matches!(state, DietState::ActivitySteps { .. }));
    match effect {
        Some(Effect::SaveWorkout(data)) => {
            assert_eq!(data.sessions_per_week, Some(4));
            assert_eq!(data.exercises.as_deref(), Some("squats, bench press"));
            assert_eq!(data.equipment_weight, Some(60.0));
            assert_eq!(data.reps, Some(8));
            assert_eq!(data.sets, Some(5));
        }
        other => panic!("expected SaveWorkout, got {other:?}"),
    }
}

#[test]
fn activity_chain_ends_with_generation_effect() {
    let start = DietState::ActivitySteps {
        data: Interview::default(),
    };
    let (state, effect) = step_through(start, &["8000", "desk job", "swimming", "3,5"]);

    assert!(matches!(state, DietState::MainMenu));
    match effect {
        Some(Effect::SaveActivityAndGeneratePlan(data)) => {
            assert_eq!(data.steps_per_day, Some(8000));
            assert_eq!(data.work_type.as_deref(), Some("desk job"));
            assert_eq!(data.extra_activity.as_deref(), Some("swimming"));
            assert_eq!(data.activity_hours, Some(3.5));
        }
        other => panic!("expected SaveActivityAndGeneratePlan, got {other:?}"),
    }
}

#[test]
fn sessions_out_of_range_reprompts() {
    let step = advance(
        DietState::TrainingSessions {
            data: Interview::default(),
        },
        "15",
        today(),
    );
    assert!(step.effect.is_none());
    assert!(matches!(step.next, DietState::TrainingSessions { .. }));

    let step = advance(
        DietState::TrainingSessions {
            data: Interview::default(),
        },
        "0",
        today(),
    );
    assert!(matches!(step.next, DietState::TrainingSessions { .. }));
}

#[test]
fn invalid_inputs_never_lose_collected_data() {
    let start = DietState::CollectingName {
        data: Interview::default(),
    };
    // A rejected height between two valid answers.
    let (state, _) = step_through(start, &["Anna", "15.10.2026", "F", "999"]);
    match state {
        DietState::CollectingHeight { data } => {
            assert_eq!(data.name.as_deref(), Some("Anna"));
            assert_eq!(data.gender, Some(Gender::Female));
        }
        other => panic!("expected to stay in CollectingHeight, got {other:?}"),
    }
}
