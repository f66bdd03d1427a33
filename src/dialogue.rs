//! Conversation state for the diet bot dialogue.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::interview::Interview;

/// States of the athlete interview, a strict forward-only chain:
/// profile fields, then the training sub-chain, then the activity
/// sub-chain, ending in the main menu hub and the plan review states.
/// Collecting states carry the data accumulated so far; cancelling
/// discards it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum DietState {
    #[default]
    Start,
    MainMenu,
    CollectingName {
        data: Interview,
    },
    CollectingCompetitionDate {
        data: Interview,
    },
    CollectingGender {
        data: Interview,
    },
    CollectingHeight {
        data: Interview,
    },
    CollectingCurrentWeight {
        data: Interview,
    },
    CollectingTargetWeight {
        data: Interview,
    },
    TrainingSessions {
        data: Interview,
    },
    TrainingExercises {
        data: Interview,
    },
    TrainingWeight {
        data: Interview,
    },
    TrainingReps {
        data: Interview,
    },
    TrainingSets {
        data: Interview,
    },
    ActivitySteps {
        data: Interview,
    },
    ActivityWorkType {
        data: Interview,
    },
    ActivityExtra {
        data: Interview,
    },
    ActivityHours {
        data: Interview,
    },
    ViewingPlan,
    ViewingSavedPlans,
}

/// Type alias for the diet bot dialogue.
pub type DietDialogue = Dialogue<DietState, InMemStorage<DietState>>;
