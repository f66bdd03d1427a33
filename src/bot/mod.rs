//! Telegram transport layer.
//!
//! Thin handlers around the pure interview state machine: `message_handler`
//! routes commands and free text, `dialogue_manager` executes the effects a
//! transition requests, `callback_handler` drives the inline-button menus
//! and `ui_builder` assembles the keyboards.

pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

/// What the user sees when a read against the store fails; the full error
/// goes to the log.
pub const MSG_GENERIC_FAILURE: &str =
    "⚠️ Something went wrong. Please try again in a moment.";
