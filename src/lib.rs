//! # Diet & Plant Care Telegram Bots
//!
//! Two small bots sharing one library: an AI diet coach that interviews
//! athletes through a linear conversation and turns the collected profile
//! into a one-day meal plan via an LLM (with a deterministic fallback), and
//! a plant care reminder bot that extracts structured tasks from free text
//! and polls the database for due reminders.

pub mod bot;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod interview;
pub mod llm;
pub mod plan;
pub mod plant;
