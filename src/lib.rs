//! Zuno: a daily learning-habit client.
//!
//! The user declares skill goals, receives one task per day, submits work,
//! gets a score with mentor feedback and tracks streaks over time. This crate
//! holds the client-side orchestration; planning and grading happen remotely.

pub mod app;
pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod feedback;
pub mod goals;
pub mod models;
pub mod onboarding;
pub mod progress;
pub mod registry;
