//! Domain models for Zuno.
//!
//! # Core Concepts
//!
//! ## Long-lived Records
//!
//! - [`Goal`]: A skill or subject the user committed to, with a daily time budget
//!   and a target date. Created in one batch by onboarding, never edited.
//! - [`DailyTask`]: Today's unit of work derived from a goal. Replaced wholesale
//!   by every registry refresh.
//! - [`ProgressSnapshot`]: Streak and completion statistics, always re-fetched.
//!
//! ## Ephemeral Records
//!
//! These only live for one call or one view:
//!
//! - [`Session`]: The single live identity of this client.
//! - [`SubmitTaskInput`]: A submission body, dropped once graded.
//! - [`Feedback`]: Grading output, handed from submission to presentation once.
//! - [`ChatTurn`]: One line of the mentor conversation, never persisted.

mod chat;
mod feedback;
mod goal;
mod progress;
mod session;
mod task;

pub use chat::*;
pub use feedback::*;
pub use goal::*;
pub use progress::*;
pub use session::*;
pub use task::*;
