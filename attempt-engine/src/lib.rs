//! Timed Test Attempt Engine
//!
//! ## Components
//!
//! - Order questions by sort position
//! - Count down a per-question time budget
//! - Record one answer per question
//! - Submit the attempt exactly once, and retry on failure
//!
pub mod answers;
pub mod api;
pub mod driver;
pub mod error;
pub mod sequencer;
pub mod session;
pub mod stats;
pub mod timer;
pub mod validate;

pub use pulse_types;
