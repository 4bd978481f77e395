//! Note capture: validated submissions and demo seeding.

pub mod capture;
pub mod seed;

pub use capture::{submit, Submission, SubmissionError};
pub use seed::{seed_demo_notes, SeedOptions};
