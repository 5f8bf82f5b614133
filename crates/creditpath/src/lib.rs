//! CreditPath: scores loan applicants' probability of default and turns it into a
//! lending recommendation with an ordered reasoning trail.

pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
