//! Domain library for the driving-school platform: enrollment lifecycle,
//! sequential course progression, exam scheduling, and certificate issuance.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
