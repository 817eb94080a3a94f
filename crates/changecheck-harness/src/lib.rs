//! Checks that every statement's reported change count depends only on that
//! statement, never on what ran before it on the same connection.

pub mod config;
pub mod error;
pub mod kind;
pub mod permute;
pub mod report;
pub mod scenario;
pub mod session;

pub use config::HarnessConfig;
pub use error::{ExpectationMismatch, HarnessError, Result};
pub use kind::{StatementKind, classify, expected_changes};
pub use report::{ScenarioOutcome, Status, SuiteReport, run_suite};
pub use scenario::{Scenario, Step, catalog};
pub use session::{Check, Reporting, Session};
