use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// One statement whose reported change count differed from its expectation.
#[derive(Debug, Clone, Eq, PartialEq, Error, Serialize)]
#[error("{scenario}: {label} (statement {index}) expected {expected} changes, got {actual}")]
pub struct ExpectationMismatch {
	pub scenario: String,
	pub index: usize,
	pub expected: i64,
	pub actual: i64,
	pub label: String,
	pub sql: String,
}

#[derive(Debug, Error)]
pub enum HarnessError {
	#[error("failed to open database for `{scenario}`")]
	Open {
		scenario: String,
		source: changecheck::Error,
	},

	#[error("failed to apply fixture schema for `{scenario}`")]
	Setup {
		scenario: String,
		source: changecheck::Error,
	},

	#[error("statement {index} of `{scenario}` failed: {sql}")]
	Statement {
		scenario: String,
		index: usize,
		sql: String,
		source: changecheck::Error,
	},

	#[error("failed to close database for `{scenario}`")]
	Close {
		scenario: String,
		source: changecheck::Error,
	},

	#[error("cannot classify statement {index} of `{scenario}`: {sql}")]
	Unclassified {
		scenario: String,
		index: usize,
		sql: String,
	},

	/// A step failed after earlier steps had already been checked.
	#[error("`{scenario}` aborted after {} expectation mismatch(es)", .mismatches.len())]
	Aborted {
		scenario: String,
		mismatches: Vec<ExpectationMismatch>,
		source: Box<HarnessError>,
	},

	#[error("{} expectation mismatch(es) in `{scenario}`", .mismatches.len())]
	Mismatches {
		scenario: String,
		mismatches: Vec<ExpectationMismatch>,
	},

	#[error("{failed} of {total} scenarios failed")]
	Suite {
		failed: usize,
		total: usize,
		failures: Vec<HarnessError>,
	},

	#[error("failed to read config file {}", .path.display())]
	ConfigRead {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("failed to parse config file {}", .path.display())]
	ConfigParse {
		path: PathBuf,
		source: toml::de::Error,
	},

	#[error("invalid configuration: {0}")]
	Config(String),
}

impl HarnessError {
	/// Every expectation mismatch carried by this error, flattening suites.
	#[must_use]
	pub fn mismatches(&self) -> Vec<&ExpectationMismatch> {
		match self {
			Self::Mismatches { mismatches, .. } | Self::Aborted { mismatches, .. } => {
				mismatches.iter().collect()
			}
			Self::Suite { failures, .. } => failures.iter().flat_map(Self::mismatches).collect(),
			_ => Vec::new(),
		}
	}

	/// True when the error reports wrong change counts rather than a harness
	/// or engine failure.
	#[must_use]
	pub fn is_expectation_failure(&self) -> bool {
		match self {
			Self::Mismatches { .. } => true,
			Self::Suite { failures, .. } => failures.iter().all(Self::is_expectation_failure),
			_ => false,
		}
	}
}

pub type Result<T> = std::result::Result<T, HarnessError>;
