use std::fmt;

use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::config::HarnessConfig;
use crate::error::{ExpectationMismatch, HarnessError, Result};
use crate::scenario::Scenario;
use crate::session::{Check, Reporting};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
	Passed,
	Failed,
	Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
	pub scenario: String,
	pub status: Status,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub checks: Vec<Check>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub mismatches: Vec<ExpectationMismatch>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuiteReport {
	pub sqlite_version: String,
	pub reporting: Reporting,
	pub total: usize,
	pub failed: usize,
	pub outcomes: Vec<ScenarioOutcome>,
	#[serde(skip)]
	failures: Vec<HarnessError>,
}

impl SuiteReport {
	fn new(reporting: Reporting) -> Self {
		Self {
			sqlite_version: changecheck::sqlite_lib_version(),
			reporting,
			total: 0,
			failed: 0,
			outcomes: Vec::new(),
			failures: Vec::new(),
		}
	}

	fn record(&mut self, scenario: &Scenario, result: Result<Vec<Check>>) {
		let scenario = scenario.path();
		self.total += 1;

		let outcome = match result {
			Ok(checks) => {
				ScenarioOutcome { scenario, status: Status::Passed, checks, mismatches: Vec::new(), error: None }
			}
			Err(err) => {
				self.failed += 1;
				let mismatches: Vec<_> = err.mismatches().into_iter().cloned().collect();
				let status = if err.is_expectation_failure() { Status::Failed } else { Status::Error };
				let error = (status == Status::Error).then(|| error_chain(&err));
				self.failures.push(err);
				ScenarioOutcome { scenario, status, checks: Vec::new(), mismatches, error }
			}
		};
		self.outcomes.push(outcome);
	}

	#[must_use]
	pub const fn passed(&self) -> usize {
		self.total - self.failed
	}

	#[must_use]
	pub fn is_success(&self) -> bool {
		self.failures.is_empty()
	}

	#[must_use]
	pub fn failures(&self) -> &[HarnessError] {
		&self.failures
	}

	/// Folds every failing scenario into one [`HarnessError::Suite`].
	pub fn into_result(self) -> Result<Self> {
		if self.failures.is_empty() {
			return Ok(self);
		}

		Err(HarnessError::Suite { failed: self.failed, total: self.total, failures: self.failures })
	}

	/// Failures with their mismatches, then a summary line. Passing scenarios
	/// are listed only when `verbose` is set.
	#[must_use]
	pub fn render_text(&self, verbose: bool) -> String {
		TextReport { report: self, verbose }.to_string()
	}

	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string_pretty(self)
	}
}

struct TextReport<'a> {
	report: &'a SuiteReport,
	verbose: bool,
}

impl fmt::Display for TextReport<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let report = self.report;
		writeln!(f, "SQLite {} (changes from {})", report.sqlite_version, report.reporting.as_str())?;

		for outcome in &report.outcomes {
			match outcome.status {
				Status::Passed if !self.verbose => continue,
				Status::Passed => {
					writeln!(f, "PASS  {} ({} checks)", outcome.scenario, outcome.checks.len())?;
				}
				Status::Failed => writeln!(f, "FAIL  {}", outcome.scenario)?,
				Status::Error => {
					let error = outcome.error.as_deref().unwrap_or("unknown error");
					writeln!(f, "ERROR {}: {error}", outcome.scenario)?;
				}
			}

			for mismatch in &outcome.mismatches {
				writeln!(
					f,
					"      {}: expected {} changes, got {} ({})",
					mismatch.label, mismatch.expected, mismatch.actual, mismatch.sql
				)?;
			}
		}

		writeln!(f, "{} passed, {} failed, {} total", report.passed(), report.failed, report.total)
	}
}

/// `"outer: inner: innermost"` for an error and its sources.
#[must_use]
pub fn error_chain(err: &dyn std::error::Error) -> String {
	std::iter::successors(err.source(), |cause| cause.source()).fold(err.to_string(), |text, cause| {
		format!("{text}: {cause}")
	})
}

/// Runs each scenario in its own session, one after another.
pub fn run_suite(config: &HarnessConfig, scenarios: &[Scenario]) -> SuiteReport {
	let mut report = SuiteReport::new(config.reporting);
	info!(scenarios = scenarios.len(), reporting = config.reporting.as_str(), "running suite");

	for scenario in scenarios {
		let span = info_span!("scenario", name = %scenario.name);
		let _entered = span.enter();

		let result = scenario.run(&config.schema, config.reporting);
		debug!(ok = result.is_ok(), "scenario finished");
		report.record(scenario, result);
	}

	info!(total = report.total, failed = report.failed, "suite finished");
	report
}
