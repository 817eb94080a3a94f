use changecheck::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ExpectationMismatch, HarnessError, Result};
use crate::kind::{StatementKind, classify, expected_changes, leading_keyword};

/// Where the reported change count of a statement is read from.
#[derive(
	Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Reporting {
	/// `RunResult::changes` of the statement itself.
	#[default]
	Statement,
	/// The connection-wide counter after the statement ran. It keeps the
	/// previous write's count across reads, so it exhibits the leak.
	Connection,
}

impl Reporting {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Statement => "statement",
			Self::Connection => "connection",
		}
	}
}

/// Outcome of one executed statement.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Check {
	pub index: usize,
	pub label: String,
	pub sql: String,
	pub kind: StatementKind,
	pub expected: i64,
	pub actual: i64,
	pub passed: bool,
}

impl Check {
	fn mismatch(&self, scenario: &str) -> ExpectationMismatch {
		ExpectationMismatch {
			scenario: scenario.to_string(),
			index: self.index,
			expected: self.expected,
			actual: self.actual,
			label: self.label.clone(),
			sql: self.sql.clone(),
		}
	}
}

/// One isolated in-memory database for a single scenario.
///
/// Checks are recorded rather than raised; [`Session::finish`] closes the
/// connection and only then reports every mismatch at once. Dropping a
/// session without finishing it still closes the connection.
pub struct Session {
	scenario: String,
	conn: Connection,
	reporting: Reporting,
	checks: Vec<Check>,
}

impl Session {
	pub fn open(scenario: impl Into<String>, schema: &str, reporting: Reporting) -> Result<Self> {
		let scenario = scenario.into();

		let conn = match Connection::open_in_memory() {
			Ok(conn) => conn,
			Err(source) => return Err(HarnessError::Open { scenario, source }),
		};
		if let Err(source) = conn.execute_batch(schema) {
			return Err(HarnessError::Setup { scenario, source });
		}

		debug!(%scenario, reporting = reporting.as_str(), "session opened");
		Ok(Self { scenario, conn, reporting, checks: Vec::new() })
	}

	#[must_use]
	pub fn scenario(&self) -> &str {
		&self.scenario
	}

	#[must_use]
	pub fn checks(&self) -> &[Check] {
		&self.checks
	}

	#[must_use]
	pub const fn connection(&self) -> &Connection {
		&self.conn
	}

	/// Runs `sql` and compares its reported changes with the expectation for
	/// a statement of its kind that matched `rows_matched` rows.
	///
	/// A wrong count is recorded and returned as a failed [`Check`]; only
	/// engine errors and unclassifiable text end the scenario early.
	pub fn run_and_check(&mut self, sql: &str, rows_matched: i64) -> Result<Check> {
		let index = self.checks.len();
		let kind = classify(sql).ok_or_else(|| HarnessError::Unclassified {
			scenario: self.scenario.clone(),
			index,
			sql: sql.to_string(),
		})?;
		let actual = self.reported_changes(index, sql)?;
		let expected = expected_changes(kind, rows_matched);

		let check = Check {
			index,
			label: operation_label(index, sql),
			sql: sql.to_string(),
			kind,
			expected,
			actual,
			passed: expected == actual,
		};

		if check.passed {
			debug!(scenario = %self.scenario, index, %kind, actual, "{sql}");
		} else {
			warn!(scenario = %self.scenario, index, %kind, expected, actual, "{sql}");
		}

		self.checks.push(check.clone());
		Ok(check)
	}

	fn reported_changes(&self, index: usize, sql: &str) -> Result<i64> {
		let fail = |source: changecheck::Error| HarnessError::Statement {
			scenario: self.scenario.clone(),
			index,
			sql: sql.to_string(),
			source,
		};

		let mut stmt = self.conn.prepare(sql).map_err(&fail)?;
		let result = stmt.run().map_err(&fail)?;

		Ok(match self.reporting {
			Reporting::Statement => result.changes,
			Reporting::Connection => self.conn.changes(),
		})
	}

	fn mismatches(&self) -> Vec<ExpectationMismatch> {
		self.checks.iter().filter(|check| !check.passed).map(|check| check.mismatch(&self.scenario)).collect()
	}

	/// Releases the connection, then fails with every recorded mismatch.
	pub fn finish(self) -> Result<Vec<Check>> {
		let mismatches = self.mismatches();
		let Self { scenario, conn, checks, .. } = self;
		let closed = conn.close();

		if !mismatches.is_empty() {
			if let Err(err) = &closed {
				warn!(%scenario, "close failed after mismatches: {err}");
			}
			return Err(HarnessError::Mismatches { scenario, mismatches });
		}

		match closed {
			Ok(()) => Ok(checks),
			Err(source) => Err(HarnessError::Close { scenario, source }),
		}
	}

	/// Ends a session whose step failed with `cause`. Mismatches checked
	/// before the failure are kept alongside it.
	pub fn abort(self, cause: HarnessError) -> HarnessError {
		let mismatches = self.mismatches();
		let Self { scenario, conn, .. } = self;
		if let Err(err) = conn.close() {
			warn!(%scenario, "close failed after abort: {err}");
		}

		if mismatches.is_empty() {
			return cause;
		}
		HarnessError::Aborted { scenario, mismatches, source: Box::new(cause) }
	}
}

const ORDINALS: [&str; 6] = ["first", "second", "third", "fourth", "fifth", "sixth"];

/// `"second operation SELECT"` for the statement at index 1.
#[must_use]
pub fn operation_label(index: usize, sql: &str) -> String {
	let keyword = leading_keyword(sql).unwrap_or("statement").to_ascii_uppercase();
	match ORDINALS.get(index) {
		Some(ordinal) => format!("{ordinal} operation {keyword}"),
		None => format!("operation {} {keyword}", index + 1),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SCHEMA: &str = "CREATE TABLE test_table (id INTEGER, name TEXT)";
	const INSERT: &str = "INSERT INTO test_table VALUES (1, 'test1')";
	const SELECT: &str = "SELECT * FROM test_table";

	#[test]
	fn labels_use_ordinals_then_positions() {
		assert_eq!(operation_label(0, "select 1"), "first operation SELECT");
		assert_eq!(operation_label(3, "  BEGIN"), "fourth operation BEGIN");
		assert_eq!(operation_label(7, "PRAGMA table_info(t)"), "operation 8 PRAGMA");
	}

	#[test]
	fn records_passing_checks_in_order() {
		let mut session = Session::open("insert select", SCHEMA, Reporting::Statement).expect("open");

		let insert = session.run_and_check(INSERT, 1).expect("run insert");
		assert_eq!((insert.expected, insert.actual, insert.passed), (1, 1, true));

		let select = session.run_and_check(SELECT, 0).expect("run select");
		assert_eq!((select.expected, select.actual, select.passed), (0, 0, true));
		assert_eq!(select.label, "second operation SELECT");
		assert_eq!(select.kind, StatementKind::ReadOnly);

		assert_eq!(session.checks().len(), 2);
		let checks = session.finish().expect("finish cleanly");
		assert_eq!(checks.len(), 2);
	}

	#[test]
	fn mismatches_are_batched_until_finish() {
		let mut session = Session::open("leaky", SCHEMA, Reporting::Connection).expect("open");
		session.run_and_check(INSERT, 1).expect("run insert");

		let select = session.run_and_check(SELECT, 0).expect("run select");
		assert!(!select.passed);
		let pragma = session.run_and_check("PRAGMA table_info(test_table)", 0).expect("run pragma");
		assert!(!pragma.passed);

		let err = session.finish().expect_err("mismatches reported at finish");
		let mismatches = err.mismatches();
		assert_eq!(mismatches.len(), 2);
		assert_eq!(mismatches[0].index, 1);
		assert_eq!((mismatches[0].expected, mismatches[0].actual), (0, 1));
		assert_eq!(mismatches[1].label, "third operation PRAGMA");
		assert_eq!(err.to_string(), "2 expectation mismatch(es) in `leaky`");
	}

	#[test]
	fn expectation_ignores_rows_for_non_writes() {
		let mut session = Session::open("explain", SCHEMA, Reporting::Statement).expect("open");
		let explain = session.run_and_check("EXPLAIN SELECT * FROM test_table", 7).expect("run");
		assert_eq!(explain.expected, 0);
		assert!(explain.passed);
	}

	#[test]
	fn engine_errors_abort_the_scenario() {
		let mut session = Session::open("broken", SCHEMA, Reporting::Statement).expect("open");
		let err = session.run_and_check("SELECT * FROM missing_table", 0).expect_err("no such table");
		assert!(matches!(err, HarnessError::Statement { index: 0, .. }), "{err:?}");
		assert!(session.checks().is_empty());
	}

	#[test]
	fn abort_keeps_mismatches_checked_before_the_failure() {
		let mut session = Session::open("leak then error", SCHEMA, Reporting::Connection).expect("open");
		session.run_and_check(INSERT, 1).expect("run insert");
		session.run_and_check(SELECT, 0).expect("run select");

		let cause = session.run_and_check("SELECT * FROM nowhere", 0).expect_err("no such table");
		let err = session.abort(cause);

		assert!(!err.is_expectation_failure());
		let mismatches = err.mismatches();
		assert_eq!(mismatches.len(), 1);
		assert_eq!((mismatches[0].index, mismatches[0].expected, mismatches[0].actual), (1, 0, 1));
		assert_eq!(err.to_string(), "`leak then error` aborted after 1 expectation mismatch(es)");

		let HarnessError::Aborted { source, .. } = err else {
			panic!("expected an aborted scenario");
		};
		assert!(matches!(*source, HarnessError::Statement { index: 2, .. }), "{source:?}");
	}

	#[test]
	fn abort_without_mismatches_returns_the_cause() {
		let mut session = Session::open("clean then error", SCHEMA, Reporting::Statement).expect("open");
		session.run_and_check(INSERT, 1).expect("run insert");

		let cause = session.run_and_check("DROP TABLE nowhere", 0).expect_err("no such table");
		assert!(matches!(session.abort(cause), HarnessError::Statement { index: 1, .. }));
	}

	#[test]
	fn unclassified_statements_are_rejected_before_running() {
		let mut session = Session::open("cte", SCHEMA, Reporting::Statement).expect("open");
		let err = session
			.run_and_check("WITH x AS (SELECT 1) INSERT INTO test_table SELECT 1, 'a'", 1)
			.expect_err("ambiguous keyword");
		assert!(matches!(&err, HarnessError::Unclassified { index: 0, scenario, .. } if scenario == "cte"));
		assert!(err.to_string().starts_with("cannot classify statement 0 of `cte`: WITH"), "{err}");

		let count = session.connection().query_row("SELECT count(*) FROM test_table").expect("count");
		assert_eq!(count, Some(vec![changecheck::Value::Integer(0)]));
	}

	#[test]
	fn invalid_schema_fails_setup() {
		let err = Session::open("bad schema", "CREATE TABLE", Reporting::Statement)
			.err()
			.expect("schema should not parse");
		assert!(matches!(err, HarnessError::Setup { .. }), "{err:?}");
	}
}
