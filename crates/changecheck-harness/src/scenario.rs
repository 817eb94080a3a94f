use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::session::{Check, Reporting, Session};

pub const DEFAULT_SCHEMA: &str = "CREATE TABLE test_table (id INTEGER, name TEXT)";

const INSERT_1: &str = "INSERT INTO test_table VALUES (1, 'test1')";
const INSERT_2: &str = "INSERT INTO test_table VALUES (2, 'test2')";
const INSERT_3: &str = "INSERT INTO test_table VALUES (3, 'test3')";
const SELECT_ALL: &str = "SELECT * FROM test_table";
const UPDATE_ID_1: &str = "UPDATE test_table SET name = 'test2', id = 2 WHERE id = 1";
const UPDATE_MISS: &str = "UPDATE test_table SET name = 'unchanged' WHERE id = 999";
const DELETE_MISS_999: &str = "DELETE FROM test_table WHERE id = 999";
const DELETE_MISS_888: &str = "DELETE FROM test_table WHERE id = 888";
const EXPLAIN_SELECT: &str = "EXPLAIN SELECT * FROM test_table";
const PRAGMA_TABLE_INFO: &str = "PRAGMA table_info(test_table)";
const BEGIN: &str = "BEGIN";

/// A statement plus the number of rows it matches at its point in the
/// scenario.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Step {
	pub sql: String,
	pub rows_matched: i64,
}

impl Step {
	pub fn write(sql: impl Into<String>, rows_matched: i64) -> Self {
		Self { sql: sql.into(), rows_matched }
	}

	/// A statement that matches no rows for writing.
	pub fn read(sql: impl Into<String>) -> Self {
		Self::write(sql, 0)
	}
}

/// A named, ordered list of steps run against a fresh database.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Scenario {
	pub group: Vec<String>,
	pub name: String,
	pub steps: Vec<Step>,
}

impl Scenario {
	pub fn new(group: &[&str], name: impl Into<String>, steps: Vec<Step>) -> Self {
		Self {
			group: group.iter().map(ToString::to_string).collect(),
			name: name.into(),
			steps,
		}
	}

	/// `"SELECT operations > two operations > INSERT SELECT"`.
	#[must_use]
	pub fn path(&self) -> String {
		let mut parts = self.group.clone();
		parts.push(self.name.clone());
		parts.join(" > ")
	}

	/// Runs the steps in a fresh session and reports all mismatches together.
	pub fn run(&self, schema: &str, reporting: Reporting) -> Result<Vec<Check>> {
		let mut session = Session::open(self.path(), schema, reporting)?;
		for step in &self.steps {
			if let Err(err) = session.run_and_check(&step.sql, step.rows_matched) {
				return Err(session.abort(err));
			}
		}

		debug!(scenario = %session.scenario(), steps = self.steps.len(), "scenario ran");
		session.finish()
	}
}

/// The hand-written reproduction scenarios, grouped by what they probe.
#[must_use]
pub fn catalog() -> Vec<Scenario> {
	const SELECTS: &str = "SELECT operations";
	const NO_EFFECT: &str = "UPDATE/DELETE operations with no effect";
	const ALWAYS_ZERO: &str = "other operations that always return zero changes";

	let insert = || Step::write(INSERT_1, 1);
	let select = || Step::read(SELECT_ALL);

	vec![
		Scenario::new(&[SELECTS, "single operation"], "single SELECT", vec![select()]),
		Scenario::new(&[SELECTS, "single operation"], "single INSERT", vec![insert()]),
		Scenario::new(&[SELECTS, "two operations"], "INSERT SELECT", vec![insert(), select()]),
		Scenario::new(&[SELECTS, "two operations"], "SELECT INSERT", vec![select(), insert()]),
		Scenario::new(&[SELECTS, "three operations"], "INSERT SELECT SELECT", vec![
			insert(),
			select(),
			select(),
		]),
		Scenario::new(&[SELECTS, "three operations"], "SELECT INSERT SELECT", vec![
			select(),
			insert(),
			select(),
		]),
		Scenario::new(&[SELECTS, "three operations"], "INSERT SELECT INSERT", vec![
			insert(),
			select(),
			Step::write(INSERT_2, 1),
		]),
		Scenario::new(&[SELECTS, "four operations"], "INSERT SELECT UPDATE SELECT", vec![
			insert(),
			select(),
			Step::write(UPDATE_ID_1, 1),
			select(),
		]),
		Scenario::new(&[NO_EFFECT], "INSERT UPDATE", vec![
			Step::write(INSERT_3, 1),
			Step::write(UPDATE_MISS, 0),
		]),
		Scenario::new(&[NO_EFFECT], "INSERT DELETE", vec![
			Step::write(INSERT_3, 1),
			Step::write(DELETE_MISS_999, 0),
		]),
		Scenario::new(&[NO_EFFECT], "INSERT UPDATE DELETE", vec![
			Step::write(INSERT_3, 1),
			Step::write(UPDATE_MISS, 0),
			Step::write(DELETE_MISS_888, 0),
		]),
		Scenario::new(&[ALWAYS_ZERO], "INSERT EXPLAIN", vec![insert(), Step::read(EXPLAIN_SELECT)]),
		Scenario::new(&[ALWAYS_ZERO], "INSERT PRAGMA", vec![insert(), Step::read(PRAGMA_TABLE_INFO)]),
		Scenario::new(&[ALWAYS_ZERO], "INSERT BEGIN", vec![insert(), Step::read(BEGIN)]),
	]
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::kind::classify;

	#[test]
	fn catalog_names_are_unique() {
		let scenarios = catalog();
		let mut paths: Vec<_> = scenarios.iter().map(Scenario::path).collect();
		paths.sort();
		paths.dedup();
		assert_eq!(paths.len(), scenarios.len());
	}

	#[test]
	fn catalog_statements_are_all_classifiable() {
		for scenario in catalog() {
			for step in &scenario.steps {
				assert!(classify(&step.sql).is_some(), "{}: {}", scenario.path(), step.sql);
			}
		}
	}

	#[test]
	fn path_joins_groups_and_name() {
		let scenario = Scenario::new(&["a", "b"], "c", Vec::new());
		assert_eq!(scenario.path(), "a > b > c");
	}

	#[test]
	fn scenario_name_matches_its_statement_keywords() {
		for scenario in catalog() {
			let keywords: Vec<_> = scenario
				.steps
				.iter()
				.filter_map(|step| step.sql.split_whitespace().next())
				.collect();
			let name = scenario.name.trim_start_matches("single ");
			assert_eq!(keywords.join(" "), name, "{}", scenario.path());
		}
	}
}
