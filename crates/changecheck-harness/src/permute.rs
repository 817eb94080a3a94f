//! Every ordering of a fixed statement palette up to a given length.
//!
//! The rows each write matches come from a small model of `test_table`
//! rather than from the engine, so the expectations stay independent of the
//! counts being checked.

use crate::scenario::{Scenario, Step};

pub const GROUP: &str = "permutations";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Operation {
	Insert,
	Select,
	Update,
	UpdateMiss,
	Delete,
	DeleteMiss,
	Explain,
	Pragma,
	Create,
	Drop,
	Begin,
	Commit,
	Rollback,
}

impl Operation {
	pub const ALL: [Self; 13] = [
		Self::Insert,
		Self::Select,
		Self::Update,
		Self::UpdateMiss,
		Self::Delete,
		Self::DeleteMiss,
		Self::Explain,
		Self::Pragma,
		Self::Create,
		Self::Drop,
		Self::Begin,
		Self::Commit,
		Self::Rollback,
	];

	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::Insert => "INSERT",
			Self::Select => "SELECT",
			Self::Update => "UPDATE",
			Self::UpdateMiss => "UPDATE-MISS",
			Self::Delete => "DELETE",
			Self::DeleteMiss => "DELETE-MISS",
			Self::Explain => "EXPLAIN",
			Self::Pragma => "PRAGMA",
			Self::Create => "CREATE",
			Self::Drop => "DROP",
			Self::Begin => "BEGIN",
			Self::Commit => "COMMIT",
			Self::Rollback => "ROLLBACK",
		}
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Contents {
	rows: i64,
	/// Whether the scratch table `aux` exists.
	aux: bool,
}

#[derive(Debug, Clone)]
struct TableModel {
	current: Contents,
	next_id: i64,
	/// State at BEGIN while a transaction is open.
	snapshot: Option<Contents>,
}

impl Default for TableModel {
	fn default() -> Self {
		Self { current: Contents { rows: 0, aux: false }, next_id: 1, snapshot: None }
	}
}

impl TableModel {
	/// The step for `op` in the current state, or `None` when the engine would
	/// reject it (nested BEGIN, COMMIT or ROLLBACK with no transaction, a
	/// second CREATE of `aux`, DROP of a missing `aux`).
	fn apply(&mut self, op: Operation) -> Option<Step> {
		let step = match op {
			Operation::Insert => {
				let id = self.next_id;
				self.next_id += 1;
				self.current.rows += 1;
				Step::write(format!("INSERT INTO test_table VALUES ({id}, 'test{id}')"), 1)
			}
			Operation::Select => Step::read("SELECT * FROM test_table"),
			Operation::Update => {
				Step::write("UPDATE test_table SET name = 'touched'", self.current.rows)
			}
			Operation::UpdateMiss => {
				Step::write("UPDATE test_table SET name = 'unchanged' WHERE id = 999", 0)
			}
			Operation::Delete => {
				let deleted = std::mem::take(&mut self.current.rows);
				Step::write("DELETE FROM test_table WHERE id >= 0", deleted)
			}
			Operation::DeleteMiss => Step::write("DELETE FROM test_table WHERE id = 999", 0),
			Operation::Explain => Step::read("EXPLAIN SELECT * FROM test_table"),
			Operation::Pragma => Step::read("PRAGMA table_info(test_table)"),
			Operation::Create => {
				if std::mem::replace(&mut self.current.aux, true) {
					return None;
				}
				Step::read("CREATE TABLE aux (x INTEGER)")
			}
			Operation::Drop => {
				if !std::mem::replace(&mut self.current.aux, false) {
					return None;
				}
				Step::read("DROP TABLE aux")
			}
			Operation::Begin => {
				if self.snapshot.is_some() {
					return None;
				}
				self.snapshot = Some(self.current);
				Step::read("BEGIN")
			}
			Operation::Commit => {
				self.snapshot.take()?;
				Step::read("COMMIT")
			}
			Operation::Rollback => {
				self.current = self.snapshot.take()?;
				Step::read("ROLLBACK")
			}
		};
		Some(step)
	}
}

/// All valid sequences of one to `depth` operations, shortest first.
#[must_use]
pub fn permutations(depth: usize) -> Vec<Scenario> {
	let mut scenarios = Vec::new();
	for len in 1..=depth {
		let mut ops = Vec::with_capacity(len);
		let mut steps = Vec::with_capacity(len);
		extend(&TableModel::default(), len, &mut ops, &mut steps, &mut scenarios);
	}
	scenarios
}

fn extend(
	model: &TableModel,
	remaining: usize,
	ops: &mut Vec<Operation>,
	steps: &mut Vec<Step>,
	out: &mut Vec<Scenario>,
) {
	if remaining == 0 {
		let name = ops.iter().map(|op| op.name()).collect::<Vec<_>>().join(" ");
		let group = format!("{} operations", ops.len());
		out.push(Scenario::new(&[GROUP, group.as_str()], name, steps.clone()));
		return;
	}

	for op in Operation::ALL {
		let mut next = model.clone();
		let Some(step) = next.apply(op) else {
			continue;
		};

		ops.push(op);
		steps.push(step);
		extend(&next, remaining - 1, ops, steps, out);
		steps.pop();
		ops.pop();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn find<'a>(scenarios: &'a [Scenario], name: &str) -> &'a Scenario {
		scenarios.iter().find(|s| s.name == name).unwrap_or_else(|| panic!("missing {name}"))
	}

	fn rows(scenario: &Scenario) -> Vec<i64> {
		scenario.steps.iter().map(|step| step.rows_matched).collect()
	}

	#[test]
	fn single_operations_skip_unbalanced_transaction_control() {
		let names: Vec<_> = permutations(1).into_iter().map(|s| s.name).collect();
		assert_eq!(names, vec![
			"INSERT",
			"SELECT",
			"UPDATE",
			"UPDATE-MISS",
			"DELETE",
			"DELETE-MISS",
			"EXPLAIN",
			"PRAGMA",
			"CREATE",
			"BEGIN",
		]);
	}

	#[test]
	fn counts_grow_with_depth() {
		let one = permutations(1).len();
		let two = permutations(2).len();
		assert_eq!(one, 10);
		// Row-level ops: 8 + CREATE + BEGIN. CREATE: 8 + DROP + BEGIN.
		// BEGIN: 8 + CREATE + COMMIT + ROLLBACK.
		assert_eq!(two - one, 8 * 10 + 10 + 11);
	}

	#[test]
	fn model_tracks_rows_through_writes() {
		let scenarios = permutations(4);
		let scenario = find(&scenarios, "INSERT INSERT UPDATE DELETE");
		assert_eq!(rows(scenario), vec![1, 1, 2, 2]);
		assert_eq!(scenario.steps[1].sql, "INSERT INTO test_table VALUES (2, 'test2')");
		assert_eq!(scenario.group, vec![GROUP.to_string(), "4 operations".to_string()]);
	}

	#[test]
	fn rollback_restores_the_snapshot() {
		let scenarios = permutations(4);
		let scenario = find(&scenarios, "INSERT BEGIN INSERT ROLLBACK");
		assert_eq!(rows(scenario), vec![1, 0, 1, 0]);

		let mut model = TableModel::default();
		let ops = [Operation::Insert, Operation::Begin, Operation::Delete, Operation::Rollback];
		for op in ops {
			model.apply(op).expect("valid operation");
		}
		let update = model.apply(Operation::Update).expect("update after rollback");
		assert_eq!(update.rows_matched, 1);
		assert_eq!(model.apply(Operation::Commit), None);
	}

	#[test]
	fn schema_operations_follow_the_scratch_table() {
		let scenarios = permutations(3);
		let scenario = find(&scenarios, "INSERT CREATE DROP");
		assert_eq!(scenario.steps[1].sql, "CREATE TABLE aux (x INTEGER)");
		assert_eq!(rows(scenario), vec![1, 0, 0]);
		assert!(scenarios.iter().all(|s| !s.name.starts_with("DROP")));
		assert!(scenarios.iter().all(|s| !s.name.contains("CREATE CREATE")));

		// A rolled back CREATE leaves nothing to drop.
		let mut model = TableModel::default();
		for op in [Operation::Begin, Operation::Create, Operation::Rollback] {
			model.apply(op).expect("valid operation");
		}
		assert_eq!(model.apply(Operation::Drop), None);
		assert!(model.apply(Operation::Create).is_some());
	}

	#[test]
	fn names_are_unique() {
		let scenarios = permutations(3);
		let mut names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
		names.sort_unstable();
		names.dedup();
		assert_eq!(names.len(), scenarios.len());
	}
}
