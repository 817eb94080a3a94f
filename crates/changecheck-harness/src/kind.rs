use std::fmt;

use serde::Serialize;

/// Static classification of a statement by its leading keyword.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatementKind {
	DataModifying,
	ReadOnly,
	Introspective,
	TransactionControl,
	Schema,
}

const KEYWORDS: &[(&str, StatementKind)] = &[
	("INSERT", StatementKind::DataModifying),
	("UPDATE", StatementKind::DataModifying),
	("DELETE", StatementKind::DataModifying),
	("REPLACE", StatementKind::DataModifying),
	("SELECT", StatementKind::ReadOnly),
	("VALUES", StatementKind::ReadOnly),
	("EXPLAIN", StatementKind::Introspective),
	("PRAGMA", StatementKind::Introspective),
	("BEGIN", StatementKind::TransactionControl),
	("COMMIT", StatementKind::TransactionControl),
	("END", StatementKind::TransactionControl),
	("ROLLBACK", StatementKind::TransactionControl),
	("SAVEPOINT", StatementKind::TransactionControl),
	("RELEASE", StatementKind::TransactionControl),
	("CREATE", StatementKind::Schema),
	("DROP", StatementKind::Schema),
	("ALTER", StatementKind::Schema),
];

impl StatementKind {
	#[must_use]
	pub const fn writes(self) -> bool {
		matches!(self, Self::DataModifying)
	}

	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::DataModifying => "data-modifying",
			Self::ReadOnly => "read-only",
			Self::Introspective => "introspective",
			Self::TransactionControl => "transaction-control",
			Self::Schema => "schema",
		}
	}
}

impl fmt::Display for StatementKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// First word of `sql` after leading whitespace, if it starts with a letter.
#[must_use]
pub fn leading_keyword(sql: &str) -> Option<&str> {
	let trimmed = sql.trim_start();
	let end = trimmed.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(trimmed.len());
	let keyword = trimmed.get(..end)?;
	if keyword.is_empty() { None } else { Some(keyword) }
}

/// Classifies `sql` by its leading keyword, ignoring case.
///
/// Returns `None` for keywords that do not pin down a kind, `WITH` included,
/// since a common table expression can front either a read or a write.
#[must_use]
pub fn classify(sql: &str) -> Option<StatementKind> {
	let keyword = leading_keyword(sql)?;
	KEYWORDS
		.iter()
		.find(|(candidate, _)| candidate.eq_ignore_ascii_case(keyword))
		.map(|&(_, kind)| kind)
}

/// Change count a statement of `kind` must report after matching
/// `rows_matched` rows. Only writes can report anything but zero.
#[must_use]
pub const fn expected_changes(kind: StatementKind, rows_matched: i64) -> i64 {
	if kind.writes() { rows_matched } else { 0 }
}
