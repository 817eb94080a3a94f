//! Thin safe wrapper over the SQLite C API whose [`Statement::run`] reports
//! the rows changed by that statement alone.

pub use changecheck_sqlite_ffi::ffi;

use core::ffi::{c_char, c_int};
use std::ffi::{CStr, CString};
use std::fmt;
use std::ptr::NonNull;

const SQLITE_OK: c_int = 0;
const SQLITE_ROW: c_int = 100;
const SQLITE_DONE: c_int = 101;

const SQLITE_INTEGER: c_int = 1;
const SQLITE_FLOAT: c_int = 2;
const SQLITE_TEXT: c_int = 3;
const SQLITE_BLOB: c_int = 4;

const SQLITE_OPEN_READWRITE: c_int = 0x0000_0002;
const SQLITE_OPEN_CREATE: c_int = 0x0000_0004;
const SQLITE_OPEN_URI: c_int = 0x0000_0040;

const SQLITE_MISUSE: c_int = 21;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Error {
	pub code: c_int,
	pub message: String,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SQLite error {}: {}", self.code, self.message)
	}
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Integer(i64),
	Float(f64),
	Text(String),
	Blob(Vec<u8>),
}

/// Outcome of running a statement to completion.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RunResult {
	/// Rows inserted, updated or deleted by this statement. Zero for anything
	/// that is not a write, whatever ran before it.
	pub changes: i64,
	pub last_insert_rowid: i64,
}

pub struct Connection {
	db: NonNull<ffi::Sqlite3>,
}

impl Connection {
	pub fn open(path: &str) -> Result<Self> {
		let path_c = CString::new(path).map_err(|_| Error {
			code: SQLITE_MISUSE,
			message: "database path contains a NUL byte".to_string(),
		})?;

		let mut db: *mut ffi::Sqlite3 = std::ptr::null_mut();
		let flags = SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI;

		let code =
			unsafe { ffi::sqlite3_open_v2(path_c.as_ptr(), &raw mut db, flags, std::ptr::null()) };
		if code != SQLITE_OK {
			let error = sqlite_error(db, code);
			if !db.is_null() {
				let _ = unsafe { ffi::sqlite3_close_v2(db) };
			}
			return Err(error);
		}

		let db = NonNull::new(db).ok_or_else(|| Error {
			code: SQLITE_MISUSE,
			message: "SQLite returned a null connection handle".to_string(),
		})?;

		let _ = unsafe { ffi::sqlite3_extended_result_codes(db.as_ptr(), 1) };

		Ok(Self { db })
	}

	pub fn open_in_memory() -> Result<Self> {
		Self::open(":memory:")
	}

	pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
		let sql_c = CString::new(sql)
			.map_err(|_| Error { code: SQLITE_MISUSE, message: "SQL contains a NUL byte".to_string() })?;

		let mut stmt: *mut ffi::Sqlite3Stmt = std::ptr::null_mut();
		let code = unsafe {
			ffi::sqlite3_prepare_v3(
				self.db.as_ptr(),
				sql_c.as_ptr(),
				-1,
				0,
				&raw mut stmt,
				std::ptr::null_mut(),
			)
		};
		if code != SQLITE_OK {
			return Err(sqlite_error(self.db.as_ptr(), code));
		}

		let stmt = NonNull::new(stmt).ok_or_else(|| Error {
			code: SQLITE_MISUSE,
			message: "SQL did not produce a statement".to_string(),
		})?;

		Ok(Statement { conn: self, stmt })
	}

	pub fn execute(&self, sql: &str) -> Result<()> {
		let mut stmt = self.prepare(sql)?;
		while stmt.step()? {}
		Ok(())
	}

	/// Runs every statement in `sql` in order, stopping at the first error.
	pub fn execute_batch(&self, sql: &str) -> Result<()> {
		let sql_c = CString::new(sql)
			.map_err(|_| Error { code: SQLITE_MISUSE, message: "SQL contains a NUL byte".to_string() })?;

		let mut tail: *const c_char = sql_c.as_ptr();
		loop {
			let mut stmt: *mut ffi::Sqlite3Stmt = std::ptr::null_mut();
			let mut next: *const c_char = std::ptr::null();
			let code = unsafe {
				ffi::sqlite3_prepare_v3(self.db.as_ptr(), tail, -1, 0, &raw mut stmt, &raw mut next)
			};
			if code != SQLITE_OK {
				return Err(sqlite_error(self.db.as_ptr(), code));
			}

			// Whitespace and comments prepare to a null statement.
			if let Some(stmt) = NonNull::new(stmt) {
				let mut stmt = Statement { conn: self, stmt };
				while stmt.step()? {}
			}

			if next.is_null() || next == tail || unsafe { *next } == 0 {
				return Ok(());
			}
			tail = next;
		}
	}

	pub fn query_all(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
		let mut stmt = self.prepare(sql)?;
		let mut rows = Vec::new();
		while stmt.step()? {
			rows.push(stmt.row_values());
		}
		Ok(rows)
	}

	pub fn query_row(&self, sql: &str) -> Result<Option<Vec<Value>>> {
		let mut stmt = self.prepare(sql)?;
		if !stmt.step()? {
			return Ok(None);
		}

		let row = stmt.row_values();
		if stmt.step()? {
			return Err(Error {
				code: SQLITE_MISUSE,
				message: "query returned more than one row".to_string(),
			});
		}

		Ok(Some(row))
	}

	/// Connection-wide `sqlite3_changes64`: the row count of the most recently
	/// completed INSERT, UPDATE or DELETE. SQLite leaves it untouched while
	/// other statements run, so it is stale after a read.
	#[must_use]
	pub fn changes(&self) -> i64 {
		unsafe { ffi::sqlite3_changes64(self.db.as_ptr()) }
	}

	/// Rows changed by every write since the connection was opened.
	#[must_use]
	pub fn total_changes(&self) -> i64 {
		unsafe { ffi::sqlite3_total_changes64(self.db.as_ptr()) }
	}

	#[must_use]
	pub fn last_insert_rowid(&self) -> i64 {
		unsafe { ffi::sqlite3_last_insert_rowid(self.db.as_ptr()) }
	}

	#[must_use]
	pub fn is_autocommit(&self) -> bool {
		unsafe { ffi::sqlite3_get_autocommit(self.db.as_ptr()) != 0 }
	}

	/// Closes the connection, surfacing the result code that `Drop` discards.
	pub fn close(self) -> Result<()> {
		let db = self.db;
		std::mem::forget(self);

		let code = unsafe { ffi::sqlite3_close_v2(db.as_ptr()) };
		if code == SQLITE_OK {
			Ok(())
		} else {
			Err(Error { code, message: "failed to close connection".to_string() })
		}
	}

	#[must_use]
	pub const fn as_ptr(&self) -> *mut ffi::Sqlite3 {
		self.db.as_ptr()
	}
}

impl Drop for Connection {
	fn drop(&mut self) {
		let _ = unsafe { ffi::sqlite3_close_v2(self.db.as_ptr()) };
	}
}

pub struct Statement<'conn> {
	conn: &'conn Connection,
	stmt: NonNull<ffi::Sqlite3Stmt>,
}

impl Statement<'_> {
	pub fn step(&mut self) -> Result<bool> {
		let code = unsafe { ffi::sqlite3_step(self.stmt.as_ptr()) };
		match code {
			SQLITE_ROW => Ok(true),
			SQLITE_DONE => Ok(false),
			_ => Err(sqlite_error(self.conn.as_ptr(), code)),
		}
	}

	pub fn reset(&mut self) -> Result<()> {
		let code = unsafe { ffi::sqlite3_reset(self.stmt.as_ptr()) };
		check_ok(self.conn.as_ptr(), code)
	}

	/// Steps the statement to completion, discarding rows, and resets it so it
	/// can run again.
	///
	/// `changes` is taken from the connection only when this statement is a
	/// write and moved the cumulative change counter; otherwise it is 0. The
	/// connection-wide count is never carried over from an earlier statement.
	pub fn run(&mut self) -> Result<RunResult> {
		let before = self.conn.total_changes();
		while self.step()? {}

		let wrote = !self.is_readonly() && self.conn.total_changes() != before;
		let changes = if wrote { self.conn.changes() } else { 0 };
		let last_insert_rowid = self.conn.last_insert_rowid();

		self.reset()?;
		Ok(RunResult { changes, last_insert_rowid })
	}

	#[must_use]
	pub fn is_readonly(&self) -> bool {
		unsafe { ffi::sqlite3_stmt_readonly(self.stmt.as_ptr()) != 0 }
	}

	#[must_use]
	pub fn column_count(&self) -> usize {
		let n = unsafe { ffi::sqlite3_column_count(self.stmt.as_ptr()) };
		usize::try_from(n).unwrap_or_default()
	}

	#[must_use]
	pub fn row_values(&self) -> Vec<Value> {
		let mut row = Vec::with_capacity(self.column_count());
		for i in 0..self.column_count() {
			let Ok(index) = c_int::try_from(i) else {
				break;
			};
			row.push(self.column_value(index));
		}
		row
	}

	#[must_use]
	pub fn column_value(&self, index: c_int) -> Value {
		match unsafe { ffi::sqlite3_column_type(self.stmt.as_ptr(), index) } {
			SQLITE_INTEGER => {
				Value::Integer(unsafe { ffi::sqlite3_column_int64(self.stmt.as_ptr(), index) })
			}
			SQLITE_FLOAT => {
				Value::Float(unsafe { ffi::sqlite3_column_double(self.stmt.as_ptr(), index) })
			}
			SQLITE_TEXT => {
				let bytes = unsafe { ffi::sqlite3_column_bytes(self.stmt.as_ptr(), index) };
				let ptr = unsafe { ffi::sqlite3_column_text(self.stmt.as_ptr(), index) };
				if ptr.is_null() || bytes <= 0 {
					Value::Text(String::new())
				} else {
					let slice =
						unsafe { std::slice::from_raw_parts(ptr, usize::try_from(bytes).unwrap_or_default()) };
					Value::Text(String::from_utf8_lossy(slice).into_owned())
				}
			}
			SQLITE_BLOB => {
				let bytes = unsafe { ffi::sqlite3_column_bytes(self.stmt.as_ptr(), index) };
				let ptr = unsafe { ffi::sqlite3_column_blob(self.stmt.as_ptr(), index) };
				if ptr.is_null() || bytes <= 0 {
					Value::Blob(Vec::new())
				} else {
					let slice = unsafe {
						std::slice::from_raw_parts(ptr.cast::<u8>(), usize::try_from(bytes).unwrap_or_default())
					};
					Value::Blob(slice.to_vec())
				}
			}
			_ => Value::Null,
		}
	}
}

impl Drop for Statement<'_> {
	fn drop(&mut self) {
		let _ = unsafe { ffi::sqlite3_finalize(self.stmt.as_ptr()) };
	}
}

fn check_ok(db: *mut ffi::Sqlite3, code: c_int) -> Result<()> {
	if code == SQLITE_OK { Ok(()) } else { Err(sqlite_error(db, code)) }
}

fn sqlite_error(db: *mut ffi::Sqlite3, code: c_int) -> Error {
	Error { code, message: db_error_message(db) }
}

fn db_error_message(db: *mut ffi::Sqlite3) -> String {
	if db.is_null() {
		return "SQLite error".to_string();
	}

	let message_ptr = unsafe { ffi::sqlite3_errmsg(db) };
	if message_ptr.is_null() {
		return "SQLite error".to_string();
	}

	unsafe { CStr::from_ptr(message_ptr).to_string_lossy().into_owned() }
}

pub fn sqlite_lib_version() -> String {
	changecheck_sqlite_ffi::sqlite_lib_version()
}

pub fn sqlite_lib_version_number() -> i32 {
	changecheck_sqlite_ffi::sqlite_lib_version_number()
}
