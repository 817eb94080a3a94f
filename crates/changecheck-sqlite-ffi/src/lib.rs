use std::ffi::CStr;

pub mod ffi;

// Referencing the crate keeps its static SQLite archive on the link line.
#[cfg(feature = "bundled-sqlite")]
use libsqlite3_sys as _;

/// First release with `sqlite3_changes64` and `sqlite3_total_changes64`.
pub const MIN_SQLITE_VERSION_NUMBER: i32 = 3_037_000;

pub fn sqlite_lib_version_number() -> i32 {
	unsafe { ffi::sqlite3_libversion_number() }
}

pub fn sqlite_lib_version() -> String {
	unsafe { CStr::from_ptr(ffi::sqlite3_libversion()).to_string_lossy().into_owned() }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn linked_sqlite_has_64_bit_change_counters() {
		assert!(sqlite_lib_version_number() >= MIN_SQLITE_VERSION_NUMBER);
	}

	#[test]
	fn has_sqlite_version_text() {
		let version = sqlite_lib_version();
		assert!(version.starts_with("3."), "unexpected version {version}");
	}
}
