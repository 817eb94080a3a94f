use std::io::Write as _;

use changecheck_harness::{HarnessConfig, HarnessError, Reporting, run_suite};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
	let mut file = tempfile::NamedTempFile::new().expect("create temp config");
	file.write_all(contents.as_bytes()).expect("write temp config");
	file
}

#[test]
fn loads_settings_from_toml() {
	let file = write_config(
		"schema = \"\"\"\nCREATE TABLE test_table (id INTEGER, name TEXT);\nCREATE TABLE audit (note TEXT);\n\"\"\"\nreporting = \"connection\"\ndepth = 2\npermutations = false\n",
	);

	let config = HarnessConfig::load(file.path()).expect("load config");
	assert_eq!(config.reporting, Reporting::Connection);
	assert_eq!(config.depth, 2);
	assert!(!config.permutations);

	let statement = HarnessConfig { reporting: Reporting::Statement, ..config };
	let report = run_suite(&statement, &statement.scenarios());
	assert!(report.is_success(), "{}", report.render_text(false));
}

#[test]
fn missing_file_is_a_read_error() {
	let dir = tempfile::tempdir().expect("create temp dir");
	let err = HarnessConfig::load(&dir.path().join("absent.toml")).expect_err("missing file");
	assert!(matches!(err, HarnessError::ConfigRead { .. }), "{err:?}");
}

#[test]
fn malformed_toml_is_a_parse_error() {
	let file = write_config("depth = \"deep\"\n");
	let err = HarnessConfig::load(file.path()).expect_err("bad depth type");
	assert!(matches!(err, HarnessError::ConfigParse { .. }), "{err:?}");
}

#[test]
fn loaded_config_is_validated() {
	let file = write_config("depth = 9\n");
	let err = HarnessConfig::load(file.path()).expect_err("depth too large");
	assert_eq!(err.to_string(), "invalid configuration: depth must be between 1 and 5, got 9");
}
