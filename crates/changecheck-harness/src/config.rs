use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::permute::permutations;
use crate::scenario::{DEFAULT_SCHEMA, Scenario, catalog};
use crate::session::Reporting;

pub const DEFAULT_DEPTH: usize = 4;
pub const MAX_DEPTH: usize = 5;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
	/// Fixture DDL applied to every fresh database.
	pub schema: String,
	pub reporting: Reporting,
	/// Longest enumerated statement sequence.
	pub depth: usize,
	/// Run enumerated sequences in addition to the catalog.
	pub permutations: bool,
}

impl Default for HarnessConfig {
	fn default() -> Self {
		Self {
			schema: DEFAULT_SCHEMA.to_string(),
			reporting: Reporting::default(),
			depth: DEFAULT_DEPTH,
			permutations: true,
		}
	}
}

impl HarnessConfig {
	pub fn load(path: &Path) -> Result<Self> {
		let text = fs::read_to_string(path)
			.map_err(|source| HarnessError::ConfigRead { path: path.to_path_buf(), source })?;
		let config: Self = toml::from_str(&text)
			.map_err(|source| HarnessError::ConfigParse { path: path.to_path_buf(), source })?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.schema.trim().is_empty() {
			return Err(HarnessError::Config("schema must not be empty".to_string()));
		}
		if !(1..=MAX_DEPTH).contains(&self.depth) {
			return Err(HarnessError::Config(format!(
				"depth must be between 1 and {MAX_DEPTH}, got {}",
				self.depth
			)));
		}
		Ok(())
	}

	/// Catalog scenarios followed by the enumerated ones, when enabled.
	#[must_use]
	pub fn scenarios(&self) -> Vec<Scenario> {
		let mut scenarios = catalog();
		if self.permutations {
			scenarios.extend(permutations(self.depth));
		}
		scenarios
	}
}
