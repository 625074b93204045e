//! Container configuration
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! root_tag = "root"
//! max_resolution_depth = 100
//! dispose_on_drop = true
//! ```

use crate::{DiError, DiResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default limit on nested resolutions within one operation
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 100;

/// Default tag of the root lifetime scope
pub const DEFAULT_ROOT_TAG: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
	/// Tag given to the root lifetime scope
	pub root_tag: String,
	/// Nesting limit after which a resolve fails with
	/// [`DiError::MaxDepthExceeded`]
	pub max_resolution_depth: usize,
	/// Dispose the root scope when the [`Container`](crate::Container) is dropped
	pub dispose_on_drop: bool,
}

impl Default for ContainerConfig {
	fn default() -> Self {
		Self {
			root_tag: DEFAULT_ROOT_TAG.to_string(),
			max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
			dispose_on_drop: true,
		}
	}
}

impl ContainerConfig {
	pub fn from_toml_str(contents: &str) -> DiResult<Self> {
		let config: Self = toml::from_str(contents)
			.map_err(|e| DiError::Configuration(format!("TOML parse error: {}", e)))?;
		config.validate()
	}

	pub fn from_json_str(contents: &str) -> DiResult<Self> {
		let config: Self = serde_json::from_str(contents)
			.map_err(|e| DiError::Configuration(format!("JSON parse error: {}", e)))?;
		config.validate()
	}

	/// Loads a `.toml` or `.json` configuration file
	pub fn from_file(path: impl Into<PathBuf>) -> DiResult<Self> {
		let path = path.into();
		let contents = std::fs::read_to_string(&path).map_err(|e| {
			DiError::Configuration(format!("Failed to read {}: {}", path.display(), e))
		})?;

		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Self::from_toml_str(&contents),
			Some("json") => Self::from_json_str(&contents),
			_ => Err(DiError::Configuration(
				"Supported formats: .toml, .json".to_string(),
			)),
		}
	}

	fn validate(self) -> DiResult<Self> {
		if self.max_resolution_depth == 0 {
			return Err(DiError::Configuration(
				"max_resolution_depth must be at least 1".to_string(),
			));
		}
		if self.root_tag.is_empty() {
			return Err(DiError::Configuration(
				"root_tag must not be empty".to_string(),
			));
		}
		Ok(self)
	}
}
