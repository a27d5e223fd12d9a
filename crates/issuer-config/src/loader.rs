//! Loader for configurations split across several files.
//!
//! The main file may name other files under `include`. Every top-level section
//! must come from exactly one file, so a secrets file can carry `[account]`
//! while the checked-in file carries everything else.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Reads a main configuration file and the files it includes.
pub struct ConfigLoader {
	/// Directory relative include paths are resolved against.
	base_path: PathBuf,
	/// Canonical paths already read; a second visit is a cycle.
	visited: HashSet<PathBuf>,
	/// File each top-level section came from.
	owners: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			visited: HashSet::new(),
			owners: HashMap::new(),
		}
	}

	/// Loads `config_path` with its includes and validates the result.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let main_path = self.locate(config_path.as_ref())?;
		let mut root = self.read_table(&main_path).await?;

		let includes = match root.remove("include") {
			None => Vec::new(),
			Some(value) => include_paths(value)?,
		};
		for key in root.keys() {
			self.owners.insert(key.clone(), main_path.clone());
		}

		for include in includes {
			let path = self.locate(&include)?;
			let table = self.read_table(&path).await?;
			if table.contains_key("include") {
				return Err(ConfigError::Validation(format!(
					"Nested include in {} is not supported",
					path.display()
				)));
			}
			self.merge(&mut root, table, &path)?;
		}

		Config::from_value(toml::Value::Table(root))
	}

	/// Moves every section of `table` into `root`, rejecting sections that
	/// another file already defined.
	fn merge(
		&mut self,
		root: &mut toml::Table,
		table: toml::Table,
		source: &Path,
	) -> Result<(), ConfigError> {
		for (key, value) in table {
			if let Some(owner) = self.owners.get(&key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}. \
					Each top-level section must be unique across all configuration files.",
					key,
					owner.display(),
					source.display()
				)));
			}
			self.owners.insert(key.clone(), source.to_path_buf());
			root.insert(key, value);
		}
		Ok(())
	}

	/// Reads one file, resolves environment variables and parses it.
	async fn read_table(&mut self, path: &Path) -> Result<toml::Table, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;
		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		let resolved = resolve_env_vars(&content)?;
		Ok(toml::from_str(&resolved)?)
	}

	/// Resolves `path` against the base directory; the file must exist.
	fn locate(&self, path: &Path) -> Result<PathBuf, ConfigError> {
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}
		Ok(resolved)
	}
}

/// Accepts `include = "file.toml"` as well as `include = ["a.toml", "b.toml"]`.
fn include_paths(value: toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match value {
		toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
		toml::Value::Array(items) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(ConfigError::Validation(
					"Include array must contain only strings".into(),
				)),
			})
			.collect(),
		_ => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}
