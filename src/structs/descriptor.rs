//! This module defines *ModDescriptor*, the launcher's view of one installed mod.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Describes one mod package found in a game's mod folder.
/// Descriptors are built fresh on every scan and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModDescriptor {
	/// The name declared by the manifest.
	/// This is the key a registry indexes mods by.
	pub name: String,

	/// The file name of the manifest this mod was read from, such as `HPM.mod`.
	/// The launch step builds each `-mod=` flag from this.
	pub manifest_file: String,

	/// Names of the mods this one declares as dependencies, in declaration order.
	/// These are not checked against the registry.
	pub dependencies: Vec<String>,

	/// A segregated save and settings directory this mod uses.
	/// An empty string means the game's default directory.
	pub user_dir: String,

	/// The repository this mod is published on, used by the update checker.
	pub repository: Option<String>,

	/// The release this mod claims to be.
	pub version: Option<String>,
}

impl ModDescriptor {
	/// Builds a descriptor with only a name and manifest file set.
	pub fn new(name: impl Into<String>, manifest_file: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			manifest_file: manifest_file.into(),
			dependencies: Vec::new(),
			user_dir: String::new(),
			repository: None,
			version: None,
		}
	}

	/// Returns this mod's user directory, or *None* if it uses the game's default.
	pub fn user_dir(&self) -> Option<&str> {
		match self.user_dir.trim() {
			"" => None,
			dir => Some(dir),
		}
	}
}

impl Display for ModDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name)
	}
}
