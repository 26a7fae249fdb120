//! This module provides *PresetStore*, a set of named snapshots of a mod selection.

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Named mod selections, kept in the order they were first saved.
/// This serializes as a plain JSON object, which is how the launcher settings store keeps it under `presets`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetStore {
	presets: IndexMap<String, Vec<String>>,
}

impl PresetStore {
	/// Lists every preset name.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.presets.keys().map(String::as_str)
	}

	/// Returns the mods saved under *name*, in their saved order.
	pub fn get(&self, name: &str) -> Option<&[String]> {
		self.presets.get(name).map(Vec::as_slice)
	}

	/// Saves *mods* under *name*.
	/// An existing preset with that name is overwritten in place, and its previous contents are returned.
	pub fn save(&mut self, name: &str, mods: &[String]) -> Option<Vec<String>> {
		let previous = self.presets.insert(name.to_owned(), mods.to_vec());

		if previous.is_some() {
			info!("Overwrote preset {name}.");
		}

		previous
	}

	/// Removes the preset called *name*, returning its contents if it existed.
	/// Remaining presets keep their order.
	pub fn delete(&mut self, name: &str) -> Option<Vec<String>> {
		self.presets.shift_remove(name)
	}

	/// The number of saved presets.
	pub fn len(&self) -> usize {
		self.presets.len()
	}

	/// Checks if there are no saved presets.
	pub fn is_empty(&self) -> bool {
		self.presets.is_empty()
	}
}
