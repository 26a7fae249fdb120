//! This module provides *ActivationModel*, the user's ordered selection of active mods.
//!
//! Activation order matters: when several active mods declare a user directory,
//! the last one in the selection decides where the game keeps its saves and settings.
//! Dependencies only shape the display hierarchy; they never force a mod on or off.

use std::fmt;

use crate::{prelude::*, registry::ModRegistry};

/// A hook that is called with the new selection after every change.
pub type PersistHook = Box<dyn FnMut(&[String]) -> AppResult<()>>;

/// The ordered set of active mods over a *ModRegistry*.
/// Every active name is guaranteed to be installed in the wrapped registry.
pub struct ActivationModel {
	registry: ModRegistry,
	active: Vec<String>,
	persist: Option<PersistHook>,
}

impl ActivationModel {
	/// Wraps a registry with an empty selection.
	pub fn new(registry: ModRegistry) -> Self {
		Self {
			registry,
			active: Vec::new(),
			persist: None,
		}
	}

	/// Attaches a hook that saves the selection after every change.
	pub fn with_persistence(mut self, hook: impl FnMut(&[String]) -> AppResult<()> + 'static) -> Self {
		self.persist = Some(Box::new(hook));
		self
	}

	/// The registry this selection is validated against.
	pub fn registry(&self) -> &ModRegistry {
		&self.registry
	}

	/// Swaps in a freshly scanned registry.
	/// Active mods that are no longer installed are dropped, and the remaining order is kept.
	pub fn replace_registry(&mut self, registry: ModRegistry) -> AppResult<()> {
		self.registry = registry;

		let before = self.active.len();
		let registry = &self.registry;
		self.active.retain(|name| registry.contains(name));

		if self.active.len() != before {
			info!("Dropped {} active mod(s) that are no longer installed.", before - self.active.len());
			self.persist()?;
		}

		Ok(())
	}

	/// Turns a single mod on or off.
	///
	/// Activating appends the mod to the end of the selection, so the order reflects the order mods were picked in.
	/// Unknown names and requests that change nothing are ignored, and `Ok(false)` is returned for them.
	pub fn set_active(&mut self, name: &str, is_active: bool) -> AppResult<bool> {
		if !self.registry.contains(name) {
			debug!("Ignoring activation change for unknown mod {name}.");
			return Ok(false);
		}

		let position = self.active.iter().position(|n| n == name);
		match (is_active, position) {
			(true, None) => self.active.push(name.to_owned()),
			(false, Some(index)) => {
				self.active.remove(index);
			},
			_ => return Ok(false),
		}

		self.persist()?;
		Ok(true)
	}

	/// Replaces the whole selection, keeping the given order.
	/// Names that aren't installed, and repeats of a name, are filtered out.
	pub fn set_active_set<S: AsRef<str>>(&mut self, ordered_names: &[S]) -> AppResult<()> {
		let mut seen = IndexSet::new();

		for name in ordered_names.iter().map(AsRef::as_ref) {
			if !self.registry.contains(name) {
				debug!("Skipping {name}, as it is not installed.");
				continue;
			}

			seen.insert(name.to_owned());
		}

		self.active = seen.into_iter().collect();
		self.persist()
	}

	/// The current selection, in activation order.
	pub fn active_mods(&self) -> &[String] {
		&self.active
	}

	/// Checks if *name* is currently active.
	pub fn is_active(&self, name: &str) -> bool {
		self.active.iter().any(|n| n == name)
	}

	/// Resolves the user directory the game will run with.
	///
	/// This is the user directory of the last active mod that declares one,
	/// or an empty string if none do.
	pub fn effective_user_dir(&self) -> &str {
		self.active
			.iter()
			.rev()
			.filter_map(|name| self.registry.descriptor(name))
			.find_map(|m| m.user_dir())
			.unwrap_or_default()
	}

	/// Iterates over the descriptors of every active mod, in activation order.
	pub fn active_descriptors(&self) -> impl Iterator<Item = &ModDescriptor> {
		self.active.iter().filter_map(|name| self.registry.descriptor(name))
	}

	fn persist(&mut self) -> AppResult<()> {
		match self.persist.as_mut() {
			Some(hook) => hook(&self.active),
			None => Ok(()),
		}
	}
}

impl fmt::Debug for ActivationModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActivationModel")
			.field("registry", &self.registry)
			.field("active", &self.active)
			.field("persist", &self.persist.is_some())
			.finish()
	}
}
