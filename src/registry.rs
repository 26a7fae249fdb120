//! This module provides *ModRegistry*, the set of mods found in a game's mod folder.
//!
//! A registry is rebuilt from scratch on every scan.
//! Besides indexing descriptors by name, it derives a display hierarchy:
//! each mod hangs under the first of its declared dependencies that is installed,
//! and mods without such a dependency are top-level.

use std::{
	ffi::OsStr,
	path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::{manifest::read_manifest, prelude::*};

/// The file extension of mod manifests.
pub const MANIFEST_EXTENSION: &str = "mod";

/// Every mod found in one mod folder, indexed by name.
#[derive(Debug, Default)]
pub struct ModRegistry {
	/// The folder this registry was scanned from.
	directory: PathBuf,

	/// Descriptors keyed by name, in scan order.
	mods: IndexMap<String, ModDescriptor>,

	/// The display parent of every mod, or *None* for top-level mods.
	parents: IndexMap<String, Option<String>>,

	/// Problems noticed during the scan that didn't stop it.
	warnings: Vec<RegistryWarning>,
}

/// One entry of the display hierarchy, along with everything nested under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
	/// The mod's name.
	pub name: String,

	/// Mods whose first installed dependency is this one, in scan order.
	pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
	/// Visits this node and its descendants depth-first, passing each one's nesting depth.
	pub fn walk<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a HierarchyNode, usize)) {
		visit(self, depth);
		for child in self.children.iter() {
			child.walk(depth + 1, visit);
		}
	}
}

impl ModRegistry {
	/// Scans *directory* (non-recursively) for manifests and builds a registry from them.
	///
	/// Manifests are visited in file name order.
	/// When two manifests declare the same name, the later one wins and a warning is recorded.
	/// Manifests that can't be read or don't declare a name are skipped with a warning.
	pub fn load(directory: impl AsRef<Path>) -> AppResult<Self> {
		let directory = directory.as_ref();

		if !directory.is_dir() {
			return Err(RegistryError::DirectoryNotFound(directory.to_owned()).into());
		}

		let walker = WalkDir::new(directory)
			.min_depth(1)
			.max_depth(1)
			.sort_by_file_name()
			.into_iter()
			.filter_map(|r| r.ok())
			.filter(|e| e.file_type().is_file())
			.filter(|e| e.path().extension() == Some(OsStr::new(MANIFEST_EXTENSION)));

		let mut descriptors = Vec::new();
		let mut warnings = Vec::new();

		for entry in walker {
			match read_manifest(entry.path()) {
				Ok(descriptor) => descriptors.push(descriptor),
				Err(error) => {
					warn!("{error}");
					warnings.push(RegistryWarning::Skipped(error));
				},
			}
		}

		let mut registry = Self::from_descriptors(descriptors);
		registry.directory = directory.to_owned();
		warnings.append(&mut registry.warnings);
		registry.warnings = warnings;

		info!("Found {} mod(s) in '{}'.", registry.len(), directory.display());
		Ok(registry)
	}

	/// Builds a registry from descriptors that have already been parsed, in the order given.
	pub fn from_descriptors(descriptors: impl IntoIterator<Item = ModDescriptor>) -> Self {
		let mut mods: IndexMap<String, ModDescriptor> = IndexMap::new();
		let mut warnings = Vec::new();

		for descriptor in descriptors {
			let name = descriptor.name.clone();

			if let Some(old) = mods.insert(name.clone(), descriptor) {
				let kept = mods[&name].manifest_file.clone();
				warn!("Mod {name} is declared by both '{}' and '{kept}'; using '{kept}'.", old.manifest_file);

				warnings.push(RegistryWarning::DuplicateName {
					name,
					replaced: old.manifest_file,
					kept,
				});
			}
		}

		let (parents, cycles) = assign_parents(&mods);
		for cycle in cycles {
			warn!("Dependency cycle between {}; showing them as top-level mods.", cycle.iter().join(", "));
			warnings.push(RegistryWarning::DependencyCycle(cycle));
		}

		Self {
			directory: PathBuf::new(),
			mods,
			parents,
			warnings,
		}
	}

	/// The folder this registry was scanned from.
	pub fn directory(&self) -> &Path {
		&self.directory
	}

	/// Iterates over every mod, in scan order.
	pub fn all_mods(&self) -> impl Iterator<Item = &ModDescriptor> {
		self.mods.values()
	}

	/// Returns the descriptor for *name*, if that mod is installed.
	pub fn descriptor(&self, name: &str) -> Option<&ModDescriptor> {
		self.mods.get(name)
	}

	/// Checks if a mod named *name* is installed.
	pub fn contains(&self, name: &str) -> bool {
		self.mods.contains_key(name)
	}

	/// Returns the dependencies *name* declares, whether they are installed or not.
	pub fn dependencies_of(&self, name: &str) -> Option<&[String]> {
		self.mods.get(name).map(|m| m.dependencies.as_slice())
	}

	/// Returns the mod *name* is displayed under, or *None* if it is top-level or unknown.
	pub fn parent_of(&self, name: &str) -> Option<&str> {
		self.parents.get(name).and_then(|p| p.as_deref())
	}

	/// Lists every declared dependency that isn't installed, as `(mod, missing dependency)` pairs.
	pub fn missing_dependencies(&self) -> Vec<(&str, &str)> {
		self.mods
			.values()
			.flat_map(|m| {
				m.dependencies
					.iter()
					.filter(|d| !self.mods.contains_key(d.as_str()))
					.map(move |d| (m.name.as_str(), d.as_str()))
			})
			.collect()
	}

	/// Builds the display forest.
	/// Roots and siblings both keep scan order, and every mod appears exactly once.
	pub fn hierarchy_roots(&self) -> Vec<HierarchyNode> {
		let mut children: IndexMap<&str, Vec<&str>> = IndexMap::new();
		let mut roots = Vec::new();

		for (name, parent) in self.parents.iter() {
			match parent {
				Some(parent) => children.entry(parent.as_str()).or_default().push(name.as_str()),
				None => roots.push(name.as_str()),
			}
		}

		roots.into_iter().map(|r| build_node(r, &children)).collect()
	}

	/// Problems noticed while building this registry.
	pub fn warnings(&self) -> &[RegistryWarning] {
		&self.warnings
	}

	/// Hands this registry's warnings over to the caller, leaving none behind.
	pub fn take_warnings(&mut self) -> Vec<RegistryWarning> {
		std::mem::take(&mut self.warnings)
	}

	/// The number of installed mods.
	pub fn len(&self) -> usize {
		self.mods.len()
	}

	/// Checks if no mods are installed.
	pub fn is_empty(&self) -> bool {
		self.mods.is_empty()
	}
}

fn build_node(name: &str, children: &IndexMap<&str, Vec<&str>>) -> HierarchyNode {
	let nested = children
		.get(name)
		.map(|c| c.iter().map(|c| build_node(c, children)).collect())
		.unwrap_or_default();

	HierarchyNode {
		name: name.to_owned(),
		children: nested,
	}
}

/// Picks every mod's display parent: its first declared dependency that is installed.
///
/// Following parents from any mod either reaches a top-level mod or loops.
/// Every mod on such a loop is made top-level, and each loop is returned so it can be reported.
fn assign_parents(mods: &IndexMap<String, ModDescriptor>) -> (IndexMap<String, Option<String>>, Vec<Vec<String>>) {
	let mut parents: IndexMap<String, Option<String>> = mods
		.values()
		.map(|m| {
			let parent = m.dependencies.iter().find(|d| mods.contains_key(d.as_str())).cloned();
			(m.name.clone(), parent)
		})
		.collect();

	// Each mod has at most one parent, so a walk from any mod is a simple chain.
	// Nodes are settled once their chain is known to end at a root.
	let mut settled: IndexSet<String> = IndexSet::new();
	let mut cycles = Vec::new();

	for start in mods.keys() {
		let mut path: IndexSet<String> = IndexSet::new();
		let mut current = Some(start.clone());

		while let Some(name) = current {
			if settled.contains(&name) {
				break;
			}

			if let Some(index) = path.get_index_of(&name) {
				let cycle: Vec<String> = path.iter().skip(index).cloned().collect();
				for member in cycle.iter() {
					parents[member] = None;
				}
				cycles.push(cycle);
				break;
			}

			current = parents[&name].clone();
			path.insert(name);
		}

		settled.extend(path);
	}

	(parents, cycles)
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;

	fn descriptor(name: &str, deps: &[&str]) -> ModDescriptor {
		ModDescriptor {
			dependencies: deps.iter().map(|d| d.to_string()).collect(),
			..ModDescriptor::new(name, format!("{name}.mod"))
		}
	}

	fn names(nodes: &[HierarchyNode]) -> Vec<&str> {
		nodes.iter().map(|n| n.name.as_str()).collect()
	}

	fn count(nodes: &[HierarchyNode]) -> usize {
		let mut total = 0;
		for node in nodes {
			node.walk(0, &mut |_, _| total += 1);
		}
		total
	}

	#[test]
	fn mod_nests_under_first_installed_dependency() {
		let registry = ModRegistry::from_descriptors([
			descriptor("Base", &[]),
			descriptor("Other", &[]),
			descriptor("Child", &["Missing", "Other", "Base"]),
		]);

		assert_eq!(registry.parent_of("Child"), Some("Other"));

		let roots = registry.hierarchy_roots();
		assert_eq!(names(&roots), vec!["Base", "Other"]);
		assert_eq!(names(&roots[1].children), vec!["Child"]);
	}

	#[test]
	fn mod_without_installed_dependency_is_top_level() {
		let registry = ModRegistry::from_descriptors([descriptor("Orphan", &["Gone", "Also Gone"])]);

		assert_eq!(registry.parent_of("Orphan"), None);
		assert_eq!(names(&registry.hierarchy_roots()), vec!["Orphan"]);
		assert_eq!(registry.missing_dependencies(), vec![("Orphan", "Gone"), ("Orphan", "Also Gone")]);
	}

	#[test]
	fn deep_chains_nest() {
		let registry = ModRegistry::from_descriptors([
			descriptor("C", &["B"]),
			descriptor("B", &["A"]),
			descriptor("A", &[]),
		]);

		let roots = registry.hierarchy_roots();
		assert_eq!(names(&roots), vec!["A"]);
		assert_eq!(names(&roots[0].children), vec!["B"]);
		assert_eq!(names(&roots[0].children[0].children), vec!["C"]);
	}

	#[test]
	fn cycles_are_reported_and_flattened() {
		let mut registry = ModRegistry::from_descriptors([
			descriptor("A", &["B"]),
			descriptor("B", &["A"]),
			descriptor("Hanger", &["A"]),
			descriptor("Selfish", &["Selfish"]),
		]);

		assert_eq!(registry.parent_of("A"), None);
		assert_eq!(registry.parent_of("B"), None);
		assert_eq!(registry.parent_of("Hanger"), Some("A"));
		assert_eq!(registry.parent_of("Selfish"), None);

		let roots = registry.hierarchy_roots();
		assert_eq!(count(&roots), registry.len());

		let cycles: Vec<Vec<String>> = registry
			.take_warnings()
			.into_iter()
			.filter_map(|w| match w {
				RegistryWarning::DependencyCycle(c) => Some(c),
				_ => None,
			})
			.collect();

		assert_eq!(cycles, vec![vec!["A".to_owned(), "B".to_owned()], vec!["Selfish".to_owned()]]);
	}

	#[test]
	fn every_mod_appears_exactly_once() {
		let registry = ModRegistry::from_descriptors([
			descriptor("A", &[]),
			descriptor("B", &["A"]),
			descriptor("C", &["A", "B"]),
			descriptor("D", &["C"]),
			descriptor("E", &["X"]),
		]);

		let mut seen = Vec::new();
		for root in registry.hierarchy_roots() {
			root.walk(0, &mut |n, _| seen.push(n.name.clone()));
		}
		seen.sort();

		assert_eq!(seen, vec!["A", "B", "C", "D", "E"]);
	}

	#[test]
	fn later_duplicate_wins() {
		let registry = ModRegistry::from_descriptors([
			ModDescriptor::new("Same", "a.mod"),
			ModDescriptor::new("Same", "b.mod"),
		]);

		assert_eq!(registry.len(), 1);
		assert_eq!(registry.descriptor("Same").unwrap().manifest_file, "b.mod");
		assert!(matches!(
			registry.warnings(),
			[RegistryWarning::DuplicateName { replaced, kept, .. }] if replaced == "a.mod" && kept == "b.mod"
		));
	}

	#[test]
	fn load_scans_manifests_in_file_name_order() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.mod"), "name = \"Dup\"\nuser_dir = \"B\"\n").unwrap();
		fs::write(dir.path().join("a.mod"), "name = \"Dup\"\nuser_dir = \"A\"\n").unwrap();
		fs::write(dir.path().join("c.mod"), "dependencies = { \"Dup\" }\n").unwrap();
		fs::write(dir.path().join("notes.txt"), "name = \"Not A Mod\"\n").unwrap();
		fs::create_dir(dir.path().join("Dup")).unwrap();
		fs::write(dir.path().join("Dup/inner.mod"), "name = \"Nested\"\n").unwrap();

		let registry = ModRegistry::load(dir.path()).unwrap();

		assert_eq!(registry.len(), 1);
		assert_eq!(registry.descriptor("Dup").unwrap().user_dir, "B");
		assert_eq!(registry.directory(), dir.path());
		assert!(registry
			.warnings()
			.iter()
			.any(|w| matches!(w, RegistryWarning::Skipped(ParseError::MissingName(_)))));
	}

	#[test]
	fn load_of_missing_directory_fails() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("mod");

		assert!(matches!(
			ModRegistry::load(&missing),
			Err(AppError::Registry(RegistryError::DirectoryNotFound(p))) if p == missing
		));
	}
}
