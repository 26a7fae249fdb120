//! This module parses mod manifests (`*.mod` files) into *ModDescriptor*s.
//!
//! A manifest is a line-oriented list of `key = value` or `key = { ... }` entries:
//!
//! ```text
//! name = "Pop Demand Mod"
//! path = "mod/PDM"
//! user_dir = "PDM"
//! dependencies = { "Base Fixes", "HPM" }
//! github = "https://github.com/example/pdm"
//! version = "2.1"
//! ```
//!
//! Parsing never fails on a single bad line.
//! Unknown keys and lines that don't look like entries are ignored.

use std::{fs, path::Path};

use crate::{prelude::*, util::misc::unquote};

/// Reads and parses the manifest at *path*.
/// The file is decoded as lossy UTF-8, so stray bytes never make a manifest unreadable.
pub fn read_manifest(path: &Path) -> Result<ModDescriptor, ParseError> {
	let bytes = fs::read(path).map_err(|source| ParseError::Unreadable {
		path: path.to_owned(),
		source,
	})?;

	let text = String::from_utf8_lossy(&bytes);
	let file_name = path
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_default();

	parse_manifest(&text, &file_name).ok_or_else(|| ParseError::MissingName(path.to_owned()))
}

/// Parses manifest text into a descriptor.
/// Returns *None* if the manifest never declares a non-empty name.
pub fn parse_manifest(text: &str, manifest_file: &str) -> Option<ModDescriptor> {
	let mut descriptor = ModDescriptor::new(String::new(), manifest_file);
	let mut lines = text.lines();

	while let Some(line) = lines.next() {
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}

		let Some((key, value)) = line.split_once('=') else {
			trace!("{manifest_file}: ignoring line without '=': {line}");
			continue;
		};

		match key.trim() {
			"name" => descriptor.name = unquote(value).to_owned(),
			"user_dir" => descriptor.user_dir = unquote(value).to_owned(),
			"github" => descriptor.repository = non_empty(unquote(value)),
			"version" => descriptor.version = non_empty(unquote(value)),
			"dependencies" => descriptor.dependencies = read_list(value, &mut lines),
			_ => {}
		}
	}

	if descriptor.name.is_empty() {
		return None;
	}

	Some(descriptor)
}

/// Reads a brace-delimited list of (usually quoted) names.
/// If the closing brace isn't on the same line, following lines are consumed until it is found.
fn read_list<'a>(first: &'a str, rest: &mut impl Iterator<Item = &'a str>) -> Vec<String> {
	let mut body = first.trim().trim_start_matches('{').to_owned();

	while !body.contains('}') {
		match rest.next() {
			Some(line) => {
				body.push(' ');
				body.push_str(line.trim());
			},
			None => break,
		}
	}

	let body = body.split('}').next().unwrap_or_default();

	split_list_items(body)
}

/// Splits the inside of a list on commas and whitespace outside of quotes.
fn split_list_items(body: &str) -> Vec<String> {
	let mut items = Vec::new();
	let mut current = String::new();
	let mut in_quotes = false;

	for ch in body.chars() {
		match ch {
			'"' => in_quotes = !in_quotes,
			',' if !in_quotes => items.push(std::mem::take(&mut current)),
			c if c.is_whitespace() && !in_quotes => items.push(std::mem::take(&mut current)),
			c => current.push(c),
		}
	}
	items.push(current);

	items
		.into_iter()
		.map(|i| i.trim().to_owned())
		.filter(|i| !i.is_empty())
		.collect()
}

fn non_empty(value: &str) -> Option<String> {
	(!value.is_empty()).then(|| value.to_owned())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_every_known_field() {
		let text = r#"
name = "Pop Demand Mod"
path = "mod/PDM"
user_dir = "PDM"
dependencies = { "Base Fixes", "HPM" }
github = "https://github.com/example/pdm"
version = "2.1"
"#;

		let descriptor = parse_manifest(text, "PDM.mod").unwrap();
		assert_eq!(descriptor.name, "Pop Demand Mod");
		assert_eq!(descriptor.manifest_file, "PDM.mod");
		assert_eq!(descriptor.user_dir(), Some("PDM"));
		assert_eq!(descriptor.dependencies, vec!["Base Fixes", "HPM"]);
		assert_eq!(descriptor.repository.as_deref(), Some("https://github.com/example/pdm"));
		assert_eq!(descriptor.version.as_deref(), Some("2.1"));
	}

	#[test]
	fn manifest_without_name_is_rejected() {
		assert!(parse_manifest("user_dir = \"X\"\n", "X.mod").is_none());
		assert!(parse_manifest("name = \"\"\n", "X.mod").is_none());
	}

	#[test]
	fn malformed_lines_do_not_abort_parsing() {
		let text = "garbage line\n{{{\nname = \"Still Here\"\n= orphan value\n";
		let descriptor = parse_manifest(text, "S.mod").unwrap();
		assert_eq!(descriptor.name, "Still Here");
		assert!(descriptor.dependencies.is_empty());
		assert_eq!(descriptor.user_dir(), None);
	}

	#[test]
	fn dependencies_may_span_lines() {
		let text = "name = \"Child\"\ndependencies = {\n\t\"Parent One\"\n\t\"Parent Two\"\n}\nuser_dir = \"C\"\n";
		let descriptor = parse_manifest(text, "Child.mod").unwrap();
		assert_eq!(descriptor.dependencies, vec!["Parent One", "Parent Two"]);
		assert_eq!(descriptor.user_dir, "C");
	}

	#[test]
	fn unknown_keys_are_ignored() {
		let text = "name=\"A\"\nreplace_path = \"history/pops\"\narchive = \"a.zip\"\n";
		let descriptor = parse_manifest(text, "A.mod").unwrap();
		assert_eq!(descriptor, ModDescriptor::new("A", "A.mod"));
	}

	#[test]
	fn empty_dependency_list_is_empty() {
		let descriptor = parse_manifest("name = \"A\"\ndependencies = {}\n", "A.mod").unwrap();
		assert!(descriptor.dependencies.is_empty());
	}

	#[test]
	fn unreadable_file_reports_its_path() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing.mod");

		match read_manifest(&path) {
			Err(ParseError::Unreadable { path: reported, .. }) => assert_eq!(reported, path),
			other => panic!("unexpected result: {other:?}"),
		}
	}

	#[test]
	fn invalid_utf8_is_tolerated() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("latin.mod");
		fs::write(&path, b"name = \"Caf\xe9 Mod\"\n").unwrap();

		let descriptor = read_manifest(&path).unwrap();
		assert!(descriptor.name.starts_with("Caf"));
		assert_eq!(descriptor.manifest_file, "latin.mod");
	}
}
