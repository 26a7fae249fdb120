//! This module edits the game's own settings files (`settings.txt`).
//!
//! These are line-oriented `key=value` files, optionally split into `[category]` sections.
//! Edits only ever touch the line holding the changed key.
//! Every other line, including its whitespace and line ending, is written back byte-for-byte.

use std::{
	fs, io,
	path::{Path, PathBuf},
};

use crate::prelude::*;

/// The file name of the game's settings inside a user directory.
pub const SETTINGS_FILE_NAME: &str = "settings.txt";

/// The template the game starts from when it has no settings file.
const DEFAULT_SETTINGS: &str = "[graphics]
x=1920
y=1080
fullScreen=no
borderless=yes

[sound]
master_volume=50
sound_fx_volume=50
music_volume=50

[gui]
lastplayer=Player

[general]
debug_saves=0
autosave=YEARLY
update_time=1.000000
";

/// One line of a settings file, stored with its line ending.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
	raw: Vec<u8>,
}

/// How a line is understood.
#[derive(Debug, PartialEq, Eq)]
enum LineKind<'a> {
	Blank,
	Category(&'a str),
	Entry { key: &'a str, value: &'a str },
}

impl Line {
	/// The line's content without its line ending.
	fn content(&self) -> &[u8] {
		let mut end = self.raw.len();
		while end > 0 && matches!(self.raw[end - 1], b'\n' | b'\r') {
			end -= 1;
		}
		&self.raw[..end]
	}

	/// The line ending, if this line has one.
	fn ending(&self) -> &[u8] {
		&self.raw[self.content().len()..]
	}

	fn kind(&self) -> LineKind<'_> {
		let Ok(text) = std::str::from_utf8(self.content()) else {
			return LineKind::Blank;
		};

		let trimmed = text.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			return LineKind::Blank;
		}

		match trimmed.split_once('=') {
			Some((key, value)) => LineKind::Entry {
				key: key.trim(),
				value: value.trim(),
			},
			None => LineKind::Category(trimmed.trim_start_matches('[').trim_end_matches(']')),
		}
	}

	/// Rewrites this entry's value.
	/// Everything up to and including the '=' is kept, as is the line ending.
	fn replace_value(&mut self, value: &str) {
		let content = self.content();
		let Some(eq) = content.iter().position(|b| *b == b'=') else {
			return;
		};

		let mut raw = content[..=eq].to_vec();
		raw.extend_from_slice(value.as_bytes());
		raw.extend_from_slice(self.ending());
		self.raw = raw;
	}
}

/// A game settings file loaded for line-level editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
	path: PathBuf,
	lines: Vec<Line>,
}

impl GameSettings {
	/// Loads the settings file at *path*.
	pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
		let path = path.as_ref();
		let bytes = fs::read(path)?;

		Ok(Self::from_bytes(path, &bytes))
	}

	/// Writes the default settings template to *path*, unless a file is already there.
	/// Returns whether a file was written.
	pub fn create_default(path: impl AsRef<Path>) -> io::Result<bool> {
		let path = path.as_ref();
		if path.exists() {
			return Ok(false);
		}

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}

		fs::write(path, DEFAULT_SETTINGS)?;
		info!("Wrote default game settings to '{}'.", path.display());
		Ok(true)
	}

	fn from_bytes(path: &Path, bytes: &[u8]) -> Self {
		let lines = bytes
			.split_inclusive(|b| *b == b'\n')
			.map(|raw| Line { raw: raw.to_vec() })
			.collect();

		Self {
			path: path.to_owned(),
			lines,
		}
	}

	/// The file this document was loaded from.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Looks up *key*.
	/// With a *category*, only that section is searched; without one, the first match anywhere wins.
	pub fn get(&self, category: Option<&str>, key: &str) -> Option<&str> {
		let index = self.find(category, key)?;

		match self.lines[index].kind() {
			LineKind::Entry { value, .. } => Some(value),
			_ => None,
		}
	}

	/// Sets *key* to *value*, rewriting only the line that holds it.
	///
	/// If the key doesn't exist yet, a new line is added at the end of *category*
	/// (or at the end of the file if that category doesn't exist or none was given).
	pub fn set(&mut self, category: Option<&str>, key: &str, value: &str) {
		if let Some(index) = self.find(category, key) {
			self.lines[index].replace_value(value);
			return;
		}

		let newline = self.newline();
		let at = category.and_then(|c| self.category_end(c)).unwrap_or(self.lines.len());

		// The line before the new one might be the last line of a file that doesn't end in a newline.
		if at > 0 && self.lines[at - 1].ending().is_empty() {
			self.lines[at - 1].raw.extend_from_slice(newline.as_bytes());
		}

		let line = Line {
			raw: format!("{key}={value}{newline}").into_bytes(),
		};
		self.lines.insert(at, line);
	}

	/// Writes this document back to the file it was loaded from.
	pub fn save(&self) -> io::Result<()> {
		fs::write(&self.path, self.to_bytes())
	}

	/// The document's full contents.
	pub fn to_bytes(&self) -> Vec<u8> {
		self.lines.iter().flat_map(|l| l.raw.iter().copied()).collect()
	}

	/// Finds the index of the line holding *key*.
	fn find(&self, category: Option<&str>, key: &str) -> Option<usize> {
		let mut current: Option<&str> = None;

		for (index, line) in self.lines.iter().enumerate() {
			match line.kind() {
				LineKind::Category(name) => current = Some(name),
				LineKind::Entry { key: k, .. } if k == key => {
					if category.is_none() || category == current {
						return Some(index);
					}
				},
				_ => {},
			}
		}

		None
	}

	/// Finds where a new entry of *category* should go: just after its last non-blank line.
	fn category_end(&self, category: &str) -> Option<usize> {
		let start = self
			.lines
			.iter()
			.position(|l| l.kind() == LineKind::Category(category))?;

		let mut end = start + 1;
		for (index, line) in self.lines.iter().enumerate().skip(start + 1) {
			match line.kind() {
				LineKind::Category(_) => break,
				LineKind::Entry { .. } => end = index + 1,
				LineKind::Blank => {},
			}
		}

		Some(end)
	}

	/// The line ending this document already uses.
	fn newline(&self) -> &'static str {
		let crlf = self.lines.iter().any(|l| l.ending() == b"\r\n");
		if crlf {
			"\r\n"
		} else {
			"\n"
		}
	}
}

/// Where the game keeps its settings for a user directory.
pub fn settings_path(user_root: &Path, user_dir: &str) -> PathBuf {
	user_root.join(user_dir).join(SETTINGS_FILE_NAME)
}

/// Rewrites the `update_time` line of the settings file at *path*, leaving every other line untouched.
/// A missing or unreadable file is reported rather than created.
pub fn patch_update_time(path: &Path, update_time: f64) -> Result<(), LaunchError> {
	let unavailable = |source| LaunchError::ExternalSettingsUnavailable {
		path: path.to_owned(),
		source,
	};

	let mut settings = GameSettings::open(path).map_err(unavailable)?;

	// An existing line is rewritten wherever it sits; only a missing one goes under [general].
	let category = settings.get(None, "update_time").is_none().then_some("general");
	settings.set(category, "update_time", &format_update_time(update_time));
	settings.save().map_err(unavailable)?;

	info!("Set update_time to {update_time} in '{}'.", path.display());
	Ok(())
}

/// Formats an update time the way the game writes it.
pub fn format_update_time(value: f64) -> String {
	format!("{value:.6}")
}
