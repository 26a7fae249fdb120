//! This module provides the *Notice* struct, which is used for pretty-printing warnings, errors, or other messages to users.

use std::{fmt::Display, io};

use crate::prelude::*;

use super::{misc::display_slice, text::TextColor};

/// Notices allow you to easily pretty-print warning, errors, and other various information.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Notice {
	color: TextColor,
	prefix: String,
	header: String,
	fields: Vec<(String, String)>,
}

/// Presets to use while making a notice, allowing you to quickly recreate common forms of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoticePreset {
	/// A red notice with the prefix "ERROR".
	Error,

	/// A yellow notice with the prefix "WARN".
	Warning,

	/// A green notice with the prefix "DONE".
	Success,

	/// A cyan notice with the prefix "INFO".
	Info,
}

impl Notice {
	/// Builds a new notice from raw components.
	pub fn new(color: TextColor, prefix: &str, header: &str) -> Self {
		Self {
			color,
			prefix: prefix.to_owned(),
			header: header.to_owned(),
			fields: Vec::new(),
		}
	}

	/// Builds a new notice from a preset and a header.
	pub fn from_preset(preset: NoticePreset, header: &str) -> Self {
		match preset {
			NoticePreset::Error => Notice::new(TextColor::Red, "ERROR", header),
			NoticePreset::Warning => Notice::new(TextColor::Yellow, "WARN", header),
			NoticePreset::Success => Notice::new(TextColor::Green, "DONE", header),
			NoticePreset::Info => Notice::new(TextColor::Cyan, "INFO", header),
		}
	}

	/// Adds a new field to this notice, which will be printed after any other fields.
	/// A field will be presented in the form of `"{label}: {content}"`.
	pub fn add_field(mut self, label: &str, content: &str) -> Self {
		self.fields.push((label.to_owned(), content.to_owned()));
		self
	}

	/// Returns the content of the first field with this label.
	pub fn field(&self, label: &str) -> Option<&str> {
		self.fields
			.iter()
			.find(|(l, _)| l == label)
			.map(|(_, content)| content.as_str())
	}

	/// Convenience method to allow printing a notice at the end of a dot-call chain.
	pub fn print(self) {
		println!("{self}");
	}

	/// Like *Notice::print*, but writes to STDERR.
	pub fn eprint(self) {
		eprintln!("{self}");
	}
}

impl Display for Notice {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let title = format!("[{} - {}]", self.prefix, self.header).bold(self.color);
		writeln!(f, "{}", title)?;

		let mut formatted_label;
		for (label, content) in self.fields.iter() {
			formatted_label = format!("  {label}: ").bold(self.color);
			writeln!(f, "{}{}", formatted_label, content)?;
		}

		Ok(())
	}
}

// Beyond this point is just conversions between errors and notices.

impl From<AppError> for Notice {
	fn from(value: AppError) -> Self {
		match value {
			AppError::IO(error) => error.into(),
			AppError::Registry(error) => error.into(),
			AppError::Launch(error) => error.into(),
			AppError::Persistence(error) => error.into(),
			AppError::Session(error) => error.into(),
			AppError::Custom(notice) => notice,

			AppError::Json(error) => Notice::from_preset(NoticePreset::Error, "(De)serialization")
				.add_field("Description", "Failed to read or write a JSON document.")
				.add_field("Details", &error.to_string()),

			AppError::Unknown(error) => Notice::from_preset(NoticePreset::Error, "Unknown")
				.add_field("Message", "An unknown error has occurred!")
				.add_field("Details", &format!("{error:#}")),
		}
	}
}

impl From<io::Error> for Notice {
	fn from(value: io::Error) -> Self {
		let notice = Notice::from_preset(NoticePreset::Error, "IO");

		match value.kind() {
			io::ErrorKind::NotFound => notice
				.add_field("Description", "The launcher tried to access a file that doesn't exist.")
				.add_field("Suggestion", "Check that the game root points at your game's installation folder."),

			io::ErrorKind::PermissionDenied => notice
				.add_field("Description", "The launcher tried to access a file, but it didn't have the right permissions.")
				.add_field("Suggestion", "Ensure you have full permissions for the game folder and its 'mod' folder."),

			_ => notice
				.add_field("Description", "An unknown error has occurred!")
				.add_field("Details", &value.to_string()),
		}
	}
}

impl From<RegistryError> for Notice {
	fn from(value: RegistryError) -> Self {
		let notice = Notice::from_preset(NoticePreset::Warning, "Mods");

		match value {
			RegistryError::DirectoryNotFound(path) => notice
				.add_field("Description", &format!("The mod folder '{}' does not exist, so no mods are listed.", path.display()))
				.add_field("Suggestion", "Point the launcher at the right game root with 'modlaunch config --game-root <PATH>'."),
		}
	}
}

impl From<ParseError> for Notice {
	fn from(value: ParseError) -> Self {
		let notice = Notice::from_preset(NoticePreset::Warning, "Manifest");

		match value {
			ParseError::MissingName(path) => notice
				.add_field("Description", &format!("The manifest '{}' does not declare a name, so it was skipped.", path.display()))
				.add_field("Suggestion", "Add a line like 'name = \"My Mod\"' to that manifest."),

			ParseError::Unreadable { path, source } => notice
				.add_field("Description", &format!("The manifest '{}' could not be read, so it was skipped.", path.display()))
				.add_field("Details", &source.to_string()),
		}
	}
}

impl From<RegistryWarning> for Notice {
	fn from(value: RegistryWarning) -> Self {
		match value {
			RegistryWarning::Skipped(error) => error.into(),

			RegistryWarning::DuplicateName { name, replaced, kept } => Notice::from_preset(NoticePreset::Warning, "Manifest")
				.add_field("Description", &format!("Both '{replaced}' and '{kept}' declare the mod {name}."))
				.add_field("Note", &format!("Only '{kept}' is used, as it comes last in file name order.")),

			RegistryWarning::DependencyCycle(names) => Notice::from_preset(NoticePreset::Warning, "Dependencies")
				.add_field("Description", "These mods depend on each other in a loop.")
				.add_field("Mods", &display_slice(&names))
				.add_field("Note", "They are listed as top-level mods instead."),
		}
	}
}

impl From<LaunchError> for Notice {
	fn from(value: LaunchError) -> Self {
		let notice = Notice::from_preset(NoticePreset::Error, "Launch");

		match value {
			LaunchError::ExternalSettingsUnavailable { path, source } => Notice::from_preset(NoticePreset::Warning, "Launch")
				.add_field("Description", &format!("Could not patch '{}', so the game keeps its previous update time.", path.display()))
				.add_field("Details", &source.to_string()),

			LaunchError::SpawnFailed { executable, source } => notice
				.add_field("Description", &format!("Failed to start {executable}."))
				.add_field("Details", &source.to_string())
				.add_field("Suggestion", "Check the 'executable' entry in the launcher settings and the game root."),

			LaunchError::HandoffLost => notice
				.add_field("Description", "The game was never confirmed as started."),
		}
	}
}

impl From<PersistenceError> for Notice {
	fn from(value: PersistenceError) -> Self {
		let notice = Notice::from_preset(NoticePreset::Error, "Settings");

		match value {
			PersistenceError::PersistenceFailure { path, reason } => notice
				.add_field("Description", &format!("Failed to save or load '{}'.", path.display()))
				.add_field("Details", &reason)
				.add_field("Note", "Your selection still applies until the launcher closes."),
		}
	}
}

impl From<SessionError> for Notice {
	fn from(value: SessionError) -> Self {
		let notice = Notice::from_preset(NoticePreset::Error, "Session");

		match value {
			SessionError::AlreadyLaunched => notice
				.add_field("Description", "The game was already launched from this session."),

			SessionError::UnknownMod(name) => notice
				.add_field("Description", &format!("No installed mod is named {name}."))
				.add_field("Suggestion", "Run 'modlaunch list' to see every installed mod."),

			SessionError::UnknownPreset(name) => notice
				.add_field("Description", &format!("No preset is named {name}."))
				.add_field("Suggestion", "Run 'modlaunch preset list' to see every saved preset."),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	#[test]
	fn fields_keep_insertion_order() {
		let notice = Notice::from_preset(NoticePreset::Info, "Test")
			.add_field("First", "1")
			.add_field("Second", "2");

		let text = notice.to_string();
		assert!(text.find("First").unwrap() < text.find("Second").unwrap());
	}

	#[test]
	fn cycle_warning_lists_members() {
		let notice: Notice = RegistryWarning::DependencyCycle(vec!["A".to_owned(), "B".to_owned()]).into();
		assert_eq!(notice.field("Mods"), Some("A, B"));
	}

	#[test]
	fn missing_directory_is_a_warning() {
		let notice: Notice = AppError::from(RegistryError::DirectoryNotFound(PathBuf::from("/nowhere/mod"))).into();
		assert!(notice.to_string().contains("WARN"));
	}
}
