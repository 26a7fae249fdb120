//! This module contains the errors used all over this codebase.

use std::{io, path::PathBuf};

use crate::prelude::*;

/// Convenience wrapper around *Result<T, AppError>*.
pub type AppResult<T> = Result<T, AppError>;

/// Error returned by several functions in the launcher.
#[derive(Error, Debug)]
pub enum AppError {
	/// Error returned by failing IO operations.
	/// Most of these will occur during filesystem interactions.
	#[error(transparent)]
	IO(#[from] io::Error),

	/// Error returned when failing to (de)serialize a type using Serde and JSON.
	#[error(transparent)]
	Json(#[from] serde_json::Error),

	/// Error returned while scanning a game's mod folder.
	#[error(transparent)]
	Registry(#[from] RegistryError),

	/// Error returned while planning or handing off a launch.
	#[error(transparent)]
	Launch(#[from] LaunchError),

	/// Error returned when the launcher's settings store cannot be read or written.
	#[error(transparent)]
	Persistence(#[from] PersistenceError),

	/// Error returned when a session is driven out of order.
	#[error(transparent)]
	Session(#[from] SessionError),

	/// Custom error that simply wraps a *Notice*.
	#[error("{0}")]
	Custom(Notice),

	/// Error converted from any error that does not have a matching *AppError* variant.
	#[error(transparent)]
	Unknown(#[from] anyhow::Error),
}

/// An error returned while turning a single manifest into a *ModDescriptor*.
/// These only ever exclude one mod; the rest of a scan carries on.
#[derive(Error, Debug)]
pub enum ParseError {
	/// The manifest never declares a `name` field.
	#[error("The manifest '{}' does not declare a name.", .0.display())]
	MissingName(PathBuf),

	/// The manifest file could not be read at all.
	#[error("The manifest '{}' could not be read: {source}", .path.display())]
	Unreadable {
		/// The manifest that failed to open.
		path: PathBuf,

		/// The underlying IO failure.
		#[source]
		source: io::Error,
	},
}

/// An error returned by a failed scan of a mod folder.
#[derive(Error, Debug)]
pub enum RegistryError {
	/// The mod folder does not exist.
	/// Callers treat this as an empty registry rather than a fatal error.
	#[error("The mod folder '{}' does not exist.", .0.display())]
	DirectoryNotFound(PathBuf),
}

/// A non-fatal problem noticed while building a registry.
#[derive(Debug)]
pub enum RegistryWarning {
	/// A manifest was skipped.
	Skipped(ParseError),

	/// Two manifests declared the same name, and the later one replaced the earlier one.
	DuplicateName {
		/// The contested mod name.
		name: String,

		/// The manifest that lost.
		replaced: String,

		/// The manifest that is now indexed under *name*.
		kept: String,
	},

	/// These mods form a loop through their first resolvable dependencies.
	/// All of them are shown as top-level entries instead.
	DependencyCycle(Vec<String>),
}

/// An error returned while planning or starting the game.
#[derive(Error, Debug)]
pub enum LaunchError {
	/// The per-user settings file that receives the `update_time` patch is missing or unreadable.
	/// Launching still proceeds without the patch.
	#[error("The game settings file '{}' is unavailable: {source}", .path.display())]
	ExternalSettingsUnavailable {
		/// Where the settings file was expected.
		path: PathBuf,

		/// Why it could not be used.
		#[source]
		source: io::Error,
	},

	/// The operating system refused to start the game.
	#[error("Failed to start '{executable}': {source}")]
	SpawnFailed {
		/// The executable that was being started.
		executable: String,

		/// The underlying IO failure.
		#[source]
		source: io::Error,
	},

	/// The spawn thread went away before reporting back.
	#[error("The launch hand-off was interrupted before the game could start.")]
	HandoffLost,
}

/// An error returned when the launcher's settings store cannot be used.
#[derive(Error, Debug)]
pub enum PersistenceError {
	/// Reading or writing the settings store failed.
	/// In-memory state stays authoritative for the rest of the session.
	#[error("Failed to persist launcher settings at '{}': {reason}", .path.display())]
	PersistenceFailure {
		/// The settings store being accessed.
		path: PathBuf,

		/// A description of the underlying failure.
		reason: String,
	},
}

/// An error returned when a session's lifecycle is violated.
#[derive(Error, Debug)]
pub enum SessionError {
	/// Any action after the game has been handed off.
	#[error("The game has already been launched from this session.")]
	AlreadyLaunched,

	/// A mod name that the current registry does not know.
	#[error("No mod named '{0}' is installed.")]
	UnknownMod(String),

	/// A preset name that the settings store does not know.
	#[error("No preset named '{0}' exists.")]
	UnknownPreset(String),
}
