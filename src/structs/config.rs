//! This module defines the launcher's two configuration documents.
//!
//! *AppConfig* lives in the platform's config directory and only remembers which game root to use.
//! *LauncherSettings* lives inside the game's mod folder and holds everything tied to that installation:
//! the selection, presets, and launch preferences.

use std::path::{Path, PathBuf};

use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};

use crate::{
	presets::PresetStore,
	prelude::*,
	util::misc::{LoadOrDefault, SaveLoad},
};

/// The folder, under a game root, that holds mod manifests.
pub const MOD_FOLDER: &str = "mod";

/// The file name of the launcher settings store, kept in the mod folder.
pub const SETTINGS_FILE: &str = "launcher_configs.json";

/// The game executable started when the settings don't name another one.
pub const DEFAULT_EXECUTABLE: &str = "v2game.exe";

/// The `update_time` written into the game's settings when none is configured.
pub const DEFAULT_UPDATE_TIME: f64 = 1.0;

/// Where the game is usually installed.
#[cfg(windows)]
const DEFAULT_GAME_ROOT: &str = r"C:\Program Files (x86)\Steam\steamapps\common\Victoria 2";

/// Where the game is usually installed.
#[cfg(not(windows))]
const DEFAULT_GAME_ROOT: &str = "~/.steam/steam/steamapps/common/Victoria 2";

/// Configuration shared by every game root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
	/// The game root used last.
	#[serde(default)]
	pub game_root: Option<PathBuf>,
}

impl AppConfig {
	/// Where this config is stored, or *None* if the platform has no config directory.
	pub fn path() -> Option<PathBuf> {
		ProjectDirs::from("", "", "modlaunch").map(|dirs| dirs.config_dir().join("config.json"))
	}

	/// Loads this config, creating it with defaults if it doesn't exist yet.
	pub fn load_or_create() -> AppResult<Self> {
		let Some(path) = Self::path() else {
			warn!("No config directory is available; using default launcher config.");
			return Ok(Self::default());
		};

		let existed = path.exists();
		let config = Self::load_or_default(&path)?;
		if !existed {
			config.save(&path)?;
		}

		Ok(config)
	}

	/// Persists this config to its usual location.
	pub fn store(&self) -> AppResult<()> {
		match Self::path() {
			Some(path) => self.save(path),
			None => Ok(()),
		}
	}

	/// Picks the game root to use, preferring *cli_root*, then the remembered root, then the usual install location.
	pub fn resolve_game_root(&self, cli_root: Option<&Path>) -> PathBuf {
		cli_root
			.map(Path::to_path_buf)
			.or_else(|| self.game_root.clone())
			.unwrap_or_else(|| expand_home(Path::new(DEFAULT_GAME_ROOT)))
	}
}

/// Everything the launcher keeps about one game installation.
/// Keys this struct doesn't know about are kept as-is when the store is rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherSettings {
	/// The active mods, in activation order.
	#[serde(default)]
	pub checked_mods: Vec<String>,

	/// The value patched into the game's `update_time` setting before every launch.
	#[serde(default = "default_update_time")]
	pub update_time: f64,

	/// Requests realtime priority instead of high priority for the game process.
	#[serde(default, with = "flag")]
	pub realtime: bool,

	/// Passes `-skipintro` to the game.
	#[serde(default, with = "flag")]
	pub skipintro: bool,

	/// Named snapshots of a selection.
	#[serde(default)]
	pub presets: PresetStore,

	/// The executable started in the game root.
	#[serde(default = "default_executable")]
	pub executable: String,

	/// Overrides the folder that holds the game's per-user directories.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_root: Option<PathBuf>,

	/// Unknown keys, kept so other tools' entries survive a rewrite.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for LauncherSettings {
	fn default() -> Self {
		Self {
			checked_mods: Vec::new(),
			update_time: DEFAULT_UPDATE_TIME,
			realtime: false,
			skipintro: false,
			presets: PresetStore::default(),
			executable: DEFAULT_EXECUTABLE.to_owned(),
			user_root: None,
			extra: serde_json::Map::new(),
		}
	}
}

impl LauncherSettings {
	/// Where the settings store for *game_root* lives.
	pub fn path_for(game_root: &Path) -> PathBuf {
		game_root.join(MOD_FOLDER).join(SETTINGS_FILE)
	}

	/// Loads the settings store at *path*.
	/// A missing store yields defaults, which are written back if the mod folder exists.
	pub fn load_or_create(path: &Path) -> Result<Self, PersistenceError> {
		let existed = path.exists();
		let settings = Self::load_or_default(path).map_err(|e| persistence_failure(path, e))?;

		if !existed && path.parent().is_some_and(Path::is_dir) {
			info!("Creating launcher settings at '{}'.", path.display());
			settings.store(path)?;
		}

		Ok(settings)
	}

	/// Writes this store to *path*.
	pub fn store(&self, path: &Path) -> Result<(), PersistenceError> {
		self.save(path).map_err(|e| persistence_failure(path, e))?;
		debug!("Saved launcher settings to '{}'.", path.display());
		Ok(())
	}

	/// The folder that holds the game's per-user directories.
	/// Defaults to the game's folder in the user's documents, then to the game root itself.
	pub fn resolve_user_root(&self, game_root: &Path) -> PathBuf {
		if let Some(root) = &self.user_root {
			return expand_home(root);
		}

		UserDirs::new()
			.and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
			.map(|docs| docs.join("Paradox Interactive").join("Victoria II"))
			.filter(|p| p.is_dir())
			.unwrap_or_else(|| game_root.to_owned())
	}
}

fn persistence_failure(path: &Path, error: AppError) -> PersistenceError {
	PersistenceError::PersistenceFailure {
		path: path.to_owned(),
		reason: error.to_string(),
	}
}

fn default_update_time() -> f64 {
	DEFAULT_UPDATE_TIME
}

fn default_executable() -> String {
	DEFAULT_EXECUTABLE.to_owned()
}

/// Replaces a path's prefix of '~' with the user's home directory.
/// If a path does not start with '~', or no home directory is known, it is returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
	let Ok(rest) = path.strip_prefix("~") else {
		return path.to_owned();
	};

	match UserDirs::new() {
		Some(dirs) => dirs.home_dir().join(rest),
		None => path.to_owned(),
	}
}

/// (De)serializes a bool as the `0`/`1` integers the settings store has always used.
/// Plain JSON booleans are accepted too.
mod flag {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u8(u8::from(*value))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Bool(bool),
			Number(i64),
		}

		Ok(match Raw::deserialize(deserializer)? {
			Raw::Bool(value) => value,
			Raw::Number(value) => value != 0,
		})
	}
}
