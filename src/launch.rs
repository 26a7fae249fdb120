//! This module turns a mod selection into a game launch.
//!
//! Launching happens in three steps:
//! 1. *LaunchPlanner::plan* resolves a *LaunchConfiguration* from the selection and settings.
//! 2. *apply_settings_patch* writes the configured `update_time` into the game's settings file.
//! 3. A *ProcessLauncher* starts the game and forgets about it.
//!
//! The launcher never waits on the game; it exits as soon as the game has been started.

use std::{
	path::{Path, PathBuf},
	process::Command,
	sync::mpsc,
	thread,
};

use serde::{Deserialize, Serialize};

use crate::{
	activation::ActivationModel,
	prelude::*,
	settings::{patch_update_time, settings_path},
	structs::config::{LauncherSettings, MOD_FOLDER},
};

/// The CPU affinity mask the game is pinned to (the first core).
pub const AFFINITY_MASK: u64 = 0x1;

/// The NUMA node the game is pinned to.
pub const NUMA_NODE: u32 = 0;

/// The scheduling priority the game is started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
	High,
	Realtime,
}

impl PriorityClass {
	/// The switch `start` uses for this priority.
	pub fn start_flag(self) -> &'static str {
		match self {
			PriorityClass::High => "/HIGH",
			PriorityClass::Realtime => "/REALTIME",
		}
	}
}

/// A pending rewrite of the game's `update_time` setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
	/// The settings file to rewrite.
	pub path: PathBuf,

	/// The value to write.
	pub update_time: f64,
}

/// Everything needed to start the game, resolved ahead of time.
/// This is handed whole to the spawning thread, so nothing else is shared with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfiguration {
	/// The game root, which the game is started in.
	pub working_dir: PathBuf,

	/// The game's executable, relative to the game root.
	pub executable: String,

	/// One `-mod=` argument per active mod, in activation order.
	pub mod_args: Vec<String>,

	/// Any other arguments, passed after the mods.
	pub extra_args: Vec<String>,

	/// The scheduling priority.
	pub priority: PriorityClass,

	/// The CPU affinity mask.
	pub affinity_mask: u64,

	/// The NUMA node.
	pub numa_node: u32,

	/// The settings rewrite to perform before starting, if the selection uses a user directory.
	pub settings_patch: Option<SettingsPatch>,
}

impl LaunchConfiguration {
	/// Every argument passed to the game, in order.
	pub fn args(&self) -> impl Iterator<Item = &str> {
		self.mod_args.iter().chain(self.extra_args.iter()).map(String::as_str)
	}

	/// A human-readable version of the command, for logs and dry runs.
	pub fn command_line(&self) -> String {
		std::iter::once(self.executable.as_str())
			.chain(self.args())
			.map(quote_arg)
			.join(" ")
	}
}

/// Builds *LaunchConfiguration*s from a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlanner {
	/// The executable to start.
	pub executable: String,

	/// The value patched into the game's settings.
	pub update_time: f64,

	/// The requested priority.
	pub priority: PriorityClass,

	/// Whether to pass `-skipintro`.
	pub skip_intro: bool,

	/// The folder holding the game's per-user directories.
	pub user_root: PathBuf,
}

impl LaunchPlanner {
	/// Builds a planner from the launcher settings of *game_root*.
	pub fn from_settings(settings: &LauncherSettings, game_root: &Path) -> Self {
		Self {
			executable: settings.executable.clone(),
			update_time: settings.update_time,
			priority: if settings.realtime {
				PriorityClass::Realtime
			} else {
				PriorityClass::High
			},
			skip_intro: settings.skipintro,
			user_root: settings.resolve_user_root(game_root),
		}
	}

	/// Resolves how the game should be started for the current selection.
	/// An empty selection is fine; the game just starts without mods.
	pub fn plan(&self, model: &ActivationModel, game_root: &Path) -> LaunchConfiguration {
		let mod_args = model
			.active_descriptors()
			.map(|m| mod_argument(&m.manifest_file))
			.collect();

		let extra_args = match self.skip_intro {
			true => vec!["-skipintro".to_owned()],
			false => Vec::new(),
		};

		let settings_patch = match model.effective_user_dir() {
			"" => None,
			dir => Some(SettingsPatch {
				path: settings_path(&self.user_root, dir),
				update_time: self.update_time,
			}),
		};

		LaunchConfiguration {
			working_dir: game_root.to_owned(),
			executable: self.executable.clone(),
			mod_args,
			extra_args,
			priority: self.priority,
			affinity_mask: AFFINITY_MASK,
			numa_node: NUMA_NODE,
			settings_patch,
		}
	}
}

/// The `-mod=` argument for a manifest in the mod folder.
pub fn mod_argument(manifest_file: &str) -> String {
	format!("-mod={MOD_FOLDER}/{manifest_file}")
}

/// Performs a configuration's settings patch, if it has one.
/// Callers should report a failure and launch anyway.
pub fn apply_settings_patch(config: &LaunchConfiguration) -> Result<(), LaunchError> {
	match &config.settings_patch {
		Some(patch) => patch_update_time(&patch.path, patch.update_time),
		None => Ok(()),
	}
}

/// Something that can start the game.
pub trait ProcessLauncher {
	/// Starts the game described by *config*.
	/// Returns once the game has been started; it never waits for the game to exit.
	fn launch(&self, config: LaunchConfiguration) -> Result<(), LaunchError>;
}

/// Starts the game as a real, detached process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
	fn launch(&self, config: LaunchConfiguration) -> Result<(), LaunchError> {
		let executable = config.executable.clone();
		let (sender, receiver) = mpsc::channel();

		info!("Starting game: {}", config.command_line());

		// The thread only reports whether the spawn itself worked; the child is never waited on.
		thread::Builder::new()
			.name("game-launch".to_owned())
			.spawn(move || {
				let result = build_command(&config)
					.spawn()
					.map(|child| child.id())
					.map_err(|source| LaunchError::SpawnFailed {
						executable: config.executable.clone(),
						source,
					});

				let _ = sender.send(result);
			})
			.map_err(|source| LaunchError::SpawnFailed { executable, source })?;

		match receiver.recv() {
			Ok(Ok(pid)) => {
				info!("Game started with PID {pid}.");
				Ok(())
			},
			Ok(Err(error)) => Err(error),
			Err(_) => Err(LaunchError::HandoffLost),
		}
	}
}

/// Builds the OS command for *config*.
/// On Windows the priority and affinity hints are applied through `start`.
#[cfg(windows)]
fn build_command(config: &LaunchConfiguration) -> Command {
	use std::os::windows::process::CommandExt;

	let inner = std::iter::once(config.executable.as_str())
		.chain(config.args())
		.map(quote_arg)
		.join(" ");

	let mut command = Command::new("cmd");
	command
		.current_dir(&config.working_dir)
		.raw_arg(format!(
			"/C start \"\" /NODE {} /AFFINITY {:X} {} {}",
			config.numa_node,
			config.affinity_mask,
			config.priority.start_flag(),
			inner
		));

	command
}

/// Builds the OS command for *config*.
/// Outside of Windows the scheduling hints have no portable equivalent, so they are only logged.
#[cfg(not(windows))]
fn build_command(config: &LaunchConfiguration) -> Command {
	debug!(
		"Ignoring scheduling hints on this platform: priority {:?}, affinity {:#x}, node {}.",
		config.priority, config.affinity_mask, config.numa_node
	);

	let mut command = Command::new(config.working_dir.join(&config.executable));
	command.current_dir(&config.working_dir).args(config.args());

	command
}

/// Wraps an argument in quotes if it contains whitespace.
fn quote_arg(arg: &str) -> String {
	if arg.contains(char::is_whitespace) {
		format!("\"{arg}\"")
	} else {
		arg.to_owned()
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;
	use crate::{registry::ModRegistry, settings::GameSettings, tests::RecordingLauncher};

	fn model(active: &[&str]) -> ActivationModel {
		let registry = ModRegistry::from_descriptors([
			ModDescriptor::new("Base", "Base.mod"),
			ModDescriptor {
				user_dir: "HPM".to_owned(),
				..ModDescriptor::new("HPM", "HPM.mod")
			},
			ModDescriptor::new("Extras", "Extras And More.mod"),
		]);

		let mut model = ActivationModel::new(registry);
		model.set_active_set(active).unwrap();
		model
	}

	fn planner(user_root: &Path) -> LaunchPlanner {
		LaunchPlanner {
			executable: "v2game.exe".to_owned(),
			update_time: 0.5,
			priority: PriorityClass::High,
			skip_intro: false,
			user_root: user_root.to_owned(),
		}
	}

	#[test]
	fn empty_selection_launches_without_mods() {
		let config = planner(Path::new("/docs")).plan(&model(&[]), Path::new("/game"));

		assert!(config.mod_args.is_empty());
		assert_eq!(config.settings_patch, None);
		assert_eq!(config.working_dir, PathBuf::from("/game"));
		assert_eq!(config.command_line(), "v2game.exe");
	}

	#[test]
	fn mod_flags_follow_activation_order() {
		let config = planner(Path::new("/docs")).plan(&model(&["HPM", "Base"]), Path::new("/game"));

		assert_eq!(config.mod_args, vec!["-mod=mod/HPM.mod", "-mod=mod/Base.mod"]);
		assert_eq!(config.affinity_mask, AFFINITY_MASK);
		assert_eq!(config.numa_node, NUMA_NODE);
		assert_eq!(
			config.settings_patch,
			Some(SettingsPatch {
				path: PathBuf::from("/docs/HPM/settings.txt"),
				update_time: 0.5,
			})
		);
	}

	#[test]
	fn planner_follows_settings() {
		let settings = LauncherSettings {
			realtime: true,
			skipintro: true,
			executable: "v2game_test.exe".to_owned(),
			user_root: Some(PathBuf::from("/saves")),
			..Default::default()
		};

		let config = LaunchPlanner::from_settings(&settings, Path::new("/game")).plan(&model(&["Extras"]), Path::new("/game"));

		assert_eq!(config.priority, PriorityClass::Realtime);
		assert_eq!(config.args().collect::<Vec<_>>(), vec!["-mod=mod/Extras And More.mod", "-skipintro"]);
		assert_eq!(config.command_line(), "v2game_test.exe \"-mod=mod/Extras And More.mod\" -skipintro");
	}

	#[test]
	fn patch_is_applied_to_the_user_settings() {
		let dir = tempfile::tempdir().unwrap();
		let path = settings_path(dir.path(), "HPM");
		GameSettings::create_default(&path).unwrap();

		let config = planner(dir.path()).plan(&model(&["HPM"]), dir.path());
		apply_settings_patch(&config).unwrap();

		assert!(fs::read_to_string(&path).unwrap().contains("update_time=0.500000"));
	}

	#[test]
	fn missing_user_settings_do_not_block_the_launch() {
		let dir = tempfile::tempdir().unwrap();
		let launcher = RecordingLauncher::default();
		let config = planner(dir.path()).plan(&model(&["HPM"]), dir.path());

		assert!(matches!(
			apply_settings_patch(&config),
			Err(LaunchError::ExternalSettingsUnavailable { .. })
		));

		launcher.launch(config.clone()).unwrap();
		assert_eq!(*launcher.launched.borrow(), vec![config]);
	}

	#[test]
	fn configuration_serializes_for_dry_runs() {
		let config = planner(Path::new("/docs")).plan(&model(&["Base"]), Path::new("/game"));
		let json = serde_json::to_value(&config).unwrap();

		assert_eq!(json["priority"], serde_json::json!("high"));
		assert_eq!(json["mod_args"], serde_json::json!(["-mod=mod/Base.mod"]));
	}
}
