//! End-to-end tests that drive a *Session* over a real folder layout.

use std::{cell::RefCell, fs, path::Path};

use tempfile::TempDir;

use crate::{
	launch::{LaunchConfiguration, ProcessLauncher},
	prelude::*,
	session::{Session, SessionState},
	settings::{settings_path, GameSettings},
	structs::config::{LauncherSettings, MOD_FOLDER, SETTINGS_FILE},
};

/// Records launches instead of starting anything.
#[derive(Default)]
pub(crate) struct RecordingLauncher {
	pub(crate) launched: RefCell<Vec<LaunchConfiguration>>,
}

impl ProcessLauncher for RecordingLauncher {
	fn launch(&self, config: LaunchConfiguration) -> Result<(), LaunchError> {
		self.launched.borrow_mut().push(config);
		Ok(())
	}
}

/// Builds a game root whose mod folder holds the given `(file, contents)` manifests.
fn game_root(manifests: &[(&str, &str)]) -> TempDir {
	let root = tempfile::tempdir().unwrap();
	let mods = root.path().join(MOD_FOLDER);
	fs::create_dir(&mods).unwrap();

	for (file, contents) in manifests {
		fs::write(mods.join(file), contents).unwrap();
	}

	root
}

fn three_mods() -> TempDir {
	game_root(&[
		("X.mod", "name = \"X\"\n"),
		("Y.mod", "name = \"Y\"\ndependencies = { \"X\" }\n"),
		("Z.mod", "name = \"Z\"\nuser_dir = \"ZDir\"\n"),
	])
}

fn stored_settings(root: &Path) -> LauncherSettings {
	let raw = fs::read_to_string(root.join(MOD_FOLDER).join(SETTINGS_FILE)).unwrap();
	serde_json::from_str(&raw).unwrap()
}

#[test]
fn opening_creates_the_settings_store() {
	let root = three_mods();
	let session = Session::open(root.path());

	assert_eq!(session.state(), SessionState::RegistryLoaded);
	assert_eq!(session.registry().len(), 3);
	assert!(session.model().active_mods().is_empty());
	assert_eq!(stored_settings(root.path()), LauncherSettings::default());
}

#[test]
fn selection_survives_a_restart() {
	let root = three_mods();

	let mut session = Session::open(root.path());
	assert!(session.set_active("Z", true).unwrap());
	assert!(session.set_active("X", true).unwrap());
	assert!(!session.set_active("X", true).unwrap());
	assert_eq!(session.state(), SessionState::ActiveSetMutated);

	assert_eq!(stored_settings(root.path()).checked_mods, vec!["Z", "X"]);

	let session = Session::open(root.path());
	assert_eq!(session.model().active_mods(), ["Z", "X"]);
}

#[test]
fn preset_round_trip() {
	let root = three_mods();
	let mut session = Session::open(root.path());

	session.select(&["Z", "X", "Y"]).unwrap();
	assert_eq!(session.save_preset("Default").unwrap(), None);

	session.select::<&str>(&[]).unwrap();
	assert!(session.model().active_mods().is_empty());

	session.load_preset("Default").unwrap();
	assert_eq!(session.model().active_mods(), ["Z", "X", "Y"]);

	let stored = stored_settings(root.path());
	assert_eq!(stored.presets.get("Default").unwrap(), ["Z", "X", "Y"]);
	assert_eq!(stored.checked_mods, vec!["Z", "X", "Y"]);

	let mut reopened = Session::open(root.path());
	reopened.select(&["Y"]).unwrap();
	reopened.load_preset("Default").unwrap();
	assert_eq!(reopened.model().active_mods(), ["Z", "X", "Y"]);

	assert_eq!(session.delete_preset("Default").unwrap(), vec!["Z", "X", "Y"]);
	assert!(stored_settings(root.path()).presets.is_empty());
}

#[test]
fn unknown_names_are_session_errors() {
	let root = three_mods();
	let mut session = Session::open(root.path());

	assert!(matches!(
		session.set_active("Nope", true),
		Err(AppError::Session(SessionError::UnknownMod(name))) if name == "Nope"
	));
	assert!(matches!(
		session.load_preset("Nope"),
		Err(AppError::Session(SessionError::UnknownPreset(_)))
	));
	assert!(matches!(
		session.delete_preset("Nope"),
		Err(AppError::Session(SessionError::UnknownPreset(_)))
	));
}

#[test]
fn failed_saves_still_mark_the_selection_changed() {
	let root = three_mods();
	let mut session = Session::open(root.path());

	// A directory in the store's place makes every save fail.
	let store = root.path().join(MOD_FOLDER).join(SETTINGS_FILE);
	fs::remove_file(&store).unwrap();
	fs::create_dir(&store).unwrap();

	assert!(matches!(session.set_active("X", true), Err(AppError::Persistence(_))));
	assert_eq!(session.state(), SessionState::ActiveSetMutated);
	assert_eq!(session.model().active_mods(), ["X"]);

	session.plan().unwrap();
	assert!(matches!(session.select(&["Y", "Z"]), Err(AppError::Persistence(_))));
	assert_eq!(session.state(), SessionState::ActiveSetMutated);
	assert_eq!(session.model().active_mods(), ["Y", "Z"]);
}

#[test]
fn removed_mods_are_dropped_on_the_next_load() {
	let root = three_mods();

	let mut session = Session::open(root.path());
	session.select(&["X", "Y", "Z"]).unwrap();
	drop(session);

	fs::remove_file(root.path().join(MOD_FOLDER).join("Y.mod")).unwrap();

	let mut session = Session::open(root.path());
	assert_eq!(session.model().active_mods(), ["X", "Z"]);
	assert!(session.take_notices().is_empty());
	assert_eq!(stored_settings(root.path()).checked_mods, vec!["X", "Z"]);
}

#[test]
fn rescan_drops_removed_mods() {
	let root = three_mods();
	let mut session = Session::open(root.path());
	session.select(&["Z", "Y"]).unwrap();

	fs::remove_file(root.path().join(MOD_FOLDER).join("Z.mod")).unwrap();
	session.rescan().unwrap();

	assert_eq!(session.state(), SessionState::RegistryLoaded);
	assert_eq!(session.model().active_mods(), ["Y"]);
	assert_eq!(stored_settings(root.path()).checked_mods, vec!["Y"]);
}

#[test]
fn missing_mod_folder_gives_an_empty_registry() {
	let root = tempfile::tempdir().unwrap();
	let mut session = Session::open(root.path());

	assert_eq!(session.state(), SessionState::RegistryLoaded);
	assert!(session.registry().is_empty());
	assert_eq!(session.take_notices().len(), 1);
	assert!(!root.path().join(MOD_FOLDER).exists());

	let plan = session.plan().unwrap();
	assert!(plan.mod_args.is_empty());
}

#[test]
fn corrupt_store_falls_back_to_defaults() {
	let root = three_mods();
	fs::write(root.path().join(MOD_FOLDER).join(SETTINGS_FILE), "{ not json").unwrap();

	let mut session = Session::open(root.path());

	assert_eq!(*session.settings(), LauncherSettings::default());
	assert_eq!(session.take_notices().len(), 1);
	assert_eq!(session.registry().len(), 3);
}

#[test]
fn broken_manifests_are_reported_and_skipped() {
	let root = game_root(&[("good.mod", "name = \"Good\"\n"), ("bad.mod", "path = \"mod/Bad\"\n")]);
	let mut session = Session::open(root.path());

	assert_eq!(session.registry().len(), 1);
	assert_eq!(session.take_notices().len(), 1);
}

#[test]
fn last_active_user_dir_is_patched() {
	let root = game_root(&[
		("A.mod", "name = \"A\"\nuser_dir = \"ADir\"\n"),
		("B.mod", "name = \"B\"\nuser_dir = \"BDir\"\n"),
	]);
	let users = tempfile::tempdir().unwrap();

	let mut session = Session::open(root.path());
	session
		.update_settings(|s| {
			s.user_root = Some(users.path().to_owned());
			s.update_time = 0.5;
		})
		.unwrap();

	for dir in ["ADir", "BDir"] {
		GameSettings::create_default(settings_path(users.path(), dir)).unwrap();
	}

	session.select(&["B", "A"]).unwrap();
	let plan = session.plan().unwrap();
	assert_eq!(session.state(), SessionState::Planned);
	assert_eq!(plan.settings_patch.unwrap().path, settings_path(users.path(), "ADir"));

	session.select(&["A", "B"]).unwrap();
	let launcher = RecordingLauncher::default();
	session.launch(&launcher).unwrap();

	let patched = GameSettings::open(settings_path(users.path(), "BDir")).unwrap();
	let untouched = GameSettings::open(settings_path(users.path(), "ADir")).unwrap();
	assert_eq!(patched.get(Some("general"), "update_time"), Some("0.500000"));
	assert_eq!(untouched.get(Some("general"), "update_time"), Some("1.000000"));
	assert_eq!(launcher.launched.borrow()[0].mod_args, vec!["-mod=mod/A.mod", "-mod=mod/B.mod"]);
}

#[test]
fn missing_user_settings_do_not_block_the_launch() {
	let root = three_mods();
	let users = tempfile::tempdir().unwrap();

	let mut session = Session::open(root.path());
	session.update_settings(|s| s.user_root = Some(users.path().to_owned())).unwrap();
	session.select(&["Z"]).unwrap();

	let launcher = RecordingLauncher::default();
	session.launch(&launcher).unwrap();

	assert_eq!(launcher.launched.borrow().len(), 1);
	assert_eq!(session.take_notices().len(), 1);
	assert!(!settings_path(users.path(), "ZDir").exists());
}

#[test]
fn launching_with_nothing_selected() {
	let root = three_mods();
	let mut session = Session::open(root.path());
	let launcher = RecordingLauncher::default();

	let config = session.launch(&launcher).unwrap();

	assert!(config.mod_args.is_empty());
	assert_eq!(config.settings_patch, None);
	assert_eq!(*launcher.launched.borrow(), vec![config]);
}

#[test]
fn launched_sessions_refuse_further_changes() {
	let root = three_mods();
	let mut session = Session::open(root.path());
	let launcher = RecordingLauncher::default();

	session.launch(&launcher).unwrap();
	assert_eq!(session.state(), SessionState::Launched);

	assert!(matches!(
		session.set_active("X", true),
		Err(AppError::Session(SessionError::AlreadyLaunched))
	));
	assert!(matches!(session.rescan(), Err(AppError::Session(SessionError::AlreadyLaunched))));
	assert!(matches!(
		session.launch(&launcher),
		Err(AppError::Session(SessionError::AlreadyLaunched))
	));
	assert_eq!(launcher.launched.borrow().len(), 1);
}
