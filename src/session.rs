//! This module provides *Session*, which drives one run of the launcher from scanning mods to starting the game.
//!
//! A session moves through these states:
//!
//! ```text
//! Uninitialized -> RegistryLoaded -> (ActiveSetMutated)* -> Planned -> Launched
//! ```
//!
//! Rescanning returns to *RegistryLoaded*, and *Launched* is final.

use std::{
	cell::{Ref, RefCell},
	path::{Path, PathBuf},
	rc::Rc,
};

use crate::{
	activation::ActivationModel,
	launch::{apply_settings_patch, LaunchConfiguration, LaunchPlanner, ProcessLauncher},
	prelude::*,
	registry::ModRegistry,
	structs::config::{LauncherSettings, MOD_FOLDER},
};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Uninitialized,
	RegistryLoaded,
	ActiveSetMutated,
	Planned,
	Launched,
}

/// The launcher's state for one game root.
pub struct Session {
	game_root: PathBuf,
	settings_path: PathBuf,
	settings: Rc<RefCell<LauncherSettings>>,
	model: ActivationModel,
	state: SessionState,
	notices: Vec<Notice>,
}

impl Session {
	/// Opens a session for *game_root*: loads its launcher settings, scans its mods, and restores the saved selection.
	///
	/// Nothing here is fatal.
	/// A missing mod folder gives an empty registry, and unusable settings fall back to defaults;
	/// both are recorded as notices.
	pub fn open(game_root: impl Into<PathBuf>) -> Self {
		let game_root = game_root.into();
		let settings_path = LauncherSettings::path_for(&game_root);
		let mut notices = Vec::new();

		let settings = LauncherSettings::load_or_create(&settings_path).unwrap_or_else(|error| {
			error!("{error}");
			notices.push(error.into());
			LauncherSettings::default()
		});

		let mut session = Self {
			game_root,
			settings_path,
			settings: Rc::new(RefCell::new(settings)),
			model: ActivationModel::new(ModRegistry::default()),
			state: SessionState::Uninitialized,
			notices,
		};

		let registry = session.scan();
		let saved = session.settings.borrow().checked_mods.clone();

		let mut model = ActivationModel::new(registry);
		if let Err(error) = model.set_active_set(&saved) {
			session.report(error);
		}

		// The saved selection may name mods that have since been removed.
		if model.active_mods() != saved.as_slice() {
			info!("Dropped {} saved mod(s) that are no longer installed.", saved.len() - model.active_mods().len());
			if let Err(error) = session.persist_selection(model.active_mods()) {
				session.report(error);
			}
		}

		session.model = model.with_persistence(selection_hook(session.settings.clone(), session.settings_path.clone()));
		session.state = SessionState::RegistryLoaded;
		session
	}

	/// The game root this session manages.
	pub fn game_root(&self) -> &Path {
		&self.game_root
	}

	/// Where this session's launcher settings are stored.
	pub fn settings_path(&self) -> &Path {
		&self.settings_path
	}

	/// The session's current state.
	pub fn state(&self) -> SessionState {
		self.state
	}

	/// The current selection and the registry behind it.
	pub fn model(&self) -> &ActivationModel {
		&self.model
	}

	/// The mods found by the last scan.
	pub fn registry(&self) -> &ModRegistry {
		self.model.registry()
	}

	/// The launcher settings for this game root.
	pub fn settings(&self) -> Ref<'_, LauncherSettings> {
		self.settings.borrow()
	}

	/// Hands over every notice collected so far.
	pub fn take_notices(&mut self) -> Vec<Notice> {
		std::mem::take(&mut self.notices)
	}

	/// Scans the mod folder again, dropping active mods that are gone.
	pub fn rescan(&mut self) -> AppResult<()> {
		self.ensure_live()?;

		let registry = self.scan();
		self.model.replace_registry(registry)?;
		self.state = SessionState::RegistryLoaded;
		Ok(())
	}

	/// Turns a mod on or off.
	/// Returns whether anything changed.
	pub fn set_active(&mut self, name: &str, is_active: bool) -> AppResult<bool> {
		self.ensure_live()?;

		if !self.registry().contains(name) {
			return Err(SessionError::UnknownMod(name.to_owned()).into());
		}

		let before = self.model.active_mods().len();
		let result = self.model.set_active(name, is_active);

		// A failed save still leaves the selection changed.
		if result.as_ref().is_ok_and(|changed| *changed) || self.model.active_mods().len() != before {
			self.state = SessionState::ActiveSetMutated;
		}

		result
	}

	/// Replaces the selection with *names*, in order.
	/// Names that aren't installed are skipped.
	pub fn select<S: AsRef<str>>(&mut self, names: &[S]) -> AppResult<()> {
		self.ensure_live()?;

		let result = self.model.set_active_set(names);
		self.state = SessionState::ActiveSetMutated;
		result
	}

	/// Saves the current selection as the preset *name*, overwriting any preset already called that.
	/// Returns the overwritten preset's contents.
	pub fn save_preset(&mut self, name: &str) -> AppResult<Option<Vec<String>>> {
		self.ensure_live()?;

		let active = self.model.active_mods().to_vec();
		let previous = self.settings.borrow_mut().presets.save(name, &active);
		self.store_settings()?;

		Ok(previous)
	}

	/// Replaces the selection with the preset *name*.
	/// Mods in the preset that are no longer installed are skipped.
	pub fn load_preset(&mut self, name: &str) -> AppResult<()> {
		self.ensure_live()?;

		let mods = self
			.settings
			.borrow()
			.presets
			.get(name)
			.map(<[String]>::to_vec)
			.ok_or_else(|| SessionError::UnknownPreset(name.to_owned()))?;

		self.select(&mods)
	}

	/// Deletes the preset *name*, returning its contents.
	pub fn delete_preset(&mut self, name: &str) -> AppResult<Vec<String>> {
		self.ensure_live()?;

		let removed = self
			.settings
			.borrow_mut()
			.presets
			.delete(name)
			.ok_or_else(|| SessionError::UnknownPreset(name.to_owned()))?;

		self.store_settings()?;
		Ok(removed)
	}

	/// Changes the launcher settings through *edit* and saves them.
	pub fn update_settings(&mut self, edit: impl FnOnce(&mut LauncherSettings)) -> AppResult<()> {
		self.ensure_live()?;

		edit(&mut self.settings.borrow_mut());
		self.store_settings()
	}

	/// Resolves how the game would be started right now.
	pub fn plan(&mut self) -> AppResult<LaunchConfiguration> {
		self.ensure_live()?;

		let planner = LaunchPlanner::from_settings(&self.settings.borrow(), &self.game_root);
		let config = planner.plan(&self.model, &self.game_root);
		self.state = SessionState::Planned;

		Ok(config)
	}

	/// Plans the launch, patches the game's settings, and hands the game over to *launcher*.
	///
	/// A failed settings patch is recorded as a notice and the launch goes ahead anyway.
	/// After this succeeds the session is finished.
	pub fn launch(&mut self, launcher: &dyn ProcessLauncher) -> AppResult<LaunchConfiguration> {
		let config = self.plan()?;

		if let Err(error) = apply_settings_patch(&config) {
			warn!("{error}");
			self.notices.push(error.into());
		}

		launcher.launch(config.clone())?;
		self.state = SessionState::Launched;

		Ok(config)
	}

	fn ensure_live(&self) -> AppResult<()> {
		match self.state {
			SessionState::Launched => Err(SessionError::AlreadyLaunched.into()),
			_ => Ok(()),
		}
	}

	fn scan(&mut self) -> ModRegistry {
		let directory = self.game_root.join(MOD_FOLDER);

		match ModRegistry::load(&directory) {
			Ok(mut registry) => {
				self.notices.extend(registry.take_warnings().into_iter().map(Notice::from));
				registry
			},
			Err(error) => {
				warn!("{error}");
				self.notices.push(error.into());
				ModRegistry::default()
			},
		}
	}

	fn persist_selection(&self, mods: &[String]) -> AppResult<()> {
		self.settings.borrow_mut().checked_mods = mods.to_vec();
		self.store_settings()
	}

	fn store_settings(&self) -> AppResult<()> {
		self.settings.borrow().store(&self.settings_path)?;
		Ok(())
	}

	fn report(&mut self, error: AppError) {
		error!("{error}");
		self.notices.push(error.into());
	}
}

/// Builds the hook that writes every selection change into the settings store.
fn selection_hook(settings: Rc<RefCell<LauncherSettings>>, path: PathBuf) -> impl FnMut(&[String]) -> AppResult<()> {
	move |mods| {
		let mut settings = settings.borrow_mut();
		settings.checked_mods = mods.to_vec();
		settings.store(&path)?;
		Ok(())
	}
}
