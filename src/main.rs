//! Modlaunch is a mod launcher for Victoria 2.
//! It lists the mods installed in a game's mod folder, keeps track of which ones are enabled, and starts the game with them.

mod activation;
mod launch;
mod manifest;
mod prelude;
mod presets;
mod registry;
mod session;
mod settings;
mod structs;
mod updates;
mod util;

#[cfg(test)]
mod tests;

use std::{path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use crate::{
	launch::SystemLauncher,
	prelude::*,
	session::Session,
	settings::{format_update_time, settings_path, GameSettings},
	structs::config::{AppConfig, MOD_FOLDER},
	updates::UpdateChecker,
	util::{
		misc::display_slice,
		text::{TextColor, TextStyle},
	},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
	/// Use this game root instead of the remembered one.
	#[arg(short = 'R', long)]
	root: Option<PathBuf>,

	/// Log more detail. Repeat for even more.
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,

	/// The command to execute.
	#[command(subcommand)]
	cmd: Command,
}

#[derive(Subcommand, Clone, Debug)]
enum Command {
	/// Lists installed mods as a tree, marking the enabled ones.
	List,

	/// Shows everything known about one mod.
	Show {
		/// The mod's name.
		name: String,
	},

	/// Enables mods, appending them to the end of the load order.
	Enable {
		/// The mods to enable.
		#[arg(required = true)]
		mods: Vec<String>,
	},

	/// Disables mods.
	Disable {
		/// The mods to disable.
		#[arg(required = true)]
		mods: Vec<String>,
	},

	/// Replaces the enabled mods with exactly these, in this order.
	Select {
		/// The mods to enable. Leave empty to disable everything.
		mods: Vec<String>,
	},

	/// Manages named selections of mods.
	Preset {
		#[command(subcommand)]
		action: PresetCommand,
	},

	/// Prints how the game would be started, as JSON.
	Plan,

	/// Starts the game with the enabled mods.
	Start {
		/// Only print the command that would be run.
		#[arg(long)]
		dry_run: bool,
	},

	/// Shows or changes launcher settings.
	Config {
		/// Remember this folder as the game root.
		#[arg(long)]
		game_root: Option<PathBuf>,

		/// Start the game with realtime priority instead of high priority.
		#[arg(long)]
		realtime: Option<bool>,

		/// Skip the game's intro.
		#[arg(long)]
		skipintro: Option<bool>,

		/// The update time written into the game's settings before launching.
		#[arg(long)]
		update_time: Option<f64>,

		/// The folder holding the game's per-user directories.
		#[arg(long)]
		user_root: Option<PathBuf>,

		/// The executable to start, relative to the game root.
		#[arg(long)]
		executable: Option<String>,
	},

	/// Reads or edits the game's settings file for the enabled mods.
	Settings {
		#[command(subcommand)]
		action: SettingsCommand,
	},

	/// Checks the repositories mods declare for new releases and commits.
	Updates,
}

#[derive(Subcommand, Clone, Debug)]
enum PresetCommand {
	/// Lists saved presets.
	List,

	/// Saves the enabled mods as a preset, replacing any preset with the same name.
	Save { name: String },

	/// Enables exactly the mods of a preset.
	Load { name: String },

	/// Deletes a preset.
	Delete { name: String },
}

#[derive(Subcommand, Clone, Debug)]
enum SettingsCommand {
	/// Prints a setting's value.
	Get {
		key: String,

		/// Only look in this category.
		#[arg(short, long)]
		category: Option<String>,
	},

	/// Changes a setting, touching no other line.
	Set {
		key: String,
		value: String,

		/// The category a new key is added to.
		#[arg(short, long)]
		category: Option<String>,
	},

	/// Writes the default settings file if there isn't one.
	Init,
}

/// Entrypoint for Modlaunch.
fn main() -> ExitCode {
	let args = Cli::parse();

	let level = match args.verbose {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		_ => LevelFilter::Trace,
	};

	if let Err(error) = SimpleLogger::new().with_colors(true).with_level(level).init() {
		Notice::from_preset(NoticePreset::Warning, "Logging")
			.add_field("Description", "Failed to start the logger.")
			.add_field("Details", &error.to_string())
			.eprint();
	}

	match run_command(args) {
		Ok(()) => ExitCode::SUCCESS,
		Err(error) => {
			error.conv::<Notice>().print();
			ExitCode::FAILURE
		},
	}
}

/// Runs the command specified by the passed CLI arguments.
fn run_command(args: Cli) -> AppResult<()> {
	let mut config = AppConfig::load_or_create()?;

	if let Command::Config { game_root: Some(root), .. } = &args.cmd {
		config.game_root = Some(root.clone());
		config.store()?;
	}

	let game_root = config.resolve_game_root(args.root.as_deref());
	info!("Using game root '{}'.", game_root.display());

	let mut session = Session::open(game_root);
	print_notices(&mut session);

	match args.cmd {
		Command::List => list(&session),

		Command::Show { name } => show(&session, &name)?,

		Command::Enable { mods } => {
			for name in mods.iter() {
				match session.set_active(name, true)? {
					true => Notice::from_preset(NoticePreset::Success, "Enable").add_field("Mod", name).print(),
					false => Notice::from_preset(NoticePreset::Info, "Enable")
						.add_field("Mod", name)
						.add_field("Description", "This mod was already enabled.")
						.print(),
				}
			}
		},

		Command::Disable { mods } => {
			for name in mods.iter() {
				match session.set_active(name, false)? {
					true => Notice::from_preset(NoticePreset::Success, "Disable").add_field("Mod", name).print(),
					false => Notice::from_preset(NoticePreset::Info, "Disable")
						.add_field("Mod", name)
						.add_field("Description", "This mod wasn't enabled.")
						.print(),
				}
			}
		},

		Command::Select { mods } => {
			session.select(&mods)?;

			let skipped = mods.iter().filter(|m| !session.registry().contains(m)).collect_vec();
			if !skipped.is_empty() {
				Notice::from_preset(NoticePreset::Warning, "Select")
					.add_field("Description", "Some mods aren't installed and were skipped.")
					.add_field("Skipped", &display_slice(&skipped))
					.print();
			}

			Notice::from_preset(NoticePreset::Success, "Select")
				.add_field("Load Order", &display_slice(session.model().active_mods()))
				.print();
		},

		Command::Preset { action } => preset(&mut session, action)?,

		Command::Plan => {
			let plan = session.plan()?;
			println!("{}", serde_json::to_string_pretty(&plan)?);
		},

		Command::Start { dry_run: true } => {
			let plan = session.plan()?;
			println!("{}", plan.command_line());

			if let Some(patch) = &plan.settings_patch {
				println!(
					"update_time={} -> {}",
					format_update_time(patch.update_time),
					patch.path.display()
				);
			}
		},

		Command::Start { dry_run: false } => {
			let plan = session.launch(&SystemLauncher)?;
			print_notices(&mut session);

			Notice::from_preset(NoticePreset::Success, "Start")
				.add_field("Command", &plan.command_line())
				.print();
		},

		Command::Config {
			game_root: _,
			realtime,
			skipintro,
			update_time,
			user_root,
			executable,
		} => {
			let changed = realtime.is_some()
				|| skipintro.is_some()
				|| update_time.is_some()
				|| user_root.is_some()
				|| executable.is_some();

			if changed {
				session.update_settings(|settings| {
					if let Some(value) = realtime {
						settings.realtime = value;
					}
					if let Some(value) = skipintro {
						settings.skipintro = value;
					}
					if let Some(value) = update_time {
						settings.update_time = value;
					}
					if let Some(value) = user_root {
						settings.user_root = Some(value);
					}
					if let Some(value) = executable {
						settings.executable = value;
					}
				})?;
			}

			let settings = session.settings();
			Notice::from_preset(NoticePreset::Info, "Config")
				.add_field("Game Root", &session.game_root().display().to_string())
				.add_field("Settings File", &session.settings_path().display().to_string())
				.add_field("Executable", &settings.executable)
				.add_field("Update Time", &format_update_time(settings.update_time))
				.add_field("Realtime", &settings.realtime.to_string())
				.add_field("Skip Intro", &settings.skipintro.to_string())
				.add_field("User Root", &settings.resolve_user_root(session.game_root()).display().to_string())
				.print();
		},

		Command::Settings { action } => game_settings(&session, action)?,

		Command::Updates => {
			let checker = UpdateChecker::new();
			let results = checker.check_all(session.registry());

			if results.is_empty() {
				println!("No installed mod declares a repository.");
			}

			for (name, result) in results {
				match result {
					Ok(report) => println!("{}", report.summary()),
					Err(error) => Notice::from_preset(NoticePreset::Warning, "Updates")
						.add_field("Mod", &name)
						.add_field("Details", &format!("{error:#}"))
						.print(),
				}
			}
		},
	}

	Ok(())
}

/// Prints the mod tree, numbering enabled mods by their position in the load order.
fn list(session: &Session) {
	let model = session.model();
	let registry = session.registry();

	if registry.is_empty() {
		println!("No mods found in '{}'.", session.game_root().join(MOD_FOLDER).display());
		return;
	}

	for root in registry.hierarchy_roots() {
		root.walk(0, &mut |node, depth| {
			let indent = "  ".repeat(depth);
			let line = match model.active_mods().iter().position(|m| *m == node.name) {
				Some(index) => format!("{indent}[{}] {}", index + 1, node.name).bold(TextColor::Green),
				None => format!("{indent}[ ] {}", node.name).stylize(Some(TextStyle::Dim), None),
			};

			println!("{line}");
		});
	}

	let user_dir = match model.effective_user_dir() {
		"" => "(none)",
		dir => dir,
	};
	println!("\nUser directory: {}", user_dir.paint(TextColor::Cyan));

	for (name, dependency) in registry.missing_dependencies() {
		Notice::from_preset(NoticePreset::Warning, "Dependencies")
			.add_field("Mod", name)
			.add_field("Description", &format!("Depends on '{dependency}', which isn't installed."))
			.print();
	}
}

fn show(session: &Session, name: &str) -> AppResult<()> {
	let registry = session.registry();
	let descriptor = registry
		.descriptor(name)
		.ok_or_else(|| SessionError::UnknownMod(name.to_owned()))?;

	let status = match session.model().active_mods().iter().position(|m| m == name) {
		Some(index) => format!("enabled, #{} in the load order", index + 1),
		None => "disabled".to_owned(),
	};

	let mut notice = Notice::from_preset(NoticePreset::Info, &descriptor.name)
		.add_field("Manifest", &descriptor.manifest_file)
		.add_field("Status", &status)
		.add_field("Listed Under", registry.parent_of(name).unwrap_or("(top level)"));

	if let Some(dependencies) = registry.dependencies_of(name).filter(|d| !d.is_empty()) {
		notice = notice.add_field("Dependencies", &display_slice(dependencies));
	}
	if let Some(dir) = descriptor.user_dir() {
		notice = notice.add_field("User Directory", dir);
	}
	if let Some(version) = &descriptor.version {
		notice = notice.add_field("Version", version);
	}
	if let Some(repository) = &descriptor.repository {
		notice = notice.add_field("Repository", repository);
	}

	notice.print();
	Ok(())
}

fn preset(session: &mut Session, action: PresetCommand) -> AppResult<()> {
	match action {
		PresetCommand::List => {
			let settings = session.settings();
			if settings.presets.is_empty() {
				println!("No presets saved.");
			}

			for name in settings.presets.names() {
				let mods = settings.presets.get(name).unwrap_or_default();
				println!("{}: {}", name.bold(TextColor::Blue), display_slice(mods));
			}
		},

		PresetCommand::Save { name } => {
			let previous = session.save_preset(&name)?;

			let mut notice = Notice::from_preset(NoticePreset::Success, "Preset")
				.add_field("Saved", &name)
				.add_field("Mods", &display_slice(session.model().active_mods()));
			if let Some(previous) = previous {
				notice = notice.add_field("Replaced", &display_slice(&previous));
			}
			notice.print();
		},

		PresetCommand::Load { name } => {
			session.load_preset(&name)?;

			Notice::from_preset(NoticePreset::Success, "Preset")
				.add_field("Loaded", &name)
				.add_field("Load Order", &display_slice(session.model().active_mods()))
				.print();
		},

		PresetCommand::Delete { name } => {
			let removed = session.delete_preset(&name)?;

			Notice::from_preset(NoticePreset::Success, "Preset")
				.add_field("Deleted", &name)
				.add_field("Mods", &display_slice(&removed))
				.print();
		},
	}

	Ok(())
}

/// Works on the settings file of the user directory the enabled mods resolve to.
fn game_settings(session: &Session, action: SettingsCommand) -> AppResult<()> {
	let user_root = session.settings().resolve_user_root(session.game_root());
	let path = settings_path(&user_root, session.model().effective_user_dir());
	debug!("Game settings file: '{}'.", path.display());

	match action {
		SettingsCommand::Get { key, category } => {
			let settings = GameSettings::open(&path)?;
			match settings.get(category.as_deref(), &key) {
				Some(value) => println!("{value}"),
				None => Notice::from_preset(NoticePreset::Warning, "Settings")
					.add_field("Description", &format!("'{key}' is not set in '{}'.", path.display()))
					.print(),
			}
		},

		SettingsCommand::Set { key, value, category } => {
			let mut settings = GameSettings::open(&path)?;
			settings.set(category.as_deref(), &key, &value);
			settings.save()?;

			Notice::from_preset(NoticePreset::Success, "Settings")
				.add_field("Changed", &format!("{key}={value}"))
				.add_field("File", &settings.path().display().to_string())
				.print();
		},

		SettingsCommand::Init => match GameSettings::create_default(&path)? {
			true => Notice::from_preset(NoticePreset::Success, "Settings")
				.add_field("Created", &path.display().to_string())
				.print(),
			false => Notice::from_preset(NoticePreset::Info, "Settings")
				.add_field("Description", &format!("'{}' already exists.", path.display()))
				.print(),
		},
	}

	Ok(())
}

fn print_notices(session: &mut Session) {
	for notice in session.take_notices() {
		notice.print();
	}
}
