//! This module is the general place for utilities that don't need their own module.

use std::{fmt::Display, fs, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Allows a struct to easily be saved and loaded using a file.
/// This is powered via Serde and JSON.
pub trait SaveLoad {
	/// Attempts to save (serialize) this struct to the file provided.
	/// Missing parent directories are created.
	fn save(&self, path: impl AsRef<Path>) -> AppResult<()>;

	/// Attempts to load (deserialize) this struct from the file provided.
	fn load(path: impl AsRef<Path>) -> AppResult<Self>
	where
		Self: Sized;
}

/// Trait to extend the *SaveLoad* trait with the ability to fallback to a struct's default value.
pub trait LoadOrDefault {
	/// Attempts to load this struct, and it will fallback to its default value when the file doesn't exist.
	/// Unlike a missing file, a file with invalid content is still an error.
	fn load_or_default(path: impl AsRef<Path>) -> AppResult<Self>
	where
		Self: Sized;
}

impl<T> SaveLoad for T
where
	T: Serialize + for<'de> Deserialize<'de>,
{
	fn save(&self, path: impl AsRef<Path>) -> AppResult<()> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}

		let json = serde_json::to_string_pretty(self)?;
		fs::write(path, json)?;
		Ok(())
	}

	fn load(path: impl AsRef<Path>) -> AppResult<Self>
	where
		Self: Sized,
	{
		let raw = fs::read_to_string(path)?;

		let item: T = serde_json::from_str(&raw)?;
		Ok(item)
	}
}

impl<T> LoadOrDefault for T
where
	T: SaveLoad + Default,
{
	fn load_or_default(path: impl AsRef<Path>) -> AppResult<Self>
	where
		Self: Sized,
	{
		match T::load(path) {
			Err(AppError::IO(e)) if e.kind() == io::ErrorKind::NotFound => Ok(T::default()),
			other => other,
		}
	}
}

/// Helper function to generate a pretty string based on a slice's contents.
pub fn display_slice<T: Display>(slice: &[T]) -> String {
	slice.iter().join(", ")
}

/// Strips one layer of surrounding whitespace and double quotes from a manifest or settings value.
pub fn unquote(raw: &str) -> &str {
	raw.trim().trim_matches('"').trim()
}
