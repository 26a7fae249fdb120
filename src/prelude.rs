//! This module re-exports a bunch of utilities used across this program.

#![allow(unused_imports)]

pub use tap::prelude::*;

pub use indexmap::{IndexMap, IndexSet};
pub use itertools::Itertools;
pub use thiserror::Error;

pub use log::debug;
pub use log::error;
pub use log::info;
pub use log::trace;
pub use log::warn;

pub use crate::structs::error::{
	AppError, AppResult, LaunchError, ParseError, PersistenceError, RegistryError, RegistryWarning, SessionError,
};
pub use crate::structs::descriptor::ModDescriptor;
pub use crate::util::notice::Notice;
pub use crate::util::notice::NoticePreset;
pub use crate::util::text::FancyText;
