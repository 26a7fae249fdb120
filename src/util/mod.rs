//! This module holds small helpers shared by the rest of the launcher.

pub mod misc;
pub mod notice;
pub mod text;
