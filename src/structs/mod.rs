//! This is the parent module over several of the launcher's plain data types, such as *ModDescriptor* or *LauncherSettings*.

pub mod config;
pub mod descriptor;
pub mod error;
