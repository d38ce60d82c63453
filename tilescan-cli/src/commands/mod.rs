//! CLI command implementations.
//!
//! Each subcommand has its own module with its arguments and handler.
//!
//! # Command Modules
//!
//! - [`run`] - Full survey of a project (main command)
//! - [`plan`] - Tiles a request document would download
//! - [`gsd`] - Ground sample distance at a latitude and zoom
//! - [`grade`] - Grade existing detector labels
//! - [`init`] - Configuration initialization
//! - [`config`] - Configuration file location

pub mod common;
pub mod config;
pub mod grade;
pub mod gsd;
pub mod init;
pub mod plan;
pub mod run;
