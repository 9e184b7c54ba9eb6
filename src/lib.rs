//! packwright - buildpack layer lifecycle engine
//!
//! Detects the toolchains an application needs, then builds cached layers
//! whose environment contributions are scoped to build time, launch time,
//! or both.

pub mod capability;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod install;
pub mod layer;
pub mod lifecycle;
pub mod toolchain;
pub mod ui;

pub use error::{PackError, PackResult};
