//! Scaffolding of containerised web application starters.
//!
//! A run validates its parameters, asks for confirmation, drives the
//! upstream project generators (Angular CLI, create-astro, `go mod`, `git`)
//! and then writes the Docker, Traefik, Make and CI files around their
//! output. Re-running the same command never clobbers files a user may have
//! edited.

pub mod artifact;
pub mod gate;
pub mod git;
pub mod params;
pub mod patch;
pub mod sanitize;
pub mod stage;
pub mod template;
pub mod tool;
mod utils;

pub use utils::{Error, Result};
