#![forbid(unsafe_code)]

pub mod array;
pub mod astro;
pub mod cli;
pub mod config;
pub mod utils;

pub use cli::app::{Cli, Command};
