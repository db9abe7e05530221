#![doc = include_str!("../README.md")]

pub mod cli;
pub mod config;
pub mod error;
pub mod log;
pub mod output;
pub mod tools;

pub use error::{PageraceError, Result};
pub use tools::fetch::{race, race_with_cancel, RaceOptions, RaceOutcome, Target};
