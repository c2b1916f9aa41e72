//! smartsort - organize a directory's files by type and date
//!
//! This library classifies files by extension against an ordered category
//! table, computes category and year/month destinations inside the source
//! directory, resolves name collisions and moves the files, collecting
//! per-entry outcomes and run statistics. Categories, defaults and exclusion
//! filters can be configured through TOML files.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod output;

pub use config::{AppConfig, CompiledFilters, ConfigError};
pub use file_category::{Category, CategoryTable};
pub use file_organizer::{
    EntryOutcome, EntryReport, FileOrganizer, FileRecord, OrganizeError, OrganizeOptions,
    RunObserver, RunReport, RunStatistics, SkipReason,
};

pub use cli::{Cli, OrganizeCommand, run_cli, run_cli_with_config};
