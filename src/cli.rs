//! Command-line interface parsing for campusdeck
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a [`StartupConfig`] describing what the binary should do.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigOverrides;
use crate::data::{ResourceId, UnknownResource};
use crate::section::{SectionId, UnknownSection};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}. Run with --list-sections to see valid sections")]
    InvalidSection(#[from] UnknownSection),

    #[error("{0}")]
    InvalidResource(#[from] UnknownResource),
}

/// campusdeck - load and inspect the admin console's data for one tenant
#[derive(Parser, Debug)]
#[command(name = "campusdeck")]
#[command(about = "Section-scoped data loader for the campus admin console")]
#[command(version)]
pub struct Cli {
    /// Path to the config file (default: ./campusdeck.yaml, then the XDG config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Tenant id, overriding the config file
    #[arg(long, value_name = "TENANT")]
    pub tenant: Option<String>,

    /// API base URL, overriding the config file
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Section to load (default: overview)
    #[arg(long, value_name = "SECTION")]
    pub section: Option<String>,

    /// Force-reload a single resource instead of running a section
    #[arg(long, value_name = "RESOURCE", conflicts_with = "section")]
    pub refresh: Option<String>,

    /// Clear the tenant's cache, or a single entry, before loading
    ///
    /// Examples:
    ///   campusdeck --clear-cache            # Wipe every cached collection
    ///   campusdeck --clear-cache batches    # Drop only the batches entry
    #[arg(long, value_name = "KEY")]
    pub clear_cache: Option<Option<String>>,

    /// Print every section with its resources and budget, then exit
    #[arg(long)]
    pub list_sections: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// What to load once the data layer is up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTarget {
    Section(SectionId),
    Resource(ResourceId),
}

impl Default for LoadTarget {
    fn default() -> Self {
        LoadTarget::Section(SectionId::Overview)
    }
}

/// Cache clearing requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearCache {
    All,
    Entry(ResourceId),
}

impl ClearCache {
    /// Key as understood by `CacheStore::clear`
    pub fn key(&self) -> Option<&'static str> {
        match self {
            ClearCache::All => None,
            ClearCache::Entry(resource) => Some(resource.as_str()),
        }
    }
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    pub target: LoadTarget,
    pub clear_cache: Option<ClearCache>,
    pub list_sections: bool,
    pub json: bool,
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

/// Parses a section argument such as `live-sessions` or `live_sessions`.
pub fn parse_section_arg(s: &str) -> Result<SectionId, CliError> {
    Ok(s.parse::<SectionId>()?)
}

/// Parses a resource argument such as `one-to-one-batches`.
pub fn parse_resource_arg(s: &str) -> Result<ResourceId, CliError> {
    Ok(s.parse::<ResourceId>()?)
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if a section or resource name is not recognized
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let target = match (&cli.section, &cli.refresh) {
            (_, Some(resource)) => LoadTarget::Resource(parse_resource_arg(resource)?),
            (Some(section), None) => LoadTarget::Section(parse_section_arg(section)?),
            (None, None) => LoadTarget::default(),
        };

        let clear_cache = match &cli.clear_cache {
            None => None,
            Some(None) => Some(ClearCache::All),
            Some(Some(key)) => Some(ClearCache::Entry(parse_resource_arg(key)?)),
        };

        Ok(StartupConfig {
            target,
            clear_cache,
            list_sections: cli.list_sections,
            json: cli.json,
            config_path: cli.config.clone(),
            overrides: ConfigOverrides {
                tenant: cli.tenant.clone(),
                base_url: cli.base_url.clone(),
            },
        })
    }
}
