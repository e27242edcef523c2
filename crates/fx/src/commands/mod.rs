//! Command implementations for the fx CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod completions;
pub mod config;
pub mod edit;
pub mod keys;
pub mod parse;
pub mod session;
pub mod show;
pub mod threshold;
pub mod url;

use std::path::PathBuf;

use crate::cli::Cli;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Filter text that does not parse.
    #[error("parse error: {0}")]
    Parse(#[from] filter_expr_rs::ParseError),

    /// Catalog loading error.
    #[error("catalog error: {0}")]
    Catalog(#[from] filter_state_rs::CatalogError),

    /// Session store error.
    #[error("session error: {0}")]
    SessionStore(#[from] filter_state_rs::SessionStoreError),

    /// Query string error.
    #[error("query string error: {0}")]
    Url(#[from] filter_state_rs::UrlError),

    /// A field or view the catalog does not define.
    #[error("{0}")]
    NotFound(String),

    /// An argument that cannot be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Whether to be verbose.
    pub verbose: bool,
    /// Catalog path from the command line or environment.
    pub catalog: Option<PathBuf>,
    /// Session path from the command line or environment.
    pub session: Option<PathBuf>,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            json_output: cli.json,
            use_colors: !cli.no_color,
            quiet: cli.quiet,
            verbose: cli.verbose,
            catalog: cli.catalog.clone(),
            session: cli.session.clone(),
        }
    }
}
