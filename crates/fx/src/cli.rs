//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the fx CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// fx - Edit dashboard filter expressions from the command line
#[derive(Parser, Debug)]
#[command(name = "fx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (show debug information)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Catalog file describing views and their fields (JSON or TOML)
    #[arg(long, global = true, env = "FX_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Session file (default: platform state directory)
    #[arg(long, global = true, env = "FX_SESSION")]
    pub session: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Views an action applies to.
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Restrict the action to a view (repeatable; default: every view
    /// exposing the field)
    #[arg(long = "view", action = clap::ArgAction::Append)]
    pub views: Vec<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse filter text and print its tree
    #[command(alias = "p")]
    Parse {
        /// Filter text, e.g. "country IN ('US') AND revenue GT 100"
        text: String,
    },

    /// Print the canonical form of filter text
    #[command(alias = "fmt")]
    Format {
        /// Filter text
        text: String,
    },

    /// Show the merged filter bar of the current session
    #[command(alias = "s")]
    Show,

    /// Toggle values of a dimension
    #[command(alias = "t")]
    Toggle {
        /// Dimension name
        dimension: String,

        /// Values to toggle
        #[arg(required = true)]
        values: Vec<String>,

        /// Create the filter as an exclusion (NIN)
        #[arg(long)]
        exclude: bool,

        /// Replace the whole selection
        #[arg(long)]
        exclusive: bool,

        /// Keep the field on the bar when its last value is removed
        #[arg(long)]
        keep_visible: bool,

        #[command(flatten)]
        views: ViewArgs,
    },

    /// Filter a dimension by substring
    Contains {
        /// Dimension name
        dimension: String,

        /// Search text (empty removes the filter)
        text: String,

        /// Exclude matches (NLIKE)
        #[arg(long, conflicts_with = "include")]
        exclude: bool,

        /// Include matches (LIKE)
        #[arg(long)]
        include: bool,

        #[command(flatten)]
        views: ViewArgs,
    },

    /// Filter a dimension by a pasted list of values
    InList {
        /// Dimension name
        dimension: String,

        /// Values (none removes the filter)
        values: Vec<String>,

        #[command(flatten)]
        views: ViewArgs,
    },

    /// Flip a dimension filter between include and exclude
    Exclude {
        /// Dimension name
        dimension: String,

        #[command(flatten)]
        views: ViewArgs,
    },

    /// Remove the filter on a dimension or measure
    #[command(alias = "rm")]
    Remove {
        /// Dimension or measure name
        field: String,

        #[command(flatten)]
        views: ViewArgs,
    },

    /// Set or remove measure thresholds
    Threshold {
        #[command(subcommand)]
        command: ThresholdCommands,
    },

    /// Pin or unpin a field on the filter bar
    Pin {
        /// Dimension or measure name
        field: String,

        #[command(flatten)]
        views: ViewArgs,
    },

    /// Add an empty filter for a field to the bar
    #[command(alias = "a")]
    Add {
        /// Dimension or measure name
        field: String,

        #[command(flatten)]
        views: ViewArgs,
    },

    /// Clear every filter (pinned fields stay on the bar)
    Clear,

    /// Print the session query string
    Url,

    /// Replace the session filters from a query string
    Load {
        /// Query string, e.g. "f.orders=country+IN+%28%27US%27%29"
        query: String,
    },

    /// View and edit configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Threshold subcommands
#[derive(Subcommand, Debug)]
pub enum ThresholdCommands {
    /// Set a threshold on a measure
    Set {
        /// Measure name
        measure: String,

        /// Operator: EQ, NEQ, GT, GTE, LT, LTE or =, !=, >, >=, <, <=
        operator: String,

        /// Threshold value
        value: String,

        /// Grouping dimension (writes `dim HAVING (...)`)
        #[arg(long)]
        by: Option<String>,

        #[command(flatten)]
        views: ViewArgs,
    },

    /// Remove the threshold on a measure
    Remove {
        /// Measure name
        measure: String,

        #[command(flatten)]
        views: ViewArgs,
    },
}

/// Shell types for completions
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// Print config file path
    Path,
}
