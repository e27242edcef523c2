//! Command dispatch module for routing CLI commands to their handlers.
//!
//! Commands that only need their arguments run synchronously; commands that
//! edit or read the filter session are async because the session store is.

use crate::cli::{Cli, Commands, ConfigCommands, Shell, ThresholdCommands};
use crate::commands::{self, CommandContext, CommandError, Result};

/// Trait for commands that run without a catalog or session.
pub trait StandaloneCommand {
    /// Execute the command.
    fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// Trait for commands that work on the persisted filter session.
#[allow(async_fn_in_trait)]
pub trait SessionCommand {
    /// Execute the command against the session.
    async fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// Commands that need neither a catalog nor a session.
pub enum StandaloneDispatch<'a> {
    Parse(&'a str),
    Format(&'a str),
    Config(&'a Option<ConfigCommands>),
    Completions(&'a Shell),
    Help,
}

impl<'a> StandaloneDispatch<'a> {
    /// Try to create a standalone dispatch from the CLI command.
    /// Returns None if the command needs the session.
    pub fn try_from_cli(cli: &'a Cli) -> Option<Self> {
        match &cli.command {
            Some(Commands::Parse { text }) => Some(Self::Parse(text)),
            Some(Commands::Format { text }) => Some(Self::Format(text)),
            Some(Commands::Config { command }) => Some(Self::Config(command)),
            Some(Commands::Completions { shell }) => Some(Self::Completions(shell)),
            None => Some(Self::Help),
            _ => None,
        }
    }
}

impl StandaloneCommand for StandaloneDispatch<'_> {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            Self::Parse(text) => commands::parse::execute_parse(ctx, text),
            Self::Format(text) => commands::parse::execute_format(ctx, text),
            Self::Config(command) => dispatch_config(ctx, command),
            Self::Completions(shell) => {
                commands::completions::execute(shell).map_err(CommandError::Io)
            }
            Self::Help => {
                if !ctx.quiet {
                    println!("fx - dashboard filter editor");
                    println!("Use --help for usage information");
                }
                Ok(())
            }
        }
    }
}

/// Dispatch config subcommands.
fn dispatch_config(ctx: &CommandContext, command: &Option<ConfigCommands>) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::execute_show(ctx),
        Some(ConfigCommands::Set { key, value }) => {
            let opts = commands::config::ConfigSetOptions {
                key: key.clone(),
                value: value.clone(),
            };
            commands::config::execute_set(ctx, &opts)
        }
        Some(ConfigCommands::Path) => commands::config::execute_path(ctx),
    }
}

/// Commands that open the filter session.
pub struct SessionDispatch<'a> {
    command: &'a Commands,
}

impl<'a> SessionDispatch<'a> {
    /// Creates a session dispatch for any command not handled by
    /// [`StandaloneDispatch`].
    pub fn from_cli(cli: &'a Cli) -> Option<Self> {
        cli.command.as_ref().map(|command| Self { command })
    }
}

impl SessionCommand for SessionDispatch<'_> {
    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self.command {
            Commands::Show => commands::show::execute(ctx).await,

            Commands::Toggle {
                dimension,
                values,
                exclude,
                exclusive,
                keep_visible,
                views,
            } => {
                let opts = commands::edit::ToggleCommandOptions {
                    dimension: dimension.clone(),
                    values: values.clone(),
                    exclude: *exclude,
                    exclusive: *exclusive,
                    keep_visible: *keep_visible,
                    views: views.views.clone(),
                };
                commands::edit::execute_toggle(ctx, &opts).await
            }

            Commands::Contains {
                dimension,
                text,
                exclude,
                include,
                views,
            } => {
                let exclude = match (*exclude, *include) {
                    (true, _) => Some(true),
                    (false, true) => Some(false),
                    (false, false) => None,
                };
                let opts = commands::edit::ContainsOptions {
                    dimension: dimension.clone(),
                    text: text.clone(),
                    exclude,
                    views: views.views.clone(),
                };
                commands::edit::execute_contains(ctx, &opts).await
            }

            Commands::InList {
                dimension,
                values,
                views,
            } => {
                let opts = commands::edit::InListOptions {
                    dimension: dimension.clone(),
                    values: values.clone(),
                    views: views.views.clone(),
                };
                commands::edit::execute_in_list(ctx, &opts).await
            }

            Commands::Exclude { dimension, views } => {
                commands::edit::execute_exclude(ctx, dimension, &views.views).await
            }

            Commands::Remove { field, views } => {
                commands::edit::execute_remove(ctx, field, &views.views).await
            }

            Commands::Threshold { command } => dispatch_threshold(ctx, command).await,

            Commands::Pin { field, views } => {
                commands::keys::execute_pin(ctx, field, &views.views).await
            }

            Commands::Add { field, views } => {
                commands::keys::execute_add(ctx, field, &views.views).await
            }

            Commands::Clear => commands::keys::execute_clear(ctx).await,

            Commands::Url => commands::url::execute_url(ctx).await,

            Commands::Load { query } => commands::url::execute_load(ctx, query).await,

            Commands::Parse { .. }
            | Commands::Format { .. }
            | Commands::Config { .. }
            | Commands::Completions { .. } => Err(CommandError::InvalidArgument(
                "command does not use the filter session".to_string(),
            )),
        }
    }
}

/// Dispatch threshold subcommands.
async fn dispatch_threshold(ctx: &CommandContext, command: &ThresholdCommands) -> Result<()> {
    match command {
        ThresholdCommands::Set {
            measure,
            operator,
            value,
            by,
            views,
        } => {
            let opts = commands::threshold::ThresholdSetOptions {
                measure: measure.clone(),
                operator: operator.clone(),
                value: value.clone(),
                by: by.clone(),
                views: views.views.clone(),
            };
            commands::threshold::execute_set(ctx, &opts).await
        }
        ThresholdCommands::Remove { measure, views } => {
            commands::threshold::execute_remove(ctx, measure, &views.views).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_standalone_commands() {
        for args in [
            vec!["fx", "parse", "a IN ('b')"],
            vec!["fx", "format", "a IN ('b')"],
            vec!["fx", "config", "path"],
            vec!["fx", "completions", "bash"],
            vec!["fx"],
        ] {
            let cli = Cli::parse_from(args.clone());
            assert!(StandaloneDispatch::try_from_cli(&cli).is_some(), "{args:?}");
        }
    }

    #[test]
    fn test_session_commands_are_not_standalone() {
        for args in [
            vec!["fx", "show"],
            vec!["fx", "toggle", "region", "EU"],
            vec!["fx", "threshold", "remove", "revenue"],
            vec!["fx", "clear"],
            vec!["fx", "load", "f=a+IN+%28%27b%27%29"],
        ] {
            let cli = Cli::parse_from(args.clone());
            assert!(StandaloneDispatch::try_from_cli(&cli).is_none(), "{args:?}");
            assert!(SessionDispatch::from_cli(&cli).is_some(), "{args:?}");
        }
    }
}
