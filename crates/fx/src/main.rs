use clap::Parser;
use std::env;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod dispatch;
mod output;

use cli::Cli;
use commands::config::load_config;
use commands::{CommandContext, CommandError};
use dispatch::{SessionCommand, SessionDispatch, StandaloneCommand, StandaloneDispatch};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                let error_json = serde_json::json!({
                    "error": {
                        "code": error_code(&e),
                        "message": e.to_string(),
                    }
                });
                match serde_json::to_string_pretty(&error_json) {
                    Ok(text) => eprintln!("{text}"),
                    Err(_) => eprintln!("{error_json}"),
                }
            } else {
                eprintln!("Error: {e}");
            }
            error_exit_code(&e)
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins; otherwise
/// `--verbose` selects debug and the default is warn.
fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn run(cli: &Cli) -> commands::Result<()> {
    let ctx = context(cli);

    if let Some(dispatch) = StandaloneDispatch::try_from_cli(cli) {
        return dispatch.execute(&ctx);
    }

    match SessionDispatch::from_cli(cli) {
        Some(dispatch) => dispatch.execute(&ctx).await,
        None => Ok(()),
    }
}

/// Builds the command context, letting `NO_COLOR` and the config file turn
/// colors off.
fn context(cli: &Cli) -> CommandContext {
    let mut ctx = CommandContext::from_cli(cli);
    if env::var_os("NO_COLOR").is_some() {
        ctx.use_colors = false;
    }
    if let Ok(config) = load_config() {
        if config.output.color == Some(false) {
            ctx.use_colors = false;
        }
    }
    ctx
}

/// Returns the error code string for JSON output.
fn error_code(e: &CommandError) -> &'static str {
    match e {
        CommandError::Parse(_) => "PARSE_ERROR",
        CommandError::Catalog(_) => "CATALOG_ERROR",
        CommandError::SessionStore(_) => "SESSION_ERROR",
        CommandError::Url(_) => "QUERY_ERROR",
        CommandError::NotFound(_) => "NOT_FOUND",
        CommandError::InvalidArgument(_) => "INVALID_ARGUMENT",
        CommandError::Config(_) => "CONFIG_ERROR",
        CommandError::Io(_) => "IO_ERROR",
        CommandError::Json(_) => "JSON_ERROR",
    }
}

/// Returns the exit code for an error.
fn error_exit_code(e: &CommandError) -> ExitCode {
    match e {
        CommandError::Parse(_) => ExitCode::from(1),
        CommandError::Url(_) => ExitCode::from(1),
        CommandError::InvalidArgument(_) => ExitCode::from(1),
        CommandError::Json(_) => ExitCode::from(1),
        CommandError::NotFound(_) => ExitCode::from(4),
        CommandError::Io(_) => ExitCode::from(3),
        CommandError::Catalog(_) => ExitCode::from(5),
        CommandError::SessionStore(_) => ExitCode::from(5),
        CommandError::Config(_) => ExitCode::from(5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_error_codes_per_kind() {
        let parse = CommandError::Parse(filter_expr_rs::parse("a IN (").unwrap_err());
        assert_eq!(error_code(&parse), "PARSE_ERROR");

        let missing = CommandError::NotFound("Field 'x' not found in the catalog.".to_string());
        assert_eq!(error_code(&missing), "NOT_FOUND");

        let config = CommandError::Config("bad".to_string());
        assert_eq!(error_code(&config), "CONFIG_ERROR");
    }

    #[test]
    #[serial]
    fn test_context_respects_no_color() {
        let original = env::var_os("NO_COLOR");
        env::set_var("NO_COLOR", "1");

        let cli = Cli::parse_from(["fx", "show"]);
        let ctx = context(&cli);

        match original {
            Some(val) => env::set_var("NO_COLOR", val),
            None => env::remove_var("NO_COLOR"),
        }

        assert!(!ctx.use_colors);
    }

    #[test]
    #[serial]
    fn test_context_respects_config_color() {
        use std::fs;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[output]\ncolor = false\n").unwrap();

        let original_config = env::var("FX_CONFIG").ok();
        let original_no_color = env::var_os("NO_COLOR");
        env::set_var("FX_CONFIG", &config_path);
        env::remove_var("NO_COLOR");

        let cli = Cli::parse_from(["fx", "show"]);
        let ctx = context(&cli);

        match original_config {
            Some(val) => env::set_var("FX_CONFIG", val),
            None => env::remove_var("FX_CONFIG"),
        }
        if let Some(val) = original_no_color {
            env::set_var("NO_COLOR", val);
        }

        assert!(!ctx.use_colors);
    }
}
