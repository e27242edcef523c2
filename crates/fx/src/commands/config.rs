//! Config command implementation.
//!
//! View and manage configuration settings.
//! Config file is located at ~/.config/fx/config.toml.

use std::env;
use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use super::{CommandContext, CommandError, Result};

/// Current config file version. Increment when making breaking changes to schema.
const CONFIG_VERSION: u32 = 1;

/// Configuration file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Config schema version for migrations.
    /// Defaults to current version when not present in file.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Catalog file used when `--catalog` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    /// Field names pinned when a session starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pinned: Vec<String>,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Returns the current config version (used by serde default).
fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            catalog: None,
            pinned: Vec::new(),
            output: OutputConfig::default(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Enable colors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

/// Gets the config directory path.
/// Uses XDG-style paths: ~/.config/fx/ on all platforms.
fn get_config_dir() -> Result<PathBuf> {
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config).join("fx"));
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join("fx"))
        .ok_or_else(|| CommandError::Config("Could not determine config directory".to_string()))
}

/// Gets the config file path.
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var("FX_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let config_dir = get_config_dir()?;
    Ok(config_dir.join("config.toml"))
}

/// Loads the configuration from disk.
pub fn load_config() -> Result<Config> {
    let path = get_config_path()?;

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| CommandError::Config(format!("Failed to read config: {}", e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| CommandError::Config(format!("Failed to parse config: {}", e)))?;

    migrate_config(config)
}

/// Migrates config to current version if needed.
/// Returns the config as-is if already at current version.
fn migrate_config(mut config: Config) -> Result<Config> {
    // Version 1 is the initial schema; later versions migrate here in order.
    config.version = CONFIG_VERSION;
    Ok(config)
}

/// Saves the configuration to disk.
fn save_config(config: &Config) -> Result<()> {
    let path = get_config_path()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            CommandError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| CommandError::Config(format!("Failed to serialize config: {}", e)))?;

    fs::write(&path, content)
        .map_err(|e| CommandError::Config(format!("Failed to write config: {}", e)))?;

    Ok(())
}

/// Executes the config show command.
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let config = load_config()?;
    let path = get_config_path()?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        use owo_colors::OwoColorize;

        let header = "Configuration";
        if ctx.use_colors {
            println!("{}\n", header.green().bold());
        } else {
            println!("{}\n", header);
        }

        println!("File: {}", path.display());
        println!("Exists: {}\n", path.exists());

        if path.exists() {
            println!("Settings:");
            if let Some(ref catalog) = config.catalog {
                println!("  catalog: {}", catalog.display());
            }
            if !config.pinned.is_empty() {
                println!("  pinned: {}", config.pinned.join(", "));
            }

            println!("\n[output]");
            if let Some(color) = config.output.color {
                println!("  color: {}", color);
            }
        } else {
            println!("(No config file exists. Run 'fx config set catalog <path>' to create one.)");
        }
    }

    Ok(())
}

/// Options for the config set command.
pub struct ConfigSetOptions {
    /// Configuration key.
    pub key: String,
    /// Configuration value.
    pub value: String,
}

/// Applies one `key = value` assignment to `config`.
fn set_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "catalog" => {
            config.catalog = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        "pinned" => {
            config.pinned = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        "output.color" => {
            config.output.color = Some(parse_bool(value)?);
        }
        _ => {
            return Err(CommandError::Config(format!(
                "Unknown config key '{}'. Valid keys: catalog, pinned, output.color",
                key
            )));
        }
    }
    Ok(())
}

/// Executes the config set command.
pub fn execute_set(ctx: &CommandContext, opts: &ConfigSetOptions) -> Result<()> {
    let mut config = load_config()?;
    let path = get_config_path()?;

    set_value(&mut config, &opts.key, &opts.value)?;
    save_config(&config)?;

    if ctx.json_output {
        let output = serde_json::json!({
            "status": "success",
            "key": opts.key,
            "value": opts.value,
            "path": path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        println!("Set {} = {}", opts.key, opts.value);
    }

    Ok(())
}

/// Executes the config path command.
pub fn execute_path(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path()?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

/// Parses a boolean value from string.
fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(CommandError::Config(format!(
            "Invalid boolean value '{}'. Use true/false, yes/no, 1/0, or on/off",
            s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_parse_bool_values() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("YES").unwrap());
        assert!(parse_bool("on").unwrap());
        assert!(!parse_bool("False").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
        assert!(parse_bool("").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(config.catalog.is_none());
        assert!(config.pinned.is_empty());
        assert!(config.output.color.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            version: CONFIG_VERSION,
            catalog: Some(PathBuf::from("/data/catalog.json")),
            pinned: vec!["region".to_string()],
            output: OutputConfig { color: Some(true) },
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("version = 1"));
        assert!(toml_str.contains("/data/catalog.json"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("color = true"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
version = 1
catalog = "catalog.toml"
pinned = ["region", "country"]

[output]
color = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.catalog, Some(PathBuf::from("catalog.toml")));
        assert_eq!(config.pinned, vec!["region", "country"]);
        assert_eq!(config.output.color, Some(false));
    }

    #[test]
    fn test_config_deserialization_empty() {
        let config: Config = toml::from_str("").unwrap();
        // Missing version defaults to current version
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(config.catalog.is_none());
        assert!(config.pinned.is_empty());
    }

    #[test]
    fn test_config_deserialization_with_future_version() {
        let config: Config = toml::from_str("version = 999").unwrap();
        assert_eq!(config.version, 999);
    }

    #[test]
    fn test_migrate_config_preserves_data() {
        let config = Config {
            version: 1,
            catalog: Some(PathBuf::from("c.json")),
            pinned: vec!["carrier".to_string()],
            output: OutputConfig { color: Some(false) },
        };

        let migrated = migrate_config(config).unwrap();
        assert_eq!(migrated.version, CONFIG_VERSION);
        assert_eq!(migrated.catalog, Some(PathBuf::from("c.json")));
        assert_eq!(migrated.pinned, vec!["carrier"]);
        assert_eq!(migrated.output.color, Some(false));
    }

    #[test]
    fn test_set_value_keys() {
        let mut config = Config::default();
        set_value(&mut config, "pinned", "region, country,,").unwrap();
        assert_eq!(config.pinned, vec!["region", "country"]);

        set_value(&mut config, "catalog", "views.json").unwrap();
        assert_eq!(config.catalog, Some(PathBuf::from("views.json")));
        set_value(&mut config, "catalog", "").unwrap();
        assert!(config.catalog.is_none());

        set_value(&mut config, "output.color", "off").unwrap();
        assert_eq!(config.output.color, Some(false));

        assert!(matches!(
            set_value(&mut config, "token", "x"),
            Err(CommandError::Config(_))
        ));
    }

    // ==================== Config Path Tests ====================

    /// Runs `f` with `FX_CONFIG` pointing into a fresh temp dir.
    fn with_config_env<T>(f: impl FnOnce(&PathBuf) -> T) -> T {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let original = env::var("FX_CONFIG").ok();
        env::set_var("FX_CONFIG", &path);
        let result = f(&path);
        match original {
            Some(val) => env::set_var("FX_CONFIG", val),
            None => env::remove_var("FX_CONFIG"),
        }
        result
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        with_config_env(|path| {
            assert_eq!(&get_config_path().unwrap(), path);
        });
    }

    #[test]
    #[serial]
    fn test_load_missing_config_is_default() {
        let config = with_config_env(|_| load_config().unwrap());
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(config.catalog.is_none());
    }

    #[test]
    #[serial]
    fn test_save_then_load_creates_parent_dirs() {
        let loaded = with_config_env(|path| {
            let mut config = Config::default();
            config.pinned = vec!["region".to_string()];
            save_config(&config).unwrap();
            assert!(path.exists());
            load_config().unwrap()
        });
        assert_eq!(loaded.pinned, vec!["region"]);
    }

    #[test]
    #[serial]
    fn test_load_invalid_config_is_config_error() {
        let result = with_config_env(|path| {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "version = \"one\"").unwrap();
            load_config()
        });
        assert!(matches!(result, Err(CommandError::Config(_))));
    }
}
