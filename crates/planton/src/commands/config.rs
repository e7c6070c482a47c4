use colored::Colorize;
use planton_config::{CliConfig, ConfigError, ConfigKey};

pub fn handle_set(key: &str, value: &str) -> anyhow::Result<()> {
    let key: ConfigKey = key.parse()?;
    let path = planton_config::config_file_path()?;

    let mut config = CliConfig::load_from(&path)?;
    config.set(key, value)?;
    config.save_to(&path)?;

    println!("Configuration {} set to {}", key, value.trim().cyan());
    Ok(())
}

pub fn handle_get(key: &str) -> anyhow::Result<()> {
    let key: ConfigKey = key.parse()?;
    let config = CliConfig::load_from(&planton_config::config_file_path()?)?;

    match config.get(key) {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => Err(ConfigError::NotSet(key.to_string()).into()),
    }
}

pub fn handle_list() -> anyhow::Result<()> {
    let config = CliConfig::load_from(&planton_config::config_file_path()?)?;
    let entries = config.entries();

    if entries.is_empty() {
        println!("No configuration values set");
        return Ok(());
    }
    for (key, value) in entries {
        println!("{key}={value}");
    }
    Ok(())
}
