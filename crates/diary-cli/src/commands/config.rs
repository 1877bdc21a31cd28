//! Config command handlers

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use diary_core::Config;

use crate::output::{Output, OutputFormat};

pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let entries = config.entries();

    match output.format {
        OutputFormat::Json => {
            let map: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::String(value)))
                .collect();
            println!("{}", Value::Object(map));
        }
        OutputFormat::Quiet => println!("{}", config.data_dir.display()),
        OutputFormat::Human => {
            println!("Configuration:");
            for (key, value) in entries {
                let value = if value.is_empty() { "(not set)".to_string() } else { value };
                println!("  {:<11} {}", format!("{key}:"), value);
            }
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Change one key and write the config file back
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    config.set(&key, &value)?;
    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}
