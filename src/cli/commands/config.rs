use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use super::Cli;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display current merged configuration
    Show {
        /// Output format: toml, json
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
    /// Get one configuration value or section
    Get { key: String },
    /// Check that the merged configuration yields a valid decision input
    Validate,
}

pub fn execute(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;

    match &args.command {
        ConfigCommand::Show { format } => {
            let full = config.get_full_config()?;
            match format.to_lowercase().as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&full)?),
                "toml" => print!("{}", toml::to_string_pretty(&full)?),
                other => bail!("Unsupported format: {other}. Use json or toml"),
            }
        }
        ConfigCommand::Get { key } => match config.get_section(key)? {
            serde_json::Value::String(s) => println!("{s}"),
            value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
                println!("{}", serde_json::to_string_pretty(&value)?)
            }
            value => println!("{value}"),
        },
        ConfigCommand::Validate => {
            let overrides = config.settings()?.strategy_override()?;
            println!(
                "Configuration is valid (strategy: {:?}, workers: {}, grouping: {})",
                overrides.strategy,
                overrides
                    .requested_workers
                    .map(|w| w.to_string())
                    .unwrap_or_else(|| "auto".to_string()),
                overrides.grouping
            );
        }
    }

    Ok(())
}
