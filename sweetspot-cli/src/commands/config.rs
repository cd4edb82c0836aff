use crate::config::{ConfigLoader, SweetspotConfig};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show effective configuration (user + project + flags)
    Show,
    /// Show configuration file paths
    Path,
}

pub fn run(args: ConfigArgs, config: &SweetspotConfig) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            println!("{}", toml::to_string_pretty(config)?);
        }
        ConfigCommands::Path => {
            println!("User config:    {}", ConfigLoader::user_config_path().display());
            println!("Project config: {}", ConfigLoader::project_config_path().display());
        }
    }
    Ok(())
}
