//! Configuration management.

use clap::Subcommand;
use deskwell_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a single value by dotted key (e.g. timing.break_free_min)
    Get { key: String },
    /// Set a value and persist
    Set { key: String, value: String },
    /// Print the whole config as TOML
    List,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("{key} = {value}");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
