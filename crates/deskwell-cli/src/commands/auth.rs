//! Microsoft Graph presence token management.
//!
//! The token lives in the OS keyring, never in the config file.

use clap::Subcommand;
use deskwell_core::presence::keyring_store;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the Graph presence token in the OS keyring
    SetToken { token: String },
    /// Remove the stored token
    ClearToken,
    /// Show whether a token is stored
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::SetToken { token } => {
            keyring_store::set(keyring_store::GRAPH_TOKEN_KEY, &token)?;
            println!("presence token stored");
        }
        AuthAction::ClearToken => {
            keyring_store::delete(keyring_store::GRAPH_TOKEN_KEY)?;
            println!("presence token cleared");
        }
        AuthAction::Status => {
            let stored = keyring_store::get(keyring_store::GRAPH_TOKEN_KEY)?.is_some();
            println!(
                "presence token: {}",
                if stored { "stored" } else { "not set" }
            );
        }
    }
    Ok(())
}
