use clap::{Parser, Subcommand};

mod commands;
mod prompter;

#[derive(Parser)]
#[command(name = "deskwell-cli", version, about = "Work-day wellness tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracking daemon (minute tick + HTTP API)
    Serve {
        /// Listen port override
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show today's status from a running daemon
    Status,
    /// Start the work day
    Start,
    /// End the work day
    End,
    /// List recent activity events
    Events {
        /// Maximum rows to print
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Presence token management
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve { port } => commands::serve::run(port),
        Commands::Status => commands::client::status(),
        Commands::Start => commands::client::start(),
        Commands::End => commands::client::end(),
        Commands::Events { limit } => commands::events::run(limit),
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
