use clap::{Parser, Subcommand};

pub mod run;
pub mod status;
pub mod version;

#[derive(Parser)]
#[command(name = "statusbot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "WhatsApp status automation bot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot service
    Run {
        /// Port for the HTTP status page (overrides PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Directory holding the session credential file (overrides SESSION_DIR)
        #[arg(long)]
        session_dir: Option<String>,

        /// Use the in-process loopback transport instead of a live connection
        #[arg(long)]
        loopback: bool,
    },

    /// Show local session presence and deployment counters
    Status,

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run {
            port,
            session_dir,
            loopback,
        } => run::execute(port, session_dir, loopback).await,
        Commands::Status => status::execute(),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
