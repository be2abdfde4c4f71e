use clap::{Parser, Subcommand};

mod aws;
mod cli;
mod config;
mod error;
mod tunnel;

pub use error::{Result, TunnelError};

#[derive(Parser)]
#[command(name = "ec2-tunnel")]
#[command(about = "SOCKS5 tunnel manager for a tagged EC2 dev server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the EC2 instance and establish the SSH tunnel
    Start {
        /// Run the SSH tunnel in the foreground with verbose output
        #[arg(long)]
        debug: bool,
    },

    /// Stop the EC2 instance
    Stop,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::Config::from_env()?;

    match cli.command {
        Commands::Start { debug } => cli::commands::start::execute(&config, debug).await,
        Commands::Stop => cli::commands::stop::execute(&config).await,
    }
}
