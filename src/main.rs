use clap::Parser;
use indexr::cli::{self, Cli, Commands};
use indexr::core::models::DataPath;
use std::io;

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let data_path = DataPath::new(cli.data_path.clone())?;
    data_path.ensure_exists()?;

    match &cli.command {
        Commands::Start { watch } => cli::handle_start_command(&data_path, *watch).await,
        Commands::Status => cli::handle_status_command(&data_path).await,
        Commands::Watch => cli::handle_watch_command(&data_path).await,
        Commands::Cancel => cli::handle_cancel_command(&data_path).await,
        Commands::Config { command } => cli::handle_config_command(&data_path, command),
        Commands::Errors { command } => cli::handle_errors_command(&data_path, command),
    }
}
