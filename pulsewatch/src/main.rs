//! pulsewatch entry point

use clap::Parser;
use pulsewatch::cli::{self, Cli, Commands, GlobalOptions};
use pulsewatch::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let options = GlobalOptions::from(&cli);

    let _log_guard = logging::init().expect("failed to initialize logging");

    let result = match cli.command {
        Some(Commands::Serve(args)) => cli::serve::execute(&args, &options).await,
        Some(Commands::Endpoint(args)) => cli::endpoint::execute(&args, &options).await,
        Some(Commands::Check(args)) => cli::report::check(&args, &options).await,
        Some(Commands::History(args)) => cli::report::history(&args, &options).await,
        Some(Commands::Uptime(args)) => cli::report::uptime(&args, &options).await,
        None => {
            // No subcommand - default to serve
            cli::serve::execute(&cli::serve::ServeArgs::default(), &options).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
