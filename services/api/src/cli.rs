use crate::demo::{run_check, run_demo, CheckArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tax_reports::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Tax Reports",
    about = "Run and exercise the tax report workflow from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check completeness and transmissibility of reports exported as CSV
    Check(CheckArgs),
    /// Walk a sample report through transmission and office review
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Load reports from a CSV export before serving
    #[arg(long, value_name = "CSV")]
    pub(crate) seed: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Check(args) => run_check(args),
        Command::Demo(args) => run_demo(args),
    }
}
