use crate::commands::{run_artifacts_check, run_score, ArtifactArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use creditpath::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "creditpath",
    about = "Serve and exercise the loan default scoring pipeline",
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
    /// Score one applicant record from a JSON file and print the result
    Score(ScoreArgs),
    /// Inspect the trained artifacts
    Artifacts {
        #[command(subcommand)]
        command: ArtifactsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ArtifactsCommand {
    /// Load and cross-validate the artifact directory, then print a summary
    Check(ArtifactArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured artifact directory
    #[arg(long)]
    pub(crate) artifacts: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Artifacts {
            command: ArtifactsCommand::Check(args),
        } => run_artifacts_check(args),
    }
}
