use crate::inspect::{run_document_listing, run_project_timeline, ListArgs, TimelineArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use repositorio::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Repositorio FCA",
    about = "Serve and inspect the faculty's institutional document repository",
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
    /// Browse documents from a seed file the way a given role would
    Documents {
        #[command(subcommand)]
        command: DocumentsCommand,
    },
    /// Inspect extension projects
    Projects {
        #[command(subcommand)]
        command: ProjectsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DocumentsCommand {
    /// Print the filtered directory listing, or export it as CSV
    List(ListArgs),
}

#[derive(Subcommand, Debug)]
enum ProjectsCommand {
    /// Print every record filed under a project code, oldest first
    Timeline(TimelineArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// JSON array of stored records to load instead of APP_SEED_FILE
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Documents {
            command: DocumentsCommand::List(args),
        } => run_document_listing(args),
        Command::Projects {
            command: ProjectsCommand::Timeline(args),
        } => run_project_timeline(args),
    }
}
