use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(name = "memex", version, about = "Client for the local memex knowledge service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Command::Server(command) => match command {
                ServerCommand::Start => handlers::server_start().await,
                ServerCommand::Stop => handlers::server_stop().await,
                ServerCommand::Status => handlers::server_status().await,
                ServerCommand::Restart => handlers::server_restart().await,
            },
            Command::Cortex(command) => match command {
                CortexCommand::Create(args) => handlers::cortex_create(args).await,
                CortexCommand::List => handlers::cortex_list().await,
                CortexCommand::Show(args) => handlers::cortex_show(args).await,
                CortexCommand::Index(args) => handlers::cortex_index(args).await,
            },
            Command::Query(args) => handlers::query(args).await,
            Command::Init => handlers::init().await,
            Command::Completions(args) => handlers::completions(args),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the background API server
    #[command(subcommand)]
    Server(ServerCommand),
    /// Manage cortices (indexed document collections)
    #[command(subcommand)]
    Cortex(CortexCommand),
    /// Run a query against the indexed cortices
    Query(QueryArgs),
    /// Initialize the service's backing stores
    Init,
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Subcommand, Debug)]
pub enum ServerCommand {
    /// Start the server if it is not already running
    Start,
    /// Stop the running server
    Stop,
    /// Report whether the server is running
    Status,
    /// Stop the server, then start a fresh instance
    Restart,
}

#[derive(Subcommand, Debug)]
pub enum CortexCommand {
    /// Create a new cortex over a folder
    Create(CreateArgs),
    /// List all known cortices
    List,
    /// Show one cortex
    Show(SelectArgs),
    /// Index (or re-index) one cortex
    Index(SelectArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Folder the cortex is created over
    #[arg(long, short = 'p')]
    pub path: String,

    /// Name of the new cortex
    #[arg(long, short = 'n')]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Cortex id
    #[arg(long, conflicts_with = "name")]
    pub id: Option<String>,

    /// Cortex name
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Query text
    pub text: String,

    /// Stream the answer as it is produced
    #[arg(long, short = 's')]
    pub stream: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

mod handlers;
