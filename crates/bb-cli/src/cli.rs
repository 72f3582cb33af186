use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blackboard",
    about = "Tag-indexed blackboard with supervised workers",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Data directory, overrides the configuration file
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start every action and supervise until stopped
    Run(RunArgs),
    /// Manage the action roster
    Action(ActionArgs),
    /// Manage pre-registered nodes
    Node(NodeArgs),
    /// Show configuration, nodes, and roster
    Status(StatusArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
    /// Stop after this many seconds instead of waiting for Enter
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,
}

#[derive(Args)]
pub struct ActionArgs {
    #[command(subcommand)]
    pub action: ActionCommand,
}

#[derive(Subcommand)]
pub enum ActionCommand {
    /// Append an action to the roster
    Add { path: PathBuf, name: String },
    /// Remove an action from the roster
    Remove { name: String },
    /// List the roster
    List,
}

#[derive(Args)]
pub struct NodeArgs {
    #[command(subcommand)]
    pub action: NodeCommand,
}

#[derive(Subcommand)]
pub enum NodeCommand {
    /// Register one or more words
    Add {
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Remove a word
    Remove { word: String },
    /// List registered words
    List,
}

#[derive(Args)]
pub struct StatusArgs {}
