//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Row synchronization for tree and table grids: inspect how a grid follows its object graph
#[derive(Parser, Debug)]
#[command(name = "gridsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Local settings file (overrides the global one)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath, env = "GRIDSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the grid rows of a graph as tree
    Tree {
        /// Graph file (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        graph: PathBuf,
        /// Expand every node
        #[arg(short, long)]
        expand_all: bool,
        /// Show the root row
        #[arg(short, long)]
        root_visible: bool,
    },

    /// Show the selection path built for an object
    Path {
        /// Graph file (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        graph: PathBuf,
        /// Object id
        object: String,
    },

    /// Show the rows added and removed when a graph changes
    Diff {
        /// Graph before the change
        #[arg(value_hint = ValueHint::FilePath)]
        before: PathBuf,
        /// Graph after the change
        #[arg(value_hint = ValueHint::FilePath)]
        after: PathBuf,
        /// Changed objects (default: all objects of both graphs)
        #[arg(short, long = "object")]
        objects: Vec<String>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,
}
