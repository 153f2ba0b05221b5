// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Reports which methods changed between two commits", long_about = None)]
pub struct Args {
    /// Path to the git repository to inspect
    #[arg(short, long, env = "GIT_METHOD_DIFF_REPO", default_value = ".")]
    pub repo: PathBuf,

    /// Extensions listed as markup files
    #[arg(long, value_delimiter = ',', default_value = "jsp")]
    pub markup_ext: Vec<String>,

    /// Extensions listed as query script files
    #[arg(long, value_delimiter = ',', default_value = "sql")]
    pub query_ext: Vec<String>,

    /// Extensions parsed and attributed to methods
    #[arg(long, value_delimiter = ',', default_value = "java")]
    pub source_ext: Vec<String>,

    /// Soft width for commit messages in the report
    #[arg(long, default_value_t = 35)]
    pub wrap_width: usize,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List commits, oldest first, optionally starting at one
    Log {
        /// Commit id to start from (inclusive)
        #[arg(long)]
        from: Option<String>,
    },
    /// List the commits that can follow the base at this index of `log`
    Candidates {
        base_index: usize,
    },
    /// Attribute every change in base..new to methods and print the report
    Diff {
        base: String,
        new: String,

        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show a progress bar while diffing commit pairs
        #[arg(long)]
        progress: bool,
    },
}
