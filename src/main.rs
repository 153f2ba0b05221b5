// src/main.rs

mod attributor;
mod backend;
mod classify;
mod cli;
mod error;
mod hunks;
mod locator;
mod model;
mod parser;
mod resolver;
mod session;
mod workspace;
mod wrap;

use anyhow::{Context, Result};
use clap::Parser;
use classify::PathClassifier;
use cli::{Args, Command};
use model::CommitSummary;
use session::ReportOptions;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use workspace::Workspace;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let start_time = Instant::now();

    let classifier = PathClassifier::new(args.markup_ext, args.query_ext, args.source_ext);
    let report = ReportOptions { wrap_width: args.wrap_width, ..ReportOptions::default() };
    let progress = matches!(args.command, Command::Diff { progress: true, .. });

    let mut workspace = Workspace::new(classifier, report).with_progress(progress);
    workspace
        .select_root(&args.repo)
        .with_context(|| format!("could not open repository at {}", args.repo.display()))?;

    match args.command {
        Command::Log { from } => {
            let commits = match from.as_deref() {
                Some(anchor) => workspace.list_commits_from(Some(anchor)),
                None => workspace.visible_base_commits(),
            };
            print_commits(&commits);
        }
        Command::Candidates { base_index } => {
            print_commits(&workspace.visible_new_commits(base_index));
        }
        Command::Diff { base, new, output, .. } => {
            let report = workspace.run_diff(&base, &new).with_context(|| format!("diff {base}..{new} failed"))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, report).with_context(|| format!("could not write report to {}", path.display()))?;
                    tracing::info!(path = %path.display(), "report written");
                }
                None => print!("{report}"),
            }
        }
    }

    tracing::info!(elapsed = ?start_time.elapsed(), "done");
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "git_method_diff=warn",
        1 => "git_method_diff=info",
        _ => "git_method_diff=debug",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn print_commits(commits: &[CommitSummary]) {
    for (index, commit) in commits.iter().enumerate() {
        println!("{index:>4}  {}", commit.label());
    }
}
