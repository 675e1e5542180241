//! A thin CLI smoke-test harness over `ref_builder_core`.
//!
//! This binary does not implement the curation workflow (fetching genome
//! records, building plans interactively, exporting); it only proves the
//! library is callable end to end: initialise a repository, rebuild its
//! index from the log, and show what is in it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ref_builder_core::model::RepoSettings;
use ref_builder_core::Repository;

#[derive(Parser)]
#[command(name = "ref-builder", about = "Smoke-test harness over the event-sourced OTU repository")]
struct Cli {
    /// Repository root directory.
    #[arg(long, global = true, default_value = ".")]
    path: PathBuf,

    /// Increase logging verbosity (repeatable: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new, empty repository at `path`.
    Init {
        name: String,
        organism: String,
        #[arg(long, default_value_t = 0.03)]
        segment_length_tolerance: f64,
    },
    /// Replay the event log and rebuild the derived SQLite index.
    RebuildIndex,
    /// Print one OTU, resolved by UUID, taxid, acronym, or id prefix.
    Show { identifier: String },
    /// List every OTU currently in the index.
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    ref_builder_core::core::logging::configure_logging(cli.verbose, cli.json_logs);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ref_builder_core::Result<()> {
    match cli.command {
        Command::Init {
            name,
            organism,
            segment_length_tolerance,
        } => {
            let repo = Repository::init(
                &cli.path,
                &name,
                &organism,
                RepoSettings {
                    default_segment_length_tolerance: segment_length_tolerance,
                },
            )?;
            println!("initialised repository {} for {}", repo.meta().id, repo.meta().organism);
            Ok(())
        }
        Command::RebuildIndex => {
            let mut repo = Repository::open(&cli.path)?;
            repo.rebuild_index()?;
            println!("index rebuilt");
            Ok(())
        }
        Command::Show { identifier } => {
            let mut repo = Repository::open(&cli.path)?;
            let otu = repo.get_otu_by_identifier(&identifier)?;
            println!("{}", serde_json::to_string_pretty(&otu)?);
            Ok(())
        }
        Command::List => {
            let repo = Repository::open(&cli.path)?;
            for otu in repo.iter_minimal_otus()? {
                println!("{}\t{}\t{}\t{}", otu.taxid, otu.acronym, otu.id, otu.name);
            }
            Ok(())
        }
    }
}
