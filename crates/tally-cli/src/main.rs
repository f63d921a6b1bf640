//! Tally command-line tool.
//!
//! Works on a JSON snapshot of one owner's documents (the same shape a
//! store subscription delivers). Read-only by default; commands that change
//! state print the result and save only with `--write`.
//!
//! Usage:
//!   tally lists
//!   tally show Hardware --sort status
//!   tally export Groceries
//!   tally move-list 2 0 --write
//!   tally cycle Hardware nails --write

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tally_client::Session;
use tally_core::{EngineConfig, SortMode};

mod commands;

/// Shared lists with per-list status workflows.
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Inspect and edit Tally lists")]
struct Args {
    /// Snapshot file to read (and write with --write)
    #[arg(long, default_value = "tally.json")]
    data: PathBuf,

    /// Engine config (RON). Missing file means defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Owner to act as; defaults to the owner of the first list
    #[arg(long)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show lists in display order
    Lists,
    /// Show a list's items
    Show {
        list: String,
        /// custom, name-ascending, name-descending, or status
        #[arg(long, value_parser = parse_sort)]
        sort: Option<SortMode>,
    },
    /// Print a list grouped by status
    Export { list: String },
    /// Move the list at display index FROM to index TO
    MoveList {
        from: usize,
        to: usize,
        #[arg(long)]
        write: bool,
    },
    /// Advance an item to its next status
    Cycle {
        list: String,
        item: String,
        #[arg(long)]
        write: bool,
    },
}

fn parse_sort(s: &str) -> Result<SortMode, String> {
    SortMode::from_str(s).ok_or_else(|| format!("unknown sort mode '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = tally_telemetry::init_tracing("tally");
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load_or_default(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let snapshot = commands::load_snapshot(&args.data)?;
    let owner = commands::pick_owner(args.owner.as_deref(), &snapshot)?;
    tracing::debug!(%owner, lists = snapshot.lists.len(), "snapshot loaded");

    let mut session = Session::new(owner, config);
    let applied = session.apply_snapshot(&snapshot);
    for stale in &applied.stale {
        tracing::debug!(?stale, "stale reference");
    }

    let (output, write) = match &args.command {
        Command::Lists => (commands::lists(&session), false),
        Command::Show { list, sort } => {
            let list = commands::find_list(&session, list)?;
            (commands::show(&mut session, list, *sort)?, false)
        }
        Command::Export { list } => {
            let list = commands::find_list(&session, list)?;
            (session.export(list)?, false)
        }
        Command::MoveList { from, to, write } => (commands::move_list(&mut session, *from, *to)?, *write),
        Command::Cycle { list, item, write } => {
            let list = commands::find_list(&session, list)?;
            let item = commands::find_item(&session, list, item)?;
            (commands::cycle(&mut session, list, item)?, *write)
        }
    };
    print!("{output}");

    let writes = session.take_mutations();
    if writes.is_empty() {
        return Ok(());
    }
    if write {
        let count = writes.len();
        let saved = commands::commit(owner, snapshot, writes).await?;
        commands::save_snapshot(&args.data, &saved)?;
        tracing::info!(count, path = %args.data.display(), "saved");
    } else {
        eprintln!("{} pending write(s) not saved; pass --write to save", writes.len());
    }
    Ok(())
}
