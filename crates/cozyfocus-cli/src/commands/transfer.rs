use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use cozyfocus_core::bundle::export_bundle;
use cozyfocus_core::merge::import_json;
use cozyfocus_core::storage::{Config, DataResetOptions, Database};
use cozyfocus_core::SystemClock;

#[derive(Args)]
pub struct ExportArgs {
    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Single-line JSON regardless of config
    #[arg(long)]
    compact: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Bundle file, or "-" for stdin
    path: PathBuf,
    /// Show the merge plan without writing anything
    #[arg(long)]
    dry_run: bool,
    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct ResetArgs {
    /// Delete every collection
    #[arg(long)]
    all: bool,
    #[arg(long)]
    tasks: bool,
    #[arg(long)]
    notes: bool,
    #[arg(long)]
    docs: bool,
    #[arg(long)]
    tags: bool,
    #[arg(long)]
    sessions: bool,
    #[arg(long)]
    stats: bool,
    #[arg(long)]
    settings: bool,
    /// Confirm deletion
    #[arg(long)]
    yes: bool,
}

pub fn export(args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let bundle = export_bundle(&db, None, &SystemClock)?;
    let json = bundle.to_json(config.export.pretty && !args.compact)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            eprintln!("exported {} records to {}", bundle.record_count(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn import(args: ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let text = if args.path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.path)?
    };

    let db = Database::open()?;
    let plan = import_json(&db, &text, args.dry_run)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    print!("{plan}");
    if plan.is_noop() {
        println!("Nothing to import: local data is already up to date.");
    } else if args.dry_run {
        println!("Dry run: nothing was written.");
    } else {
        let total = plan.total();
        println!("Imported {} new and {} updated records.", total.add, total.update);
    }
    Ok(())
}

pub fn reset(args: ResetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = if args.all {
        DataResetOptions::all()
    } else {
        DataResetOptions {
            tasks: args.tasks,
            notes: args.notes,
            docs: args.docs,
            tags: args.tags,
            sessions: args.sessions,
            stats: args.stats,
            settings: args.settings,
        }
    };
    let any = [
        options.tasks,
        options.notes,
        options.docs,
        options.tags,
        options.sessions,
        options.stats,
        options.settings,
    ]
    .contains(&true);
    if !any {
        return Err("nothing selected; pass --all or a collection flag".into());
    }
    if !args.yes {
        return Err("refusing to delete data without --yes".into());
    }

    let db = Database::open()?;
    let summary = db.reset_data(options)?;
    for (collection, n) in &summary.deleted {
        println!("{}: {n} deleted", collection.table());
    }
    Ok(())
}
