use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "cozyfocus", version, about = "CozyFocus CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Daily notes
    Note {
        #[command(subcommand)]
        action: commands::note::NoteAction,
    },
    /// Markdown documents
    Doc {
        #[command(subcommand)]
        action: commands::doc::DocAction,
    },
    /// Tag registry
    Tag {
        #[command(subcommand)]
        action: commands::tag::TagAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Export all local data as a JSON bundle
    Export(commands::transfer::ExportArgs),
    /// Merge an exported bundle into local data
    Import(commands::transfer::ImportArgs),
    /// Delete local data
    Reset(commands::transfer::ResetArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("COZYFOCUS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Note { action } => commands::note::run(action),
        Commands::Doc { action } => commands::doc::run(action),
        Commands::Tag { action } => commands::tag::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Export(args) => commands::transfer::export(args),
        Commands::Import(args) => commands::transfer::import(args),
        Commands::Reset(args) => commands::transfer::reset(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "cozyfocus", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
