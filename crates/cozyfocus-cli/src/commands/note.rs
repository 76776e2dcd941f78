use clap::Subcommand;
use cozyfocus_core::storage::Database;
use cozyfocus_core::SystemClock;

use super::resolve_day;

#[derive(Subcommand)]
pub enum NoteAction {
    /// Write a note
    Add {
        content: String,
        #[arg(long)]
        day: Option<String>,
    },
    /// Replace a note's content
    Edit {
        id: String,
        content: String,
    },
    /// List notes of a day, newest first
    List {
        #[arg(long)]
        day: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: NoteAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let clock = SystemClock;

    match action {
        NoteAction::Add { content, day } => {
            let day = resolve_day(day)?;
            let note = db.create_note(&clock, &day, &content)?;
            println!("{}", serde_json::to_string_pretty(&note)?);
        }
        NoteAction::Edit { id, content } => {
            let note = db.update_note(&clock, &id, &content)?;
            println!("{}", serde_json::to_string_pretty(&note)?);
        }
        NoteAction::List { day, json } => {
            let day = resolve_day(day)?;
            let notes = db.list_notes(&day)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else if notes.is_empty() {
                println!("No notes for {day}.");
            } else {
                for note in &notes {
                    println!("{}  {}", note.id, note.content);
                }
            }
        }
    }
    Ok(())
}
