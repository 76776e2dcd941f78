use clap::Subcommand;
use cozyfocus_core::storage::{Database, TaskPatch};
use cozyfocus_core::SystemClock;

use super::resolve_day;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a task
    Add {
        /// Task title
        title: String,
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        day: Option<String>,
    },
    /// List tasks of a day
    List {
        #[arg(long)]
        day: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle completion
    Done {
        /// Task ID
        id: String,
    },
    /// Rename a task
    Rename {
        id: String,
        title: String,
    },
    /// Delete a task
    Delete {
        id: String,
    },
    /// Show or set the task in focus for a day
    Focus {
        /// Task ID to focus on
        id: Option<String>,
        #[arg(long)]
        day: Option<String>,
        /// Clear the current focus
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let clock = SystemClock;

    match action {
        TaskAction::Add { title, day } => {
            let day = resolve_day(day)?;
            let task = db.create_task(&clock, &day, &title)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { day, json } => {
            let day = resolve_day(day)?;
            let tasks = db.list_tasks(&day)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("No tasks for {day}.");
            } else {
                let focus = db.current_focus(&day)?;
                for task in &tasks {
                    let mark = if task.completed { "x" } else { " " };
                    let star = if focus.as_deref() == Some(task.id.as_str()) { " *" } else { "" };
                    println!("[{mark}] {}  {}{star}", task.id, task.title);
                }
            }
        }
        TaskAction::Done { id } => {
            let task = db.toggle_task(&clock, &id)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Rename { id, title } => {
            let task = db.patch_task(
                &clock,
                &id,
                TaskPatch {
                    title: Some(title),
                    ..Default::default()
                },
            )?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Delete { id } => {
            if db.delete_task(&id)? {
                println!("deleted {id}");
            } else {
                eprintln!("task not found: {id}");
                std::process::exit(1);
            }
        }
        TaskAction::Focus { id, day, clear } => {
            let day = resolve_day(day)?;
            if clear {
                db.set_current_focus(&clock, &day, None)?;
                println!("focus cleared for {day}");
            } else if let Some(id) = id {
                db.set_current_focus(&clock, &day, Some(id.as_str()))?;
                println!("focus for {day}: {id}");
            } else {
                match db.current_focus(&day)? {
                    Some(id) => println!("{id}"),
                    None => println!("No focus task for {day}."),
                }
            }
        }
    }
    Ok(())
}
