use clap::Subcommand;
use cozyfocus_core::storage::Database;
use cozyfocus_core::SystemClock;

#[derive(Subcommand)]
pub enum TagAction {
    /// List registered tags
    List,
    /// Register a tag
    Add {
        name: String,
    },
}

pub fn run(action: TagAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        TagAction::List => {
            for tag in db.list_tags()? {
                println!("{}", tag.name);
            }
        }
        TagAction::Add { name } => match db.ensure_tag(&SystemClock, &name)? {
            Some(tag) => println!("added {}", tag.name),
            None => println!("tag already exists or is empty: {name}"),
        },
    }
    Ok(())
}
