use clap::Subcommand;
use cozyfocus_core::storage::{Database, DocPatch};
use cozyfocus_core::SystemClock;

use super::resolve_day;

#[derive(Subcommand)]
pub enum DocAction {
    /// Create a document
    Add {
        title: String,
        /// Markdown body
        #[arg(long, default_value = "")]
        markdown: String,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        day: Option<String>,
    },
    /// Edit a document
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        markdown: Option<String>,
        /// Replace the tag list (repeatable)
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },
    /// List documents of a day, or all documents with a tag
    List {
        #[arg(long)]
        day: Option<String>,
        #[arg(long, conflicts_with = "day")]
        tag: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: DocAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let clock = SystemClock;

    match action {
        DocAction::Add {
            title,
            markdown,
            tags,
            day,
        } => {
            let day = resolve_day(day)?;
            let doc = db.create_doc(&clock, &day, &title, &markdown, &tags)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        DocAction::Edit {
            id,
            title,
            markdown,
            tags,
        } => {
            let doc = db.patch_doc(
                &clock,
                &id,
                DocPatch {
                    title,
                    markdown,
                    tags,
                },
            )?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        DocAction::List { day, tag, json } => {
            let docs = match tag {
                Some(tag) => db.docs_with_tag(&tag)?,
                None => {
                    let day = resolve_day(day)?;
                    db.docs().get_all(Some(day.as_str()))?
                }
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&docs)?);
            } else if docs.is_empty() {
                println!("No documents.");
            } else {
                for doc in &docs {
                    println!("{}  {}  [{}]", doc.id, doc.title, doc.tags.join(", "));
                }
            }
        }
    }
    Ok(())
}
