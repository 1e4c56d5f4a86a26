//! Daily journal commands for CLI.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use skillforge_core::model::local_date;
use skillforge_core::storage::Database;

#[derive(Subcommand)]
pub enum JournalAction {
    /// Write the entry for a day, replacing any earlier one
    Write {
        /// Entry text
        content: String,
        /// Day as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Free-form mood label
        #[arg(long)]
        mood: Option<String>,
        /// Skill ID the entry is about (repeatable)
        #[arg(long = "skill")]
        skills: Vec<String>,
    },
    /// Show the entry for a day
    Show {
        /// Day as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List recent entries
    List {
        /// Maximum number of entries
        #[arg(long, default_value = "14")]
        limit: usize,
    },
}

pub fn run(action: JournalAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let today = local_date(Utc::now());

    match action {
        JournalAction::Write {
            content,
            date,
            mood,
            skills,
        } => {
            let reflection =
                db.upsert_reflection(date.unwrap_or(today), &content, mood.as_deref(), &skills)?;
            println!("{}", serde_json::to_string_pretty(&reflection)?);
        }
        JournalAction::Show { date } => {
            let date = date.unwrap_or(today);
            let reflection = db
                .get_reflection(date)?
                .ok_or_else(|| format!("no journal entry for {date}"))?;
            println!("{}", serde_json::to_string_pretty(&reflection)?);
        }
        JournalAction::List { limit } => {
            let reflections = db.list_reflections(limit)?;
            println!("{}", serde_json::to_string_pretty(&reflections)?);
        }
    }
    Ok(())
}
