use clap::Subcommand;
use skillforge_core::storage::Database;

#[derive(Subcommand)]
pub enum DbAction {
    /// Recompute skill, task and daily totals from the session log
    Rebuild,
    /// List recent sessions
    Sessions {
        /// Maximum number of sessions
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

pub fn run(action: DbAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        DbAction::Rebuild => {
            let summary = db.rebuild_aggregates()?;
            tracing::info!(?summary, "aggregates rebuilt");
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        DbAction::Sessions { limit } => {
            let sessions = db.list_sessions(limit)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}
