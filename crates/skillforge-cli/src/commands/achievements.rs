use chrono::Utc;
use skillforge_core::storage::Database;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let achievements = db.list_achievements(Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&achievements)?);
    Ok(())
}
