use chrono::{Local, Utc};
use clap::Subcommand;
use skillforge_core::storage::Database;
use skillforge_core::Config;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// All-time stats
    All,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let goals = Config::load_or_default().goals;
    let stats = db
        .stats(Utc::now())?
        .with_goals(goals.daily_goal_minutes, goals.weekly_goal_minutes);

    match action {
        StatsAction::Today => {
            let today = serde_json::json!({
                "date": Local::now().date_naive(),
                "minutes": stats.today_minutes,
                "sessions": stats.today_sessions,
                "daily_goal_minutes": stats.daily_goal_minutes,
                "daily_goal_pct": stats.daily_goal_pct,
                "streak_days": stats.streak_days,
            });
            println!("{}", serde_json::to_string_pretty(&today)?);
        }
        StatsAction::All => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
