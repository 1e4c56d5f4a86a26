use clap::Subcommand;
use skillforge_core::storage::Database;

#[derive(Subcommand)]
pub enum SkillAction {
    /// Create a skill
    Add {
        /// Skill name
        name: String,
        /// Goal in minutes (default: 10,000 hours)
        #[arg(long)]
        goal_minutes: Option<u64>,
    },
    /// List skills with progress
    List,
    /// Make a skill the default target for new sessions
    Activate {
        /// Skill ID
        id: String,
    },
}

pub fn run(action: SkillAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        SkillAction::Add { name, goal_minutes } => {
            let skill = db.create_skill(&name, goal_minutes)?;
            println!("{}", serde_json::to_string_pretty(&skill)?);
        }
        SkillAction::List => {
            let skills = db.list_skills()?;
            println!("{}", serde_json::to_string_pretty(&skills)?);
        }
        SkillAction::Activate { id } => {
            db.set_active_skill(&id)?;
            let skill = db.active_skill()?;
            println!("{}", serde_json::to_string_pretty(&skill)?);
        }
    }
    Ok(())
}
