//! Task management commands for CLI.

use clap::Subcommand;
use skillforge_core::storage::Database;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a task under a skill
    Add {
        /// Task title
        title: String,
        /// Skill ID (default: the active skill)
        #[arg(long)]
        skill: Option<String>,
        /// Estimated work intervals
        #[arg(long, default_value = "1")]
        estimated: u32,
    },
    /// List tasks
    List {
        /// Filter by skill ID
        #[arg(long)]
        skill: Option<String>,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        TaskAction::Add {
            title,
            skill,
            estimated,
        } => {
            let skill_id = match skill {
                Some(id) => id,
                None => db
                    .active_skill()?
                    .map(|s| s.id)
                    .ok_or("no active skill; pass --skill")?,
            };
            let task = db.create_task(&skill_id, &title, estimated)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { skill } => {
            let tasks = db.list_tasks(skill.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
    }
    Ok(())
}
