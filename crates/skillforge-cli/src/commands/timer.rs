use std::ops::ControlFlow;

use clap::Subcommand;
use serde::Serialize;
use skillforge_core::{
    ConfigFile, CreditReceipt, Database, Engine, Event, SessionKind, SessionTarget, TickDriver,
    TimerStatus, Transition,
};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a session
    Start {
        /// work, short-recovery or long-recovery (default: next in the cycle)
        #[arg(long)]
        kind: Option<SessionKind>,
        /// Skill ID to credit (default: the active skill)
        #[arg(long)]
        skill: Option<String>,
        /// Task ID to log against
        #[arg(long)]
        task: Option<String>,
    },
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// Stop the session, crediting whole elapsed minutes of work
    Stop,
    /// Leave the completed state without waiting for the next session
    Dismiss,
    /// Print current timer state as JSON
    Status,
    /// Drive the timer in the foreground until it goes idle or Ctrl-C
    Run,
}

/// What a timer command prints.
#[derive(Serialize)]
struct Report<'a> {
    events: &'a [Event],
    credits: &'a [CreditReceipt],
    state: Event,
}

fn print_report(engine: &Engine<Database>, t: &Transition) -> Result<(), Box<dyn std::error::Error>> {
    let report = Report {
        events: &t.events,
        credits: &t.credits,
        state: engine.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Open the engine and catch it up with the time since the last command.
fn load_engine() -> Result<(Engine<Database>, Transition), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let settings = ConfigFile::default_location()?;
    let mut engine = Engine::new(db, settings);
    let restored = engine.restore();
    Ok((engine, restored))
}

/// Check `--skill` and `--task` against the database.
///
/// Without `--skill` the task's own skill is used, then the active skill.
fn start_target(
    db: &Database,
    skill: Option<String>,
    task: Option<String>,
) -> Result<SessionTarget, Box<dyn std::error::Error>> {
    let task = match task {
        Some(id) => Some(db.get_task(&id)?.ok_or(format!("unknown task: {id}"))?),
        None => None,
    };
    let skill_id = match (skill, &task) {
        (Some(id), _) => {
            if db.get_skill(&id)?.is_none() {
                return Err(format!("unknown skill: {id}").into());
            }
            Some(id)
        }
        (None, Some(task)) => Some(task.skill_id.clone()),
        (None, None) => db.active_skill()?.map(|s| s.id),
    };
    if let (Some(task), Some(skill_id)) = (&task, &skill_id) {
        if task.skill_id != *skill_id {
            return Err(format!(
                "task {} belongs to skill {}, not {skill_id}",
                task.id, task.skill_id
            )
            .into());
        }
    }
    Ok(SessionTarget {
        skill_id,
        task_id: task.map(|t| t.id),
    })
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut engine, mut t) = load_engine()?;

    match action {
        TimerAction::Start { kind, skill, task } => {
            let kind = kind.unwrap_or(engine.state().next_kind);
            let target = start_target(engine.store(), skill, task)?;
            t.merge(engine.start(kind, target)?);
        }
        TimerAction::Pause => t.merge(engine.pause()?),
        TimerAction::Resume => t.merge(engine.resume()?),
        TimerAction::Stop => t.merge(engine.stop()?),
        TimerAction::Dismiss => t.merge(engine.dismiss()?),
        TimerAction::Status => t.merge(engine.tick()),
        TimerAction::Run => return drive(engine),
    }

    print_report(&engine, &t)
}

fn drive(mut engine: Engine<Database>) -> Result<(), Box<dyn std::error::Error>> {
    if engine.status() == TimerStatus::Idle {
        println!("{}", serde_json::to_string(&engine.snapshot())?);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let ticks = runtime.block_on(async {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "could not listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        TickDriver::default()
            .run(&mut engine, shutdown, |engine, t| {
                for event in &t.events {
                    match serde_json::to_string(event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => tracing::warn!(error = %e, "failed to encode event"),
                    }
                }
                if engine.status() == TimerStatus::Idle {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await
    });
    tracing::debug!(ticks, "foreground run finished");

    println!("{}", serde_json::to_string(&engine.snapshot())?);
    Ok(())
}
