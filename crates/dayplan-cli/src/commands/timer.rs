use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use dayplan_core::error::SessionError;
use dayplan_core::schedule::timestamp::clock_label;
use dayplan_core::{Block, SessionRegistry, TimerEngine, TimerEvent, TimerState};

use super::{load_blocks, CliResult};

const TICK: Duration = Duration::from_secs(1);

#[derive(Args)]
pub struct TimerArgs {
    /// JSON file with a generated plan
    pub file: PathBuf,
    /// Block index to start from
    #[arg(short, long, default_value = "0")]
    pub start: usize,
}

pub fn run(args: TimerArgs) -> CliResult {
    let blocks = load_blocks(&args.file)?;
    println!("Starting timer with {} blocks", blocks.len());
    if args.start > 0 {
        println!("Starting from block {}", args.start + 1);
    }
    countdown(blocks, args.start)?;
    Ok(())
}

/// Run `blocks` from `start` until the plan completes or Ctrl-C is pressed.
/// Returns the session id and the engine in its final state.
pub fn countdown(blocks: Vec<Block>, start: usize) -> CliResult<(String, TimerEngine)> {
    let mut registry = SessionRegistry::new();
    let id = registry.create(blocks)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(&mut registry, &id, start))?;

    let engine = registry.remove(&id)?;
    tracing::info!(
        session = %id,
        completed = engine.completed_blocks().len(),
        state = ?engine.state(),
        "timer finished"
    );
    Ok((id, engine))
}

async fn drive(registry: &mut SessionRegistry, id: &str, start: usize) -> Result<(), SessionError> {
    report(registry.start(id, start)?, registry.get(id)?);

    let mut interval = tokio::time::interval(TICK);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while registry.get(id)?.state() == TimerState::Running {
        tokio::select! {
            _ = interval.tick() => {
                let events = registry.tick(id)?;
                let engine = registry.get(id)?;
                report(events, engine);
                print_remaining(engine);
            }
            _ = &mut ctrl_c => {
                if let Some(event) = registry.stop(id)? {
                    report(vec![event], registry.get(id)?);
                }
                break;
            }
        }
    }
    Ok(())
}

fn print_remaining(engine: &TimerEngine) {
    if engine.state() != TimerState::Running {
        return;
    }
    let secs = engine.remaining_ms() / 1000;
    print!("\r  {:02}:{:02} remaining ", secs / 60, secs % 60);
    let _ = std::io::stdout().flush();
}

fn report(events: Vec<TimerEvent>, engine: &TimerEngine) {
    for event in events {
        match event {
            TimerEvent::BlockStarted {
                block_index,
                kind,
                title,
                ..
            } => {
                let window = engine
                    .blocks()
                    .get(block_index)
                    .map(|b| format!("{} - {}", clock_label(&b.start), clock_label(&b.end)))
                    .unwrap_or_default();
                println!("\n[{}] {title} ({window})", kind.as_str());
            }
            TimerEvent::BlockCompleted { title, .. } => println!("\rCompleted: {title}          "),
            TimerEvent::EventPassed { title, .. } => println!("Event: {title}"),
            TimerEvent::TimerStopped { block_index, .. } => {
                println!("\nTimer stopped at block {}", block_index + 1);
            }
            TimerEvent::PlanCompleted {
                completed_blocks,
                completed_pomodoros,
                ..
            } => println!(
                "All blocks completed: {completed_blocks} blocks, {completed_pomodoros} pomodoros"
            ),
            other => tracing::debug!(event = ?other, "timer event"),
        }
    }
}
