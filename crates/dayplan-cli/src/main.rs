use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "dayplan", version, about = "Pomodoro day planner")]
struct Cli {
    /// Debug logging on stderr (DAYPLAN_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a day plan from tasks and events
    Plan(commands::plan::PlanArgs),
    /// Generate a plan and run the timer over it
    Run(commands::run::RunArgs),
    /// Run the timer over a previously generated plan
    Timer(commands::timer::TimerArgs),
    /// Export a generated plan as an iCalendar file
    Export(commands::export::ExportArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Session history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("DAYPLAN_LOG")
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Timer(args) => commands::timer::run(args),
        Commands::Export(args) => commands::export::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::History { action } => commands::history::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
