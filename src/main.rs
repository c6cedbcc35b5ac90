//! Workflow Panels CLI entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use workflow_panels::commands::find_command;
use workflow_panels::runtime::Runtime;
use workflow_panels::terminal::run_inherited;
use workflow_panels::ui::TUI;
use workflow_panels::{PanelKind, ReloadTrigger, RowAction, Settings};

#[derive(Debug, Parser)]
#[command(name = "workflow-panels", version, about = "Config-driven workflow dashboard")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive dashboard (default)
    Tui,
    /// Print the three panels once and exit
    Show,
    /// Load the config and report what would be watched
    Check,
    /// Run a configured command by label
    Run {
        /// Command label, or "Command N" for unlabeled commands
        label: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Tui);

    init_logging(matches!(command, Command::Tui));
    log::info!("Workflow Panels v{}", env!("CARGO_PKG_VERSION"));

    match command {
        Command::Tui => tui(cli.settings).await,
        Command::Show => show(cli.settings).await,
        Command::Check => check(cli.settings).await,
        Command::Run { label } => run(cli.settings, &label).await,
    }
}

/// Log to stderr for headless commands, to a file under the cache dir for the TUI
fn init_logging(tui: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if tui {
        let file = dirs::cache_dir()
            .map(|dir| dir.join("workflow-panels"))
            .and_then(|dir| {
                fs::create_dir_all(&dir).ok()?;
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(dir.join("panels.log"))
                    .ok()
            });

        match file {
            Some(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            None => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    } else {
        builder.format_timestamp(None);
    }

    builder.init();
}

async fn tui(settings: Settings) -> Result<()> {
    let runtime = Runtime::start(settings).await?;

    let result = {
        let mut tui = TUI::new()?;
        tui.run(runtime.clone()).await
    };

    runtime.teardown();
    result
}

async fn show(settings: Settings) -> Result<()> {
    let runtime = Runtime::new(settings)?;
    if let Err(e) = runtime.reload(ReloadTrigger::Activation).await {
        eprintln!("{}", e);
    }

    for (idx, kind) in PanelKind::ALL.iter().enumerate() {
        if idx > 0 {
            println!();
        }
        println!("{}", kind.title());
        for row in runtime.rows(*kind).await {
            match row.action {
                Some(RowAction::OpenFile(path)) => {
                    println!("  {}  ({})", row.label, path.display())
                }
                _ => println!("  {}", row.label),
            }
        }
    }

    runtime.teardown();
    Ok(())
}

async fn check(settings: Settings) -> Result<()> {
    let runtime = Runtime::new(settings)?;
    let snapshot = runtime.reload(ReloadTrigger::Activation).await?;
    let snapshot = snapshot.or_else(|| runtime.current());

    println!("Workspace: {}", runtime.root().display());
    println!("Config: {}", runtime.config_path().display());

    if let Some(snapshot) = snapshot {
        let config = &snapshot.config;
        println!(
            "Current task: {}",
            config.current_task_path().unwrap_or("(not configured)")
        );
        println!(
            "Task queue: {}",
            config.task_queue_path().unwrap_or("(not configured)")
        );
        println!("Status files: {}", config.statuses.len());
        println!("Commands: {}", config.commands.len());
    }

    let watches = runtime.watch_set();
    println!("Watched:");
    for path in &watches.watched {
        println!("  {}", path.display());
    }
    if !watches.unwatched.is_empty() {
        println!("Outside workspace (timer only):");
        for path in &watches.unwatched {
            println!("  {}", path.display());
        }
    }

    runtime.teardown();
    Ok(())
}

async fn run(settings: Settings, label: &str) -> Result<()> {
    let runtime = Runtime::new(settings)?;
    runtime.reload(ReloadTrigger::Activation).await?;

    let launch = find_command(runtime.current().as_deref(), runtime.root(), label)?;
    runtime.teardown();

    let code = run_inherited(&launch).await?;
    std::process::exit(code);
}
