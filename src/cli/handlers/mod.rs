mod driver;
mod init;
pub use driver::{DriverError, MAX_ATTEMPTS, PassSummary, focus_once, run_pass};
pub use init::cmd_init;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use regex::Regex;
use tracing::{error, info};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::history::HistoryStore;
use crate::io::store::{FileStore, SnapshotStore};
use crate::io::workspace::{Workspace, WorkspaceError, discover_workspace};
use crate::model::config::{EngineConfig, WorkspaceConfig};
use crate::model::tag::NodeKind;
use crate::ops::{check, query};
use crate::parse::{TagSyntax, parse_name};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let dir = cli.workspace_dir.as_deref();

    match &cli.command {
        Commands::Init => cmd_init(dir, json),
        Commands::Plan => cmd_plan(&cli, json),
        Commands::Run(args) => cmd_run(&cli, args, json),
        Commands::Focus(args) => cmd_focus(&cli, args, json),
        Commands::Parse(args) => cmd_parse(&cli, args, json),
        Commands::Tasks(args) => cmd_tasks(&cli, args, json),
        Commands::Check => cmd_check(&cli, json),
        Commands::History(args) => cmd_history(&cli, args, json),
        Commands::Config(cmd) => match &cmd.action {
            ConfigAction::Show => cmd_config_show(&cli, json),
            ConfigAction::Set { key, value } => cmd_config_set(&cli, key, value),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A discovered workspace with its configuration, overrides applied
struct Session {
    workspace: Workspace,
    config: WorkspaceConfig,
}

impl Session {
    fn engine(&self) -> EngineConfig {
        self.config.engine()
    }

    fn store(&self) -> FileStore {
        FileStore::new(&self.workspace)
    }

    fn history(&self) -> HistoryStore {
        HistoryStore::new(&self.workspace)
    }
}

fn start_dir(cli: &Cli) -> Result<PathBuf, WorkspaceError> {
    match &cli.workspace_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => std::env::current_dir().map_err(|e| WorkspaceError::ReadError {
            path: PathBuf::from("."),
            source: e,
        }),
    }
}

fn load_session(cli: &Cli) -> Result<Session, WorkspaceError> {
    let workspace = discover_workspace(&start_dir(cli)?)?;
    let mut config = workspace.load_config()?;
    apply_overrides(&mut config, &cli.overrides);
    Ok(Session { workspace, config })
}

/// Flags and environment variables beat config.toml
pub fn apply_overrides(config: &mut WorkspaceConfig, overrides: &Overrides) {
    if let Some(label) = &overrides.next_action_label {
        config.labels.next_action = label.clone();
    }
    if let Some(label) = &overrides.focus_label {
        config.labels.focus = Some(label.clone()).filter(|l| !l.is_empty());
    }
    if let Some(days) = overrides.hide_future {
        config.schedule.hide_future_days = days;
    }
    if let Some(c) = overrides.p_suffix {
        config.tags.parallel = c;
    }
    if let Some(c) = overrides.s_suffix {
        config.tags.sequential = c;
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Label passes
// ---------------------------------------------------------------------------

fn cmd_plan(cli: &Cli, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let session = load_session(cli)?;
    let snapshot = session.store().fetch()?;
    let plan = crate::ops::compute_label_operations(&snapshot, &session.engine())?;

    if json {
        return print_json(&plan);
    }
    print!("{}", render_operations(&plan.operations, &snapshot));
    if !plan.diagnostics.is_clean() {
        println!();
        print!("{}", render_diagnostics(&plan.diagnostics));
    }
    Ok(())
}

fn cmd_run(cli: &Cli, args: &RunArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let session = load_session(cli)?;
    let engine = session.engine();
    engine.validate()?;
    let delay = Duration::from_secs(args.delay.unwrap_or(session.config.schedule.delay_secs));
    let store = session.store();
    let history = session.history();

    info!(
        workspace = %session.workspace.dir.display(),
        delay_secs = delay.as_secs(),
        once = args.once,
        "starting"
    );
    loop {
        let started = Instant::now();
        match run_pass(&store, Some(&history), &engine, Utc::now()) {
            Ok(summary) => {
                if json {
                    println!("{}", serde_json::to_string(&summary)?);
                } else if !summary.plan.operations.is_empty()
                    || summary.focus.as_ref().is_some_and(|f| !f.is_noop())
                {
                    let snapshot = store.fetch()?;
                    let mut ops = summary.plan.operations.clone();
                    if let Some(focus) = &summary.focus {
                        ops.extend(focus.operations.iter().cloned());
                    }
                    print!("{}", render_operations(&ops, &snapshot));
                }
            }
            Err(e @ DriverError::Config(_)) => return Err(e.into()),
            Err(e) if args.once => return Err(e.into()),
            Err(e) => error!(error = %e, "pass failed"),
        }
        if args.once {
            return Ok(());
        }
        std::thread::sleep(delay.saturating_sub(started.elapsed()));
    }
}

fn cmd_focus(cli: &Cli, args: &FocusArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let session = load_session(cli)?;
    let engine = session.engine();
    engine.validate()?;
    let history = session.history();
    let (result, report) = focus_once(
        &session.store(),
        Some(&history),
        &engine,
        args.winner.as_deref(),
        args.apply,
        Utc::now(),
    )?;

    if json {
        return print_json(&serde_json::json!({ "result": result, "report": report }));
    }
    print!("{}", render_reconcile(&result));
    if let Some(report) = report {
        for failure in &report.failures {
            println!("failed: {} ({})", failure.operation, failure.reason);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_parse(cli: &Cli, args: &ParseArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let kind = NodeKind::parse(&args.kind)
        .ok_or_else(|| format!("unknown kind '{}' (project, section, task, subtask)", args.kind))?;
    // Outside a workspace the default tag characters apply
    let config = match load_session(cli) {
        Ok(session) => session.config,
        Err(WorkspaceError::NotAWorkspace) => {
            let mut config = WorkspaceConfig::default();
            apply_overrides(&mut config, &cli.overrides);
            config
        }
        Err(e) => return Err(e.into()),
    };
    let engine = config.engine();
    engine.validate()?;

    let parsed = parse_name(&args.name, kind, &TagSyntax::from(&engine));
    if json {
        print_json(&ParseJson::new(&parsed, kind))
    } else {
        print!("{}", render_parsed(&parsed, kind));
        Ok(())
    }
}

fn cmd_tasks(cli: &Cli, args: &TasksArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let session = load_session(cli)?;
    let snapshot = session.store().fetch()?;
    let filter = query::TaskFilter {
        label: args.label.clone(),
        contains: args.contains.as_deref().map(Regex::new).transpose()?,
    };
    let rows = query::list_tasks(&snapshot, &filter, &session.engine());

    if json {
        return print_json(&rows);
    }
    print!("{}", render_tasks(&rows));
    Ok(())
}

fn cmd_check(cli: &Cli, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let session = load_session(cli)?;
    let engine = session.engine();
    engine.validate()?;
    let snapshot = session.store().fetch()?;
    let diagnostics = check::check_snapshot(&snapshot, &engine);

    if json {
        print_json(&diagnostics)?;
    } else if diagnostics.is_clean() {
        println!("No problems found.");
    } else {
        print!("{}", render_diagnostics(&diagnostics));
    }
    if !diagnostics.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_history(cli: &Cli, args: &HistoryArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let session = load_session(cli)?;
    let label = args.label.as_deref().or(session.config.labels.focus.as_deref());
    let sessions = session.history().list_sessions(label, args.limit)?;

    if json {
        return print_json(&sessions);
    }
    print!("{}", render_sessions(&sessions));
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config_show(cli: &Cli, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let session = load_session(cli)?;
    if json {
        return print_json(&session.config);
    }
    print!("{}", toml::to_string_pretty(&session.config)?);
    Ok(())
}

fn cmd_config_set(cli: &Cli, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = discover_workspace(&start_dir(cli)?)?;
    config_io::update_config(&workspace, key, value)?;
    println!("{} = {:?}", key, value);
    Ok(())
}
