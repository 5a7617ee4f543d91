use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "al", about = concat!("autolabel v", env!("CARGO_PKG_VERSION"), " - next actions from tagged names"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log decisions at debug level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "workspace-dir", global = true)]
    pub workspace_dir: Option<String>,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Settings that take precedence over config.toml
#[derive(Args, Default)]
pub struct Overrides {
    /// Next-action label name ("" disables labeling)
    #[arg(long, global = true, env = "AUTOLABEL_LABEL")]
    pub next_action_label: Option<String>,

    /// Singleton focus label name
    #[arg(long, global = true, env = "AUTOLABEL_FOCUS_LABEL")]
    pub focus_label: Option<String>,

    /// Hide tasks due more than this many days ahead (0 = off)
    #[arg(long, global = true, env = "AUTOLABEL_HIDE_FUTURE")]
    pub hide_future: Option<u32>,

    /// Parallel suffix character
    #[arg(long, global = true, env = "AUTOLABEL_P_SUFFIX")]
    pub p_suffix: Option<char>,

    /// Sequential suffix character
    #[arg(long, global = true, env = "AUTOLABEL_S_SUFFIX")]
    pub s_suffix: Option<char>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an autolabel/ workspace in the current directory
    Init,
    /// Show the label operations the next pass would apply
    Plan,
    /// Apply label operations periodically
    Run(RunArgs),
    /// Preview or apply focus label reconciliation
    Focus(FocusArgs),
    /// Decode the tag characters in a name
    Parse(ParseArgs),
    /// List open tasks
    Tasks(TasksArgs),
    /// Report structural errors and tag warnings in the snapshot
    Check,
    /// Show past focus sessions
    History(HistoryArgs),
    /// Show or edit config.toml
    Config(ConfigCmd),
}

#[derive(Args)]
pub struct RunArgs {
    /// Exit after a single pass
    #[arg(long)]
    pub once: bool,
    /// Seconds between passes
    #[arg(long, env = "AUTOLABEL_DELAY")]
    pub delay: Option<u64>,
}

#[derive(Args)]
pub struct FocusArgs {
    /// Task that must keep (or receive) the focus label
    #[arg(long)]
    pub winner: Option<String>,
    /// Apply the operations instead of previewing them
    #[arg(long)]
    pub apply: bool,
}

#[derive(Args)]
pub struct ParseArgs {
    /// Raw name, tag characters included
    pub name: String,
    /// Item kind: project, section, task or subtask
    #[arg(long, default_value = "task")]
    pub kind: String,
}

#[derive(Args)]
pub struct TasksArgs {
    /// Only tasks carrying this label
    #[arg(long)]
    pub label: Option<String>,
    /// Only tasks whose name matches this regex
    #[arg(long)]
    pub contains: Option<String>,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Maximum number of sessions to show
    #[arg(long, default_value = "20")]
    pub limit: usize,
    /// Label to show sessions for (default: the configured focus label)
    #[arg(long)]
    pub label: Option<String>,
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set a key in config.toml, e.g. `labels.focus focus`
    Set {
        /// Dotted key: table.field
        key: String,
        /// New value ("" clears labels.focus)
        value: String,
    },
}
