mod cmd_agent;
mod cmd_cleanup;
mod cmd_prefs;
mod cmd_serve;
mod cmd_sync;
mod workstation;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use workstation::{AgentArgs, Workstation};

#[derive(Parser)]
#[command(
    name = "vibe",
    version,
    about = "PR lifecycle automation for Vibe Kanban task worktrees"
)]
struct Cli {
    /// Preferences directory [default: $VIBE_PREFERENCES_DIR or /workspace/data/preferences]
    #[arg(long, global = true)]
    prefs_dir: Option<PathBuf>,
    /// Task API base URL [default: $VIBE_KANBAN_API_URL or http://localhost:9091]
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or reuse the PR for this task worktree, then review, merge and sync status as configured
    Cleanup {
        #[command(flatten)]
        agent: AgentArgs,
        /// Also print lifecycle events as JSON lines on stdout
        #[arg(long)]
        json_events: bool,
    },
    /// Mark the task done if a merged PR exists for its branch
    SyncStatus,
    /// Run the agent on a prompt read from stdin, then the selected PR phases
    Agent {
        /// Create or reuse a PR after the agent finishes
        #[arg(long)]
        create_pr: bool,
        /// Run the review phase
        #[arg(long)]
        review: bool,
        /// Merge the PR (implies --create-pr)
        #[arg(long)]
        merge: bool,
        #[command(flatten)]
        agent: AgentArgs,
        /// Also print lifecycle events as JSON lines on stdout
        #[arg(long)]
        json_events: bool,
    },
    /// Read and write preference documents
    Prefs {
        #[command(subcommand)]
        cmd: PrefsCmd,
    },
    /// Serve preference documents over HTTP
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port
        #[arg(long, default_value_t = 3001)]
        port: u16,
    },
}

#[derive(Subcommand)]
enum PrefsCmd {
    /// Print a document (created with its default when absent)
    Get {
        /// Document key or file name, e.g. `automations` or `pr-prompt.md`
        name: String,
    },
    /// Replace a document with the contents of a file or stdin
    Set {
        /// Document key or file name
        name: String,
        /// Read the new content from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List known documents
    List,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let ws = Workstation::new(cli.prefs_dir, cli.api_url);
    match cli.cmd {
        Command::Cleanup { agent, json_events } => cmd_cleanup::execute(&ws, &agent, json_events),
        Command::SyncStatus => cmd_sync::execute(&ws),
        Command::Agent {
            create_pr,
            review,
            merge,
            agent,
            json_events,
        } => cmd_agent::execute(
            &ws,
            cmd_agent::selection(create_pr, review, merge),
            &agent,
            json_events,
        ),
        Command::Prefs { cmd } => match cmd {
            PrefsCmd::Get { name } => cmd_prefs::get(&ws, &name),
            PrefsCmd::Set { name, file } => cmd_prefs::set(&ws, &name, file.as_deref()),
            PrefsCmd::List => cmd_prefs::list(&ws),
        },
        Command::Serve { bind, port } => cmd_serve::execute(&ws, &bind, port),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
