#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::uninlined_format_args
)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, EnvFilter};

use hookdispatch::concurrency::{lock_dir_for, ResourceLock};
use hookdispatch::hooks::{Discriminators, BLOCK_EXIT_CODE};
use hookdispatch::{Config, DispatchOutcome, Dispatcher, HookEvent};

/// `hooks-loader` - run plugin hooks for one runtime event.
#[derive(Parser, Debug)]
#[command(name = "hooks-loader")]
#[command(version)]
#[command(about = "Dispatch runtime events to plugin hooks.", long_about = None)]
struct Cli {
    /// Plugins root (overrides config and HOOKDISPATCH_PLUGINS_DIR)
    #[arg(long, global = true)]
    plugins_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct SubjectArgs {
    /// Tool name matchers are tested against (default: payload `tool_name`)
    #[arg(long)]
    tool: Option<String>,

    /// Notification kind (default: payload `type` or `notification_type`)
    #[arg(long)]
    notification: Option<String>,

    /// Agent kind (default: payload `agent_type`)
    #[arg(long)]
    agent: Option<String>,
}

impl SubjectArgs {
    fn apply(self, mut discriminators: Discriminators) -> Discriminators {
        if let Some(tool) = self.tool {
            discriminators.tool = tool;
        }
        if let Some(notification) = self.notification {
            discriminators.notification = notification;
        }
        if let Some(agent) = self.agent {
            discriminators.agent = agent;
        }
        discriminators
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run matching hooks with the event payload read from stdin
    Dispatch {
        /// Event name (PreToolUse, PostToolUse, Notification, ...)
        event: String,

        #[command(flatten)]
        subject: SubjectArgs,
    },

    /// List scanned plugins and the events they register
    Plugins,

    /// Show the hooks that would run for an event, without running them
    Hooks {
        event: String,

        #[command(flatten)]
        subject: SubjectArgs,
    },

    /// Run a shell command while holding the lock for a state file
    WithLock {
        /// State file the lock directory is placed next to
        state_file: PathBuf,

        /// Give up after this many milliseconds (default: config `lock.timeout_ms`)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Command to run inside the critical section. A single word is a
        /// shell script; several words are run as one argv.
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let subscriber = fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install tracing subscriber: {e}");
    }

    let cli = Cli::parse();
    let is_dispatch = matches!(cli.command, Commands::Dispatch { .. });
    match run(cli).await {
        Ok(code) => code,
        // The host must never break because of the loader itself.
        Err(e) if is_dispatch => {
            warn!("dispatch failed: {e:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(plugins_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(dir) = plugins_dir {
        config.dispatch.plugins_dir = dir;
    }
    Ok(config)
}

async fn dispatch(plugins_dir: Option<PathBuf>, event: &str, subject: SubjectArgs) -> Result<ExitCode> {
    let Ok(event) = event.parse::<HookEvent>() else {
        debug!(event, "ignoring unknown event");
        return Ok(ExitCode::SUCCESS);
    };

    let mut payload = String::new();
    tokio::io::stdin()
        .read_to_string(&mut payload)
        .await
        .context("Failed to read event payload from stdin")?;

    let dispatcher = Dispatcher::new(load_config(plugins_dir)?);
    let discriminators = subject.apply(Discriminators::from_payload(&payload));

    match dispatcher.dispatch(event, &discriminators, &payload).await {
        DispatchOutcome::Silent => Ok(ExitCode::SUCCESS),
        DispatchOutcome::Output(json) => {
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        DispatchOutcome::Blocked(reason) => {
            eprintln!("{}", reason.trim_end());
            Ok(ExitCode::from(u8::try_from(BLOCK_EXIT_CODE).unwrap_or(2)))
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let plugins_dir = cli.plugins_dir;
    match cli.command {
        Commands::Dispatch { event, subject } => dispatch(plugins_dir, &event, subject).await,
        Commands::Plugins => {
            let dispatcher = Dispatcher::new(load_config(plugins_dir)?);
            let registry = dispatcher.scan();
            if registry.is_empty() {
                println!(
                    "No plugins found in {}",
                    dispatcher.config().dispatch.plugins_dir.display()
                );
            }
            for plugin in registry.plugins() {
                let status = match (&plugin.events, plugin.has_hooks) {
                    (_, false) => "no hooks".to_string(),
                    (None, true) => "manifest unreadable".to_string(),
                    (Some(_), true) => plugin.event_names().join(", "),
                };
                println!("{}  [{}]", plugin.name, status);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Hooks { event, subject } => {
            let event: HookEvent = event.parse()?;
            let dispatcher = Dispatcher::new(load_config(plugins_dir)?);
            let hooks = dispatcher.resolve(event, &subject.apply(Discriminators::default()));
            if hooks.is_empty() {
                println!("No hooks match {event}");
            }
            for hook in hooks {
                let mode = if hook.is_async { "async" } else { "sync" };
                println!("{:<5} {}: {}", mode, hook.plugin_name, hook.command);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::WithLock {
            state_file,
            timeout_ms,
            command,
        } => {
            let config = load_config(plugins_dir)?;
            let timeout = timeout_ms.map_or_else(|| config.lock.timeout(), Duration::from_millis);
            let lock = ResourceLock::new(lock_dir_for(&state_file))
                .with_timeout(timeout)
                .with_retry_interval(config.lock.retry_interval());

            let Some(guard) = lock.acquire().await else {
                eprintln!(
                    "could not acquire {} within {}ms",
                    lock.path().display(),
                    timeout.as_millis()
                );
                return Ok(ExitCode::FAILURE);
            };

            let status = locked_command(&config.dispatch.shell, &command).status().await;
            guard.release();

            let status = status.context("Failed to run locked command")?;
            Ok(status
                .code()
                .and_then(|c| u8::try_from(c).ok())
                .map_or(ExitCode::FAILURE, ExitCode::from))
        }
    }
}

/// `<shell> -c <script>` for one word, otherwise `<shell> -c '"$@"' with-lock <words...>`
/// so each word stays one argument.
fn locked_command(shell: &str, words: &[String]) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(shell);
    match words {
        [script] => {
            cmd.arg("-c").arg(script);
        }
        _ => {
            cmd.arg("-c").arg("\"$@\"").arg("with-lock").args(words);
        }
    }
    cmd
}
