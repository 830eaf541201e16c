use std::process::Stdio;

use futures_util::future::join_all;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::matcher::ExecutableHook;
use super::merge::fold_outputs;

/// Exit status a hook uses to block the triggering action.
pub const BLOCK_EXIT_CODE: i32 = 2;

/// Shell used to interpret hook commands when none is configured.
pub const DEFAULT_SHELL: &str = "bash";

/// Outcome of one hook process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookExecutionResult {
    pub plugin_name: String,
    /// `None` when the process could not be spawned or was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub blocked: bool,
    /// Spawn or wait failure, if any.
    pub error: Option<String>,
}

impl HookExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn failed(plugin_name: &str, error: String) -> Self {
        Self {
            plugin_name: plugin_name.to_string(),
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Combined outcome of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    pub blocked: bool,
    pub stderr: String,
    pub merged_output: String,
}

/// Runs resolved hooks as subprocesses.
///
/// Every hook is spawned at once and the runner waits on a join-all barrier
/// for all of them, fire-and-forget hooks included. The first blocked hook in
/// list order decides the dispatch; otherwise stdout documents are merged in
/// list order.
#[derive(Debug, Clone)]
pub struct HookRunner {
    shell: String,
}

impl Default for HookRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRunner {
    pub fn new() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub async fn run(&self, hooks: &[ExecutableHook], payload: &str) -> AggregateResult {
        if hooks.is_empty() {
            return AggregateResult::default();
        }

        let futs: Vec<_> = hooks
            .iter()
            .map(|hook| self.execute(hook, payload))
            .collect();
        let results = join_all(futs).await;

        if let Some(blocker) = results.iter().find(|r| r.blocked) {
            info!(plugin = %blocker.plugin_name, "dispatch blocked by hook");
            return AggregateResult {
                blocked: true,
                stderr: blocker.stderr.clone(),
                merged_output: String::new(),
            };
        }

        let merged = fold_outputs(
            hooks
                .iter()
                .zip(&results)
                .filter(|(hook, _)| !hook.is_async)
                .map(|(_, result)| result.stdout.as_str()),
        );

        AggregateResult {
            blocked: false,
            stderr: String::new(),
            merged_output: merged.map(|m| m.to_json()).unwrap_or_default(),
        }
    }

    /// Run one hook to completion. Never fails; errors are recorded in the result.
    pub async fn execute(&self, hook: &ExecutableHook, payload: &str) -> HookExecutionResult {
        if hook.is_async {
            self.execute_detached(hook).await
        } else {
            self.execute_piped(hook, payload).await
        }
    }

    async fn execute_piped(&self, hook: &ExecutableHook, payload: &str) -> HookExecutionResult {
        debug!(plugin = %hook.plugin_name, command = %hook.command, "spawning hook");
        let mut child = match Command::new(&self.shell)
            .arg("-c")
            .arg(&hook.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(c) => c,
            Err(e) => {
                warn!(plugin = %hook.plugin_name, error = %e, "failed to spawn hook");
                return HookExecutionResult::failed(&hook.plugin_name, format!("failed to spawn: {e}"));
            }
        };

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // Hooks that never read stdin close the pipe early.
                let _ = stdin.write_all(payload.as_bytes()).await;
                let _ = stdin.shutdown().await;
            }
        };
        let ((), output) = tokio::join!(feed, child.wait_with_output());

        let output = match output {
            Ok(o) => o,
            Err(e) => {
                warn!(plugin = %hook.plugin_name, error = %e, "failed to wait for hook");
                return HookExecutionResult::failed(&hook.plugin_name, format!("process error: {e}"));
            }
        };

        let exit_code = output.status.code();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(plugin = %hook.plugin_name, ?exit_code, "hook exited");
        if !output.status.success() && exit_code != Some(BLOCK_EXIT_CODE) {
            debug!(plugin = %hook.plugin_name, stderr = %stderr.trim(), "hook failed");
        }

        HookExecutionResult {
            plugin_name: hook.plugin_name.clone(),
            exit_code,
            stdout,
            stderr,
            blocked: exit_code == Some(BLOCK_EXIT_CODE),
            error: None,
        }
    }

    async fn execute_detached(&self, hook: &ExecutableHook) -> HookExecutionResult {
        debug!(plugin = %hook.plugin_name, command = %hook.command, "spawning async hook");
        let spawned = Command::new(&self.shell)
            .arg("-c")
            .arg(&hook.command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(c) => c,
            Err(e) => {
                warn!(plugin = %hook.plugin_name, error = %e, "failed to spawn async hook");
                return HookExecutionResult::failed(&hook.plugin_name, format!("failed to spawn: {e}"));
            }
        };

        // Wait so the child is not torn down with the dispatcher's process group.
        match child.wait().await {
            Ok(status) => HookExecutionResult {
                plugin_name: hook.plugin_name.clone(),
                exit_code: status.code(),
                ..HookExecutionResult::default()
            },
            Err(e) => HookExecutionResult::failed(&hook.plugin_name, format!("process error: {e}")),
        }
    }
}
