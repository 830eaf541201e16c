use crate::config::Config;
use crate::plugins::PluginRegistry;

use super::event::{Discriminators, HookEvent};
use super::matcher::{extract_hooks, ExecutableHook};
use super::runner::{AggregateResult, HookRunner};

/// What the invoking process should do after a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No hook produced mergeable output.
    Silent,
    /// One merged JSON document for stdout.
    Output(String),
    /// Deny the action: diagnostic for stderr, exit with the block status.
    Blocked(String),
}

impl From<AggregateResult> for DispatchOutcome {
    fn from(result: AggregateResult) -> Self {
        if result.blocked {
            DispatchOutcome::Blocked(result.stderr)
        } else if result.merged_output.is_empty() {
            DispatchOutcome::Silent
        } else {
            DispatchOutcome::Output(result.merged_output)
        }
    }
}

/// One-shot dispatcher: scan, match, run, merge.
///
/// Holds no state across calls; every dispatch rescans the plugins root.
pub struct Dispatcher {
    config: Config,
    runner: HookRunner,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        let runner = HookRunner::new().with_shell(config.dispatch.shell.clone());
        Self { config, runner }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scan(&self) -> PluginRegistry {
        PluginRegistry::scan(&self.config.dispatch.plugins_dir)
    }

    /// Hooks that would run for `event`, without running them.
    pub fn resolve(&self, event: HookEvent, discriminators: &Discriminators) -> Vec<ExecutableHook> {
        let registry = self.scan();
        extract_hooks(
            registry.plugins(),
            event,
            discriminators,
            &self.config.dispatch.async_programs,
        )
    }

    /// Run every matching hook for `event` with `payload` on stdin.
    pub async fn dispatch(
        &self,
        event: HookEvent,
        discriminators: &Discriminators,
        payload: &str,
    ) -> DispatchOutcome {
        let hooks = self.resolve(event, discriminators);
        if hooks.is_empty() {
            tracing::debug!(%event, "no matching hooks");
            return DispatchOutcome::Silent;
        }
        tracing::debug!(%event, count = hooks.len(), "dispatching hooks");

        let payload = if payload.trim().is_empty() { "{}" } else { payload };
        self.runner.run(&hooks, payload).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_aggregate() {
        assert_eq!(
            DispatchOutcome::from(AggregateResult::default()),
            DispatchOutcome::Silent
        );
        assert_eq!(
            DispatchOutcome::from(AggregateResult {
                blocked: false,
                stderr: String::new(),
                merged_output: "{}".into(),
            }),
            DispatchOutcome::Output("{}".into())
        );
        assert_eq!(
            DispatchOutcome::from(AggregateResult {
                blocked: true,
                stderr: "no".into(),
                merged_output: String::new(),
            }),
            DispatchOutcome::Blocked("no".into())
        );
    }

    #[tokio::test]
    async fn missing_plugins_dir_is_silent() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.dispatch.plugins_dir = tmp.path().join("absent");

        let dispatcher = Dispatcher::new(config);
        let outcome = dispatcher
            .dispatch(HookEvent::PreToolUse, &Discriminators::default(), "")
            .await;
        assert_eq!(outcome, DispatchOutcome::Silent);
    }
}
