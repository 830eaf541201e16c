use regex::Regex;
use std::path::Path;

use crate::plugins::manifest::{HookCommand, PluginManifest, PLUGIN_ROOT_PLACEHOLDER};

use super::event::{Discriminators, HookEvent};

/// A resolved command ready to run for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableHook {
    pub command: String,
    pub is_async: bool,
    pub plugin_name: String,
}

impl ExecutableHook {
    pub fn sync(command: impl Into<String>, plugin_name: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            is_async: false,
            plugin_name: plugin_name.into(),
        }
    }
}

/// Select and resolve every hook for `event` across `plugins`.
///
/// Order: plugin order, then entry order, then command order.
pub fn extract_hooks(
    plugins: &[PluginManifest],
    event: HookEvent,
    discriminators: &Discriminators,
    async_programs: &[String],
) -> Vec<ExecutableHook> {
    let subject = discriminators.subject(event);
    let mut hooks = Vec::new();

    for plugin in plugins {
        for entry in plugin.entries_for(event.as_str()) {
            if !matches_filter(entry.matcher.as_deref(), subject) {
                continue;
            }
            for template in entry.hooks.iter().filter(|h| h.is_runnable()) {
                let command = resolve_command(&template.command, &plugin.root_path);
                let is_async = is_async_command(template, &command, async_programs);
                hooks.push(ExecutableHook {
                    command,
                    is_async,
                    plugin_name: plugin.name.clone(),
                });
            }
        }
    }

    hooks
}

/// `None` or empty matches everything; an invalid pattern matches nothing.
pub fn matches_filter(matcher: Option<&str>, subject: &str) -> bool {
    let Some(pattern) = matcher.filter(|m| !m.is_empty()) else {
        return true;
    };
    match Regex::new(pattern) {
        Ok(re) => re.is_match(subject),
        Err(e) => {
            tracing::debug!(pattern, error = %e, "invalid hook matcher; treating as non-matching");
            false
        }
    }
}

/// Substitute the plugin root placeholder in a single pass.
pub fn resolve_command(template: &str, root: &Path) -> String {
    template.replace(PLUGIN_ROOT_PLACEHOLDER, &root.to_string_lossy())
}

fn is_async_command(template: &HookCommand, resolved: &str, async_programs: &[String]) -> bool {
    if let Some(flag) = template.is_async {
        return flag;
    }
    leading_program(resolved).is_some_and(|program| async_programs.iter().any(|p| p == program))
}

/// File name of the first token of a shell command.
fn leading_program(command: &str) -> Option<&str> {
    let first = command.split_whitespace().next()?;
    Some(first.rsplit('/').next().unwrap_or(first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::manifest::EventEntry;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn command(cmd: &str) -> HookCommand {
        HookCommand {
            kind: Some("command".into()),
            command: cmd.into(),
            is_async: None,
        }
    }

    fn plugin(name: &str, root: &str, event: &str, entries: Vec<EventEntry>) -> PluginManifest {
        let mut events = HashMap::new();
        events.insert(event.to_string(), entries);
        PluginManifest {
            name: name.into(),
            root_path: PathBuf::from(root),
            has_hooks: true,
            events: Some(events),
        }
    }

    fn entry(matcher: Option<&str>, cmds: &[&str]) -> EventEntry {
        EventEntry {
            matcher: matcher.map(String::from),
            hooks: cmds.iter().map(|c| command(c)).collect(),
        }
    }

    fn tool(name: &str) -> Discriminators {
        Discriminators {
            tool: name.into(),
            ..Discriminators::default()
        }
    }

    fn defaults() -> Vec<String> {
        vec!["afplay".into(), "aplay".into(), "paplay".into()]
    }

    #[test]
    fn no_matcher_always_matches() {
        let plugins = vec![plugin("p", "/p", "PreToolUse", vec![entry(None, &["echo a"])])];
        for subject in ["", "Write", "anything"] {
            let hooks = extract_hooks(&plugins, HookEvent::PreToolUse, &tool(subject), &defaults());
            assert_eq!(hooks.len(), 1, "subject {subject:?}");
        }
    }

    #[test]
    fn alternation_matcher() {
        let plugins = vec![plugin(
            "p",
            "/p",
            "PreToolUse",
            vec![entry(Some("Write|Edit"), &["echo guard"])],
        )];
        let run = |name: &str| extract_hooks(&plugins, HookEvent::PreToolUse, &tool(name), &defaults());
        assert_eq!(run("Write").len(), 1);
        assert_eq!(run("Edit").len(), 1);
        assert!(run("Read").is_empty());
    }

    #[test]
    fn invalid_regex_fails_closed() {
        assert!(!matches_filter(Some("(unclosed"), "(unclosed"));
        assert!(matches_filter(Some(""), "whatever"));
        assert!(matches_filter(None, ""));
    }

    #[test]
    fn placeholder_substituted_once() {
        assert_eq!(
            resolve_command("bash ${CLAUDE_PLUGIN_ROOT}/x.sh", Path::new("/p")),
            "bash /p/x.sh"
        );
        // A root containing the token is not re-expanded.
        assert_eq!(
            resolve_command("${CLAUDE_PLUGIN_ROOT}/x", Path::new("/a/${CLAUDE_PLUGIN_ROOT}")),
            "/a/${CLAUDE_PLUGIN_ROOT}/x"
        );
    }

    #[test]
    fn notification_and_agent_subjects() {
        let plugins = vec![
            plugin("n", "/n", "Notification", vec![entry(Some("^idle$"), &["echo n"])]),
            plugin("a", "/a", "SubagentStop", vec![entry(Some("explorer"), &["echo a"])]),
        ];
        let d = Discriminators {
            tool: "explorer".into(),
            notification: "idle".into(),
            agent: "code-explorer".into(),
        };
        assert_eq!(extract_hooks(&plugins, HookEvent::Notification, &d, &defaults()).len(), 1);
        assert_eq!(extract_hooks(&plugins, HookEvent::SubagentStop, &d, &defaults()).len(), 1);

        let wrong = Discriminators {
            tool: "idle".into(),
            ..Discriminators::default()
        };
        assert!(extract_hooks(&plugins, HookEvent::Notification, &wrong, &defaults()).is_empty());
    }

    #[test]
    fn async_classification() {
        let mut explicit = command("python3 slow.py");
        explicit.is_async = Some(true);
        let mut pinned = command("afplay ding.aiff");
        pinned.is_async = Some(false);
        let plugins = vec![PluginManifest {
            name: "sounds".into(),
            root_path: PathBuf::from("/s"),
            has_hooks: true,
            events: Some(HashMap::from([(
                "Stop".to_string(),
                vec![EventEntry {
                    matcher: None,
                    hooks: vec![
                        command("afplay /System/Library/Sounds/Glass.aiff"),
                        command("/usr/bin/paplay bell.oga"),
                        command("echo afplay"),
                        explicit,
                        pinned,
                    ],
                }],
            )])),
        }];

        let hooks = extract_hooks(&plugins, HookEvent::Stop, &Discriminators::default(), &defaults());
        let flags: Vec<bool> = hooks.iter().map(|h| h.is_async).collect();
        assert_eq!(flags, [true, true, false, true, false]);
    }

    #[test]
    fn order_is_plugin_then_entry_then_command() {
        let plugins = vec![
            plugin(
                "first",
                "/1",
                "PostToolUse",
                vec![entry(None, &["a1", "a2"]), entry(Some("Bash"), &["b1"])],
            ),
            plugin("second", "/2", "PostToolUse", vec![entry(None, &["c1"])]),
        ];
        let hooks = extract_hooks(&plugins, HookEvent::PostToolUse, &tool("Bash"), &defaults());
        let commands: Vec<&str> = hooks.iter().map(|h| h.command.as_str()).collect();
        assert_eq!(commands, ["a1", "a2", "b1", "c1"]);
        assert_eq!(hooks[3].plugin_name, "second");
    }

    #[test]
    fn plugins_without_hooks_contribute_nothing() {
        let plugins = vec![
            PluginManifest {
                name: "bare".into(),
                root_path: PathBuf::from("/bare"),
                has_hooks: false,
                events: None,
            },
            PluginManifest {
                name: "broken".into(),
                root_path: PathBuf::from("/broken"),
                has_hooks: true,
                events: None,
            },
        ];
        for event in HookEvent::ALL {
            assert!(extract_hooks(&plugins, event, &tool("Write"), &defaults()).is_empty());
        }
    }

    #[test]
    fn non_command_hooks_skipped() {
        let mut prompt = command("echo nope");
        prompt.kind = Some("prompt".into());
        let plugins = vec![plugin(
            "p",
            "/p",
            "Stop",
            vec![EventEntry {
                matcher: None,
                hooks: vec![prompt, command("echo yes")],
            }],
        )];
        let hooks = extract_hooks(&plugins, HookEvent::Stop, &Discriminators::default(), &defaults());
        assert_eq!(hooks, vec![ExecutableHook::sync("echo yes", "p")]);
    }
}
