//! Folding of several hooks' stdout documents into one response.
//!
//! Hooks are written independently, so each may emit its own
//! `additionalContext`, `systemMessage` or `hookSpecificOutput` envelope.
//! [`merge_one`] combines them field by field in hook order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const CONTEXT_SEPARATOR: &str = "\n\n";
const MESSAGE_SEPARATOR: &str = "\n";

/// A hook's stdout document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookResponse {
    /// Structured decision envelope (permission decisions, event-scoped context).
    #[serde(
        rename = "hookSpecificOutput",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hook_specific_output: Option<HookSpecificOutput>,
    #[serde(
        rename = "additionalContext",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_context: Option<String>,
    #[serde(
        rename = "systemMessage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub system_message: Option<String>,
    /// Any other top-level fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookSpecificOutput {
    #[serde(
        rename = "additionalContext",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_context: Option<String>,
    /// `hookEventName`, `permissionDecision`, `permissionDecisionReason`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HookResponse {
    /// Parse a hook's stdout. Anything but a JSON object with well-typed reserved fields is rejected.
    pub fn parse(stdout: &str) -> Option<Self> {
        serde_json::from_str(stdout.trim()).ok()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn message(&self) -> Option<&str> {
        non_empty(self.system_message.as_deref())
    }
}

/// Fold one hook's stdout into the accumulator.
///
/// Malformed output leaves the accumulator unchanged. The first parsed
/// document seeds an empty accumulator.
///
/// A flat `additionalContext` is adopted field by field when the accumulator
/// has none, rather than replacing the whole document. This keeps an earlier
/// `hookSpecificOutput` decision from being erased by a later informational
/// hook.
pub fn merge_one(accumulator: Option<HookResponse>, new_stdout: &str) -> Option<HookResponse> {
    let Some(new) = HookResponse::parse(new_stdout) else {
        tracing::debug!("dropping non-JSON hook output");
        return accumulator;
    };
    let Some(mut acc) = accumulator else {
        return Some(new);
    };

    let new_message = new.message().map(str::to_owned);

    match new.hook_specific_output {
        Some(incoming) => {
            if let Some(existing) = acc.hook_specific_output.as_mut() {
                if let Some(ctx) = non_empty(incoming.additional_context.as_deref()) {
                    append(&mut existing.additional_context, ctx, CONTEXT_SEPARATOR);
                }
            } else {
                // A later decision envelope replaces earlier informational output.
                // Earlier messages only survive as a prefix of a new one.
                let carried = acc.system_message.take().filter(|_| new_message.is_some());
                acc = HookResponse {
                    hook_specific_output: Some(incoming),
                    additional_context: new.additional_context,
                    system_message: carried,
                    extra: new.extra,
                };
            }
        }
        None => {
            if let Some(ctx) = non_empty(new.additional_context.as_deref()) {
                append(&mut acc.additional_context, ctx, CONTEXT_SEPARATOR);
            }
        }
    }

    if let Some(message) = new_message {
        append(&mut acc.system_message, &message, MESSAGE_SEPARATOR);
    }

    Some(acc)
}

/// Left-fold every non-blank stdout, in order, into one response.
pub fn fold_outputs<'a, I>(outputs: I) -> Option<HookResponse>
where
    I: IntoIterator<Item = &'a str>,
{
    outputs
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .fold(None, merge_one)
}

fn append(target: &mut Option<String>, addition: &str, separator: &str) {
    match target {
        Some(existing) if !existing.is_empty() => {
            existing.push_str(separator);
            existing.push_str(addition);
        }
        _ => *target = Some(addition.to_owned()),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
