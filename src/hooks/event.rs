use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Runtime events a plugin can register hooks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    UserPromptSubmit,
    PreToolUse,
    PostToolUse,
    PermissionRequest,
    SubagentStart,
    SubagentStop,
    SessionStart,
    Stop,
    Notification,
    PreCompact,
    SessionEnd,
    Setup,
}

/// Which discriminator a matcher is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFamily {
    Tool,
    Notification,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hook event: {0}")]
pub struct UnknownEvent(pub String);

impl HookEvent {
    pub const ALL: [HookEvent; 12] = [
        HookEvent::UserPromptSubmit,
        HookEvent::PreToolUse,
        HookEvent::PostToolUse,
        HookEvent::PermissionRequest,
        HookEvent::SubagentStart,
        HookEvent::SubagentStop,
        HookEvent::SessionStart,
        HookEvent::Stop,
        HookEvent::Notification,
        HookEvent::PreCompact,
        HookEvent::SessionEnd,
        HookEvent::Setup,
    ];

    /// Name used as the key in plugin manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            HookEvent::UserPromptSubmit => "UserPromptSubmit",
            HookEvent::PreToolUse => "PreToolUse",
            HookEvent::PostToolUse => "PostToolUse",
            HookEvent::PermissionRequest => "PermissionRequest",
            HookEvent::SubagentStart => "SubagentStart",
            HookEvent::SubagentStop => "SubagentStop",
            HookEvent::SessionStart => "SessionStart",
            HookEvent::Stop => "Stop",
            HookEvent::Notification => "Notification",
            HookEvent::PreCompact => "PreCompact",
            HookEvent::SessionEnd => "SessionEnd",
            HookEvent::Setup => "Setup",
        }
    }

    pub fn family(self) -> EventFamily {
        match self {
            HookEvent::Notification => EventFamily::Notification,
            HookEvent::SubagentStart | HookEvent::SubagentStop => EventFamily::Agent,
            _ => EventFamily::Tool,
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookEvent::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// Strings a matcher regex can be tested against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discriminators {
    pub tool: String,
    pub notification: String,
    pub agent: String,
}

impl Discriminators {
    /// Extract discriminators from a raw JSON payload.
    ///
    /// Each field is read on its own: a missing or non-string field yields an
    /// empty string without affecting the others.
    pub fn from_payload(raw: &str) -> Self {
        let Ok(payload) = serde_json::from_str::<Value>(raw) else {
            return Self::default();
        };
        let field = |key: &str| payload.get(key).and_then(Value::as_str);
        Self {
            tool: field("tool_name").unwrap_or_default().to_string(),
            notification: field("type")
                .or_else(|| field("notification_type"))
                .unwrap_or_default()
                .to_string(),
            agent: field("agent_type").unwrap_or_default().to_string(),
        }
    }

    /// The string an event's matchers are tested against.
    pub fn subject(&self, event: HookEvent) -> &str {
        match event.family() {
            EventFamily::Tool => &self.tool,
            EventFamily::Notification => &self.notification,
            EventFamily::Agent => &self.agent,
        }
    }
}
