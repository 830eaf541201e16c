mod dispatch;
pub mod event;
pub mod matcher;
pub mod merge;
mod runner;

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use event::{Discriminators, EventFamily, HookEvent, UnknownEvent};
pub use matcher::{extract_hooks, ExecutableHook};
pub use merge::{fold_outputs, merge_one, HookResponse, HookSpecificOutput};
pub use runner::{AggregateResult, HookExecutionResult, HookRunner, BLOCK_EXIT_CODE};
