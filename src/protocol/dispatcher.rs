//! # Message Dispatcher
//!
//! Runs every hook matching a decoded message and aggregates the outcome.
//!
//! All selected callbacks are spawned as their own tasks and run
//! concurrently; completion order is unspecified and must not be relied
//! upon. The dispatcher waits for every callback to settle before the
//! session reads the message's suppression latch, so a slow hook delays
//! that one message without blocking the opposite direction. A failing or
//! panicking hook is isolated: it is reported and collected, but neither
//! aborts its siblings nor touches the latch.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::core::message::RelayMessage;
use crate::error::{constants, RelayError, Result};
use crate::protocol::hooks::{HookContext, HookId, HookRegistry};
use crate::transport::session::SessionHandle;

/// One failed hook invocation
pub struct HookFailure {
    /// Registration id of the failing hook
    pub id: HookId,
    /// What went wrong
    pub error: RelayError,
}

/// Outcome of dispatching one message
pub struct DispatchReport {
    /// How many hooks were invoked
    pub invoked: usize,
    /// Failures collected from individual callbacks
    pub failures: Vec<HookFailure>,
}

impl DispatchReport {
    /// True when every invoked hook completed without error
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Invokes matching hooks for decoded messages
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HookRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher selects from
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Run all hooks matching the message and wait for every one to settle
    pub async fn dispatch(
        &self,
        message: &Arc<RelayMessage>,
        session: &SessionHandle,
    ) -> DispatchReport {
        let selected = self
            .registry
            .select(message.direction(), message.kind())
            .await;
        let invoked = selected.len();

        let mut handles: Vec<(HookId, JoinHandle<Result<()>>)> = Vec::with_capacity(invoked);
        for entry in selected {
            let ctx = HookContext {
                message: Arc::clone(message),
                session: session.clone(),
            };
            handles.push((entry.id, tokio::spawn(entry.hook.call(ctx))));
        }

        let mut failures = Vec::new();
        for (id, handle) in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    warn!(hook = ?id, error = %error, "hook failed");
                    failures.push(HookFailure { id, error });
                }
                Err(join_error) => {
                    let error = if join_error.is_panic() {
                        RelayError::HookFailed(constants::ERR_HOOK_PANICKED.to_owned())
                    } else {
                        RelayError::HookFailed(join_error.to_string())
                    };
                    warn!(hook = ?id, error = %error, "hook task failed");
                    failures.push(HookFailure { id, error });
                }
            }
        }

        DispatchReport { invoked, failures }
    }
}
