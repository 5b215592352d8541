//! Mutation flow with two-step confirmation.
//!
//! ```text
//! Idle --begin--> Confirming --confirm--> Executing --+--> Idle            (succeeded)
//!                     ^                               +--> Confirming      (soft conflict, force = true)
//!                     |                               +--> HardFailed      (terminal, dismiss only)
//!                     +------ cancel (any state but Executing) --> Idle
//! ```
//!
//! A soft conflict upgrades the pending action to `force = true` exactly once.
//! If the server conflicts again on the forced attempt the flow fails hard.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{FlowError, HardFailure, TransportError};
use crate::protocol::{classify, ConflictKind, MutationReply, Verdict};
use crate::tracer::{NoopTracer, Tracer};

/// HTTP method of a mutate endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl ActionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionMethod::Post => "POST",
            ActionMethod::Put => "PUT",
            ActionMethod::Patch => "PATCH",
            ActionMethod::Delete => "DELETE",
        }
    }
}

/// A state-changing call such as `PUT trainers/12/toggle-status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub method: ActionMethod,
    /// Path relative to the API root, e.g. `courses/7` or `users/3/deactivate`.
    pub path: String,
    /// Plain-language description shown in the first confirmation.
    pub description: String,
}

impl Action {
    pub fn new(method: ActionMethod, path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            description: description.into(),
        }
    }

    pub fn post(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ActionMethod::Post, path, description)
    }

    pub fn put(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ActionMethod::Put, path, description)
    }

    pub fn delete(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ActionMethod::Delete, path, description)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method.as_str(), self.path)
    }
}

/// Remote "mutate" call.
#[async_trait]
pub trait MutationTarget: Send + Sync + 'static {
    /// Send `action`; `force` is the override flag of a re-confirmed attempt.
    ///
    /// Any HTTP status is a reply; only I/O failure is an error.
    async fn send(&self, action: &Action, force: bool) -> Result<MutationReply, TransportError>;
}

/// What the confirmation dialog shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// First confirmation, from the action's description.
    Initial(String),
    /// Re-confirmation carrying the server's warning.
    Warning(String),
}

impl Prompt {
    pub fn message(&self) -> &str {
        match self {
            Prompt::Initial(m) | Prompt::Warning(m) => m,
        }
    }
}

/// State of a [`MutationFlow`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Confirming {
        action: Action,
        prompt: Prompt,
        force: bool,
    },
    Executing {
        action: Action,
        force: bool,
    },
    HardFailed {
        action: Action,
        failure: HardFailure,
    },
}

impl MutationState {
    pub fn name(&self) -> &'static str {
        match self {
            MutationState::Idle => "idle",
            MutationState::Confirming { .. } => "confirming",
            MutationState::Executing { .. } => "executing",
            MutationState::HardFailed { .. } => "hard_failed",
        }
    }
}

/// Result of one confirmed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server accepted; the flow is back to idle.
    Succeeded { message: String },
    /// The server asked for re-confirmation; the flow is confirming again with `force = true`.
    SoftConflict { warning: String },
    /// Terminal rejection; the flow waits for dismissal.
    HardFailed(HardFailure),
}

/// Drives one state-changing action through confirmation and execution.
pub struct MutationFlow {
    resource: String,
    state: MutationState,
    tracer: Arc<dyn Tracer>,
}

impl fmt::Debug for MutationFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationFlow")
            .field("resource", &self.resource)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl MutationFlow {
    pub fn new(resource: impl Into<String>) -> Self {
        Self::with_tracer(resource, Arc::new(NoopTracer))
    }

    pub fn with_tracer(resource: impl Into<String>, tracer: Arc<dyn Tracer>) -> Self {
        Self {
            resource: resource.into(),
            state: MutationState::Idle,
            tracer,
        }
    }

    pub fn state(&self) -> &MutationState {
        &self.state
    }

    /// The confirmation currently shown, if any.
    pub fn prompt(&self) -> Option<&Prompt> {
        match &self.state {
            MutationState::Confirming { prompt, .. } => Some(prompt),
            _ => None,
        }
    }

    /// UI buttons should be disabled while this is `true`.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, MutationState::Executing { .. })
    }

    /// Present the initial confirmation for `action`. No request is made.
    pub fn begin(&mut self, action: Action) -> Result<(), FlowError> {
        match &self.state {
            MutationState::Idle => {
                let prompt = Prompt::Initial(action.description.clone());
                self.transition(MutationState::Confirming {
                    action,
                    prompt,
                    force: false,
                });
                Ok(())
            }
            MutationState::Executing { .. } => Err(FlowError::Busy),
            other => Err(FlowError::InvalidTransition {
                action: "begin",
                state: other.name(),
            }),
        }
    }

    /// Cancel a confirmation or dismiss a hard failure.
    pub fn cancel(&mut self) -> Result<(), FlowError> {
        match &self.state {
            MutationState::Executing { .. } => Err(FlowError::Busy),
            MutationState::Idle => Ok(()),
            _ => {
                self.transition(MutationState::Idle);
                Ok(())
            }
        }
    }

    /// Recover from a `confirm` future that was dropped mid-flight.
    ///
    /// The request may still have reached the server; callers should refetch.
    pub fn abandon(&mut self) {
        if self.is_busy() {
            self.transition(MutationState::Idle);
        }
    }

    /// Execute the pending action.
    pub async fn confirm<M>(&mut self, target: &M) -> Result<MutationOutcome, FlowError>
    where
        M: MutationTarget + ?Sized,
    {
        let (action, force) = match &self.state {
            MutationState::Confirming { action, force, .. } => (action.clone(), *force),
            MutationState::Executing { .. } => return Err(FlowError::Busy),
            other => {
                return Err(FlowError::InvalidTransition {
                    action: "confirm",
                    state: other.name(),
                })
            }
        };
        self.transition(MutationState::Executing {
            action: action.clone(),
            force,
        });

        let outcome = match target.send(&action, force).await {
            Err(err) => MutationOutcome::HardFailed(HardFailure::new(err.to_string())),
            Ok(reply) => match classify(&reply) {
                Verdict::Accepted { message } => MutationOutcome::Succeeded { message },
                Verdict::Conflict(conflict) if conflict.kind == ConflictKind::Soft && !force => {
                    MutationOutcome::SoftConflict {
                        warning: conflict.message,
                    }
                }
                Verdict::Conflict(conflict) => {
                    MutationOutcome::HardFailed(conflict.into_hard_failure())
                }
            },
        };

        let next = match &outcome {
            MutationOutcome::Succeeded { .. } => MutationState::Idle,
            MutationOutcome::SoftConflict { warning } => MutationState::Confirming {
                action,
                prompt: Prompt::Warning(warning.clone()),
                force: true,
            },
            MutationOutcome::HardFailed(failure) => MutationState::HardFailed {
                action,
                failure: failure.clone(),
            },
        };
        self.transition(next);
        Ok(outcome)
    }

    fn transition(&mut self, next: MutationState) {
        let from = self.state.name();
        self.state = next;
        self.tracer
            .on_mutation_transition(&self.resource, from, self.state.name());
    }
}
