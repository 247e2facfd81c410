//! Saga state machine.

use serde::{Deserialize, Serialize};

/// The state of a saga run in its lifecycle.
///
/// State transitions:
/// ```text
/// Started ──► OwnerValidated ──► CategoryValidated ──► AggregateCreated ──► PostProcessed
///                                                              │
///                                                              └──► Compensating ──► Compensated
/// ```
///
/// Compensation is only reachable once the aggregate exists; a validation
/// failure before that point simply ends the run with nothing to undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// Run created, no step executed yet.
    #[default]
    Started,

    /// The owning user was found.
    OwnerValidated,

    /// The category was found.
    CategoryValidated,

    /// The transaction and its envelope were persisted atomically.
    AggregateCreated,

    /// Post-processing succeeded (terminal state).
    PostProcessed,

    /// A step after creation failed and the aggregate is being removed.
    Compensating,

    /// Compensation attempt finished (terminal state).
    Compensated,
}

impl SagaState {
    /// Returns true if the run holds a created aggregate that compensation
    /// would have to remove.
    pub fn can_compensate(&self) -> bool {
        matches!(self, SagaState::AggregateCreated)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::PostProcessed | SagaState::Compensated)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Started => "Started",
            SagaState::OwnerValidated => "OwnerValidated",
            SagaState::CategoryValidated => "CategoryValidated",
            SagaState::AggregateCreated => "AggregateCreated",
            SagaState::PostProcessed => "PostProcessed",
            SagaState::Compensating => "Compensating",
            SagaState::Compensated => "Compensated",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One saga invocation, tracked in memory for the duration of the call.
///
/// Runs are not persisted: a crash between aggregate creation and
/// post-processing leaves the aggregate (and its envelope) in place with no
/// run to resume.
#[derive(Debug, Clone, Default)]
pub struct SagaRun {
    state: SagaState,
    visited: Vec<SagaState>,
}

impl SagaRun {
    /// Starts a run in [`SagaState::Started`].
    pub fn new() -> Self {
        Self {
            state: SagaState::Started,
            visited: vec![SagaState::Started],
        }
    }

    /// Moves the run to the next state.
    pub fn advance(&mut self, next: SagaState) {
        tracing::debug!(from = self.state.as_str(), to = next.as_str(), "saga transition");
        self.state = next;
        self.visited.push(next);
    }

    /// Current state.
    pub fn state(&self) -> SagaState {
        self.state
    }

    /// Every state the run has passed through, in order.
    pub fn visited(&self) -> &[SagaState] {
        &self.visited
    }
}
