//! Finite state machine for a single admission decision.
//!
//! Every request walks `Received → Authorized → PolicyResolved →
//! VersionChecked → Admitted`, or a shorter path for deletes and reads.
//! Any non-terminal state may move to `Rejected`. The transition table is
//! explicit so a decision can never skip a stage its operation requires.

use std::fmt;

use tracing::{debug, info};

use crate::authz::Operation;
use crate::error::{AdmissionError, ErrorKind, Result};

/// Stage of an admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionState {
    Received,
    Authorized,
    PolicyResolved,
    VersionChecked,
    Admitted,
    Rejected(ErrorKind),
}

impl AdmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AdmissionState::Admitted | AdmissionState::Rejected(_))
    }
}

impl fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionState::Received => write!(f, "Received"),
            AdmissionState::Authorized => write!(f, "Authorized"),
            AdmissionState::PolicyResolved => write!(f, "PolicyResolved"),
            AdmissionState::VersionChecked => write!(f, "VersionChecked"),
            AdmissionState::Admitted => write!(f, "Admitted"),
            AdmissionState::Rejected(kind) => write!(f, "Rejected({})", kind),
        }
    }
}

/// Events that move a decision forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionEvent {
    /// Authorization gate passed
    AccessGranted,
    /// Datacenter, preset and defaulting policies applied
    PoliciesApplied,
    /// Version compatibility verified or not applicable
    VersionAccepted,
    /// All required stages completed
    Admit,
    /// A check failed
    Reject,
}

impl fmt::Display for AdmissionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionEvent::AccessGranted => write!(f, "AccessGranted"),
            AdmissionEvent::PoliciesApplied => write!(f, "PoliciesApplied"),
            AdmissionEvent::VersionAccepted => write!(f, "VersionAccepted"),
            AdmissionEvent::Admit => write!(f, "Admit"),
            AdmissionEvent::Reject => write!(f, "Reject"),
        }
    }
}

/// A permitted move in the transition table.
#[derive(Debug)]
pub struct Transition {
    pub from: AdmissionState,
    pub to: AdmissionState,
    pub event: AdmissionEvent,
    pub description: &'static str,
}

impl Transition {
    const fn new(
        from: AdmissionState,
        to: AdmissionState,
        event: AdmissionEvent,
        description: &'static str,
    ) -> Self {
        Self {
            from,
            to,
            event,
            description,
        }
    }
}

/// Result of attempting a state transition
#[derive(Debug)]
pub enum TransitionResult {
    Success {
        from: AdmissionState,
        to: AdmissionState,
        event: AdmissionEvent,
        description: &'static str,
    },
    InvalidTransition {
        current: AdmissionState,
        event: AdmissionEvent,
    },
}

/// Transition table for one operation.
pub struct AdmissionStateMachine {
    operation: Operation,
    transitions: Vec<Transition>,
}

impl AdmissionStateMachine {
    /// Build the table for `operation`.
    ///
    /// Create and patch pass through every stage; delete and reads go
    /// straight from `Authorized` to `Admitted`.
    pub fn for_operation(operation: Operation) -> Self {
        use AdmissionEvent::*;
        use AdmissionState::*;

        let mut transitions = vec![Transition::new(
            Received,
            Authorized,
            AccessGranted,
            "Principal authorized for the project",
        )];

        if matches!(operation, Operation::Create | Operation::Patch) {
            transitions.extend([
                Transition::new(
                    Authorized,
                    PolicyResolved,
                    PoliciesApplied,
                    "Datacenter and credential policies applied",
                ),
                Transition::new(
                    PolicyResolved,
                    VersionChecked,
                    VersionAccepted,
                    "Requested version compatible with the node population",
                ),
                Transition::new(VersionChecked, Admitted, Admit, "Mutation admitted"),
            ]);
        } else {
            transitions.push(Transition::new(
                Authorized,
                Admitted,
                Admit,
                "Request admitted",
            ));
        }

        Self {
            operation,
            transitions,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Attempt to move from `current` on `event`.
    ///
    /// `Reject` is accepted from every non-terminal state and carries the
    /// rejection kind into the target state.
    pub fn transition(
        &self,
        current: &AdmissionState,
        event: AdmissionEvent,
        rejection: Option<ErrorKind>,
    ) -> TransitionResult {
        if event == AdmissionEvent::Reject {
            return match rejection {
                Some(kind) if !current.is_terminal() => TransitionResult::Success {
                    from: *current,
                    to: AdmissionState::Rejected(kind),
                    event,
                    description: "Request rejected",
                },
                _ => TransitionResult::InvalidTransition {
                    current: *current,
                    event,
                },
            };
        }

        match self
            .transitions
            .iter()
            .find(|t| t.from == *current && t.event == event)
        {
            Some(t) => TransitionResult::Success {
                from: t.from,
                to: t.to,
                event,
                description: t.description,
            },
            None => TransitionResult::InvalidTransition {
                current: *current,
                event,
            },
        }
    }

    /// Check if a transition is valid
    pub fn can_transition(&self, from: &AdmissionState, event: &AdmissionEvent) -> bool {
        if *event == AdmissionEvent::Reject {
            return !from.is_terminal();
        }
        self.transitions
            .iter()
            .any(|t| t.from == *from && t.event == *event)
    }

    /// Get all non-reject events valid from a given state
    pub fn valid_events(&self, state: &AdmissionState) -> Vec<&AdmissionEvent> {
        self.transitions
            .iter()
            .filter(|t| t.from == *state)
            .map(|t| &t.event)
            .collect()
    }
}

/// A decision in progress: current state plus the trail of visited states.
pub struct AdmissionWalk {
    machine: AdmissionStateMachine,
    current: AdmissionState,
    trail: Vec<AdmissionState>,
}

impl AdmissionWalk {
    pub fn start(operation: Operation) -> Self {
        debug!(operation = %operation, "Admission request received");
        Self {
            machine: AdmissionStateMachine::for_operation(operation),
            current: AdmissionState::Received,
            trail: vec![AdmissionState::Received],
        }
    }

    pub fn current(&self) -> AdmissionState {
        self.current
    }

    pub fn trail(&self) -> &[AdmissionState] {
        &self.trail
    }

    /// Advance on `event`; an event the table does not allow is an internal error.
    pub fn advance(&mut self, event: AdmissionEvent) -> Result<()> {
        match self.machine.transition(&self.current, event, None) {
            TransitionResult::Success {
                from,
                to,
                description,
                ..
            } => {
                debug!(
                    operation = %self.machine.operation(),
                    from = %from,
                    to = %to,
                    "{}",
                    description
                );
                self.current = to;
                self.trail.push(to);
                Ok(())
            }
            TransitionResult::InvalidTransition { current, event } => {
                Err(AdmissionError::Internal(format!(
                    "invalid admission transition from {} on {} for {}",
                    current,
                    event,
                    self.machine.operation()
                )))
            }
        }
    }

    /// Record `error` as the outcome and hand it back.
    pub fn reject(&mut self, error: AdmissionError) -> AdmissionError {
        let kind = error.kind();
        if let TransitionResult::Success { from, to, .. } =
            self.machine
                .transition(&self.current, AdmissionEvent::Reject, Some(kind))
        {
            debug!(
                operation = %self.machine.operation(),
                stage = %from,
                kind = %kind,
                "Admission rejected"
            );
            self.current = to;
            self.trail.push(to);
        }
        error
    }

    /// Run a fallible stage; failures move the walk to `Rejected`.
    pub fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|error| self.reject(error))
    }

    /// Finish an admitted walk.
    pub fn admit<T>(mut self, value: T) -> Result<Admitted<T>> {
        self.advance(AdmissionEvent::Admit)?;
        info!(
            operation = %self.machine.operation(),
            stages = self.trail.len(),
            "Admission granted"
        );
        Ok(Admitted {
            value,
            trail: self.trail,
        })
    }
}

/// An admitted result and the states visited on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Admitted<T> {
    pub value: T,
    pub trail: Vec<AdmissionState>,
}

impl<T> Admitted<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}
