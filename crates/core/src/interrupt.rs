//! Interrupt Model
//!
//! A task unit that needs human input mid-run does not fail: it returns an
//! `InterruptSignal` (wrapped in `CoreError::Interrupted`). Composite
//! components that run several sub-tasks bundle the signals of their
//! children into one composite signal carrying their own resume state.
//!
//! The signal tree is plain serde data, so callers can persist it between
//! the suspending run and the resuming run. Resuming means building a
//! `RunContext` with `RunContext::resume_from(&signal)` plus decisions keyed
//! by interrupt id (see `InterruptContext::id`).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{Address, RunContext};
use crate::error::{CoreError, CoreResult};

// ============================================================================
// InterruptSignal
// ============================================================================

/// A suspend-for-input signal, possibly bundling nested signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptSignal {
    /// Address of the component that raised the signal.
    pub address: Address,
    /// Information for whoever has to make the decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
    /// State the component needs back when it is resumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Signals raised by nested components.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<InterruptSignal>,
}

impl InterruptSignal {
    /// Build a signal without children.
    pub fn leaf(address: Address, info: Option<Value>, state: Option<Value>) -> Self {
        Self {
            address,
            info,
            state,
            children: Vec::new(),
        }
    }

    /// The interrupt id: the address string of the raising component.
    pub fn id(&self) -> String {
        self.address.to_string()
    }

    pub fn is_composite(&self) -> bool {
        !self.children.is_empty()
    }

    /// Depth-first traversal, parents before children.
    pub fn visit<F: FnMut(&InterruptSignal)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }

    /// The root causes of this signal: every node without children.
    pub fn contexts(&self) -> Vec<InterruptContext> {
        let mut contexts = Vec::new();
        self.visit(&mut |node| {
            if !node.is_composite() {
                contexts.push(InterruptContext {
                    id: node.id(),
                    address: node.address.clone(),
                    info: node.info.clone(),
                });
            }
        });
        contexts
    }

    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl fmt::Display for InterruptSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.contexts().len();
        write!(
            f,
            "interrupt at '{}' waiting on {} input(s)",
            self.id(),
            pending
        )
    }
}

// ============================================================================
// InterruptContext / InterruptInfo
// ============================================================================

/// One root-cause interrupt, as presented to the caller deciding how to resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptContext {
    /// Key under which resume data for this interrupt must be supplied.
    pub id: String,
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

/// Structured view of an interrupt error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptInfo {
    /// Id of the outermost signal.
    pub id: String,
    pub contexts: Vec<InterruptContext>,
}

// ============================================================================
// Constructors & classification
// ============================================================================

/// Raise a suspend-for-input signal at the context's address.
pub fn interrupt(ctx: &RunContext, info: Value) -> CoreError {
    CoreError::interrupted(InterruptSignal::leaf(ctx.address().clone(), Some(info), None))
}

/// Raise a suspend-for-input signal that persists `state` for the resumed run.
pub fn stateful_interrupt(ctx: &RunContext, info: Value, state: Value) -> CoreError {
    CoreError::interrupted(InterruptSignal::leaf(
        ctx.address().clone(),
        Some(info),
        Some(state),
    ))
}

/// Bundle several child signals with the composite component's own state.
pub fn composite_interrupt(
    ctx: &RunContext,
    info: Option<Value>,
    state: Value,
    children: Vec<InterruptSignal>,
) -> InterruptSignal {
    InterruptSignal {
        address: ctx.address().clone(),
        info,
        state: Some(state),
        children,
    }
}

/// Inspect an error; returns the interrupt details if it is a suspend-for-input signal.
pub fn extract_interrupt_info(err: &CoreError) -> Option<InterruptInfo> {
    match err {
        CoreError::Interrupted(signal) => Some(InterruptInfo {
            id: signal.id(),
            contexts: signal.contexts(),
        }),
        _ => None,
    }
}

/// Split an error into its interrupt signal, or hand the ordinary error back.
pub fn into_interrupt_signal(err: CoreError) -> Result<InterruptSignal, CoreError> {
    match err {
        CoreError::Interrupted(signal) => Ok(*signal),
        other => Err(other),
    }
}
