//! Run Context
//!
//! The context handed to every compile and invoke call. It carries three
//! things that must travel with a unit of work:
//!
//! 1. `Address` - the structural path of the current component, extended by
//!    composite components (e.g. one segment per batch item) so nested
//!    interrupts can be attributed to "this batch, this item, this step"
//! 2. A `CancellationToken` shared by everything started from the context
//! 3. The resume scope - which addresses were interrupted in a previous run,
//!    the state they persisted, and the decisions supplied by the caller
//!
//! Contexts are cheap to clone: the resume scope is shared behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, CoreResult};
use crate::interrupt::InterruptSignal;

/// Separator between segments in an address string.
const SEGMENT_SEPARATOR: char = ';';

/// Separator between a segment's kind and id.
const KIND_SEPARATOR: char = ':';

/// Percent-encode the separator characters (and `%` itself) so that distinct
/// addresses always render to distinct strings.
fn write_escaped(f: &mut fmt::Formatter<'_>, part: &str) -> fmt::Result {
    for c in part.chars() {
        match c {
            '%' => f.write_str("%25")?,
            SEGMENT_SEPARATOR => f.write_str("%3B")?,
            KIND_SEPARATOR => f.write_str("%3A")?,
            other => write!(f, "{}", other)?,
        }
    }
    Ok(())
}

// ============================================================================
// Address
// ============================================================================

/// One step of a structural address, e.g. `batch_process:3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressSegment {
    /// Segment type, chosen by the component that appended it.
    pub kind: String,
    /// Segment value, unique among siblings of the same kind.
    pub id: String,
}

impl fmt::Display for AddressSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, &self.kind)?;
        write!(f, "{}", KIND_SEPARATOR)?;
        write_escaped(f, &self.id)
    }
}

/// A path-like identifier distinguishing nested sub-tasks.
///
/// The root address is empty. Its string form joins segments with `;`,
/// e.g. `node:review;batch_process:0`. Interrupt ids are address strings.
/// Separator characters inside a kind or id are percent-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(Vec<AddressSegment>);

impl Address {
    /// The empty root address.
    pub fn root() -> Self {
        Self::default()
    }

    /// Return a new address extended by one segment.
    pub fn child(&self, kind: impl Into<String>, id: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(AddressSegment {
            kind: kind.into(),
            id: id.into(),
        });
        Self(segments)
    }

    pub fn segments(&self) -> &[AddressSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&AddressSegment> {
        self.0.last()
    }

    /// Whether `prefix` is an ancestor of (or equal to) this address.
    pub fn starts_with(&self, prefix: &Address) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEGMENT_SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

// ============================================================================
// Resume Scope
// ============================================================================

#[derive(Debug, Clone, Default)]
struct ResumeScope {
    /// Address string -> state persisted by the component interrupted there.
    interrupted: HashMap<String, Option<Value>>,
    /// Interrupt id -> decision supplied by the caller.
    resume_data: HashMap<String, Value>,
}

// ============================================================================
// RunContext
// ============================================================================

/// Context threaded through compile and invoke calls.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    address: Address,
    cancellation_token: CancellationToken,
    resume: Arc<ResumeScope>,
}

impl RunContext {
    /// Create a root context with a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cancellation token.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Derive a context whose token is a child of this context's token.
    ///
    /// Cancelling the child does not cancel the parent.
    pub fn with_child_cancellation(&self) -> Self {
        let mut ctx = self.clone();
        ctx.cancellation_token = self.cancellation_token.child_token();
        ctx
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Return a context whose address is extended by `kind:id`.
    pub fn append_address_segment(&self, kind: impl Into<String>, id: impl Into<String>) -> Self {
        let mut ctx = self.clone();
        ctx.address = self.address.child(kind, id);
        ctx
    }

    /// Rebuild the resume scope from a signal returned by a previous run.
    ///
    /// Every node of the signal tree is recorded as interrupted, together
    /// with the state it persisted. Resume data already attached is kept.
    pub fn resume_from(mut self, signal: &InterruptSignal) -> Self {
        let scope = Arc::make_mut(&mut self.resume);
        scope.interrupted.clear();
        signal.visit(&mut |node| {
            scope
                .interrupted
                .insert(node.address.to_string(), node.state.clone());
        });
        self
    }

    /// Attach a decision for the interrupt with the given id.
    pub fn with_resume_data(mut self, interrupt_id: impl Into<String>, data: Value) -> Self {
        Arc::make_mut(&mut self.resume)
            .resume_data
            .insert(interrupt_id.into(), data);
        self
    }

    /// Attach several decisions at once, keyed by interrupt id.
    pub fn batch_resume_with_data(mut self, data: HashMap<String, Value>) -> Self {
        Arc::make_mut(&mut self.resume).resume_data.extend(data);
        self
    }

    /// Whether the component at this address was interrupted in the run being resumed.
    pub fn was_interrupted(&self) -> bool {
        self.resume
            .interrupted
            .contains_key(&self.address.to_string())
    }

    /// Decode the state the component at this address persisted when it interrupted.
    ///
    /// Returns `Ok(None)` when the address was not interrupted or stored no state.
    pub fn interrupt_state<T: DeserializeOwned>(&self) -> CoreResult<Option<T>> {
        let key = self.address.to_string();
        match self.resume.interrupted.get(&key) {
            Some(Some(value)) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    CoreError::parse(format!("Interrupt state at '{}' has unexpected shape: {}", key, e))
                }),
            _ => Ok(None),
        }
    }

    /// Whether resume data targets this address or one nested below it.
    pub fn is_resume_target(&self) -> bool {
        let key = self.address.to_string();
        if key.is_empty() {
            return !self.resume.resume_data.is_empty();
        }
        let nested_prefix = format!("{}{}", key, SEGMENT_SEPARATOR);
        self.resume
            .resume_data
            .keys()
            .any(|id| *id == key || id.starts_with(&nested_prefix))
    }

    /// Decode the decision supplied for the interrupt raised at exactly this address.
    pub fn resume_data<T: DeserializeOwned>(&self) -> CoreResult<Option<T>> {
        let key = self.address.to_string();
        match self.resume.resume_data.get(&key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    CoreError::parse(format!("Resume data for '{}' has unexpected shape: {}", key, e))
                }),
            None => Ok(None),
        }
    }
}
