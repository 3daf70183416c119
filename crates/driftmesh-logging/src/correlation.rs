//! Correlation ID system for tracing message flows
//!
//! A context is an immutable value threaded explicitly through the code that
//! emits events. Deriving a child keeps the trace id, mints a fresh span id,
//! links back to the parent span, and bumps the hop counter, so the full
//! forward chain of a packet can be reconstructed from recorded events.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation context attached to every recorded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationContext {
    /// Root trace ID - shared by a root context and all its descendants
    pub trace_id: Uuid,

    /// Span ID - unique to this specific context
    pub span_id: Uuid,

    /// Parent span ID - links this span to the one it was derived from
    pub parent_span_id: Option<Uuid>,

    /// Depth in the parent chain (root = 0)
    pub hop_count: u32,

    /// Free-form key/value tags; derived contexts copy rather than share
    pub tags: BTreeMap<String, String>,
}

impl CorrelationContext {
    /// Create a new root context with entropy-based ids
    pub fn new_root() -> Self {
        let id = Uuid::new_v4();
        Self {
            trace_id: id,
            span_id: id,
            parent_span_id: None,
            hop_count: 0,
            tags: BTreeMap::new(),
        }
    }

    /// Create a root context drawing id bits from the given source
    ///
    /// Used by the engine so that logs are reproducible under a fixed seed.
    pub fn root_with(rng: &mut impl Rng) -> Self {
        let id = fresh_id(rng);
        Self {
            trace_id: id,
            span_id: id,
            parent_span_id: None,
            hop_count: 0,
            tags: BTreeMap::new(),
        }
    }

    /// Derive a child context with entropy-based span id
    pub fn child(&self) -> Self {
        self.child_span(Uuid::new_v4())
    }

    /// Derive a child context drawing its span id from the given source
    pub fn child_with(&self, rng: &mut impl Rng) -> Self {
        self.child_span(fresh_id(rng))
    }

    fn child_span(&self, span_id: Uuid) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id,
            parent_span_id: Some(self.span_id),
            hop_count: self.hop_count + 1,
            tags: self.tags.clone(),
        }
    }

    /// Return a derived context with an added tag
    ///
    /// The receiver's tag map is left untouched.
    pub fn with_tag(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut derived = self.clone();
        derived.tags.insert(key.into(), value.into());
        derived
    }
}

impl Default for CorrelationContext {
    fn default() -> Self {
        Self::new_root()
    }
}

fn fresh_id(rng: &mut impl Rng) -> Uuid {
    Uuid::from_u128(rng.random())
}
