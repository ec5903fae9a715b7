//! Request-scoped context threaded through lifecycle operations.

use crate::model::actor::Actor;

/// Per-request state. Built by the caller for each request; never shared
/// across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: Actor,
}

impl RequestContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }
}
