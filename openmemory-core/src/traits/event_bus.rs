use async_trait::async_trait;

use crate::models::Event;

/// Single-threaded cooperative dispatch of typed events (`spec.md` §4.9).
/// Handlers run in registration order; a failing handler is isolated and
/// never aborts its siblings.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: Event);
}
