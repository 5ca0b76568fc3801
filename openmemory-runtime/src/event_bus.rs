use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use openmemory_core::models::Event;
use openmemory_core::traits::EventBus;

/// A handler subscribed to every published event. Implementations should
/// filter on `event.payload` themselves; the bus dispatches everything to
/// everyone, in registration order.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event);
}

/// Single-process, in-order [`EventBus`] (`spec.md` §4.9). Each handler
/// runs on its own spawned task so a panicking handler is isolated from
/// its siblings and from the publisher; dispatch to the next handler
/// proceeds regardless.
pub struct SequentialEventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
    max_listeners: usize,
}

impl SequentialEventBus {
    pub fn new(max_listeners: usize) -> Self {
        Self { handlers: RwLock::new(Vec::new()), max_listeners }
    }

    /// Registers `handler`, refusing once `max_listeners` is reached
    /// (`OpenMemoryConfig::event_max_listeners`, default 100).
    pub async fn subscribe(&self, handler: Arc<dyn EventHandler>) -> bool {
        let mut handlers = self.handlers.write().await;
        if handlers.len() >= self.max_listeners {
            tracing::warn!(max_listeners = self.max_listeners, "event bus at capacity, dropping subscription");
            return false;
        }
        handlers.push(handler);
        true
    }

    pub async fn listener_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

#[async_trait]
impl EventBus for SequentialEventBus {
    async fn publish(&self, event: Event) {
        let handlers = self.handlers.read().await.clone();
        for handler in handlers {
            let ev = event.clone();
            let result = tokio::spawn(async move { handler.handle(&ev).await }).await;
            if let Err(err) = result {
                tracing::warn!(error = %err, "event handler panicked, continuing dispatch");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use openmemory_core::models::EventActor;
    use openmemory_core::models::EventPayload;

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl EventHandler for PanickingHandler {
        async fn handle(&self, _event: &Event) {
            panic!("boom");
        }
    }

    #[tokio::test]
    async fn dispatches_to_every_registered_handler() {
        let bus = SequentialEventBus::new(100);
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(Arc::new(CountingHandler(count.clone()))).await;
        bus.subscribe(Arc::new(CountingHandler(count.clone()))).await;

        bus.publish(Event::new(
            EventActor::System("test".to_string()),
            EventPayload::MemoryQueried { user_id: None, result_count: 0 },
        ))
        .await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_block_the_rest() {
        let bus = SequentialEventBus::new(100);
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(Arc::new(PanickingHandler)).await;
        bus.subscribe(Arc::new(CountingHandler(count.clone()))).await;

        bus.publish(Event::new(
            EventActor::System("test".to_string()),
            EventPayload::MemoryQueried { user_id: None, result_count: 0 },
        ))
        .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscription_is_refused_past_the_cap() {
        let bus = SequentialEventBus::new(1);
        let count = Arc::new(AtomicUsize::new(0));
        assert!(bus.subscribe(Arc::new(CountingHandler(count.clone()))).await);
        assert!(!bus.subscribe(Arc::new(CountingHandler(count.clone()))).await);
        assert_eq!(bus.listener_count().await, 1);
    }
}
