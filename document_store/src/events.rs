//! A single in-process event stream documents and credentials are published on (§4.6).

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    Added(Uuid),
    Updated(Uuid),
    Deleted(Uuid),
}

/// Thin wrapper over a broadcast channel: late subscribers simply miss events published before
/// they subscribed, matching the "lazy sequence" framing in §4.6 (there is no replay log).
pub struct EventStream {
    sender: tokio::sync::broadcast::Sender<DocumentEvent>,
}

impl EventStream {
    pub fn new() -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(256);
        Self { sender }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DocumentEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Dropped if there are currently no subscribers — callers never need to
    /// treat that as an error.
    pub fn publish(&self, event: DocumentEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let stream = EventStream::new();
        let mut receiver = stream.subscribe();

        let id = Uuid::new_v4();
        stream.publish(DocumentEvent::Added(id));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event, DocumentEvent::Added(id));
    }

    #[test]
    fn publishing_with_no_subscribers_does_not_panic() {
        let stream = EventStream::new();
        stream.publish(DocumentEvent::Deleted(Uuid::new_v4()));
    }
}
