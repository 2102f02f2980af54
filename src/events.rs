use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{ContentKind, FullContentItem};

/// A change on the approved content set. Pending-side activity never
/// produces an event; the public feed only learns about items entering or
/// leaving the approved state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedEvent {
    Published { item: FullContentItem },
    Withdrawn { id: String, kind: ContentKind },
}

impl FeedEvent {
    pub fn kind(&self) -> ContentKind {
        match self {
            FeedEvent::Published { item } => item.metadata.details.kind(),
            FeedEvent::Withdrawn { kind, .. } => *kind,
        }
    }

    pub fn matches(&self, filter: Option<ContentKind>) -> bool {
        filter.map_or(true, |k| self.kind() == k)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeedEvent::Published { .. } => "published",
            FeedEvent::Withdrawn { .. } => "withdrawn",
        }
    }
}

/// Fan-out point for feed events. Cloned into app state; every SSE
/// connection holds its own receiver, dropped when the client goes away.
#[derive(Clone)]
pub struct ContentFeed {
    tx: broadcast::Sender<FeedEvent>,
}

impl ContentFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    /// Best effort: an event with no listeners is simply dropped.
    pub fn publish(&self, event: FeedEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for ContentFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentDetails, ContentMetadata, ModerationStatus};
    use chrono::Utc;

    fn sample_item() -> FullContentItem {
        FullContentItem {
            id: "abc".to_string(),
            status: ModerationStatus::Approved,
            metadata: ContentMetadata {
                author_name: "Asha N.".to_string(),
                created_at: Utc::now(),
                last_updated_at: None,
                approved_at: Some(Utc::now()),
                details: ContentDetails::Story,
            },
            body: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let feed = ContentFeed::new();
        let mut rx = feed.subscribe();

        feed.publish(FeedEvent::Published { item: sample_item() });

        match rx.recv().await.expect("event delivered") {
            FeedEvent::Published { item } => assert_eq!(item.id, "abc"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn kind_filter_matches_withdrawals() {
        let withdrawal = FeedEvent::Withdrawn {
            id: "abc".to_string(),
            kind: ContentKind::Feedback,
        };
        assert!(withdrawal.matches(None));
        assert!(withdrawal.matches(Some(ContentKind::Feedback)));
        assert!(!withdrawal.matches(Some(ContentKind::Story)));
    }

    #[test]
    fn publish_without_listeners_does_not_panic() {
        let feed = ContentFeed::new();
        feed.publish(FeedEvent::Withdrawn {
            id: "gone".to_string(),
            kind: ContentKind::Event,
        });
    }
}
