//! Notification and badge sink seam

use serde::Serialize;

use crate::types::{BlockCategory, SegmentCategory, Severity};

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub duration_ms: u64,
}

/// Default on-screen time of a notification.
pub const DEFAULT_NOTIFICATION_MS: u64 = 3000;

/// Event forwarded to the background collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EngineEvent {
    AdsBlocked {
        count: u64,
        total: u64,
        category: BlockCategory,
    },
    SegmentSkipped {
        category: SegmentCategory,
        #[serde(rename = "videoId")]
        item_id: Option<String>,
    },
}

/// Notification/badge sink.
pub trait Notifier {
    fn notify(&mut self, notification: Notification);
    fn update_badge(&mut self, tab_id: Option<i32>, count: u64);
    fn report(&mut self, event: EngineEvent);
}

/// Sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notification: Notification) {
        match notification.severity {
            Severity::Error => log::error!("{}", notification.message),
            Severity::Warning => log::warn!("{}", notification.message),
            Severity::Info | Severity::Success => log::info!("{}", notification.message),
        }
    }

    fn update_badge(&mut self, tab_id: Option<i32>, count: u64) {
        log::debug!("Badge for tab {:?}: {}", tab_id, count);
    }

    fn report(&mut self, event: EngineEvent) {
        log::debug!("Event: {:?}", event);
    }
}

/// Sink that keeps everything until drained.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    pub notifications: Vec<Notification>,
    pub badges: Vec<(Option<i32>, u64)>,
    pub events: Vec<EngineEvent>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything recorded so far.
    pub fn drain(&mut self) -> RecordingNotifier {
        std::mem::take(self)
    }

    pub fn messages(&self) -> Vec<&str> {
        self.notifications.iter().map(|n| n.message.as_str()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn update_badge(&mut self, tab_id: Option<i32>, count: u64) {
        self.badges.push((tab_id, count));
    }

    fn report(&mut self, event: EngineEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = EngineEvent::SegmentSkipped {
            category: SegmentCategory::Sponsor,
            item_id: Some("abc".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "segment_skipped");
        assert_eq!(json["category"], "sponsor");
        assert_eq!(json["videoId"], "abc");
    }

    #[test]
    fn test_recording_drain() {
        let mut sink = RecordingNotifier::new();
        sink.update_badge(Some(1), 2);
        let drained = sink.drain();
        assert_eq!(drained.badges, vec![(Some(1), 2)]);
        assert!(sink.badges.is_empty());
    }
}
