use serde::Serialize;
use tokio::sync::broadcast;

/// Which table a change touched, as surfaced to subscribed clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Caregivers,
    Medications,
    MedicationLogs,
    HydrationLogs,
    JuiceLogs,
    BmLogs,
    Messages,
    TeamSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A minimal change notification. Carries no row data; clients re-fetch
/// whatever the event invalidates.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub op: ChangeOp,
    pub patient_id: String,
}

/// In-process fan-out of write notifications to SSE subscribers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        ChangeFeed { sender }
    }

    /// Best-effort: with no subscribers the event is dropped, which is fine.
    pub fn publish(&self, table: ChangeTable, op: ChangeOp, patient_id: &str) {
        let _ = self.sender.send(ChangeEvent {
            table,
            op,
            patient_id: patient_id.to_string(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();

        feed.publish(ChangeTable::Medications, ChangeOp::Insert, "patient-1");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table, ChangeTable::Medications);
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.patient_id, "patient-1");
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let feed = ChangeFeed::new(8);
        feed.publish(ChangeTable::Messages, ChangeOp::Delete, "patient-1");
    }

    #[test]
    fn events_serialize_with_lowercase_tags() {
        let event = ChangeEvent {
            table: ChangeTable::BmLogs,
            op: ChangeOp::Update,
            patient_id: "p".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["table"], "bm_logs");
        assert_eq!(json["op"], "update");
    }
}
