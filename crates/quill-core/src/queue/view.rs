//! HTTP 層に返す view（serde で camelCase の JSON になる）
//!
//! - `EnqueueResponse`: 投稿受付時のレスポンス
//! - `QueueStatusView`: ステータスポーリングのレスポンス
//! - `QueueCounts`: status ごとの件数（監視・CLI 用）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{QueueItem, QueueStatus};
use crate::domain::{CommentRecord, QueueId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }
}

/// Body of the status poll response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatusView {
    pub queue_id: QueueId,
    pub status: QueueStatus,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CommentRecord>,
}

impl From<&QueueItem> for QueueStatusView {
    fn from(item: &QueueItem) -> Self {
        Self {
            queue_id: item.id(),
            status: item.status(),
            created_at: item.created_at(),
            processed_at: item.processed_at(),
            error_message: item.error_message().map(str::to_string),
            result: item.result().cloned(),
        }
    }
}

/// Body of the enqueue response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub queue_id: QueueId,
    pub status: QueueStatus,
    pub message: String,
}

impl EnqueueResponse {
    pub fn accepted(queue_id: QueueId) -> Self {
        Self {
            queue_id,
            status: QueueStatus::Pending,
            message: "Comment queued for processing".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommentId, CreateCommentRequest};
    use chrono::TimeZone;
    use ulid::Ulid;

    #[test]
    fn pending_view_omits_outcome_fields() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let item = QueueItem::new(
            QueueId::from_ulid(Ulid::new()),
            CreateCommentRequest::new("Alice", "a@x.com", "hi"),
            at,
        );

        let json = serde_json::to_value(QueueStatusView::from(&item)).unwrap();

        assert_eq!(json["status"], "Pending");
        assert_eq!(json["queueId"], item.id().to_string());
        assert!(json.get("processedAt").is_none());
        assert!(json.get("errorMessage").is_none());
        assert!(json.get("result").is_none());
    }

    #[test]
    fn completed_view_carries_result() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let req = CreateCommentRequest::new("Alice", "a@x.com", "hi");
        let mut item = QueueItem::new(QueueId::from_ulid(Ulid::new()), req.clone(), at);
        let record = CommentRecord::from_request(CommentId::from_ulid(Ulid::new()), &req, at);
        item.start_processing().unwrap();
        item.complete(record.clone(), at).unwrap();

        let view = QueueStatusView::from(&item);

        assert_eq!(view.status, QueueStatus::Completed);
        assert_eq!(view.result, Some(record));
        assert_eq!(view.processed_at, Some(at));
    }

    #[test]
    fn counts_totals() {
        let counts = QueueCounts {
            pending: 1,
            processing: 1,
            completed: 3,
            failed: 2,
        };
        assert_eq!(counts.total(), 7);
    }
}
