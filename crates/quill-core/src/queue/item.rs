//! QueueItem - キューに積まれた 1 件の投稿
//!
//! フィールドは非公開で、状態は遷移メソッド経由でのみ変わります。
//! - `start_processing`: Pending → Processing
//! - `complete`: Processing → Completed（`result` を保持）
//! - `fail`: Processing → Failed（`error_message` を保持）
//!
//! 不正な遷移は `TransitionError` になり、item は変更されません。
//! `processed_at` は `created_at` より前にならないよう丸めます（時計が戻った場合）。

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::QueueStatus;
use crate::domain::{CommentRecord, CreateCommentRequest, QueueId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal transition {from} -> {to}")]
pub struct TransitionError {
    pub from: QueueStatus,
    pub to: QueueStatus,
}

/// One queued comment submission.
///
/// Design:
/// - The store holds these by value; readers get clones (snapshots).
/// - Fields are only changed through the transition methods below, which refuse
///   to move backwards and keep `result` / `error_message` consistent with `status`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    id: QueueId,
    payload: CreateCommentRequest,
    status: QueueStatus,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    result: Option<CommentRecord>,
    error_message: Option<String>,
}

impl QueueItem {
    pub fn new(id: QueueId, payload: CreateCommentRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            payload,
            status: QueueStatus::Pending,
            created_at,
            processed_at: None,
            result: None,
            error_message: None,
        }
    }

    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn payload(&self) -> &CreateCommentRequest {
        &self.payload
    }

    pub fn status(&self) -> QueueStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn result(&self) -> Option<&CommentRecord> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Time since enqueue; zero if `now` is before `created_at`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.created_at).max(chrono::Duration::zero())
    }

    /// Pending -> Processing.
    pub fn start_processing(&mut self) -> Result<(), TransitionError> {
        self.transition(QueueStatus::Processing)?;
        Ok(())
    }

    /// Processing -> Completed.
    pub fn complete(&mut self, result: CommentRecord, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(QueueStatus::Completed)?;
        self.result = Some(result);
        self.processed_at = Some(at.max(self.created_at));
        Ok(())
    }

    /// Processing -> Failed.
    pub fn fail(&mut self, error_message: impl Into<String>, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(QueueStatus::Failed)?;
        self.error_message = Some(error_message.into());
        self.processed_at = Some(at.max(self.created_at));
        Ok(())
    }

    fn transition(&mut self, to: QueueStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
