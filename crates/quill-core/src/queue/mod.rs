//! Queue module: item state machine, store, processor, sweep, and the service facade.
//!
//! # 構成
//! - **status / item**: 状態機械と queue item
//! - **store**: item の保存（lock 付き HashMap）
//! - **processor**: グローバル gate の下で 1 件ずつ comment を作成
//! - **sweeper**: stuck の回収と古い item の削除、定期実行の timer
//! - **service**: 外部向けの facade（`CommentQueue` の実装）
//! - **view**: HTTP 層向けのレスポンス型

mod item;
mod processor;
mod service;
mod status;
mod store;
mod sweeper;
mod view;

pub use item::{QueueItem, TransitionError};
pub use processor::{ProcessOutcome, Processor};
pub use service::{QueueService, QueueServiceBuilder};
pub use status::QueueStatus;
pub use store::QueueStore;
pub use sweeper::{SweepReport, SweepTimer, Sweeper};
pub use view::{EnqueueResponse, QueueCounts, QueueStatusView};

use async_trait::async_trait;

use crate::domain::{CreateCommentRequest, QueueId};
use crate::error::QueueError;

/// Queue port (interface) as seen by the HTTP layer.
///
/// `QueueService` is the in-process implementation; this trait is the seam for
/// swapping in a durable one later.
#[async_trait]
pub trait CommentQueue: Send + Sync {
    /// Store the submission and start processing it in the background.
    async fn enqueue(&self, payload: CreateCommentRequest) -> Result<QueueId, QueueError>;

    /// Current snapshot of a queued submission.
    async fn get_status(&self, id: QueueId) -> Result<QueueItem, QueueError>;
}
