//! Processor - queue item を 1 件ずつ CommentCreator に渡す
//!
//! # フロー
//! 1. グローバル gate を取得（同時に走る creation は常に 1 件）
//! 2. store の lock 内で Pending を確認して Processing に遷移（claim）
//! 3. CommentCreator::create を呼ぶ（panic も catch する）
//! 4. 結果を Completed / Failed として記録
//!
//! claim できなかった id（既に処理済み・削除済み）は何もせず `Skipped` を返します。
//! そのため同じ id を何度 dispatch しても creator は 1 回しか呼ばれません。
//!
//! dispatch は構築時に受け取った runtime `Handle` に spawn するので、
//! runtime の外のスレッドから `enqueue` / sweep を呼んでも動きます。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{QueueStatus, QueueStore};
use crate::domain::QueueId;
use crate::ports::{Clock, CommentCreator};

/// What `process_one` did with an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Item absent or no longer Pending; nothing was done.
    Skipped,
    Completed,
    Failed,
    /// Creation ran, but the item was evicted before the outcome could be recorded.
    Discarded,
}

/// Serializes every comment creation behind one process-wide gate.
///
/// Design:
/// - The gate is global, not per item. Throughput is one creation at a time, which
///   also means the creator never has to be reentrant.
/// - `process_one` re-checks the item under the gate, so calling it twice for the
///   same id (sweep re-dispatch racing the original dispatch) runs the creator once.
pub struct Processor {
    store: Arc<QueueStore>,
    creator: Arc<dyn CommentCreator>,
    clock: Arc<dyn Clock>,
    gate: Mutex<()>,
    runtime: Handle,
}

impl Processor {
    pub fn new(
        store: Arc<QueueStore>,
        creator: Arc<dyn CommentCreator>,
        clock: Arc<dyn Clock>,
        runtime: Handle,
    ) -> Self {
        Self {
            store,
            creator,
            clock,
            gate: Mutex::new(()),
            runtime,
        }
    }

    /// Run `process_one` on its own task; the caller does not wait for it.
    ///
    /// Callable from any thread, inside a runtime or not.
    pub fn dispatch(self: &Arc<Self>, id: QueueId) -> JoinHandle<ProcessOutcome> {
        let processor = Arc::clone(self);
        self.runtime.spawn(async move { processor.process_one(id).await })
    }

    pub async fn process_one(&self, id: QueueId) -> ProcessOutcome {
        // guard は drop で必ず解放される（panic 時も含む）
        let _gate = self.gate.lock().await;

        let claimed = self.store.update(id, |item| {
            if item.status() != QueueStatus::Pending {
                return None;
            }
            item.start_processing().ok()?;
            Some(item.payload().clone())
        });
        let Some(Some(payload)) = claimed else {
            tracing::debug!(queue_id = %id, "skipping queue item: absent or already picked up");
            return ProcessOutcome::Skipped;
        };

        tracing::info!(queue_id = %id, "processing queued comment");

        let result = AssertUnwindSafe(self.creator.create(&payload))
            .catch_unwind()
            .await;
        let now = self.clock.now();

        // claim 済みの item は gate を持つこのタスク以外からは遷移しないので、
        // 記録に失敗するのは sweep に削除された場合だけ
        let (outcome, recorded) = match result {
            Ok(Ok(record)) => {
                let comment_id = record.id;
                let recorded = self.store.update(id, |item| item.complete(record, now));
                if recorded.is_some() {
                    tracing::info!(queue_id = %id, comment_id = %comment_id, "comment processed successfully");
                }
                (ProcessOutcome::Completed, recorded)
            }
            Ok(Err(err)) => {
                tracing::error!(queue_id = %id, error = %err, "failed to process queued comment");
                let recorded = self.store.update(id, |item| item.fail(err.to_string(), now));
                (ProcessOutcome::Failed, recorded)
            }
            Err(panic) => {
                let message = format!("comment creation panicked: {}", panic_message(&*panic));
                tracing::error!(queue_id = %id, error = %message, "failed to process queued comment");
                let recorded = self.store.update(id, |item| item.fail(message, now));
                (ProcessOutcome::Failed, recorded)
            }
        };

        if recorded.and_then(Result::ok).is_some() {
            outcome
        } else {
            tracing::warn!(queue_id = %id, "queue item evicted while processing; outcome discarded");
            ProcessOutcome::Discarded
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
