//! QueueService - enqueue / status facade over the store, processor and sweep timer.
//!
//! `start()` は呼び出し時の tokio runtime の `Handle` を保持し、processor の dispatch と
//! sweep timer はすべてそこに spawn されます。以降の `enqueue` / `get_status` は
//! runtime の外のスレッドからも呼べます。
//!
//! # 使用例
//! ```ignore
//! let service = QueueService::builder(Arc::new(InMemoryCommentStore::new()))
//!     .config(QueueConfig::default())
//!     .start()?;
//! let id = service.enqueue(CreateCommentRequest::new("Alice", "a@x.com", "hi"))?;
//! let item = service.get_status(id)?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;

use super::processor::Processor;
use super::sweeper::{SweepReport, SweepTimer, Sweeper};
use super::{CommentQueue, EnqueueResponse, QueueCounts, QueueItem, QueueStatusView, QueueStore};
use crate::config::QueueConfig;
use crate::domain::{CreateCommentRequest, QueueId};
use crate::error::{ConfigError, QueueError};
use crate::ports::{Clock, CommentCreator, IdGenerator, SystemClock, UlidGenerator};

/// Wiring for a [`QueueService`].
///
/// Clock と IdGenerator は省略すると SystemClock / UlidGenerator になります。
pub struct QueueServiceBuilder {
    creator: Arc<dyn CommentCreator>,
    config: QueueConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl QueueServiceBuilder {
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Build the service and spawn its sweep timer on the current tokio runtime.
    ///
    /// Fails fast on an invalid config. Panics if called outside a runtime.
    pub fn start(self) -> Result<QueueService, ConfigError> {
        self.config.validate()?;
        let runtime = Handle::current();

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        let store = Arc::new(QueueStore::new());
        let processor = Arc::new(Processor::new(
            Arc::clone(&store),
            self.creator,
            Arc::clone(&clock),
            runtime.clone(),
        ));
        let sweeper = Arc::new(Sweeper::new(
            Arc::clone(&store),
            Arc::clone(&processor),
            Arc::clone(&clock),
            self.config.stuck_after,
            self.config.retention,
        ));
        let timer = SweepTimer::spawn(Arc::clone(&sweeper), self.config.sweep_interval, &runtime);

        tracing::info!(
            sweep_interval_secs = self.config.sweep_interval.as_secs(),
            stuck_after_secs = self.config.stuck_after.as_secs(),
            retention_secs = self.config.retention.as_secs(),
            "comment queue service started"
        );

        Ok(QueueService {
            store,
            processor,
            sweeper,
            clock,
            ids,
            timer: Some(timer),
        })
    }
}

/// In-process queue for comment submissions.
///
/// Dropping the service stops the sweep timer. Tasks already dispatched keep
/// running to completion.
pub struct QueueService {
    store: Arc<QueueStore>,
    processor: Arc<Processor>,
    sweeper: Arc<Sweeper>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    timer: Option<SweepTimer>,
}

impl QueueService {
    pub fn builder(creator: Arc<dyn CommentCreator>) -> QueueServiceBuilder {
        QueueServiceBuilder {
            creator,
            config: QueueConfig::default(),
            clock: None,
            ids: None,
        }
    }

    /// Validate, store as Pending, dispatch processing, return the id.
    ///
    /// Does not wait for processing. The returned id resolves through
    /// [`get_status`](Self::get_status) straight away.
    pub fn enqueue(&self, payload: CreateCommentRequest) -> Result<QueueId, QueueError> {
        payload.validate()?;

        let item = QueueItem::new(self.ids.generate_queue_id(), payload, self.clock.now());
        let id = item.id();
        self.store.insert(item)?;
        tracing::info!(queue_id = %id, "comment queued");

        self.processor.dispatch(id);
        Ok(id)
    }

    /// Snapshot of the item; may be stale a moment later.
    pub fn get_status(&self, id: QueueId) -> Result<QueueItem, QueueError> {
        self.store
            .get(id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    /// `get_status` for an id taken straight from a request path.
    ///
    /// A string that does not parse as a queue id cannot name a stored item, so
    /// it is reported as `NotFound` like any other unknown id.
    pub fn get_status_str(&self, raw: &str) -> Result<QueueItem, QueueError> {
        match raw.parse::<QueueId>() {
            Ok(id) => self.get_status(id),
            Err(err) => {
                tracing::debug!(queue_id = raw, error = %err, "malformed queue id");
                Err(QueueError::NotFound(raw.to_string()))
            }
        }
    }

    pub fn status_view(&self, id: QueueId) -> Result<QueueStatusView, QueueError> {
        self.get_status(id).map(|item| QueueStatusView::from(&item))
    }

    /// Enqueue and wrap the id in the response body the HTTP layer returns.
    pub fn enqueue_response(&self, payload: CreateCommentRequest) -> Result<EnqueueResponse, QueueError> {
        self.enqueue(payload).map(EnqueueResponse::accepted)
    }

    pub fn counts(&self) -> QueueCounts {
        self.store.counts()
    }

    /// Run one sweep now, outside the timer schedule.
    pub fn sweep_once(&self) -> SweepReport {
        self.sweeper.run_once()
    }

    /// Direct access to the backing store (inspection, tests).
    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    /// Stop the timer, wait for it, and discard every item.
    pub async fn shutdown(mut self) {
        if let Some(timer) = self.timer.take() {
            timer.shutdown_and_join().await;
        }
        let dropped = self.store.len();
        self.store.clear();
        tracing::info!(dropped, "comment queue service disposed");
    }
}

#[async_trait]
impl CommentQueue for QueueService {
    async fn enqueue(&self, payload: CreateCommentRequest) -> Result<QueueId, QueueError> {
        QueueService::enqueue(self, payload)
    }

    async fn get_status(&self, id: QueueId) -> Result<QueueItem, QueueError> {
        QueueService::get_status(self, id)
    }
}
