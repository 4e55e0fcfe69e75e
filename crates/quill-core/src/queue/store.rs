//! QueueStore - queue item の唯一の保存場所
//!
//! `parking_lot::Mutex<HashMap>` で保護し、各操作はその操作の間だけ lock を持ちます。
//! - `get` / `scan` は clone を返す（呼び出し側が lock を持ち続けない）
//! - `update` はクロージャを lock 内で実行するので、確認と遷移が不可分になる
//!   （processor の claim はこれに依存）
//! - `scan` は snapshot。sweep 中に追加された item は次回の sweep で見る

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{QueueCounts, QueueItem, QueueStatus};
use crate::domain::QueueId;
use crate::error::QueueError;

/// Thread-safe map from queue id to item.
///
/// Every operation takes the lock for its own duration only; nothing here awaits,
/// so the lock is never held across a suspension point.
#[derive(Default)]
pub struct QueueStore {
    items: Mutex<HashMap<QueueId, QueueItem>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: QueueItem) -> Result<(), QueueError> {
        let mut items = self.items.lock();
        let id = item.id();
        if items.contains_key(&id) {
            return Err(QueueError::DuplicateId(id));
        }
        items.insert(id, item);
        Ok(())
    }

    pub fn get(&self, id: QueueId) -> Option<QueueItem> {
        self.items.lock().get(&id).cloned()
    }

    /// Snapshot of every item. Items added after the call are not included.
    pub fn scan(&self) -> Vec<QueueItem> {
        self.items.lock().values().cloned().collect()
    }

    /// Returns whether an item was actually removed.
    pub fn remove(&self, id: QueueId) -> bool {
        self.items.lock().remove(&id).is_some()
    }

    /// Apply `f` to the item if it is still present.
    pub fn update<T>(&self, id: QueueId, f: impl FnOnce(&mut QueueItem) -> T) -> Option<T> {
        self.items.lock().get_mut(&id).map(f)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }

    pub fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for item in self.items.lock().values() {
            match item.status() {
                QueueStatus::Pending => counts.pending += 1,
                QueueStatus::Processing => counts.processing += 1,
                QueueStatus::Completed => counts.completed += 1,
                QueueStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}
