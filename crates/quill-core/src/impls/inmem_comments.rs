//! InMemoryCommentStore - 開発用のコメント作成先
//!
//! # 実装詳細
//! - HashMap<CommentId, CommentRecord> を parking_lot::Mutex で保護
//! - 返信（parent_id あり）は親が存在する場合のみ受け付ける
//! - await を跨いでロックを保持しない

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{CommentId, CommentRecord, CreateCommentRequest};
use crate::error::CreateCommentError;
use crate::ports::{Clock, CommentCreator, IdGenerator, SystemClock, UlidGenerator};

pub struct InMemoryCommentStore {
    comments: Mutex<HashMap<CommentId, CommentRecord>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        Self {
            comments: Mutex::new(HashMap::new()),
            clock,
            ids,
        }
    }

    pub fn get(&self, id: CommentId) -> Option<CommentRecord> {
        self.comments.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.comments.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.lock().is_empty()
    }

    /// Direct replies to `parent`, oldest first.
    pub fn replies_of(&self, parent: CommentId) -> Vec<CommentRecord> {
        let mut replies: Vec<CommentRecord> = self
            .comments
            .lock()
            .values()
            .filter(|c| c.parent_id == Some(parent))
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        replies
    }
}

impl Default for InMemoryCommentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentCreator for InMemoryCommentStore {
    async fn create(&self, request: &CreateCommentRequest) -> Result<CommentRecord, CreateCommentError> {
        request
            .validate()
            .map_err(|e| CreateCommentError::Rejected(e.to_string()))?;

        let mut comments = self.comments.lock();
        if let Some(parent) = request.parent_id
            && !comments.contains_key(&parent)
        {
            return Err(CreateCommentError::ParentNotFound(parent));
        }

        let record = CommentRecord::from_request(self.ids.generate_comment_id(), request, self.clock.now());
        comments.insert(record.id, record.clone());
        Ok(record)
    }
}
