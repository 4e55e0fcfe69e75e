//! CommentCreator port - コメント作成（キューが呼び出す外部機能）
//!
//! 本番では DB に書き込む実装が入ります。キューはこの trait 越しにしか作成処理を知りません。

use async_trait::async_trait;

use crate::domain::{CommentRecord, CreateCommentRequest};
use crate::error::CreateCommentError;

/// Creates one comment from a submission.
///
/// Called from background tasks. The queue never calls it concurrently with itself,
/// so implementations do not need to be reentrant.
#[async_trait]
pub trait CommentCreator: Send + Sync {
    async fn create(&self, request: &CreateCommentRequest) -> Result<CommentRecord, CreateCommentError>;
}
