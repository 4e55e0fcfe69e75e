//! Domain model (IDs, comment payload, comment record).

pub mod comment;
pub mod ids;

pub use comment::{CommentRecord, CreateCommentRequest};
pub use ids::{CommentId, Id, IdMarker, IdParseError, QueueId};
