//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryCommentStore**: 開発用の CommentCreator
//!
//! 本番の DB 実装はこのクレートには含めません。

pub mod inmem_comments;

pub use self::inmem_comments::InMemoryCommentStore;
