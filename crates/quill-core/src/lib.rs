//! quill-core
//!
//! In-process queue for comment submissions.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, comment）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, CommentCreator）
//! - **impls**: 実装（InMemoryCommentStore など開発用）
//! - **queue**: キュー本体（item, store, processor, sweeper, service）
//! - **config**: QueueConfig（TOML）
//! - **error**: エラー型

pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

pub use config::QueueConfig;
pub use error::{ConfigError, CreateCommentError, QueueError, ValidationError};
pub use queue::{CommentQueue, QueueItem, QueueService, QueueStatus};
