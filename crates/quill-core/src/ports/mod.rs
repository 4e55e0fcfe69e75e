//! Ports - 抽象化レイヤー
//!
//! キューが外部に依存する部分（時刻・ID 生成・コメント作成）を trait として定義します。

pub mod clock;
pub mod comment_creator;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use self::comment_creator::CommentCreator;
pub use self::id_generator::{IdGenerator, UlidGenerator};
