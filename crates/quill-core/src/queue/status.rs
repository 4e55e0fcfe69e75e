//! QueueStatus - queue item の状態機械
//!
//! 遷移は前進のみで、終端状態（Completed / Failed）からは動きません。
//! `rank()` はポーリング側で「状態が戻っていない」ことを確かめるのに使えます。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a queued submission.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Failed
///
/// Ordered so that `Pending < Processing < Completed/Failed`; a polled item never goes backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueStatus {
    /// Stored, waiting for the processor.
    Pending,

    /// Holding the gate, comment creation in flight.
    Processing,

    /// Comment created.
    Completed,

    /// Comment creation failed (permanent, never retried).
    Failed,
}

impl QueueStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::Failed)
    }

    /// Position in the lifecycle; terminal states share a rank.
    pub fn rank(self) -> u8 {
        match self {
            QueueStatus::Pending => 0,
            QueueStatus::Processing => 1,
            QueueStatus::Completed | QueueStatus::Failed => 2,
        }
    }

    pub fn can_transition_to(self, next: QueueStatus) -> bool {
        matches!(
            (self, next),
            (QueueStatus::Pending, QueueStatus::Processing)
                | (QueueStatus::Processing, QueueStatus::Completed)
                | (QueueStatus::Processing, QueueStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueStatus::Pending => "Pending",
            QueueStatus::Processing => "Processing",
            QueueStatus::Completed => "Completed",
            QueueStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
