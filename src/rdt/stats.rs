//! 统计信息
//!
//! 每个 RDT 层一份计数器，供驱动方与 CLI 汇总输出。

use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RdtStats {
    pub segments_sent: u64,
    pub retransmissions: u64,
    pub segment_timeouts: u64,
    pub acks_sent: u64,
    pub acks_received: u64,
    pub duplicate_acks: u64,
    pub duplicate_data: u64,
    pub corrupt_discarded: u64,
    pub out_of_window_dropped: u64,
}
