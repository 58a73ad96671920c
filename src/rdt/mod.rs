//! 可靠数据传输（RDT）层
//!
//! 一个简化的 TCP 式 ARQ：
//! - 按 `data_length` 切段，按字符偏移编号
//! - 流量控制窗口内流水线发送
//! - 按 tick 计数的超时重传（只重传超时的段）
//! - 接收方乱序缓存 + 累计 ACK
//!
//! 不实现拥塞控制、多路复用、握手或接收方通告窗口。

mod config;
mod error;
mod layer;
mod receiver;
mod segment;
mod sender;
mod stats;

pub use config::{AckPolicy, RdtConfig};
pub use error::{ChannelSide, RdtError, Result};
pub use layer::RdtLayer;
pub use receiver::{IngestReport, Receiver};
pub use segment::{Segment, SegmentBody};
pub use sender::{AckOutcome, Sender};
pub use stats::RdtStats;
