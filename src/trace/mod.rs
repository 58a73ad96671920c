//! 协议事件记录
//!
//! 与 `tracing` 日志并行：日志给人看，事件给测试与离线分析用。
//! 每个 RDT 层可选地持有一个 [`TraceLog`]，CLI 在结束时输出为 JSON 数组。

mod types;

pub use types::{TraceEvent, TraceEventKind, TraceLog};
