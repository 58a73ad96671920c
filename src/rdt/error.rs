//! 错误类型
//!
//! 稳态协议路径没有错误：丢包/乱序/重复/损坏都是可恢复的协议行为。
//! 只有配置错误与信道未设置会以错误形式返回。

use thiserror::Error;

/// 信道方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSide {
    Send,
    Receive,
}

impl std::fmt::Display for ChannelSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelSide::Send => f.write_str("send"),
            ChannelSide::Receive => f.write_str("receive"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RdtError {
    /// 配置无法保证前进（例如段长为 0）
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// 在设置信道之前调用了 `process_data`
    #[error("{side} channel is not configured")]
    ChannelNotConfigured { side: ChannelSide },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RdtError>;
