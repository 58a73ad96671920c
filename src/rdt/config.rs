use serde::{Deserialize, Serialize};

use super::error::{RdtError, Result};

/// 何时发送累计 ACK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckPolicy {
    /// 每个 tick 都发送一个 ACK（无论是否收到新数据）
    #[default]
    EveryTick,
    /// 仅在本 tick 收到过数据段（含重复段）时发送
    OnData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdtConfig {
    /// 每个数据段的最大载荷（字符）
    pub data_length: usize,
    /// 发送方允许的最大未确认字符数
    pub flow_control_win_size: usize,
    /// 超时阈值（tick）
    pub timeout_ticks: u64,
    pub ack_policy: AckPolicy,
    /// 校验失败的段按丢失处理；关闭后损坏段会被照单全收
    pub verify_checksum: bool,
    /// 接收缓冲容量（字符）；超出 `expected + recv_window` 的分片被丢弃
    pub recv_window: Option<usize>,
    /// 每个 tick 最多发出的新数据段数
    pub max_segments_per_tick: Option<usize>,
}

impl Default for RdtConfig {
    fn default() -> Self {
        Self {
            data_length: 4,
            flow_control_win_size: 15,
            timeout_ticks: 8,
            ack_policy: AckPolicy::EveryTick,
            verify_checksum: true,
            recv_window: None,
            max_segments_per_tick: None,
        }
    }
}

impl RdtConfig {
    pub fn new(data_length: usize, flow_control_win_size: usize, timeout_ticks: u64) -> Self {
        Self {
            data_length,
            flow_control_win_size,
            timeout_ticks,
            ..Self::default()
        }
    }

    /// 拒绝会让传输无法前进的配置
    pub fn validate(&self) -> Result<()> {
        if self.data_length == 0 {
            return Err(RdtError::InvalidConfig("data_length must be positive".into()));
        }
        if self.flow_control_win_size == 0 {
            return Err(RdtError::InvalidConfig(
                "flow_control_win_size must be positive".into(),
            ));
        }
        if self.timeout_ticks == 0 {
            return Err(RdtError::InvalidConfig("timeout_ticks must be positive".into()));
        }
        if self.recv_window == Some(0) {
            return Err(RdtError::InvalidConfig("recv_window must be positive when set".into()));
        }
        if self.max_segments_per_tick == Some(0) {
            return Err(RdtError::InvalidConfig(
                "max_segments_per_tick must be positive when set".into(),
            ));
        }
        Ok(())
    }
}
