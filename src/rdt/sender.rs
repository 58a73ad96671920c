//! 发送方状态机
//!
//! 把待发送字符串切成定长段，在流量控制窗口内流水线发送，
//! 按累计 ACK 释放在途段，并在超时后原样重传。
//!
//! 序号空间（字符偏移）：
//!
//! ```text
//!  base_seq            next_seq
//!     │                   │
//! ────┼───────────────────┼───────────────▶ offset
//!     │ <── in flight ──▶ │ <── sendable ─▶
//! ```

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::config::RdtConfig;
use super::error::Result;
use super::segment::Segment;
use crate::sim::Tick;

#[derive(Debug, Clone)]
struct InFlight {
    payload: String,
    len: u64,
    sent_at: Tick,
    timed_out: bool,
}

/// `on_ack` 的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// 窗口左沿前移
    Advanced { from: u64, to: u64 },
    /// 未释放任何在途段
    Duplicate,
    /// ack 超过了曾发送过的最大偏移，忽略
    Invalid,
}

#[derive(Debug)]
pub struct Sender {
    data_length: u64,
    window: u64,
    burst: Option<usize>,

    data: Vec<char>,
    base_seq: u64,
    next_seq: u64,
    inflight: BTreeMap<u64, InFlight>, // seq -> segment
}

impl Sender {
    /// 配置非法（如 `data_length == 0`）时直接失败，否则切段永远无法前进
    pub fn new(cfg: &RdtConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            data_length: cfg.data_length as u64,
            window: cfg.flow_control_win_size as u64,
            burst: cfg.max_segments_per_tick,
            data: Vec::new(),
            base_seq: 0,
            next_seq: 0,
            inflight: BTreeMap::new(),
        })
    }

    /// 安装新的待发送数据并清空窗口；传输中调用会丢弃未确认进度。
    pub fn load_data(&mut self, data: &str) {
        self.data = data.chars().collect();
        self.base_seq = 0;
        self.next_seq = 0;
        self.inflight.clear();
    }

    /// 当前装载的待发送数据（字符）
    pub fn loaded(&self) -> &[char] {
        &self.data
    }

    pub fn data_len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn base_seq(&self) -> u64 {
        self.base_seq
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// 已发送未确认的字符数
    pub fn outstanding(&self) -> u64 {
        self.next_seq - self.base_seq
    }

    pub fn in_flight_segments(&self) -> usize {
        self.inflight.len()
    }

    /// 曾经超时过、且仍在途的段数
    pub fn timed_out_segments(&self) -> usize {
        self.inflight.values().filter(|s| s.timed_out).count()
    }

    pub fn is_complete(&self) -> bool {
        self.base_seq >= self.data_len()
    }

    /// 在窗口允许范围内切出新段。
    ///
    /// 载荷长度取 `min(data_length, 剩余数据, 窗口余量)`，
    /// 因此 `outstanding() <= window` 始终成立。
    pub fn emit_ready(&mut self, now: Tick) -> Vec<Segment> {
        let total = self.data_len();
        let mut out = Vec::new();

        while self.outstanding() < self.window && self.next_seq < total {
            if self.burst.is_some_and(|b| out.len() >= b) {
                break;
            }
            let avail = self.window - self.outstanding();
            let len = self.data_length.min(total - self.next_seq).min(avail);
            let seq = self.next_seq;
            let payload: String = self.data[seq as usize..(seq + len) as usize].iter().collect();

            debug!(seq, len, %now, "发送新数据段");
            self.inflight.insert(
                seq,
                InFlight {
                    payload: payload.clone(),
                    len,
                    sent_at: now,
                    timed_out: false,
                },
            );
            self.next_seq += len;
            out.push(Segment::data(seq, payload));
        }

        out
    }

    /// 累计 ACK：释放所有 `seq + len <= ack` 的在途段。
    pub fn on_ack(&mut self, ack: u64) -> AckOutcome {
        if ack > self.next_seq {
            debug!(ack, next_seq = self.next_seq, "ACK 超出已发送范围，忽略");
            return AckOutcome::Invalid;
        }

        let mut released = Vec::new();
        for (&seq, seg) in self.inflight.iter() {
            if seq + seg.len <= ack {
                released.push(seq);
            } else {
                break;
            }
        }
        if released.is_empty() {
            trace!(ack, base_seq = self.base_seq, "重复 ACK");
            return AckOutcome::Duplicate;
        }
        for seq in released {
            self.inflight.remove(&seq);
        }

        let from = self.base_seq;
        self.base_seq = self.base_seq.max(ack);
        debug!(from, to = self.base_seq, "窗口前移");
        AckOutcome::Advanced {
            from,
            to: self.base_seq,
        }
    }

    /// 收集超时段并刷新其发送时间；重传使用原 seq 与原载荷，不重新切分。
    pub fn check_timeouts(&mut self, now: Tick, timeout_ticks: u64) -> Vec<Segment> {
        let mut out = Vec::new();
        for (&seq, seg) in self.inflight.iter_mut() {
            if now.since(seg.sent_at) >= timeout_ticks {
                debug!(seq, sent_at = %seg.sent_at, %now, "段超时，重传");
                seg.timed_out = true;
                seg.sent_at = now;
                out.push(Segment::data(seq, seg.payload.clone()));
            }
        }
        out
    }
}
