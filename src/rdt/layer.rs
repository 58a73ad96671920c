//! RDT 层（驱动/集成）
//!
//! 组合发送方与接收方。每个 tick 固定两阶段：
//! 1. 发送阶段：先发窗口内的新段，再重传超时段；
//! 2. 接收阶段：取出信道上可见的段，ACK 交给发送方、数据交给接收方，
//!    最后按 [`AckPolicy`] 回一个累计 ACK。
//!
//! 本 tick 收到的 ACK 只影响下一个 tick 的发送。

use tracing::{debug, info, warn};

use super::config::{AckPolicy, RdtConfig};
use super::error::{ChannelSide, RdtError, Result};
use super::receiver::Receiver;
use super::segment::Segment;
use super::sender::{AckOutcome, Sender};
use super::stats::RdtStats;
use crate::channel::SharedChannel;
use crate::sim::Tick;
use crate::trace::{TraceEvent, TraceEventKind, TraceLog};

#[derive(Debug)]
pub struct RdtLayer {
    name: String,
    cfg: RdtConfig,
    send_channel: Option<SharedChannel>,
    receive_channel: Option<SharedChannel>,
    sender: Sender,
    receiver: Receiver,
    now: Tick,
    stats: RdtStats,
    /// 可选的事件记录；`None` 时不记录
    pub trace: Option<TraceLog>,
}

impl RdtLayer {
    pub fn new(cfg: RdtConfig) -> Result<Self> {
        let sender = Sender::new(&cfg)?;
        Ok(Self {
            name: "rdt".to_string(),
            sender,
            receiver: Receiver::new(cfg.recv_window),
            cfg,
            send_channel: None,
            receive_channel: None,
            now: Tick::ZERO,
            stats: RdtStats::default(),
            trace: None,
        })
    }

    /// 设置用于日志与事件记录的端点名
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RdtConfig {
        &self.cfg
    }

    pub fn set_send_channel(&mut self, channel: SharedChannel) {
        self.send_channel = Some(channel);
    }

    pub fn set_receive_channel(&mut self, channel: SharedChannel) {
        self.receive_channel = Some(channel);
    }

    /// 安装新的待发送数据；会重置发送窗口
    pub fn set_data_to_send(&mut self, data: &str) {
        info!(endpoint = %self.name, chars = data.chars().count(), "设置待发送数据");
        self.sender.load_data(data);
    }

    /// 目前为止按序拼出的数据
    pub fn data_received(&self) -> &str {
        self.receiver.assembled()
    }

    pub fn count_segment_timeouts(&self) -> u64 {
        self.stats.segment_timeouts
    }

    pub fn stats(&self) -> &RdtStats {
        &self.stats
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// 已执行的 tick 数
    pub fn now(&self) -> Tick {
        self.now
    }

    /// 执行一个 tick。任一信道未设置时直接返回错误，不改动任何状态。
    #[tracing::instrument(skip(self), fields(endpoint = %self.name))]
    pub fn process_data(&mut self) -> Result<()> {
        let send = self.send_channel.clone().ok_or(RdtError::ChannelNotConfigured {
            side: ChannelSide::Send,
        })?;
        let recv = self.receive_channel.clone().ok_or(RdtError::ChannelNotConfigured {
            side: ChannelSide::Receive,
        })?;

        self.now = self.now.next();
        self.process_send(&send);
        self.process_receive(&send, &recv);
        Ok(())
    }

    fn process_send(&mut self, send: &SharedChannel) {
        for seg in self.sender.emit_ready(self.now) {
            self.stats.segments_sent += 1;
            self.record(TraceEventKind::SendData {
                seq: seg.seq().unwrap_or_default(),
                len: seg.payload_len(),
                retrans: false,
            });
            send.borrow_mut().send(seg);
        }

        for seg in self.sender.check_timeouts(self.now, self.cfg.timeout_ticks) {
            let seq = seg.seq().unwrap_or_default();
            self.stats.segment_timeouts += 1;
            self.stats.retransmissions += 1;
            self.stats.segments_sent += 1;
            self.record(TraceEventKind::Timeout { seq });
            self.record(TraceEventKind::SendData {
                seq,
                len: seg.payload_len(),
                retrans: true,
            });
            send.borrow_mut().send(seg);
        }
    }

    fn process_receive(&mut self, send: &SharedChannel, recv: &SharedChannel) {
        let incoming = recv.borrow_mut().receive();
        let mut data: Vec<Segment> = Vec::new();

        for seg in incoming {
            if self.cfg.verify_checksum && !seg.checksum_ok() {
                warn!(endpoint = %self.name, %seg, "校验和错误，按丢失处理");
                self.stats.corrupt_discarded += 1;
                self.record(TraceEventKind::DropCorrupt { ack: seg.is_ack() });
                continue;
            }
            match seg.ack_num() {
                Some(ack) => self.handle_ack(ack),
                None => {
                    self.record(TraceEventKind::RecvData {
                        seq: seg.seq().unwrap_or_default(),
                        len: seg.payload_len(),
                    });
                    data.push(seg);
                }
            }
        }

        let report = self.receiver.ingest(&data);
        self.stats.duplicate_data += report.duplicates as u64;
        self.stats.out_of_window_dropped += report.out_of_window as u64;
        if report.out_of_window > 0 {
            self.record(TraceEventKind::DropOutOfWindow {
                count: report.out_of_window as u64,
            });
        }
        for &(seq, len) in &report.delivered {
            self.record(TraceEventKind::Deliver { seq, len });
        }

        let should_ack = match self.cfg.ack_policy {
            AckPolicy::EveryTick => true,
            AckPolicy::OnData => !data.is_empty(),
        };
        if should_ack {
            let ack = self.receiver.build_ack();
            self.stats.acks_sent += 1;
            self.record(TraceEventKind::SendAck {
                ack: self.receiver.expected_seq(),
            });
            send.borrow_mut().send(ack);
        }
    }

    fn handle_ack(&mut self, ack: u64) {
        self.stats.acks_received += 1;
        let outcome = self.sender.on_ack(ack);
        let advanced = matches!(outcome, AckOutcome::Advanced { .. });
        self.record(TraceEventKind::RecvAck { ack, advanced });

        match outcome {
            AckOutcome::Advanced { from, to } => {
                debug!(endpoint = %self.name, from, to, "累计确认");
                if self.sender.is_complete() {
                    info!(
                        endpoint = %self.name,
                        tick = self.now.0,
                        timeouts = self.stats.segment_timeouts,
                        "✅ 全部数据已确认"
                    );
                }
            }
            AckOutcome::Duplicate => {
                if self.sender.in_flight_segments() > 0 {
                    self.stats.duplicate_acks += 1;
                }
            }
            AckOutcome::Invalid => {
                warn!(endpoint = %self.name, ack, next_seq = self.sender.next_seq(), "ACK 超出已发送范围，忽略");
            }
        }
    }

    fn record(&mut self, kind: TraceEventKind) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceEvent {
                tick: self.now.0,
                endpoint: self.name.clone(),
                kind,
            });
        }
    }
}
