//! 接收方状态机
//!
//! 以偏移为键缓存乱序/重复的数据段，拼出连续前缀，并给出累计 ACK。

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::segment::{Segment, SegmentBody};

/// 一批数据段的处理结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub buffered: usize,
    /// `seq < expected` 的旧段，或与缓存中同偏移的段重复
    pub duplicates: usize,
    /// 超出接收窗口而被丢弃
    pub out_of_window: usize,
    /// 本批次拼入连续前缀的段：(seq, len)
    pub delivered: Vec<(u64, u64)>,
}

#[derive(Debug, Default)]
pub struct Receiver {
    recv_window: Option<u64>,
    expected_seq: u64,
    received: BTreeMap<u64, String>,
    assembled: String,
}

impl Receiver {
    pub fn new(recv_window: Option<usize>) -> Self {
        Self {
            recv_window: recv_window.map(|w| w as u64),
            ..Self::default()
        }
    }

    pub fn expected_seq(&self) -> u64 {
        self.expected_seq
    }

    /// 尚未拼入前缀的缓存分片数
    pub fn buffered_fragments(&self) -> usize {
        self.received.len()
    }

    pub fn assembled(&self) -> &str {
        &self.assembled
    }

    /// 吸收一批段（ACK 段被忽略），然后把所有已连续的分片拼入前缀。
    pub fn ingest<'a>(&mut self, segments: impl IntoIterator<Item = &'a Segment>) -> IngestReport {
        let mut report = IngestReport::default();

        for seg in segments {
            let SegmentBody::Data { seq, payload } = seg.body() else {
                continue;
            };
            let seq = *seq;
            if seq < self.expected_seq {
                debug!(seq, expected = self.expected_seq, "旧数据段，丢弃");
                report.duplicates += 1;
                continue;
            }
            if let Some(win) = self.recv_window {
                if seq >= self.expected_seq.saturating_add(win) {
                    warn!(
                        seq,
                        expected = self.expected_seq,
                        recv_window = win,
                        "数据段超出接收窗口，按策略丢弃"
                    );
                    report.out_of_window += 1;
                    continue;
                }
            }
            if self.received.insert(seq, payload.clone()).is_some() {
                debug!(seq, "重复数据段，覆盖缓存");
                report.duplicates += 1;
            } else {
                report.buffered += 1;
            }
        }

        while let Some(payload) = self.received.remove(&self.expected_seq) {
            let seq = self.expected_seq;
            let len = payload.chars().count() as u64;
            self.assembled.push_str(&payload);
            self.expected_seq += len;
            debug!(seq, len, expected = self.expected_seq, "拼入连续前缀");
            report.delivered.push((seq, len));
        }

        // 拼接可能越过仍在缓存中的分片（仅在偏移被篡改时出现）
        let keep = self.received.split_off(&self.expected_seq);
        let stale = std::mem::replace(&mut self.received, keep);
        if !stale.is_empty() {
            debug!(count = stale.len(), "清理落后于前缀的缓存分片");
        }

        report
    }

    /// 纯累计 ACK：永远不确认空洞之后的分片
    pub fn build_ack(&self) -> Segment {
        Segment::ack(self.expected_seq)
    }
}
