//! 段（Segment）
//!
//! 信道上交换的最小单位：要么是数据段（seq + 载荷），要么是累计 ACK 段。
//! 构造时计算校验和；信道可以就地损坏段内容而不刷新校验和，
//! 接收方据此识别损坏。

use serde::{Deserialize, Serialize};

/// 段的内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentBody {
    /// `seq` 为载荷首字符在整个流中的偏移（字符计）
    Data { seq: u64, payload: String },
    /// `ack` 为接收方下一个期望的偏移
    Ack { ack: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    body: SegmentBody,
    checksum: u16,
}

impl Segment {
    pub fn data(seq: u64, payload: impl Into<String>) -> Self {
        Self::seal(SegmentBody::Data {
            seq,
            payload: payload.into(),
        })
    }

    pub fn ack(ack: u64) -> Self {
        Self::seal(SegmentBody::Ack { ack })
    }

    fn seal(body: SegmentBody) -> Self {
        let checksum = checksum_of(&body);
        Self { body, checksum }
    }

    pub fn body(&self) -> &SegmentBody {
        &self.body
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// 数据段的 seq；ACK 段返回 `None`
    pub fn seq(&self) -> Option<u64> {
        match self.body {
            SegmentBody::Data { seq, .. } => Some(seq),
            SegmentBody::Ack { .. } => None,
        }
    }

    /// ACK 段的 ack；数据段返回 `None`
    pub fn ack_num(&self) -> Option<u64> {
        match self.body {
            SegmentBody::Ack { ack } => Some(ack),
            SegmentBody::Data { .. } => None,
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self.body, SegmentBody::Ack { .. })
    }

    /// 载荷长度（字符数）；ACK 段为 0
    pub fn payload_len(&self) -> u64 {
        match &self.body {
            SegmentBody::Data { payload, .. } => payload.chars().count() as u64,
            SegmentBody::Ack { .. } => 0,
        }
    }

    /// 重新计算校验和并与携带的值比较
    pub fn checksum_ok(&self) -> bool {
        checksum_of(&self.body) == self.checksum
    }

    /// 信道使用：就地篡改内容但保留旧校验和。
    ///
    /// 数据段替换 `salt` 选中的一个字符；ACK 段翻转 ack 的一个低位。
    pub(crate) fn corrupt(&mut self, salt: u64) {
        match &mut self.body {
            SegmentBody::Data { payload, .. } => {
                let n = payload.chars().count();
                if n == 0 {
                    // 空载荷无字符可改，改校验和本身
                    self.checksum ^= 0x5a5a;
                    return;
                }
                let idx = (salt % n as u64) as usize;
                *payload = payload
                    .chars()
                    .enumerate()
                    .map(|(i, c)| if i == idx { flip_char(c) } else { c })
                    .collect();
            }
            SegmentBody::Ack { ack } => {
                *ack ^= 1 << (salt % 8);
            }
        }
    }
}

fn flip_char(c: char) -> char {
    if c == '#' { '*' } else { '#' }
}

/// 16 位反码和（Internet checksum 风格）
fn checksum_of(body: &SegmentBody) -> u16 {
    let mut bytes = Vec::new();
    match body {
        SegmentBody::Data { seq, payload } => {
            bytes.push(0u8);
            bytes.extend_from_slice(&seq.to_be_bytes());
            bytes.extend_from_slice(payload.as_bytes());
        }
        SegmentBody::Ack { ack } => {
            bytes.push(1u8);
            bytes.extend_from_slice(&ack.to_be_bytes());
        }
    }

    let mut sum: u32 = 0;
    for pair in bytes.chunks(2) {
        let word = match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        };
        sum = sum.wrapping_add(word as u32);
    }
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.body {
            SegmentBody::Data { seq, payload } => {
                write!(f, "seq: {seq}, data: {payload}, checksum: {:#06x}", self.checksum)
            }
            SegmentBody::Ack { ack } => write!(f, "ack: {ack}, checksum: {:#06x}", self.checksum),
        }
    }
}
