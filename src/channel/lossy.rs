//! 故障注入信道
//!
//! 每个段在发送时决定命运：
//! - 丢弃（`loss_rate`）
//! - 就地损坏、不刷新校验和（`corrupt_rate`）
//! - 额外延迟 1..=`max_delay_ticks` 个 tick（`delay_rate`）
//! - 复制一份独立投递（`duplicate_rate`）
//!
//! 基础时延为 1 个 tick。开启 `reorder` 后，同一 tick 到期的段以随机顺序可见。
//! 所有随机性来自 `ChaCha8Rng`，同一种子可完全复现。

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::UnreliableChannel;
use crate::rdt::{RdtError, Result, Segment};
use crate::sim::Tick;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub loss_rate: f64,
    pub delay_rate: f64,
    pub max_delay_ticks: u64,
    pub reorder: bool,
    pub duplicate_rate: f64,
    pub corrupt_rate: f64,
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::perfect(0)
    }
}

impl ChannelConfig {
    /// 无任何故障的信道
    pub fn perfect(seed: u64) -> Self {
        Self {
            loss_rate: 0.0,
            delay_rate: 0.0,
            max_delay_ticks: 0,
            reorder: false,
            duplicate_rate: 0.0,
            corrupt_rate: 0.0,
            seed,
        }
    }

    /// 丢包、延迟、乱序、复制、损坏全部开启的中等强度配置
    pub fn hostile(seed: u64) -> Self {
        Self {
            loss_rate: 0.1,
            delay_rate: 0.1,
            max_delay_ticks: 3,
            reorder: true,
            duplicate_rate: 0.05,
            corrupt_rate: 0.05,
            seed,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let probs = [
            ("loss_rate", self.loss_rate),
            ("delay_rate", self.delay_rate),
            ("duplicate_rate", self.duplicate_rate),
            ("corrupt_rate", self.corrupt_rate),
        ];
        for (name, p) in probs {
            if !(0.0..=1.0).contains(&p) {
                return Err(RdtError::InvalidConfig(format!("{name} must be within [0, 1], got {p}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub sent: u64,
    pub dropped: u64,
    pub delayed: u64,
    pub duplicated: u64,
    pub corrupted: u64,
    pub delivered: u64,
}

#[derive(Debug)]
struct Pending {
    at: Tick,
    id: u64,
    seg: Segment,
}

#[derive(Debug)]
pub struct LossyChannel {
    cfg: ChannelConfig,
    rng: ChaCha8Rng,
    now: Tick,
    next_id: u64,
    pending: Vec<Pending>,
    visible: Vec<Segment>,
    pub stats: ChannelStats,
}

impl LossyChannel {
    pub fn new(cfg: ChannelConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::build(cfg))
    }

    /// 透明信道：每个段恰好延迟 1 个 tick、按发送顺序可见
    pub fn perfect() -> Self {
        Self::build(ChannelConfig::perfect(0))
    }

    fn build(cfg: ChannelConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        Self {
            cfg,
            rng,
            now: Tick::ZERO,
            next_id: 0,
            pending: Vec::new(),
            visible: Vec::new(),
            stats: ChannelStats::default(),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.cfg
    }

    /// 尚未可见的段数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn schedule(&mut self, seg: Segment) {
        let mut delay = 1;
        if self.cfg.max_delay_ticks > 0 && self.rng.gen_bool(self.cfg.delay_rate) {
            delay += self.rng.gen_range(1..=self.cfg.max_delay_ticks);
            self.stats.delayed += 1;
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.pending.push(Pending {
            at: self.now.after(delay),
            id,
            seg,
        });
    }
}

impl UnreliableChannel for LossyChannel {
    fn send(&mut self, mut seg: Segment) {
        self.stats.sent += 1;
        if self.rng.gen_bool(self.cfg.loss_rate) {
            trace!(%seg, "信道丢弃段");
            self.stats.dropped += 1;
            return;
        }
        if self.rng.gen_bool(self.cfg.corrupt_rate) {
            let salt = self.rng.gen_range(0..u64::MAX);
            seg.corrupt(salt);
            trace!(%seg, "信道损坏段");
            self.stats.corrupted += 1;
        }
        if self.rng.gen_bool(self.cfg.duplicate_rate) {
            self.stats.duplicated += 1;
            self.schedule(seg.clone());
        }
        self.schedule(seg);
    }

    fn receive(&mut self) -> Vec<Segment> {
        std::mem::take(&mut self.visible)
    }

    fn tick(&mut self) {
        self.now = self.now.next();
        let now = self.now;

        let (mut due, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|p| p.at <= now);
        self.pending = rest;

        due.sort_by_key(|p| (p.at, p.id));
        if self.cfg.reorder {
            due.shuffle(&mut self.rng);
        }
        self.stats.delivered += due.len() as u64;
        self.visible.extend(due.into_iter().map(|p| p.seg));
    }
}
