//! 驱动循环
//!
//! 持有一对 RDT 层（client / server）与两条单向信道，每个 tick：
//! client 处理 → server 处理 → 两条信道各推进一个 tick。

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, info};

use super::time::Tick;
use crate::channel::{ChannelConfig, ChannelStats, LossyChannel, SharedChannel, UnreliableChannel};
use crate::rdt::{RdtConfig, RdtLayer, Result};
use crate::trace::TraceLog;

/// 一次运行的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub ticks: u64,
    pub completed: bool,
    pub client_timeouts: u64,
    pub server_timeouts: u64,
}

pub struct Driver<C: UnreliableChannel + 'static = LossyChannel> {
    pub client: RdtLayer,
    pub server: RdtLayer,
    client_to_server: Rc<RefCell<C>>,
    server_to_client: Rc<RefCell<C>>,
    now: Tick,
}

impl Driver<LossyChannel> {
    /// 两个方向使用同一套故障参数；反向信道的种子加一以免两边命运完全相同
    pub fn new(cfg: RdtConfig, channel: ChannelConfig) -> Result<Self> {
        let reverse = ChannelConfig {
            seed: channel.seed.wrapping_add(1),
            ..channel.clone()
        };
        Ok(Self::with_channels(
            RdtLayer::new(cfg.clone())?.named("client"),
            RdtLayer::new(cfg)?.named("server"),
            LossyChannel::new(channel)?,
            LossyChannel::new(reverse)?,
        ))
    }

    /// (client→server, server→client)
    pub fn channel_stats(&self) -> (ChannelStats, ChannelStats) {
        (
            self.client_to_server.borrow().stats.clone(),
            self.server_to_client.borrow().stats.clone(),
        )
    }
}

impl<C: UnreliableChannel + 'static> Driver<C> {
    pub fn with_channels(mut client: RdtLayer, mut server: RdtLayer, c2s: C, s2c: C) -> Self {
        let c2s = Rc::new(RefCell::new(c2s));
        let s2c = Rc::new(RefCell::new(s2c));
        let c2s_dyn: SharedChannel = c2s.clone();
        let s2c_dyn: SharedChannel = s2c.clone();

        client.set_send_channel(c2s_dyn.clone());
        client.set_receive_channel(s2c_dyn.clone());
        server.set_send_channel(s2c_dyn);
        server.set_receive_channel(c2s_dyn);

        Self {
            client,
            server,
            client_to_server: c2s,
            server_to_client: s2c,
            now: Tick::ZERO,
        }
    }

    pub fn set_client_data(&mut self, data: &str) {
        self.client.set_data_to_send(data);
    }

    pub fn set_server_data(&mut self, data: &str) {
        self.server.set_data_to_send(data);
    }

    /// 两端都开始记录协议事件
    pub fn enable_trace(&mut self) {
        self.client.trace = Some(TraceLog::default());
        self.server.trace = Some(TraceLog::default());
    }

    pub fn client_to_server(&self) -> Ref<'_, C> {
        self.client_to_server.borrow()
    }

    pub fn server_to_client(&self) -> Ref<'_, C> {
        self.server_to_client.borrow()
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    /// 两个方向的数据都已完整、按序到达。
    ///
    /// 以各端发送方当前装载的数据为准，因此直接调用 `client.set_data_to_send` 也成立。
    pub fn is_complete(&self) -> bool {
        fn delivered(to: &RdtLayer, from: &RdtLayer) -> bool {
            to.data_received().chars().eq(from.sender().loaded().iter().copied())
        }
        delivered(&self.server, &self.client) && delivered(&self.client, &self.server)
    }

    /// 执行一个 tick
    pub fn step(&mut self) -> Result<()> {
        self.client.process_data()?;
        self.server.process_data()?;
        self.client_to_server.borrow_mut().tick();
        self.server_to_client.borrow_mut().tick();
        self.now = self.now.next();
        debug!(
            tick = self.now.0,
            server_received = self.server.data_received().chars().count(),
            client_received = self.client.data_received().chars().count(),
            "tick 完成"
        );
        Ok(())
    }

    /// 运行到传输完成或达到 `max_ticks`。
    #[tracing::instrument(skip(self))]
    pub fn run_until(&mut self, max_ticks: u64) -> Result<RunOutcome> {
        info!("▶️  开始传输");
        while self.now.0 < max_ticks && !self.is_complete() {
            self.step()?;
        }

        let outcome = RunOutcome {
            ticks: self.now.0,
            completed: self.is_complete(),
            client_timeouts: self.client.count_segment_timeouts(),
            server_timeouts: self.server.count_segment_timeouts(),
        };
        info!(
            ticks = outcome.ticks,
            completed = outcome.completed,
            client_timeouts = outcome.client_timeouts,
            server_timeouts = outcome.server_timeouts,
            "传输结束"
        );
        Ok(outcome)
    }
}
