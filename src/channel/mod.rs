//! 不可靠信道
//!
//! RDT 层只通过 [`UnreliableChannel`] 与下层交互；具体丢包/乱序/损坏模型
//! 由实现决定。[`LossyChannel`] 是一个带种子的故障注入实现，用于仿真与测试。

mod lossy;

pub use lossy::{ChannelConfig, ChannelStats, LossyChannel};

use std::cell::RefCell;
use std::rc::Rc;

use crate::rdt::Segment;

/// 单向不可靠信道
pub trait UnreliableChannel: std::fmt::Debug {
    /// 交给信道发送；本层不会失败（可能被信道悄悄丢弃）
    fn send(&mut self, seg: Segment);
    /// 取走自上次调用以来对端可见的全部段，顺序由信道决定
    fn receive(&mut self) -> Vec<Segment>;
    /// 推进信道自身的逻辑时间一个 tick
    fn tick(&mut self);
}

/// 两个 RDT 层共享同一条信道（一端写、一端读）
pub type SharedChannel = Rc<RefCell<dyn UnreliableChannel>>;

/// 包装成共享句柄；返回具体类型以便驱动方读取统计，需要时再转为 [`SharedChannel`]
pub fn shared<C: UnreliableChannel + 'static>(channel: C) -> Rc<RefCell<C>> {
    Rc::new(RefCell::new(channel))
}
