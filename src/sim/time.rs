//! 逻辑时间类型
//!
//! RDT 不使用墙钟：每调用一次 `process_data` 即前进一个 tick。

/// 逻辑时间（tick 数）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// 下一个 tick
    pub fn next(self) -> Tick {
        Tick(self.0.saturating_add(1))
    }

    /// 从 `earlier` 到 `self` 经过的 tick 数（不会下溢）
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn after(self, ticks: u64) -> Tick {
        Tick(self.0.saturating_add(ticks))
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}
