//! 仿真核心模块
//!
//! 逻辑时间与 tick 驱动循环。

// 子模块声明
mod driver;
mod time;

// 重新导出公共接口
pub use driver::{Driver, RunOutcome};
pub use time::Tick;
