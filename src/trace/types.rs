use serde::{Deserialize, Serialize};

/// 协议事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEventKind {
    /// 发送数据段（`retrans` 表示超时重传）
    SendData { seq: u64, len: u64, retrans: bool },
    /// 发送累计 ACK
    SendAck { ack: u64 },
    /// 收到数据段（校验通过之后）
    RecvData { seq: u64, len: u64 },
    /// 收到 ACK；`advanced` 表示窗口左沿前移
    RecvAck { ack: u64, advanced: bool },
    /// 在途段超时
    Timeout { seq: u64 },
    /// 分片拼入连续前缀
    Deliver { seq: u64, len: u64 },
    /// 校验失败被丢弃
    DropCorrupt { ack: bool },
    /// 超出接收窗口被丢弃
    DropOutOfWindow { count: u64 },
}

/// 一条可回放的事件（JSON）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub tick: u64,
    pub endpoint: String,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

/// 内存事件收集器，运行结束后整体写成 JSON
#[derive(Debug, Default)]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, ev: TraceEvent) {
        self.events.push(ev);
    }

    pub fn count(&self, pred: impl Fn(&TraceEventKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }
}
