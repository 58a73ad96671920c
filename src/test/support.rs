use std::collections::{HashMap, HashSet};

use crate::channel::UnreliableChannel;
use crate::rdt::Segment;

/// Deterministic channel for scenario tests: one tick of latency, plus
/// per-seq "drop the first copy" and "delay the first copy" rules.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    drop_once: HashSet<u64>,
    delay_once: HashMap<u64, u64>,
    in_transit: Vec<(u64, Segment)>,
    visible: Vec<Segment>,
    pub sent: Vec<Segment>,
    pub dropped: Vec<Segment>,
}

impl ScriptedChannel {
    pub fn drop_first(mut self, seq: u64) -> Self {
        self.drop_once.insert(seq);
        self
    }

    pub fn delay_first(mut self, seq: u64, extra_ticks: u64) -> Self {
        self.delay_once.insert(seq, extra_ticks);
        self
    }
}

impl UnreliableChannel for ScriptedChannel {
    fn send(&mut self, seg: Segment) {
        self.sent.push(seg.clone());
        let mut extra = 0;
        if let Some(seq) = seg.seq() {
            if self.drop_once.remove(&seq) {
                self.dropped.push(seg);
                return;
            }
            extra = self.delay_once.remove(&seq).unwrap_or(0);
        }
        self.in_transit.push((1 + extra, seg));
    }

    fn receive(&mut self) -> Vec<Segment> {
        std::mem::take(&mut self.visible)
    }

    fn tick(&mut self) {
        let mut still = Vec::new();
        for (left, seg) in std::mem::take(&mut self.in_transit) {
            if left <= 1 {
                self.visible.push(seg);
            } else {
                still.push((left - 1, seg));
            }
        }
        self.in_transit = still;
    }
}
