//! RDT 传输实验
//!
//! client 通过一对不可靠信道把字符串发给 server（可选反向同时发送），
//! 运行到两端都按序收齐或达到 tick 上限。

use clap::{Parser, ValueEnum};
use rdt_sim::channel::ChannelConfig;
use rdt_sim::rdt::{AckPolicy, RdtConfig, Result};
use rdt_sim::sim::Driver;
use rdt_sim::trace::TraceEvent;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

const DEFAULT_DATA: &str = "The quick brown fox jumped over the lazy dog while the reliable \
data transfer layer kept every character in order, despite loss, delay and corruption.";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AckPolicyArg {
    EveryTick,
    OnData,
}

impl From<AckPolicyArg> for AckPolicy {
    fn from(v: AckPolicyArg) -> Self {
        match v {
            AckPolicyArg::EveryTick => AckPolicy::EveryTick,
            AckPolicyArg::OnData => AckPolicy::OnData,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "rdt-sim", about = "不可靠信道上的可靠数据传输仿真（client -> server）")]
struct Args {
    /// 配置文件（JSON：{"rdt": {...}, "channel": {...}}）；命令行参数优先
    #[arg(long)]
    config: Option<PathBuf>,

    /// 要发送的字符串
    #[arg(long, conflicts_with = "data_file")]
    data: Option<String>,

    /// 从文件读取要发送的字符串
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// server 反向发送的字符串（默认不发送）
    #[arg(long)]
    reverse_data: Option<String>,

    /// 每段最大载荷（字符）
    #[arg(long)]
    data_length: Option<usize>,

    /// 流量控制窗口（字符）
    #[arg(long)]
    window: Option<usize>,

    /// 超时阈值（tick）
    #[arg(long)]
    timeout_ticks: Option<u64>,

    #[arg(long, value_enum)]
    ack_policy: Option<AckPolicyArg>,

    /// 接收缓冲容量（字符）
    #[arg(long)]
    recv_window: Option<usize>,

    /// 丢包概率
    #[arg(long)]
    loss: Option<f64>,

    /// 额外延迟概率
    #[arg(long)]
    delay: Option<f64>,

    /// 额外延迟上限（tick）
    #[arg(long)]
    max_delay_ticks: Option<u64>,

    /// 同一 tick 到达的段随机乱序
    #[arg(long, default_value_t = false)]
    reorder: bool,

    /// 复制概率
    #[arg(long)]
    duplicate: Option<f64>,

    /// 损坏概率
    #[arg(long)]
    corrupt: Option<f64>,

    /// 不校验 checksum（损坏段会被当作正常数据接收）
    #[arg(long, default_value_t = false)]
    no_checksum: bool,

    /// 信道随机种子
    #[arg(long)]
    seed: Option<u64>,

    /// 最多运行多少个 tick
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u64,

    /// 输出协议事件 JSON；不填则不记录
    #[arg(long)]
    trace_json: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RunConfig {
    rdt: RdtConfig,
    channel: ChannelConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}

/// 运行一次传输并打印汇总；返回是否传输完成
fn run(args: &Args) -> Result<bool> {
    let RunConfig { mut rdt, mut channel } = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        }
        None => RunConfig::default(),
    };

    if let Some(v) = args.data_length {
        rdt.data_length = v;
    }
    if let Some(v) = args.window {
        rdt.flow_control_win_size = v;
    }
    if let Some(v) = args.timeout_ticks {
        rdt.timeout_ticks = v;
    }
    if let Some(v) = args.ack_policy {
        rdt.ack_policy = v.into();
    }
    if args.recv_window.is_some() {
        rdt.recv_window = args.recv_window;
    }
    if args.no_checksum {
        rdt.verify_checksum = false;
    }
    if let Some(v) = args.loss {
        channel.loss_rate = v;
    }
    if let Some(v) = args.delay {
        channel.delay_rate = v;
    }
    if let Some(v) = args.max_delay_ticks {
        channel.max_delay_ticks = v;
    }
    if args.reorder {
        channel.reorder = true;
    }
    if let Some(v) = args.duplicate {
        channel.duplicate_rate = v;
    }
    if let Some(v) = args.corrupt {
        channel.corrupt_rate = v;
    }
    if let Some(v) = args.seed {
        channel.seed = v;
    }

    let data = match (&args.data, &args.data_file) {
        (Some(s), _) => s.clone(),
        (None, Some(path)) => fs::read_to_string(path)?,
        (None, None) => DEFAULT_DATA.to_string(),
    };

    let mut driver = Driver::new(rdt, channel)?;
    driver.set_client_data(&data);
    if let Some(rev) = &args.reverse_data {
        driver.set_server_data(rev);
    }
    if args.trace_json.is_some() {
        driver.enable_trace();
    }

    let outcome = driver.run_until(args.max_ticks)?;

    if let Some(path) = &args.trace_json {
        let mut events: Vec<TraceEvent> = Vec::new();
        for layer in [&mut driver.client, &mut driver.server] {
            if let Some(t) = layer.trace.take() {
                events.extend(t.events);
            }
        }
        events.sort_by_key(|e| e.tick);
        fs::write(path, serde_json::to_string_pretty(&events)?)?;
        eprintln!("wrote trace events to {}", path.display());
    }

    let (c2s, s2c) = driver.channel_stats();
    println!(
        "rdt_summary ticks={} completed={} client_timeouts={} server_timeouts={}",
        outcome.ticks, outcome.completed, outcome.client_timeouts, outcome.server_timeouts
    );
    println!("  client: {}", serde_json::to_string(driver.client.stats())?);
    println!("  server: {}", serde_json::to_string(driver.server.stats())?);
    println!(
        "  channel c2s: sent={} dropped={} delayed={} duplicated={} corrupted={} delivered={}",
        c2s.sent, c2s.dropped, c2s.delayed, c2s.duplicated, c2s.corrupted, c2s.delivered
    );
    println!(
        "  channel s2c: sent={} dropped={} delayed={} duplicated={} corrupted={} delivered={}",
        s2c.sent, s2c.dropped, s2c.delayed, s2c.duplicated, s2c.corrupted, s2c.delivered
    );
    println!("received: {}", driver.server.data_received());
    if args.reverse_data.is_some() {
        println!("reverse received: {}", driver.client.data_received());
    }

    Ok(outcome.completed)
}
