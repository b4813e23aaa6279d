//! Locator 指标收集模块
//!
//! 请求生命周期、配置下发与授权流程的 Prometheus 指标，以及内存中的聚合统计。

use std::collections::BTreeMap;
use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// 记录请求提交
pub fn record_request_submitted(kind: &'static str) {
    counter!("locator_requests_submitted_total", "kind" => kind).increment(1);
}

/// 记录请求结束 (outcome: completed / failed / cancelled ...)
pub fn record_request_finished(kind: &'static str, outcome: &'static str) {
    counter!(
        "locator_requests_finished_total",
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

/// 记录队列深度
pub fn record_queue_depth(kind: &'static str, depth: usize) {
    gauge!("locator_queue_depth", "kind" => kind).set(depth as f64);
}

/// 记录配置下发 (applied = false 表示配置未变化被忽略)
pub fn record_settings_update(applied: bool) {
    let status = if applied { "applied" } else { "ignored" };
    counter!("locator_settings_updates_total", "status" => status).increment(1);
}

/// 记录授权请求
pub fn record_authorization_prompt(mode: &str) {
    counter!(
        "locator_authorization_prompts_total",
        "mode" => mode.to_string()
    )
    .increment(1);
}

/// 记录读数投递
pub fn record_reading_delivered(receivers: usize) {
    counter!("locator_readings_dispatched_total").increment(1);
    histogram!("locator_reading_fanout").record(receivers as f64);
}

/// 记录读数被丢弃 (reason: too_coarse / below_min_distance / stale)
pub fn record_reading_discarded(reason: &'static str) {
    counter!("locator_readings_discarded_total", "reason" => reason).increment(1);
}

/// 记录请求从提交到首个结果的耗时
pub fn record_time_to_result(elapsed: Duration) {
    histogram!("locator_time_to_result_ms").record(elapsed.as_secs_f64() * 1000.0);
}

/// 请求结果聚合器
///
/// 在内存中聚合请求结果，便于 CLI 输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RequestStatsAggregator {
    /// 结果计数 (outcome -> count)
    pub outcomes: BTreeMap<String, u64>,

    /// 首个结果耗时统计 (毫秒)
    pub latency_ms: RunningStats,

    /// 收到的读数总数
    pub readings: u64,
}

impl RequestStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个读数
    pub fn record_reading(&mut self, elapsed: Option<Duration>) {
        self.readings += 1;
        if let Some(elapsed) = elapsed {
            self.latency_ms.push(elapsed.as_secs_f64() * 1000.0);
        }
    }

    /// 记录请求结果
    pub fn record_outcome(&mut self, outcome: &str) {
        *self.outcomes.entry(outcome.to_string()).or_insert(0) += 1;
    }

    /// 生成摘要
    pub fn summary(&self) -> RequestSummary {
        RequestSummary {
            outcomes: self.outcomes.clone(),
            readings: self.readings,
            latency_ms: StatsSummary::from(&self.latency_ms),
        }
    }
}

/// 请求摘要
#[derive(Debug, Clone, Default)]
pub struct RequestSummary {
    pub outcomes: BTreeMap<String, u64>,
    pub readings: u64,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Request Summary ===")?;
        writeln!(f, "Readings received: {}", self.readings)?;
        writeln!(f, "Time to first result (ms): {}", self.latency_ms)?;
        if !self.outcomes.is_empty() {
            writeln!(f, "Outcomes:")?;
            for (outcome, count) in &self.outcomes {
                writeln!(f, "  {}: {}", outcome, count)?;
            }
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
