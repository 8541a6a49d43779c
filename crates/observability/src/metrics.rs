//! Recorder / Proximity 指标收集模块
//!
//! 基于 Resolution 与 episode 写入报告收集和统计运行指标。

use std::collections::HashMap;

use contracts::{AgentKind, Resolution};
use metrics::{counter, gauge, histogram};

/// 记录一次邻近解析结果
///
/// 每个 tick、每类 agent 调用一次。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_resolution;
///
/// let resolution = resolver.resolve(AgentKind::TrafficLight, &agents, &pose, &mut memory);
/// record_resolution(AgentKind::TrafficLight, &resolution);
/// ```
pub fn record_resolution(kind: AgentKind, resolution: &Resolution) {
    match resolution.proximity.distance() {
        Some(distance) => {
            histogram!(
                "proximity_resolved_distance",
                "kind" => kind.as_str()
            )
            .record(distance);
            gauge!("proximity_governing_agent", "kind" => kind.as_str()).set(1.0);
        }
        None => {
            gauge!("proximity_governing_agent", "kind" => kind.as_str()).set(0.0);
        }
    }
}

/// 记录空间索引重建
pub fn record_index_rebuild(kind: AgentKind, agent_count: usize) {
    counter!("proximity_index_rebuilds_total", "kind" => kind.as_str()).increment(1);
    gauge!("proximity_indexed_agents", "kind" => kind.as_str()).set(agent_count as f64);
}

/// 记录录制帧
pub fn record_frame_captured(buffered: usize) {
    counter!("recorder_frames_captured_total").increment(1);
    gauge!("recorder_buffered_frames").set(buffered as f64);
}

/// 记录单帧写入失败
pub fn record_frame_write_failure(store: &str) {
    counter!(
        "recorder_frame_write_failures_total",
        "store" => store.to_string()
    )
    .increment(1);
}

/// 记录写入进度 (0-1)
pub fn record_write_progress(fraction: f64) {
    gauge!("recorder_write_progress").set(fraction);
}

/// 记录 episode 写入完成
pub fn record_episode_written(frames_written: usize, failed_frames: usize, duration_ms: f64) {
    let status = if failed_frames == 0 { "complete" } else { "partial" };
    counter!("recorder_episodes_written_total", "status" => status).increment(1);
    counter!("recorder_frames_written_total").increment(frames_written as u64);
    histogram!("recorder_episode_write_ms").record(duration_ms);
}

/// 录制指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RecorderMetricsAggregator {
    /// 总 tick 数
    pub total_ticks: u64,

    /// 录制帧数
    pub frames_captured: u64,

    /// 写入完成的 episode 数
    pub episodes_written: u64,

    /// 部分写入的 episode 数
    pub episodes_partial: u64,

    /// 已写入帧数
    pub frames_written: u64,

    /// 写入失败帧数
    pub frames_failed: u64,

    /// 各类 agent 的解析距离统计
    pub distance_stats: HashMap<AgentKind, RunningStats>,

    /// 各类 agent 存在有效选择的 tick 数
    pub governed_ticks: HashMap<AgentKind, u64>,

    /// episode 写入耗时统计 (毫秒)
    pub write_ms_stats: RunningStats,
}

impl RecorderMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新 tick 统计
    pub fn record_tick(&mut self, resolutions: &[(AgentKind, Resolution)], captured: bool) {
        self.total_ticks += 1;
        if captured {
            self.frames_captured += 1;
        }
        for (kind, resolution) in resolutions {
            if let Some(distance) = resolution.proximity.distance() {
                self.distance_stats.entry(*kind).or_default().push(distance);
                *self.governed_ticks.entry(*kind).or_insert(0) += 1;
            }
        }
    }

    /// 更新 episode 写入统计
    pub fn record_episode(&mut self, frames_written: usize, failed_frames: usize, duration_ms: f64) {
        if failed_frames == 0 {
            self.episodes_written += 1;
        } else {
            self.episodes_partial += 1;
        }
        self.frames_written += frames_written as u64;
        self.frames_failed += failed_frames as u64;
        self.write_ms_stats.push(duration_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let distance = |kind: AgentKind| {
            self.distance_stats
                .get(&kind)
                .map(StatsSummary::from)
                .unwrap_or_default()
        };
        let coverage = |kind: AgentKind| {
            if self.total_ticks > 0 {
                self.governed_ticks.get(&kind).copied().unwrap_or(0) as f64
                    / self.total_ticks as f64
                    * 100.0
            } else {
                0.0
            }
        };

        MetricsSummary {
            total_ticks: self.total_ticks,
            frames_captured: self.frames_captured,
            episodes_written: self.episodes_written,
            episodes_partial: self.episodes_partial,
            frames_written: self.frames_written,
            frames_failed: self.frames_failed,
            traffic_light_coverage: coverage(AgentKind::TrafficLight),
            speed_limit_coverage: coverage(AgentKind::SpeedLimitSign),
            traffic_light_distance: distance(AgentKind::TrafficLight),
            speed_limit_distance: distance(AgentKind::SpeedLimitSign),
            write_ms: StatsSummary::from(&self.write_ms_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_ticks: u64,
    pub frames_captured: u64,
    pub episodes_written: u64,
    pub episodes_partial: u64,
    pub frames_written: u64,
    pub frames_failed: u64,
    /// 有红绿灯生效的 tick 占比 (%)
    pub traffic_light_coverage: f64,
    /// 有限速牌生效的 tick 占比 (%)
    pub speed_limit_coverage: f64,
    pub traffic_light_distance: StatsSummary,
    pub speed_limit_distance: StatsSummary,
    pub write_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Recorder Metrics Summary ===")?;
        writeln!(f, "Total ticks: {}", self.total_ticks)?;
        writeln!(f, "Frames captured: {}", self.frames_captured)?;
        writeln!(
            f,
            "Episodes written: {} (partial: {})",
            self.episodes_written, self.episodes_partial
        )?;
        writeln!(
            f,
            "Frames written: {} (failed: {})",
            self.frames_written, self.frames_failed
        )?;
        writeln!(
            f,
            "Traffic light governed: {:.2}% of ticks, distance {}",
            self.traffic_light_coverage, self.traffic_light_distance
        )?;
        writeln!(
            f,
            "Speed limit governed: {:.2}% of ticks, distance {}",
            self.speed_limit_coverage, self.speed_limit_distance
        )?;
        writeln!(f, "Episode write time (ms): {}", self.write_ms)?;
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

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Agent, Location, ProximityResult, Reading, TrafficLightState};

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_tick_and_episode() {
        let mut aggregator = RecorderMetricsAggregator::new();
        let light = Agent::traffic_light(1, Location::default(), 0.0, TrafficLightState::Red);
        let governed = Resolution::new(
            Reading::TrafficLight(TrafficLightState::Red),
            ProximityResult::at(light, 4.0),
        );
        let clear = Resolution::new(Reading::SpeedLimit(None), ProximityResult::none());

        aggregator.record_tick(
            &[
                (AgentKind::TrafficLight, governed),
                (AgentKind::SpeedLimitSign, clear),
            ],
            true,
        );
        aggregator.record_tick(&[], false);
        aggregator.record_episode(1, 0, 12.0);

        let summary = aggregator.summary();
        assert_eq!(summary.total_ticks, 2);
        assert_eq!(summary.frames_captured, 1);
        assert_eq!(summary.episodes_written, 1);
        assert!((summary.traffic_light_coverage - 50.0).abs() < 1e-10);
        assert_eq!(summary.speed_limit_distance.count, 0);
        assert_eq!(summary.traffic_light_distance.count, 1);
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            total_ticks: 100,
            frames_captured: 60,
            episodes_written: 2,
            episodes_partial: 1,
            frames_written: 58,
            frames_failed: 2,
            traffic_light_coverage: 25.0,
            ..Default::default()
        };

        let output = format!("{}", summary);
        assert!(output.contains("Total ticks: 100"));
        assert!(output.contains("25.00%"));
        assert!(output.contains("partial: 1"));
    }
}
