//! Session statistics.

use std::time::Duration;

use contracts::AgentKind;
use controller::TickOutput;
use observability::RecorderMetricsAggregator;
use recorder::WriteReport;

#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub ticks: u64,

    /// Episodes written to disk (complete or partial)
    pub episodes: u64,

    pub duration: Duration,

    pub metrics: RecorderMetricsAggregator,
}

impl SessionStats {
    pub fn record_tick(&mut self, out: &TickOutput) {
        self.ticks += 1;
        self.metrics.record_tick(
            &[
                (AgentKind::TrafficLight, out.traffic_light),
                (AgentKind::SpeedLimitSign, out.speed_limit),
            ],
            out.captured,
        );
        if let Some(report) = &out.completed_write {
            self.record_report(report);
        }
    }

    pub fn record_report(&mut self, report: &WriteReport) {
        self.episodes += 1;
        self.metrics.record_episode(
            report.frames_written,
            report.failed_frames.len(),
            report.elapsed_ms,
        );
    }

    pub fn ticks_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.ticks as f64 / secs
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!();
        println!("Duration: {:.2}s ({:.2} ticks/s)", self.duration.as_secs_f64(), self.ticks_per_second());
        print!("{}", self.metrics.summary());
        println!();
    }
}
