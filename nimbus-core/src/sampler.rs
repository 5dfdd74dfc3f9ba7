//! Synthetic utilization metrics for simulated instances.
//!
//! Live samples use a tighter band than historical backfill so freshly
//! polled values look steadier than the long-tail history behind them. The
//! random source is seedable so tests can pin the stream.

use chrono::{Duration, Utc};
use nimbus_common::MetricSample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::Mutex;
use uuid::Uuid;

const LIVE_CPU_PERCENT: RangeInclusive<f64> = 10.0..=70.0;
const HISTORY_CPU_PERCENT: RangeInclusive<f64> = 5.0..=85.0;
const MEMORY_PERCENT: RangeInclusive<f64> = 20.0..=80.0;
const NETWORK_IN_BPS: RangeInclusive<f64> = 0.0..=8_000_000.0;
const NETWORK_OUT_BPS: RangeInclusive<f64> = 0.0..=2_000_000.0;

pub struct MetricSampler {
    rng: Mutex<StdRng>,
}

impl MetricSampler {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sampler for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// One live reading for the instance, stamped now.
    pub fn sample(&self, instance_id: &str) -> MetricSample {
        self.sample_at(instance_id, Utc::now(), &LIVE_CPU_PERCENT)
    }

    /// `count` historical readings ending now, spaced `interval_minutes`
    /// apart, newest first.
    pub fn sample_history(
        &self,
        instance_id: &str,
        count: u32,
        interval_minutes: i64,
    ) -> Vec<MetricSample> {
        let now = Utc::now();
        (0..count)
            .map(|step| {
                let at = now - Duration::minutes(interval_minutes * i64::from(step));
                self.sample_at(instance_id, at, &HISTORY_CPU_PERCENT)
            })
            .collect()
    }

    fn sample_at(
        &self,
        instance_id: &str,
        at: chrono::DateTime<Utc>,
        cpu_range: &RangeInclusive<f64>,
    ) -> MetricSample {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        MetricSample {
            id: Uuid::new_v4().to_string(),
            instance_id: instance_id.to_string(),
            timestamp: at,
            cpu_usage_percent: round1(rng.gen_range(cpu_range.clone())),
            memory_usage_percent: round1(rng.gen_range(MEMORY_PERCENT)),
            network_in_rate: round1(rng.gen_range(NETWORK_IN_BPS)),
            network_out_rate: round1(rng.gen_range(NETWORK_OUT_BPS)),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_samples_stay_inside_documented_bounds() {
        let sampler = MetricSampler::with_seed(7);
        for _ in 0..500 {
            let sample = sampler.sample("inst-1");
            assert!((0.0..=100.0).contains(&sample.cpu_usage_percent));
            assert!((10.0..=70.0).contains(&sample.cpu_usage_percent));
            assert!((0.0..=100.0).contains(&sample.memory_usage_percent));
            assert!(sample.network_in_rate >= 0.0);
            assert!(sample.network_out_rate >= 0.0);
        }
    }

    #[test]
    fn history_is_newest_first_with_strictly_decreasing_timestamps() {
        let sampler = MetricSampler::with_seed(11);
        let history = sampler.sample_history("inst-1", 24, 60);
        assert_eq!(history.len(), 24);
        let now = Utc::now();
        for sample in &history {
            assert!(sample.timestamp <= now);
            assert!((0.0..=100.0).contains(&sample.cpu_usage_percent));
            assert!((0.0..=100.0).contains(&sample.memory_usage_percent));
        }
        for pair in history.windows(2) {
            assert!(pair[0].timestamp > pair[1].timestamp);
        }
    }

    #[test]
    fn seeded_samplers_produce_identical_streams() {
        let a = MetricSampler::with_seed(99);
        let b = MetricSampler::with_seed(99);
        let sa = a.sample("inst-1");
        let sb = b.sample("inst-1");
        assert_eq!(sa.cpu_usage_percent, sb.cpu_usage_percent);
        assert_eq!(sa.memory_usage_percent, sb.memory_usage_percent);
        assert_eq!(sa.network_in_rate, sb.network_in_rate);
    }
}
