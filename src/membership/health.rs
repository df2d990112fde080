//! Silo health scoring.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

use crate::util::SiloId;

/// A single (cpu%, mem%, latencyMs) health sample.
#[derive(Debug, Clone, Copy)]
pub struct HealthSample {
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub latency_ms: f64,
    pub observed_at: DateTime<Utc>,
}

/// Weights used to aggregate a sample into a single score. Higher weight
/// means the dimension contributes more to badness (lower health score).
#[derive(Debug, Clone, Copy)]
pub struct HealthWeights {
    pub cpu: f64,
    pub mem: f64,
    pub latency: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            cpu: 0.4,
            mem: 0.3,
            latency: 0.3,
        }
    }
}

impl HealthSample {
    /// Weighted badness score in `[0, 1]`; 0 is perfectly healthy.
    /// `latency_ms` is normalized against a 1s ceiling.
    pub fn score(&self, weights: HealthWeights) -> f64 {
        let latency_component = (self.latency_ms / 1000.0).min(1.0);
        let cpu_component = (self.cpu_percent / 100.0).min(1.0);
        let mem_component = (self.mem_percent / 100.0).min(1.0);
        (weights.cpu * cpu_component + weights.mem * mem_component + weights.latency * latency_component)
            .clamp(0.0, 1.0)
    }
}

/// Per-silo bounded history of health samples, trimmed to the N most
/// recent points.
pub struct HealthMonitor {
    max_history: usize,
    weights: HealthWeights,
    histories: HashMap<SiloId, VecDeque<HealthSample>>,
}

impl HealthMonitor {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            weights: HealthWeights::default(),
            histories: HashMap::new(),
        }
    }

    pub fn record(&mut self, silo_id: SiloId, sample: HealthSample) {
        let history = self.histories.entry(silo_id).or_default();
        history.push_back(sample);
        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    /// Average badness score over the retained history, or `None` if no
    /// samples have been recorded yet.
    pub fn score(&self, silo_id: SiloId) -> Option<f64> {
        let history = self.histories.get(&silo_id)?;
        if history.is_empty() {
            return None;
        }
        let sum: f64 = history.iter().map(|s| s.score(self.weights)).sum();
        Some(sum / history.len() as f64)
    }

    pub fn forget(&mut self, silo_id: SiloId) {
        self.histories.remove(&silo_id);
    }

    pub fn history_len(&self, silo_id: SiloId) -> usize {
        self.histories.get(&silo_id).map(|h| h.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cpu: f64) -> HealthSample {
        HealthSample {
            cpu_percent: cpu,
            mem_percent: cpu,
            latency_ms: cpu,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn history_trims_to_max() {
        let mut monitor = HealthMonitor::new(3);
        let silo = SiloId::new();
        for i in 0..10 {
            monitor.record(silo, sample(i as f64));
        }
        assert_eq!(monitor.history_len(silo), 3);
    }

    #[test]
    fn score_is_none_without_samples() {
        let monitor = HealthMonitor::new(3);
        assert_eq!(monitor.score(SiloId::new()), None);
    }

    #[test]
    fn higher_load_raises_score() {
        let mut monitor = HealthMonitor::new(5);
        let healthy = SiloId::new();
        let loaded = SiloId::new();
        monitor.record(healthy, sample(5.0));
        monitor.record(loaded, sample(95.0));
        assert!(monitor.score(loaded).unwrap() > monitor.score(healthy).unwrap());
    }
}
