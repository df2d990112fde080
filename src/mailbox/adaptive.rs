//! Adaptive mailbox capacity.

#[derive(Debug, Clone, Copy)]
pub struct AdaptiveConfig {
    pub initial_capacity: usize,
    pub min_capacity: usize,
    pub max_capacity: usize,
    pub grow_threshold: f64,
    pub shrink_threshold: f64,
    pub growth_factor: f64,
    pub shrink_factor: f64,
    pub min_samples_before_adapt: usize,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1000,
            min_capacity: 100,
            max_capacity: 10_000,
            grow_threshold: 0.8,
            shrink_threshold: 0.2,
            growth_factor: 2.0,
            shrink_factor: 0.5,
            min_samples_before_adapt: 10,
        }
    }
}

/// Tracks fill-ratio samples and decides when/how to resize a mailbox.
/// Disabled by default; callers must opt in.
pub struct AdaptiveCapacity {
    config: AdaptiveConfig,
    enabled: bool,
    samples: Vec<f64>,
}

impl AdaptiveCapacity {
    pub fn new(config: AdaptiveConfig, enabled: bool) -> Self {
        Self {
            config,
            enabled,
            samples: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one fill-ratio sample (`queue_len / capacity`). Returns the
    /// new capacity if this sample triggered an adaptation, clamped to
    /// `[min_capacity, max_capacity]`.
    pub fn record(&mut self, fill_ratio: f64, current_capacity: usize) -> Option<usize> {
        if !self.enabled {
            return None;
        }
        self.samples.push(fill_ratio);
        if self.samples.len() < self.config.min_samples_before_adapt {
            return None;
        }
        let avg: f64 = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        self.samples.clear();

        if avg > self.config.grow_threshold {
            let grown = ((current_capacity as f64) * self.config.growth_factor) as usize;
            let new_capacity = grown.min(self.config.max_capacity);
            if new_capacity > current_capacity {
                return Some(new_capacity);
            }
        } else if avg < self.config.shrink_threshold {
            let shrunk = ((current_capacity as f64) * self.config.shrink_factor) as usize;
            let new_capacity = shrunk.max(self.config.min_capacity);
            if new_capacity < current_capacity {
                return Some(new_capacity);
            }
        }
        None
    }
}
