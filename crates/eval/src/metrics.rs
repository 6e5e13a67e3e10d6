//! Smoothed timing meters for progress lines.

use std::collections::VecDeque;
use std::fmt;

pub const DEFAULT_WINDOW: usize = 20;

/// Sliding window of recent values plus running totals over the whole series.
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    window: VecDeque<f64>,
    capacity: usize,
    total: f64,
    count: usize,
}

impl Default for SmoothedValue {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl SmoothedValue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            total: 0.0,
            count: 0,
        }
    }

    pub fn update(&mut self, value: f64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(value);
        self.total += value;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Lower median of the window.
    pub fn median(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let mut values: Vec<f64> = self.window.iter().copied().collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values[(values.len() - 1) / 2]
    }

    pub fn avg(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    pub fn global_avg(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total / self.count as f64
    }
}

/// Named meters rendered as `name: median (global_avg)`.
#[derive(Debug, Clone)]
pub struct MetricLogger {
    meters: Vec<(String, SmoothedValue)>,
    delimiter: String,
}

impl Default for MetricLogger {
    fn default() -> Self {
        Self::new("  ")
    }
}

impl MetricLogger {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            meters: Vec::new(),
            delimiter: delimiter.into(),
        }
    }

    pub fn update(&mut self, values: &[(&str, f64)]) {
        for (name, value) in values {
            match self.meters.iter_mut().find(|(n, _)| n == name) {
                Some((_, meter)) => meter.update(*value),
                None => {
                    let mut meter = SmoothedValue::default();
                    meter.update(*value);
                    self.meters.push((name.to_string(), meter));
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&SmoothedValue> {
        self.meters.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }
}

impl fmt::Display for MetricLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, meter)) in self.meters.iter().enumerate() {
            if i > 0 {
                f.write_str(&self.delimiter)?;
            }
            write!(f, "{name}: {:.4} ({:.4})", meter.median(), meter.global_avg())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_drops_oldest_but_totals_keep_everything() {
        let mut v = SmoothedValue::new(3);
        for x in [10.0, 1.0, 2.0, 3.0] {
            v.update(x);
        }
        assert_eq!(v.count(), 4);
        assert_eq!(v.median(), 2.0);
        assert_eq!(v.avg(), 2.0);
        assert_eq!(v.global_avg(), 4.0);
    }

    #[test]
    fn median_of_even_window_is_lower_middle() {
        let mut v = SmoothedValue::new(4);
        for x in [4.0, 1.0, 3.0, 2.0] {
            v.update(x);
        }
        assert_eq!(v.median(), 2.0);
    }

    #[test]
    fn display_keeps_first_seen_order() {
        let mut log = MetricLogger::default();
        log.update(&[("time", 0.5), ("data", 0.25)]);
        log.update(&[("time", 1.5), ("data", 0.25)]);
        assert_eq!(
            log.to_string(),
            "time: 0.5000 (1.0000)  data: 0.2500 (0.2500)"
        );
    }
}
