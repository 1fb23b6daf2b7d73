/// Deterministic merging t-digest for approximate percentiles.
///
/// Centroids are merged in sorted order under a size budget, so two
/// runs over the same value stream produce identical digests. Accuracy
/// is tightest at the distribution tails.
#[derive(Debug, Clone)]
pub struct TDigest {
    compression: usize,
    buffer_cap: usize,
    centroids: Vec<Centroid>,
    buffer: Vec<f64>,
    count: u64,
    min: f64,
    max: f64,
}

#[derive(Debug, Clone, Copy)]
struct Centroid {
    mean: f64,
    weight: f64,
}

impl Default for TDigest {
    fn default() -> Self {
        TDigest::new(100)
    }
}

impl TDigest {
    pub fn new(compression: usize) -> Self {
        TDigest {
            compression: compression.max(20),
            buffer_cap: compression.max(20) * 5,
            centroids: Vec::new(),
            buffer: Vec::new(),
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.buffer.push(value);
        if self.buffer.len() >= self.buffer_cap {
            self.flush();
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let mut incoming: Vec<Centroid> = std::mem::take(&mut self.buffer)
            .into_iter()
            .map(|mean| Centroid { mean, weight: 1.0 })
            .collect();
        incoming.extend(self.centroids.drain(..));
        incoming.sort_by(|a, b| a.mean.total_cmp(&b.mean));

        let total: f64 = incoming.iter().map(|c| c.weight).sum();
        let limit = total / self.compression as f64;
        let mut merged: Vec<Centroid> = Vec::with_capacity(self.compression + 1);
        for centroid in incoming {
            match merged.last_mut() {
                Some(last) if last.weight + centroid.weight <= limit.max(1.0) => {
                    let weight = last.weight + centroid.weight;
                    last.mean = (last.mean * last.weight + centroid.mean * centroid.weight) / weight;
                    last.weight = weight;
                }
                _ => merged.push(centroid),
            }
        }
        self.centroids = merged;
    }

    /// Estimate the `q`-quantile, `q` in `[0, 1]`.
    pub fn quantile(&mut self, q: f64) -> Option<f64> {
        self.flush();
        if self.count == 0 {
            return None;
        }
        if self.centroids.len() == 1 {
            return Some(self.centroids[0].mean);
        }
        let q = q.clamp(0.0, 1.0);
        let target = q * self.count as f64;

        let mut cumulative = 0.0;
        for (idx, centroid) in self.centroids.iter().enumerate() {
            let next = cumulative + centroid.weight;
            if target <= next {
                // Interpolate within this centroid toward its neighbors.
                let lower = if idx == 0 {
                    self.min
                } else {
                    (self.centroids[idx - 1].mean + centroid.mean) / 2.0
                };
                let upper = if idx == self.centroids.len() - 1 {
                    self.max
                } else {
                    (centroid.mean + self.centroids[idx + 1].mean) / 2.0
                };
                let fraction = if centroid.weight > 0.0 {
                    (target - cumulative) / centroid.weight
                } else {
                    0.5
                };
                return Some(lower + (upper - lower) * fraction);
            }
            cumulative = next;
        }
        Some(self.max)
    }

    /// Percentile on the 0–100 scale.
    pub fn percentile(&mut self, p: f64) -> Option<f64> {
        self.quantile(p / 100.0)
    }
}
