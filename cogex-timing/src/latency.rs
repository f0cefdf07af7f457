use serde::Serialize;

/// Summary of presentation latencies (actual minus nominal onset, in ms)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: usize,
    pub mean_ms: f64,
    /// Population standard deviation
    pub jitter_ms: f64,
    pub min_ms: i64,
    pub max_ms: i64,
}

impl LatencyStats {
    pub fn from_samples(samples: &[i64]) -> Self {
        if samples.is_empty() {
            return LatencyStats {
                count: 0,
                mean_ms: 0.0,
                jitter_ms: 0.0,
                min_ms: 0,
                max_ms: 0,
            };
        }
        let n = samples.len() as f64;
        let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;
        let var = samples
            .iter()
            .map(|&s| (s as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        LatencyStats {
            count: samples.len(),
            mean_ms: mean,
            jitter_ms: var.sqrt(),
            min_ms: samples.iter().copied().min().unwrap_or_default(),
            max_ms: samples.iter().copied().max().unwrap_or_default(),
        }
    }
}
