use serde::{Deserialize, Serialize};

use openmemory_core::models::{ClassifierHead, Sector};

/// A (content, sector) pair used to fit the per-user head.
#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub mean_vec: Vec<f32>,
    pub sector: Sector,
}

/// Per-user multinomial logistic regression over the memory's mean
/// sector vector. Trained incrementally with SGD (`spec.md` §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticHead {
    pub dim: usize,
    /// One weight row per sector, in `Sector::ALL` order.
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub version: u64,
    pub learning_rate: f64,
}

impl LogisticHead {
    pub fn new(dim: usize, learning_rate: f64) -> Self {
        Self {
            dim,
            weights: vec![vec![0.0; dim]; Sector::ALL.len()],
            bias: vec![0.0; Sector::ALL.len()],
            version: 0,
            learning_rate,
        }
    }

    fn logits(&self, vec: &[f32]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(self.bias.iter())
            .map(|(w, b)| {
                let dot: f64 = w
                    .iter()
                    .zip(vec.iter())
                    .map(|(a, b)| *a as f64 * *b as f64)
                    .sum();
                dot + *b as f64
            })
            .collect()
    }

    fn softmax(logits: &[f64]) -> Vec<f64> {
        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        if sum == 0.0 {
            return vec![1.0 / logits.len() as f64; logits.len()];
        }
        exps.into_iter().map(|e| e / sum).collect()
    }

    /// argmax over `weights . vec + bias`, softmax-normalised into a
    /// confidence.
    pub fn predict(&self, vec: &[f32]) -> (Sector, f64) {
        let probs = Self::softmax(&self.logits(vec));
        let (idx, &p) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        (Sector::ALL[idx], p)
    }

    /// One SGD epoch pass over `examples`, incrementing `version` once.
    pub fn train_epoch(&mut self, examples: &[TrainingExample]) {
        for ex in examples {
            let probs = Self::softmax(&self.logits(&ex.mean_vec));
            let target_idx = Sector::ALL.iter().position(|s| *s == ex.sector).unwrap();
            for (k, w_row) in self.weights.iter_mut().enumerate() {
                let target = if k == target_idx { 1.0 } else { 0.0 };
                let error = probs[k] - target;
                for (w, x) in w_row.iter_mut().zip(ex.mean_vec.iter()) {
                    *w -= (self.learning_rate * error * *x as f64) as f32;
                }
                self.bias[k] -= (self.learning_rate * error) as f32;
            }
        }
        self.version += 1;
    }

    pub fn train(&mut self, examples: &[TrainingExample], epochs: u32) {
        for _ in 0..epochs {
            self.train_epoch(examples);
        }
    }
}

impl From<&LogisticHead> for ClassifierHead {
    fn from(h: &LogisticHead) -> Self {
        Self {
            dim: h.dim,
            weights: h.weights.clone(),
            bias: h.bias.clone(),
            version: h.version,
            learning_rate: h.learning_rate,
        }
    }
}

impl From<&ClassifierHead> for LogisticHead {
    fn from(h: &ClassifierHead) -> Self {
        Self {
            dim: h.dim,
            weights: h.weights.clone(),
            bias: h.bias.clone(),
            version: h.version,
            learning_rate: h.learning_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicts_after_training() {
        let mut head = LogisticHead::new(2, 0.5);
        let examples = vec![
            TrainingExample { mean_vec: vec![1.0, 0.0], sector: Sector::Episodic },
            TrainingExample { mean_vec: vec![0.0, 1.0], sector: Sector::Procedural },
        ];
        head.train(&examples, 200);
        let (sector, confidence) = head.predict(&[1.0, 0.0]);
        assert_eq!(sector, Sector::Episodic);
        assert!(confidence > 0.5);
        assert_eq!(head.version, 200);
    }
}
