use crate::core::SentimentError;
use candle_core::{DType, Tensor};
use candle_nn::ops::softmax_last_dim;
use serde::{Deserialize, Serialize};

/// Number of ordinal classes the model distinguishes, from very negative (0)
/// to very positive (4).
pub const NUM_CLASSES: usize = 5;

/// Coarse three-way sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "POS")]
    Positive,
    #[serde(rename = "NEG")]
    Negative,
    #[serde(rename = "NEU")]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "POS",
            Sentiment::Negative => "NEG",
            Sentiment::Neutral => "NEU",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps each ordinal class index to its coarse label.
pub const CLASS_MAP: [Sentiment; NUM_CLASSES] = [
    Sentiment::Negative,
    Sentiment::Negative,
    Sentiment::Neutral,
    Sentiment::Positive,
    Sentiment::Positive,
];

/// Softmax distribution over the five ordinal classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities([f32; NUM_CLASSES]);

impl ClassProbabilities {
    /// Normalize raw logits. Accepts `(NUM_CLASSES,)` or `(1, NUM_CLASSES)`.
    pub fn from_logits(logits: &Tensor) -> Result<Self, SentimentError> {
        let logits = logits.flatten_all()?.to_dtype(DType::F32)?;
        let found = logits.elem_count();
        if found != NUM_CLASSES {
            return Err(SentimentError::UnexpectedClassCount {
                expected: NUM_CLASSES,
                found,
            });
        }

        let probs: Vec<f32> = softmax_last_dim(&logits)?.to_vec1()?;
        let mut out = [0f32; NUM_CLASSES];
        out.copy_from_slice(&probs);
        Ok(Self(out))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied()
    }

    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Index of the most probable class; on ties the lowest index wins.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (index, &p) in self.0.iter().enumerate().skip(1) {
            if p > self.0[best] {
                best = index;
            }
        }
        best
    }

    /// The chosen class, its coarse label, and its own probability.
    pub fn top(&self) -> (usize, Sentiment, f32) {
        let index = self.argmax();
        (index, CLASS_MAP[index], self.0[index])
    }
}

/// Round a probability to four decimal digits.
pub fn round_score(p: f32) -> f64 {
    (f64::from(p) * 10_000.0).round() / 10_000.0
}
