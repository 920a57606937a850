use thiserror::Error;

/// Error returned when a single classification request fails.
///
/// Load-time failures are reported through `anyhow` by the builders; this type
/// only covers what can go wrong after the model is up and serving.
#[derive(Debug, Error)]
pub enum SentimentError {
    /// The tokenizer rejected the input text.
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    /// A tensor operation failed during the forward pass or post-processing.
    #[error("inference failed: {0}")]
    Inference(#[from] candle_core::Error),

    /// The model head produced a different number of classes than the
    /// five-step sentiment scale expects.
    #[error("expected {expected} class scores, model produced {found}")]
    UnexpectedClassCount { expected: usize, found: usize },
}
