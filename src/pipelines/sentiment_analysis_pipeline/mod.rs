//! Sentiment analysis pipeline.
//!
//! Runs a five-class ordinal sentiment classifier (very negative ... very
//! positive) and collapses its prediction into a coarse [`Sentiment`]:
//! classes 0-1 are `NEG`, 2 is `NEU`, 3-4 are `POS`. The reported score is the
//! probability of the single ordinal class that won, not the combined mass
//! of its coarse label.
//!
//! ## Main Types
//!
//! - [`SentimentAnalysisPipeline`] - tokenize, classify, map to a coarse label
//! - [`SentimentAnalysisPipelineBuilder`] - model and device configuration
//! - [`SentimentAnalysisModel`] - trait for classifier implementations
//! - [`ClassProbabilities`] - the five-class softmax distribution
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sentiment_service::pipelines::sentiment_analysis_pipeline::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let pipeline = SentimentAnalysisPipelineBuilder::multilingual().build().await?;
//!
//! let result = pipeline.classify("I love this product!")?;
//! println!("{} ({:.4})", result.sentiment, result.score);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod classes;
pub mod model;
pub mod pipeline;

pub use builder::SentimentAnalysisPipelineBuilder;
pub use classes::{round_score, ClassProbabilities, Sentiment, CLASS_MAP, NUM_CLASSES};
pub use model::SentimentAnalysisModel;
pub use pipeline::{ClassificationResponse, SentimentAnalysisPipeline, DEFAULT_MAX_LENGTH};

pub use crate::models::implementations::sentiment_distilbert::{
    SentimentDistilBertModel, SentimentModelSource, DEFAULT_SENTIMENT_MODEL,
};
pub use crate::pipelines::utils::DeviceRequest;
