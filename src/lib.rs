//! A sentiment classification service powered by Candle.
//!
//! A pretrained five-class DistilBERT sentiment model is loaded once from the
//! Hugging Face Hub; each request is tokenized, classified, and collapsed
//! into a three-way `POS`/`NEU`/`NEG` label with the winning class's
//! probability as its score.

pub mod config;
pub mod core;
pub mod loaders;
pub mod models;
pub mod pipelines;
pub mod server;

pub use crate::core::SentimentError;
pub use pipelines::sentiment_analysis_pipeline::{
    ClassificationResponse, Sentiment, SentimentAnalysisPipeline, SentimentAnalysisPipelineBuilder,
};
