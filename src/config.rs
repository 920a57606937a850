//! Command-line and environment configuration for `sentiment-server`.

use crate::pipelines::sentiment_analysis_pipeline::{
    SentimentModelSource, DEFAULT_MAX_LENGTH, DEFAULT_SENTIMENT_MODEL,
};
use crate::pipelines::utils::DeviceRequest;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Sentiment classification HTTP server
#[derive(Parser, Debug, Clone)]
#[command(name = "sentiment-server")]
#[command(about = "Serves POST /sentiment backed by a pretrained five-class sentiment model")]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "SENTIMENT_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8000", env = "SENTIMENT_PORT")]
    pub port: u16,

    /// Hugging Face Hub repository of the classifier
    #[arg(long, default_value = DEFAULT_SENTIMENT_MODEL, env = "SENTIMENT_MODEL_ID")]
    pub model_id: String,

    /// Git revision (branch, tag or commit) of the model repository
    #[arg(long, default_value = "main", env = "SENTIMENT_REVISION")]
    pub revision: String,

    /// Run on CPU even when CUDA is available
    #[arg(long, env = "SENTIMENT_CPU", conflicts_with = "cuda_device")]
    pub cpu: bool,

    /// CUDA device index to run on
    #[arg(long, env = "SENTIMENT_CUDA_DEVICE")]
    pub cuda_device: Option<usize>,

    /// Maximum number of tokens per input; longer inputs are truncated
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH, env = "SENTIMENT_MAX_LENGTH")]
    pub max_length: usize,

    /// Per-request inference timeout in milliseconds (unbounded when unset)
    #[arg(long, env = "SENTIMENT_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Local tokenizer.json to use instead of the hub copy
    #[arg(long)]
    pub tokenizer_file: Option<PathBuf>,

    /// Local config.json to use instead of the hub copy
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Local weights (.safetensors or .bin) to use instead of the hub copy
    #[arg(long)]
    pub weights_file: Option<PathBuf>,
}

impl ServerConfig {
    /// `host:port`, resolved when the listener binds.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn model_source(&self) -> SentimentModelSource {
        SentimentModelSource {
            model_id: self.model_id.clone(),
            revision: self.revision.clone(),
            tokenizer_file: self.tokenizer_file.clone(),
            config_file: self.config_file.clone(),
            weights_file: self.weights_file.clone(),
        }
    }

    pub fn device_request(&self) -> DeviceRequest {
        match (self.cpu, self.cuda_device) {
            (true, _) => DeviceRequest::Cpu,
            (false, Some(index)) => DeviceRequest::Cuda(index),
            (false, None) => DeviceRequest::Auto,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
