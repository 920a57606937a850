//! Five-class sentiment classifier backed by DistilBERT weights from the hub.

use crate::core::ModelOptions;
use crate::loaders::{ModelConfigLoader, TokenizerLoader, WeightsLoader};
use crate::models::distilbert::{Config, DistilBertForSequenceClassification};
use crate::pipelines::sentiment_analysis_pipeline::{SentimentAnalysisModel, NUM_CLASSES};
use crate::pipelines::utils::device_name;
use candle_core::{DType, Device, Tensor};
use std::path::PathBuf;
use std::sync::Arc;
use tokenizers::Tokenizer;

/// Multilingual DistilBERT fine-tuned for five-step sentiment.
pub const DEFAULT_SENTIMENT_MODEL: &str = "tabularisai/multilingual-sentiment-analysis";

/// Where the classifier's config, weights and tokenizer come from.
///
/// Any of the three files can be pointed at a local path, in which case the
/// hub is not contacted for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentModelSource {
    pub model_id: String,
    pub revision: String,
    pub tokenizer_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub weights_file: Option<PathBuf>,
}

impl SentimentModelSource {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Default::default()
        }
    }

    /// Git revision (branch, tag or commit) to download.
    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    pub fn tokenizer_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tokenizer_file = Some(path.into());
        self
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn weights_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.weights_file = Some(path.into());
        self
    }
}

impl Default for SentimentModelSource {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_SENTIMENT_MODEL.to_string(),
            revision: "main".to_string(),
            tokenizer_file: None,
            config_file: None,
            weights_file: None,
        }
    }
}

impl std::fmt::Display for SentimentModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.model_id, self.revision)
    }
}

impl ModelOptions for SentimentModelSource {
    fn cache_key(&self) -> String {
        match (&self.config_file, &self.weights_file) {
            (None, None) => self.to_string(),
            (config, weights) => format!("{self}:{config:?}:{weights:?}"),
        }
    }
}

/// Ordinal class names from `id2label`, indexed by class id.
fn ordinal_labels(config: &Config) -> anyhow::Result<Vec<String>> {
    if config.num_labels() != NUM_CLASSES {
        anyhow::bail!(
            "sentiment model must have {NUM_CLASSES} labels, config declares {}",
            config.num_labels()
        );
    }
    (0..NUM_CLASSES)
        .map(|index| {
            config
                .label(index)
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("label id '{index}' missing from id2label"))
        })
        .collect()
}

/// Sentiment analysis model using DistilBERT.
#[derive(Clone)]
pub struct SentimentDistilBertModel {
    model: DistilBertForSequenceClassification,
    model_id: String,
    labels: Arc<[String]>,
}

impl SentimentDistilBertModel {
    pub async fn new(source: SentimentModelSource, device: Device) -> anyhow::Result<Self> {
        let config = ModelConfigLoader::<Config>::new(&source.model_id, &source.revision)
            .with_local_file(source.config_file.clone())
            .load()
            .await?;
        let labels = ordinal_labels(&config)?;

        let vb = WeightsLoader::new(&source.model_id, &source.revision)
            .with_local_file(source.weights_file.clone())
            .var_builder(DType::F32, &device)
            .await?;
        let model = DistilBertForSequenceClassification::load(vb, &config)?;

        tracing::info!(
            model = %source,
            layers = config.n_layers,
            device = device_name(&device),
            labels = ?labels,
            "loaded sentiment model"
        );

        Ok(Self {
            model,
            model_id: source.model_id,
            labels: labels.into(),
        })
    }

    pub async fn get_tokenizer(source: SentimentModelSource) -> anyhow::Result<Tokenizer> {
        TokenizerLoader::new(&source.model_id, &source.revision)
            .with_local_file(source.tokenizer_file)
            .load()
            .await
    }

    pub fn device(&self) -> &Device {
        self.model.device()
    }
}

impl SentimentAnalysisModel for SentimentDistilBertModel {
    type Options = SentimentModelSource;

    async fn new(options: Self::Options, device: Device) -> anyhow::Result<Self> {
        SentimentDistilBertModel::new(options, device).await
    }

    async fn get_tokenizer(options: Self::Options) -> anyhow::Result<Tokenizer> {
        SentimentDistilBertModel::get_tokenizer(options).await
    }

    fn logits(&self, input_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        self.model.forward(input_ids, attention_mask)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn class_name(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    fn device(&self) -> &Device {
        self.device()
    }
}
