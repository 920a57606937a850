use super::model::SentimentAnalysisModel;
use super::pipeline::{SentimentAnalysisPipeline, DEFAULT_MAX_LENGTH};
use crate::core::{global_cache, ModelOptions};
use crate::models::implementations::sentiment_distilbert::{
    SentimentDistilBertModel, SentimentModelSource,
};
use crate::pipelines::utils::{build_cache_key, device_name, DeviceRequest};

pub struct SentimentAnalysisPipelineBuilder<M: SentimentAnalysisModel> {
    options: M::Options,
    device_request: DeviceRequest,
    max_length: usize,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipelineBuilder<M> {
    pub fn new(options: M::Options) -> Self {
        Self {
            options,
            device_request: DeviceRequest::Auto,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    pub fn device_request(mut self, request: DeviceRequest) -> Self {
        self.device_request = request;
        self
    }

    /// Run on CPU even when CUDA is available.
    pub fn cpu(self) -> Self {
        self.device_request(DeviceRequest::Cpu)
    }

    /// Truncate inputs to at most `max_length` tokens, special tokens included.
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub async fn build(self) -> anyhow::Result<SentimentAnalysisPipeline<M>>
    where
        M: Clone + Send + Sync + 'static,
        M::Options: ModelOptions,
    {
        let device = self.device_request.resolve()?;
        let key = build_cache_key(&self.options, &device);
        tracing::info!(
            options = ?self.options,
            device = device_name(&device),
            max_length = self.max_length,
            "building sentiment analysis pipeline"
        );

        let model = global_cache()
            .get_or_create(&key, || M::new(self.options.clone(), device.clone()))
            .await?;
        let tokenizer = M::get_tokenizer(self.options).await?;

        SentimentAnalysisPipeline::from_parts(model, tokenizer, self.max_length)
    }
}

impl SentimentAnalysisPipelineBuilder<SentimentDistilBertModel> {
    /// A DistilBERT five-class sentiment classifier from `source`.
    pub fn distilbert(source: SentimentModelSource) -> Self {
        Self::new(source)
    }

    /// The default multilingual five-class model.
    pub fn multilingual() -> Self {
        Self::distilbert(SentimentModelSource::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::sentiment_analysis_pipeline::pipeline::test_support::FixedLogitsModel;
    use crate::pipelines::sentiment_analysis_pipeline::Sentiment;

    #[tokio::test]
    async fn build_uses_cpu_when_requested() {
        let pipeline = SentimentAnalysisPipelineBuilder::<FixedLogitsModel>::new(vec![
            0.0, 0.0, 0.0, 0.0, 9.0,
        ])
        .cpu()
        .build()
        .await
        .unwrap();

        assert!(pipeline.device().is_cpu());
        assert_eq!(pipeline.model_id(), "test/fixed-logits");
        let response = pipeline.classify("good").unwrap();
        assert_eq!(response.sentiment, Sentiment::Positive);
    }

    #[tokio::test]
    async fn build_rejects_zero_max_length() {
        let result = SentimentAnalysisPipelineBuilder::<FixedLogitsModel>::new(vec![0.0; 5])
            .cpu()
            .max_length(0)
            .build()
            .await;
        assert!(result.is_err());
    }
}
