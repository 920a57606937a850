use super::classes::{round_score, ClassProbabilities, Sentiment};
use super::model::SentimentAnalysisModel;
use crate::core::SentimentError;
use candle_core::Tensor;
use serde::{Deserialize, Serialize};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Default truncation length, the model's positional limit.
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// A coarse sentiment label and the probability of the fine-grained class
/// that produced it, rounded to four decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub sentiment: Sentiment,
    pub score: f64,
}

/// Tokenizes text, runs the classifier and collapses its five-class output
/// into a [`Sentiment`].
///
/// Build one with
/// [`SentimentAnalysisPipelineBuilder`](super::SentimentAnalysisPipelineBuilder).
/// Classification only reads the model and tokenizer, so one pipeline can be
/// shared behind an `Arc` by any number of concurrent callers.
pub struct SentimentAnalysisPipeline<M: SentimentAnalysisModel> {
    pub(crate) model: M,
    pub(crate) tokenizer: Tokenizer,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipeline<M> {
    /// Assemble a pipeline from an already loaded model and tokenizer.
    ///
    /// Configures the tokenizer to truncate to `max_length` tokens and pad to
    /// the longest sequence in the batch.
    pub fn from_parts(model: M, mut tokenizer: Tokenizer, max_length: usize) -> anyhow::Result<Self> {
        configure_tokenizer(&mut tokenizer, max_length)?;
        Ok(Self { model, tokenizer })
    }

    /// Classify `text` into a coarse sentiment with a confidence score.
    pub fn classify(&self, text: &str) -> Result<ClassificationResponse, SentimentError> {
        let probabilities = self.probabilities(text)?;
        let (index, sentiment, probability) = probabilities.top();

        tracing::debug!(
            class = index,
            class_name = self.model.class_name(index).unwrap_or("?"),
            %sentiment,
            probability,
            "classified text"
        );

        Ok(ClassificationResponse {
            sentiment,
            score: round_score(probability),
        })
    }

    /// The full five-class distribution for `text`.
    pub fn probabilities(&self, text: &str) -> Result<ClassProbabilities, SentimentError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| SentimentError::Tokenization(e.to_string()))?;

        let device = self.model.device();
        let input_ids = Tensor::new(encoding.get_ids(), device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), device)?.unsqueeze(0)?;
        tracing::trace!(tokens = encoding.len(), "encoded input");

        let logits = self.model.logits(&input_ids, &attention_mask)?;
        ClassProbabilities::from_logits(&logits)
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }
}

fn configure_tokenizer(tokenizer: &mut Tokenizer, max_length: usize) -> anyhow::Result<()> {
    if max_length == 0 {
        anyhow::bail!("max_length must be at least 1");
    }

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(anyhow::Error::msg)?;

    let pad_id = tokenizer.get_padding().map_or(0, |p| p.pad_id);
    let pad_token = tokenizer
        .id_to_token(pad_id)
        .unwrap_or_else(|| "[PAD]".to_string());
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id,
        pad_token,
        ..Default::default()
    }));
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use candle_core::Device;
    use std::str::FromStr;

    /// Returns the same logits for every input.
    #[derive(Clone)]
    pub struct FixedLogitsModel {
        pub logits: Vec<f32>,
        pub device: Device,
    }

    impl SentimentAnalysisModel for FixedLogitsModel {
        type Options = Vec<f32>;

        async fn new(options: Self::Options, device: Device) -> anyhow::Result<Self> {
            Ok(Self {
                logits: options,
                device,
            })
        }

        async fn get_tokenizer(_options: Self::Options) -> anyhow::Result<Tokenizer> {
            whitespace_tokenizer()
        }

        fn logits(
            &self,
            input_ids: &Tensor,
            _attention_mask: &Tensor,
        ) -> candle_core::Result<Tensor> {
            let batch = input_ids.dim(0)?;
            Tensor::new(self.logits.as_slice(), &self.device)?
                .unsqueeze(0)?
                .repeat((batch, 1))
        }

        fn model_id(&self) -> &str {
            "test/fixed-logits"
        }

        fn device(&self) -> &Device {
            &self.device
        }
    }

    impl crate::core::ModelOptions for Vec<f32> {
        fn cache_key(&self) -> String {
            format!("{self:?}")
        }
    }

    pub const CLS_ID: u32 = 2;
    pub const SEP_ID: u32 = 3;

    const WHITESPACE_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": {
            "type": "TemplateProcessing",
            "single": [
                {"SpecialToken": {"id": "[CLS]", "type_id": 0}},
                {"Sequence": {"id": "A", "type_id": 0}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 0}}
            ],
            "pair": [
                {"SpecialToken": {"id": "[CLS]", "type_id": 0}},
                {"Sequence": {"id": "A", "type_id": 0}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 0}},
                {"Sequence": {"id": "B", "type_id": 1}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 1}}
            ],
            "special_tokens": {
                "[CLS]": {"id": "[CLS]", "ids": [2], "tokens": ["[CLS]"]},
                "[SEP]": {"id": "[SEP]", "ids": [3], "tokens": ["[SEP]"]}
            }
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3, "good": 4, "bad": 5},
            "unk_token": "[UNK]"
        }
    }"#;

    /// Whitespace-split word-level tokenizer with a tiny vocabulary that wraps
    /// every sequence in `[CLS] ... [SEP]`.
    pub fn whitespace_tokenizer() -> anyhow::Result<Tokenizer> {
        Tokenizer::from_str(WHITESPACE_TOKENIZER).map_err(anyhow::Error::msg)
    }

    pub fn fixed_pipeline(logits: &[f32]) -> SentimentAnalysisPipeline<FixedLogitsModel> {
        let model = FixedLogitsModel {
            logits: logits.to_vec(),
            device: Device::Cpu,
        };
        SentimentAnalysisPipeline::from_parts(model, whitespace_tokenizer().unwrap(), DEFAULT_MAX_LENGTH)
            .unwrap()
    }
}
