use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// A sequence classifier that scores text on the five-step sentiment scale.
#[allow(async_fn_in_trait)]
pub trait SentimentAnalysisModel {
    type Options: std::fmt::Debug + Clone;

    async fn new(options: Self::Options, device: Device) -> anyhow::Result<Self>
    where
        Self: Sized;

    async fn get_tokenizer(options: Self::Options) -> anyhow::Result<Tokenizer>;

    /// Raw class scores with shape `(batch, num_classes)`.
    fn logits(&self, input_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor>;

    /// Hub repository (or other identifier) the weights were loaded from.
    fn model_id(&self) -> &str;

    /// Human-readable name of an ordinal class, if the model declares one.
    fn class_name(&self, _index: usize) -> Option<&str> {
        None
    }

    fn device(&self) -> &Device;
}
