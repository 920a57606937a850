//! DistilBERT encoder with a sequence-classification head.
//!
//! DistilBERT is a six-layer distillation of BERT with learned absolute
//! position embeddings and post-norm transformer blocks. The classification
//! head pools the first (`[CLS]`) token and applies
//! `pre_classifier -> ReLU -> classifier`, matching checkpoints exported as
//! `DistilBertForSequenceClassification`. The forward pass takes
//! `(batch, seq)` token ids plus an attention mask and returns
//! `(batch, num_labels)` logits.

use candle_core::{DType, Device, IndexOp, Module, Result, Tensor};
use candle_nn::{
    embedding, layer_norm, linear, ops::softmax_last_dim, Activation, Embedding, LayerNorm,
    Linear, VarBuilder,
};
use serde::Deserialize;
use std::collections::HashMap;

const LAYER_NORM_EPS: f64 = 1e-12;
const MIN_VALUE_F64: f64 = f32::MIN as f64;

fn default_activation() -> Activation {
    Activation::Gelu
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub dim: usize,
    pub n_layers: usize,
    pub n_heads: usize,
    pub hidden_dim: usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_activation")]
    pub activation: Activation,
    #[serde(default)]
    pub pad_token_id: u32,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

impl Config {
    pub fn num_labels(&self) -> usize {
        self.id2label.len()
    }

    /// Label name for a class index, as declared in `id2label`.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.id2label.get(&index.to_string()).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct Embeddings {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    layer_norm: LayerNorm,
}

impl Embeddings {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let word_embeddings = embedding(config.vocab_size, config.dim, vb.pp("word_embeddings"))?;
        // Checkpoints trained with sinusoidal positions still ship the table
        // as a weight, so both variants load the same way.
        let position_embeddings = embedding(
            config.max_position_embeddings,
            config.dim,
            vb.pp("position_embeddings"),
        )?;
        let layer_norm = layer_norm(config.dim, LAYER_NORM_EPS, vb.pp("LayerNorm"))?;
        Ok(Self {
            word_embeddings,
            position_embeddings,
            layer_norm,
        })
    }

    fn forward(&self, input_ids: &Tensor) -> Result<Tensor> {
        let seq_len = input_ids.dim(1)?;
        let positions = Tensor::arange(0u32, seq_len as u32, input_ids.device())?.unsqueeze(0)?;
        let words = self.word_embeddings.forward(input_ids)?;
        let positions = self.position_embeddings.forward(&positions)?;
        words.broadcast_add(&positions)?.apply(&self.layer_norm)
    }
}

#[derive(Debug, Clone)]
struct MultiHeadSelfAttention {
    q_lin: Linear,
    k_lin: Linear,
    v_lin: Linear,
    out_lin: Linear,
    n_heads: usize,
    head_dim: usize,
    scale: f64,
}

impl MultiHeadSelfAttention {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        if config.dim % config.n_heads != 0 {
            candle_core::bail!(
                "hidden size {} is not divisible by {} attention heads",
                config.dim,
                config.n_heads
            );
        }
        let head_dim = config.dim / config.n_heads;
        Ok(Self {
            q_lin: linear(config.dim, config.dim, vb.pp("q_lin"))?,
            k_lin: linear(config.dim, config.dim, vb.pp("k_lin"))?,
            v_lin: linear(config.dim, config.dim, vb.pp("v_lin"))?,
            out_lin: linear(config.dim, config.dim, vb.pp("out_lin"))?,
            n_heads: config.n_heads,
            head_dim,
            scale: 1.0 / (head_dim as f64).sqrt(),
        })
    }

    /// `attention_mask` is additive with shape `(batch, 1, 1, seq_len)`.
    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, dim) = hidden_states.dims3()?;

        let split_heads = |xs: Tensor| -> Result<Tensor> {
            xs.reshape((batch, seq_len, self.n_heads, self.head_dim))?
                .transpose(1, 2)?
                .contiguous()
        };

        let q = (split_heads(self.q_lin.forward(hidden_states)?)? * self.scale)?;
        let k = split_heads(self.k_lin.forward(hidden_states)?)?;
        let v = split_heads(self.v_lin.forward(hidden_states)?)?;

        let scores = q
            .matmul(&k.t()?.contiguous()?)?
            .broadcast_add(attention_mask)?;
        let weights = softmax_last_dim(&scores)?;

        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq_len, dim))?;
        self.out_lin.forward(&context)
    }
}

#[derive(Debug, Clone)]
struct FeedForward {
    lin1: Linear,
    lin2: Linear,
    activation: Activation,
}

impl FeedForward {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            lin1: linear(config.dim, config.hidden_dim, vb.pp("lin1"))?,
            lin2: linear(config.hidden_dim, config.dim, vb.pp("lin2"))?,
            activation: config.activation,
        })
    }
}

impl Module for FeedForward {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        xs.apply(&self.lin1)?
            .apply(&self.activation)?
            .apply(&self.lin2)
    }
}

#[derive(Debug, Clone)]
struct TransformerBlock {
    attention: MultiHeadSelfAttention,
    sa_layer_norm: LayerNorm,
    ffn: FeedForward,
    output_layer_norm: LayerNorm,
}

impl TransformerBlock {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            attention: MultiHeadSelfAttention::load(vb.pp("attention"), config)?,
            sa_layer_norm: layer_norm(config.dim, LAYER_NORM_EPS, vb.pp("sa_layer_norm"))?,
            ffn: FeedForward::load(vb.pp("ffn"), config)?,
            output_layer_norm: layer_norm(config.dim, LAYER_NORM_EPS, vb.pp("output_layer_norm"))?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let attended = self.attention.forward(hidden_states, attention_mask)?;
        let attended = (attended + hidden_states)?.apply(&self.sa_layer_norm)?;
        let projected = self.ffn.forward(&attended)?;
        (projected + attended)?.apply(&self.output_layer_norm)
    }
}

/// The bare DistilBERT encoder.
#[derive(Debug, Clone)]
pub struct DistilBertModel {
    embeddings: Embeddings,
    layers: Vec<TransformerBlock>,
    device: Device,
    dtype: DType,
}

impl DistilBertModel {
    pub fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let embeddings = Embeddings::load(vb.pp("embeddings"), config)?;
        let layers_vb = vb.pp("transformer.layer");
        let layers = (0..config.n_layers)
            .map(|idx| TransformerBlock::load(layers_vb.pp(idx), config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            embeddings,
            layers,
            device: vb.device().clone(),
            dtype: vb.dtype(),
        })
    }

    /// Turn a `(batch, seq_len)` 0/1 mask into an additive
    /// `(batch, 1, 1, seq_len)` mask: 0 where attended, `f32::MIN` on padding.
    fn additive_mask(&self, attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len) = attention_mask.dims2()?;
        attention_mask
            .to_dtype(DType::F32)?
            .affine(-MIN_VALUE_F64, MIN_VALUE_F64)?
            .reshape((batch, 1, 1, seq_len))?
            .to_dtype(self.dtype)
    }

    /// Returns hidden states with shape `(batch, seq_len, dim)`.
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask = self.additive_mask(attention_mask)?;
        let mut hidden_states = self.embeddings.forward(input_ids)?;
        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states, &mask)?;
        }
        Ok(hidden_states)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

/// DistilBERT with a `[CLS]`-pooled classification head.
#[derive(Debug, Clone)]
pub struct DistilBertForSequenceClassification {
    distilbert: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    num_labels: usize,
}

impl DistilBertForSequenceClassification {
    pub fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let num_labels = config.num_labels();
        if num_labels == 0 {
            candle_core::bail!("config declares no labels in `id2label`");
        }
        let distilbert = DistilBertModel::load(vb.pp("distilbert"), config)?;
        let pre_classifier = linear(config.dim, config.dim, vb.pp("pre_classifier"))?;
        let classifier = linear(config.dim, num_labels, vb.pp("classifier"))?;
        Ok(Self {
            distilbert,
            pre_classifier,
            classifier,
            num_labels,
        })
    }

    /// Forward pass for sequence classification.
    ///
    /// # Arguments
    /// * `input_ids` - Token IDs with shape `(batch_size, sequence_length)`
    /// * `attention_mask` - Mask with shape `(batch_size, sequence_length)`, 1 for real tokens and 0 for padding
    ///
    /// # Returns
    /// Raw logits with shape `(batch_size, num_labels)`
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let hidden_states = self.distilbert.forward(input_ids, attention_mask)?;
        hidden_states
            .i((.., 0))?
            .apply(&self.pre_classifier)?
            .relu()?
            .apply(&self.classifier)
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn device(&self) -> &Device {
        self.distilbert.device()
    }
}
