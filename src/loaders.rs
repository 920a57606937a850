//! Hugging Face Hub loaders for the classifier's artifacts.
//!
//! - [`HfLoader`] - resolves one file from a model repo at a given revision
//! - [`TokenizerLoader`] - loads `tokenizer.json`
//! - [`ModelConfigLoader`] - loads and deserializes `config.json`
//! - [`WeightsLoader`] - resolves model weights, preferring safetensors
//!
//! Every loader accepts a local file override; when one is set the hub is
//! never contacted for that artifact. Hub downloads retry on lock contention,
//! which happens when several processes share one cache directory.

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use hf_hub::{Repo, RepoType};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokenizers::Tokenizer;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub revision: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, revision: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
            filename: filename.into(),
        }
    }

    pub async fn load(&self) -> anyhow::Result<PathBuf> {
        let hf_api = hf_hub::api::tokio::ApiBuilder::new()
            .with_chunk_size(None)
            .build()?;
        let hf_repo = hf_api.repo(Repo::with_revision(
            self.repo.clone(),
            RepoType::Model,
            self.revision.clone(),
        ));

        let mut attempt = 0;
        loop {
            match hf_repo.get(self.filename.as_str()).await {
                Ok(path) => return Ok(path),
                Err(e) => {
                    let lock_contention = e.to_string().contains("Lock acquisition failed");
                    if lock_contention && attempt + 1 < MAX_RETRIES {
                        let wait_time = Duration::from_millis(100 * (1 << attempt));
                        tracing::warn!(
                            repo = %self.repo,
                            file = %self.filename,
                            ?wait_time,
                            "hub cache locked, retrying"
                        );
                        tokio::time::sleep(wait_time).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(anyhow::Error::new(e).context(format!(
                        "failed to fetch `{}` from `{}@{}`",
                        self.filename, self.repo, self.revision
                    )));
                }
            }
        }
    }
}

/// Resolve `local` if given, otherwise fetch through `loader`.
async fn resolve(local: Option<&Path>, loader: &HfLoader) -> anyhow::Result<PathBuf> {
    match local {
        Some(path) => {
            tracing::info!(path = %path.display(), "using local {}", loader.filename);
            Ok(path.to_path_buf())
        }
        None => loader.load().await,
    }
}

#[derive(Debug, Clone)]
pub struct TokenizerLoader {
    pub tokenizer_file_loader: HfLoader,
    pub local_file: Option<PathBuf>,
}

impl TokenizerLoader {
    pub fn new(repo: &str, revision: &str) -> Self {
        Self {
            tokenizer_file_loader: HfLoader::new(repo, revision, "tokenizer.json"),
            local_file: None,
        }
    }

    pub fn with_local_file(mut self, path: Option<PathBuf>) -> Self {
        self.local_file = path;
        self
    }

    pub async fn load(&self) -> anyhow::Result<Tokenizer> {
        let path = resolve(self.local_file.as_deref(), &self.tokenizer_file_loader).await?;
        Tokenizer::from_file(&path).map_err(anyhow::Error::msg)
    }
}

/// Loads `config.json` and deserializes it into `T`.
#[derive(Debug, Clone)]
pub struct ModelConfigLoader<T> {
    pub config_file_loader: HfLoader,
    pub local_file: Option<PathBuf>,
    _config: PhantomData<T>,
}

impl<T: DeserializeOwned> ModelConfigLoader<T> {
    pub fn new(repo: &str, revision: &str) -> Self {
        Self {
            config_file_loader: HfLoader::new(repo, revision, "config.json"),
            local_file: None,
            _config: PhantomData,
        }
    }

    pub fn with_local_file(mut self, path: Option<PathBuf>) -> Self {
        self.local_file = path;
        self
    }

    pub async fn load(&self) -> anyhow::Result<T> {
        let path = resolve(self.local_file.as_deref(), &self.config_file_loader).await?;
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {path:?}: {e}"))?;
        parse_config(&content)
    }
}

fn parse_config<T: DeserializeOwned>(content: &str) -> anyhow::Result<T> {
    serde_json::from_str(content).map_err(|e| anyhow::anyhow!("failed to parse model config: {e}"))
}

/// Resolves model weights. `model.safetensors` is tried first, then
/// `pytorch_model.bin`.
#[derive(Debug, Clone)]
pub struct WeightsLoader {
    pub repo: String,
    pub revision: String,
    pub local_file: Option<PathBuf>,
}

impl WeightsLoader {
    const SAFETENSORS: &'static str = "model.safetensors";
    const PYTORCH: &'static str = "pytorch_model.bin";

    pub fn new(repo: &str, revision: &str) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
            local_file: None,
        }
    }

    pub fn with_local_file(mut self, path: Option<PathBuf>) -> Self {
        self.local_file = path;
        self
    }

    pub async fn load(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.local_file {
            return Ok(path.clone());
        }

        match HfLoader::new(&self.repo, &self.revision, Self::SAFETENSORS)
            .load()
            .await
        {
            Ok(path) => Ok(path),
            Err(safetensors_err) => {
                tracing::debug!(error = %safetensors_err, "no safetensors weights, trying pytorch_model.bin");
                HfLoader::new(&self.repo, &self.revision, Self::PYTORCH)
                    .load()
                    .await
                    .map_err(|e| {
                        anyhow::anyhow!(
                            "model weights not found in `{}`. Expected `{}` or `{}`. Error: {e}",
                            self.repo,
                            Self::SAFETENSORS,
                            Self::PYTORCH
                        )
                    })
            }
        }
    }

    /// Resolve the weights and open them as a [`VarBuilder`].
    pub async fn var_builder(
        &self,
        dtype: DType,
        device: &Device,
    ) -> anyhow::Result<VarBuilder<'static>> {
        let path = self.load().await?;
        var_builder_from_path(path, dtype, device)
    }
}

fn var_builder_from_path(
    path: PathBuf,
    dtype: DType,
    device: &Device,
) -> anyhow::Result<VarBuilder<'static>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        // SAFETY: the file is memory-mapped read-only and lives in the hub
        // cache for the life of the process.
        Some("safetensors") => Ok(unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], dtype, device)?
        }),
        Some("bin") => Ok(VarBuilder::from_pth(&path, dtype, device)?),
        _ => anyhow::bail!("unsupported weight file format: {:?}", path),
    }
}
