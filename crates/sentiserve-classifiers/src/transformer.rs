//! Candle-backed transformer sequence classifiers
//!
//! Loads a Hugging Face style model directory (`config.json`, a tokenizer and
//! `model.safetensors`) and serves `(id2label[argmax], max probability)`.
//! Supported `model_type`s: `bert` and `distilbert`. The classification head
//! must be present in the weights.

use crate::classifier::{ClassificationMetadata, ClassificationResult, Classifier};
use crate::locator::WeightLocator;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use sentiserve_core::{Error, Result};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokenizers::{Tokenizer, TruncationDirection};

/// Inference options shared by every transformer the runtime loads
#[derive(Debug, Clone)]
pub struct TransformerOptions {
    /// Device to run on (cpu, cuda, metal)
    pub device: String,

    /// Maximum sequence length; longer inputs are truncated
    pub max_length: usize,
}

impl Default for TransformerOptions {
    fn default() -> Self {
        Self {
            device: "cpu".to_string(),
            max_length: 512,
        }
    }
}

fn ml_err<E: Display>(context: &'static str) -> impl Fn(E) -> Error {
    move |e| Error::classifier(format!("{context}: {e}"))
}

/// Materialize a transformer classifier. Blocking: downloads and mmaps weights.
pub fn load(
    name: &str,
    locator: &WeightLocator,
    options: &TransformerOptions,
) -> Result<TransformerClassifier> {
    let model_dir = resolve_model_dir(locator)?;
    let config_str = std::fs::read_to_string(model_dir.join("config.json"))
        .map_err(ml_err("Failed to read config.json"))?;
    let config_json: serde_json::Value =
        serde_json::from_str(&config_str).map_err(ml_err("Failed to parse config.json"))?;

    let labels = id2label(&config_json);
    let tokenizer = load_tokenizer(&model_dir)?;
    let device = get_device(&options.device)?;
    let vb = load_var_builder(&model_dir, &device)?;

    let model_type = config_json
        .get("model_type")
        .and_then(|v| v.as_str())
        .unwrap_or("bert");

    let (backbone, hidden_size) = match model_type {
        "bert" => {
            let config: BertConfig =
                serde_json::from_str(&config_str).map_err(ml_err("Failed to parse BERT config"))?;
            let model = BertModel::load(vb.pp("bert"), &config)
                .or_else(|_| BertModel::load(vb.clone(), &config))
                .map_err(ml_err("Failed to load BERT backbone"))?;
            let pooler = candle_nn::linear(
                config.hidden_size,
                config.hidden_size,
                vb.pp("bert").pp("pooler").pp("dense"),
            )
            .ok();
            (Backbone::Bert { model, pooler }, config.hidden_size)
        }
        "distilbert" => {
            let config: DistilBertConfig = serde_json::from_str(&config_str)
                .map_err(ml_err("Failed to parse DistilBERT config"))?;
            let hidden_size = config_json
                .get("dim")
                .and_then(|v| v.as_u64())
                .unwrap_or(768) as usize;
            let model = DistilBertModel::load(vb.pp("distilbert"), &config)
                .map_err(ml_err("Failed to load DistilBERT backbone"))?;
            let pre_classifier =
                candle_nn::linear(hidden_size, hidden_size, vb.pp("pre_classifier")).ok();
            (
                Backbone::DistilBert {
                    model,
                    pre_classifier,
                },
                hidden_size,
            )
        }
        other => {
            return Err(Error::classifier(format!(
                "Unsupported model_type '{other}' (supported: bert, distilbert)"
            )))
        }
    };

    let classifier = candle_nn::linear(hidden_size, labels.len(), vb.pp("classifier"))
        .map_err(ml_err("Model has no classification head"))?;

    tracing::info!(
        model = name,
        model_type,
        labels = ?labels,
        "Loaded transformer classifier"
    );

    Ok(TransformerClassifier {
        name: name.to_string(),
        tokenizer,
        backbone,
        classifier,
        device,
        labels,
        max_length: options.max_length,
    })
}

fn resolve_model_dir(locator: &WeightLocator) -> Result<PathBuf> {
    match locator {
        WeightLocator::Local { path } => {
            if !path.is_dir() {
                return Err(Error::classifier(format!(
                    "Model directory does not exist: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        WeightLocator::HuggingFace { repo, revision } => download_from_huggingface(repo, revision),
        WeightLocator::Builtin { implementation } => Err(Error::classifier(format!(
            "Builtin implementation '{implementation}' has no weights to load"
        ))),
    }
}

fn download_from_huggingface(repo: &str, revision: &str) -> Result<PathBuf> {
    tracing::info!(repo, revision, "Downloading model from HuggingFace");

    let api = hf_hub::api::sync::Api::new()
        .map_err(ml_err("Failed to initialize HuggingFace API"))?;
    let repo_obj = api.repo(hf_hub::Repo::with_revision(
        repo.to_string(),
        hf_hub::RepoType::Model,
        revision.to_string(),
    ));

    let config_path = repo_obj
        .get("config.json")
        .map_err(ml_err("Failed to download config.json"))?;
    repo_obj
        .get("model.safetensors")
        .map_err(ml_err("Failed to download model.safetensors"))?;

    let has_tokenizer = ["tokenizer.json", "vocab.txt"]
        .iter()
        .any(|file| repo_obj.get(file).is_ok());
    if !has_tokenizer {
        return Err(Error::classifier(
            "No tokenizer found (tried tokenizer.json, vocab.txt)",
        ));
    }

    let model_dir = config_path
        .parent()
        .ok_or_else(|| Error::classifier("Invalid HuggingFace cache path"))?;

    tracing::info!(path = %model_dir.display(), "Model available");
    Ok(model_dir.to_path_buf())
}

fn id2label(config: &serde_json::Value) -> Vec<String> {
    let mut labels: Vec<(usize, String)> = config
        .get("id2label")
        .and_then(|v| v.as_object())
        .map(|map| {
            map.iter()
                .filter_map(|(idx, label)| {
                    Some((idx.parse::<usize>().ok()?, label.as_str()?.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    if labels.is_empty() {
        return vec!["negative".to_string(), "positive".to_string()];
    }

    labels.sort_by_key(|(idx, _)| *idx);
    labels.into_iter().map(|(_, label)| label).collect()
}

fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0).map_err(ml_err("Failed to initialize CUDA")),
        "mps" | "metal" => Device::new_metal(0).map_err(ml_err("Failed to initialize Metal")),
        _ => Ok(Device::Cpu),
    }
}

fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::classifier(format!(
            "model.safetensors not found in {}",
            model_dir.display()
        )));
    }

    // SAFETY: the weights file is treated as immutable for the process lifetime.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(ml_err("Failed to load weights"))?
    };

    Ok(vb)
}

fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_json_path = model_dir.join("tokenizer.json");
    if tokenizer_json_path.exists() {
        return Tokenizer::from_file(&tokenizer_json_path)
            .map_err(ml_err("Failed to load tokenizer.json"));
    }

    let vocab_path = model_dir.join("vocab.txt");
    if vocab_path.exists() {
        tracing::debug!("Building tokenizer from vocab.txt");

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(ml_err("Failed to build WordPiece model"))?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
        tokenizer.with_post_processor(Some(BertProcessing::new(
            ("[SEP]".to_string(), 102),
            ("[CLS]".to_string(), 101),
        )));

        return Ok(tokenizer);
    }

    Err(Error::classifier(format!(
        "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
        model_dir.display()
    )))
}

enum Backbone {
    Bert {
        model: BertModel,
        pooler: Option<Linear>,
    },
    DistilBert {
        model: DistilBertModel,
        pre_classifier: Option<Linear>,
    },
}

pub struct TransformerClassifier {
    name: String,
    tokenizer: Tokenizer,
    backbone: Backbone,
    classifier: Linear,
    device: Device,
    labels: Vec<String>,
    max_length: usize,
}

impl TransformerClassifier {
    fn pooled_output(&self, ids: &[u32], type_ids: &[u32], mask: &[u32]) -> Result<Tensor> {
        match &self.backbone {
            Backbone::Bert { model, pooler } => {
                let input_ids = Tensor::new(ids, &self.device)
                    .and_then(|t| t.unsqueeze(0))
                    .map_err(ml_err("Failed to create input tensor"))?;
                let token_type_ids = Tensor::new(type_ids, &self.device)
                    .and_then(|t| t.unsqueeze(0))
                    .map_err(ml_err("Failed to create token type tensor"))?;

                let hidden_states = model
                    .forward(&input_ids, &token_type_ids, None)
                    .map_err(ml_err("Model forward pass failed"))?;
                let cls = hidden_states
                    .i((0, 0, ..))
                    .and_then(|t| t.unsqueeze(0))
                    .map_err(ml_err("Failed to get CLS token"))?;

                match pooler {
                    Some(pooler) => pooler
                        .forward(&cls)
                        .and_then(|t| t.tanh())
                        .map_err(ml_err("Pooler failed")),
                    None => Ok(cls),
                }
            }
            Backbone::DistilBert {
                model,
                pre_classifier,
            } => {
                let ids_i64: Vec<i64> = ids.iter().map(|&x| x as i64).collect();
                let input_ids = Tensor::new(ids_i64.as_slice(), &self.device)
                    .and_then(|t| t.unsqueeze(0))
                    .map_err(ml_err("Failed to create input tensor"))?;

                // DistilBERT expects 1 where attention is masked out.
                let inverted: Vec<u8> = mask.iter().map(|&x| u8::from(x == 0)).collect();
                let attention_mask = Tensor::new(inverted.as_slice(), &self.device)
                    .and_then(|t| t.unsqueeze(0))
                    .map_err(ml_err("Failed to create attention mask"))?;

                let hidden_states = model
                    .forward(&input_ids, &attention_mask)
                    .map_err(ml_err("Model forward pass failed"))?;
                let cls = hidden_states
                    .i((0, 0, ..))
                    .and_then(|t| t.unsqueeze(0))
                    .map_err(ml_err("Failed to get CLS token"))?;

                match pre_classifier {
                    Some(pre) => pre
                        .forward(&cls)
                        .and_then(|t| t.relu())
                        .map_err(ml_err("Pre-classifier failed")),
                    None => Ok(cls),
                }
            }
        }
    }
}

impl Classifier for TransformerClassifier {
    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();

        let mut encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(ml_err("Tokenization failed"))?;
        encoding.truncate(self.max_length, 0, TruncationDirection::Right);

        let pooled = self.pooled_output(
            encoding.get_ids(),
            encoding.get_type_ids(),
            encoding.get_attention_mask(),
        )?;

        let logits = self
            .classifier
            .forward(&pooled)
            .map_err(ml_err("Classification head failed"))?;
        let probs: Vec<f32> = candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1())
            .map_err(ml_err("Softmax failed"))?;

        let (best, score) = probs
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .ok_or_else(|| Error::classifier("Model produced no logits"))?;

        let label = self
            .labels
            .get(best)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{best}"));

        let all_scores = self
            .labels
            .iter()
            .cloned()
            .zip(probs.iter().copied())
            .collect();

        Ok(ClassificationResult {
            label,
            score,
            metadata: ClassificationMetadata {
                model: Some(self.name.clone()),
                all_scores: Some(all_scores),
            },
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
