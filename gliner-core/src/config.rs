//! # Configuração
//!
//! Configuração de inicialização (fonte do modelo, variante, largura máxima de span,
//! execução) e opções por chamada de inferência. Tudo é (de)serializável via serde,
//! permitindo carregar a configuração de um arquivo JSON.
//!
//! ```rust
//! use gliner_core::config::{GlinerConfig, ModelType};
//!
//! let config = GlinerConfig::from_json_str(r#"{
//!     "model_source": { "path": "models/gliner.onnx" },
//!     "model_type": "token_level"
//! }"#).unwrap();
//! assert_eq!(config.model_type, ModelType::TokenLevel);
//! assert_eq!(config.max_width, 12);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GlinerError, Result};

pub const DEFAULT_MAX_WIDTH: usize = 12;
pub const DEFAULT_MAX_WORDS: usize = 512;
pub const DEFAULT_BATCH_SIZE: usize = 8;
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Variante do modelo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Pontua cada candidato (início, largura, rótulo) diretamente.
    #[default]
    SpanLevel,
    /// Pontua fronteiras início/fim e pertencimento por palavra; os spans são montados por pareamento.
    TokenLevel,
}

/// De onde o motor de inferência carrega o modelo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    Wasm,
    Webgpu,
    Webgl,
}

impl ExecutionProvider {
    /// Provedores que aceitam `multi_thread`/`max_threads`.
    pub fn supports_threads(self) -> bool {
        matches!(self, Self::Cpu | Self::Wasm)
    }
}

/// Parâmetros repassados ao motor ao criar a sessão.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    pub provider: ExecutionProvider,
    pub multi_thread: bool,
    pub max_threads: Option<usize>,
}

/// Configuração de inicialização do [`crate::Gliner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlinerConfig {
    pub model_source: Option<ModelSource>,
    /// Caminho do `tokenizer.json` (ver [`GlinerConfig::tokenizer_file`]).
    pub tokenizer_path: Option<PathBuf>,
    pub model_type: ModelType,
    /// Largura máxima (em palavras) de um span candidato.
    pub max_width: usize,
    pub execution: ExecutionSettings,
    /// Máximo de palavras por janela no modo com fatiamento.
    pub max_words: usize,
    /// Máximo de janelas por sub-lote no modo com fatiamento.
    pub batch_size: usize,
}

impl Default for GlinerConfig {
    fn default() -> Self {
        Self {
            model_source: None,
            tokenizer_path: None,
            model_type: ModelType::default(),
            max_width: DEFAULT_MAX_WIDTH,
            execution: ExecutionSettings::default(),
            max_words: DEFAULT_MAX_WORDS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl GlinerConfig {
    pub fn new(model_source: ModelSource) -> Self {
        Self {
            model_source: Some(model_source),
            ..Self::default()
        }
    }

    pub fn with_model_type(mut self, model_type: ModelType) -> Self {
        self.model_type = model_type;
        self
    }

    pub fn with_max_width(mut self, max_width: usize) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn with_tokenizer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tokenizer_path = Some(path.into());
        self
    }

    /// Caminho do tokenizador configurado; ausente ou vazio é erro de configuração.
    pub fn tokenizer_file(&self) -> Result<&Path> {
        match &self.tokenizer_path {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(GlinerError::configuration("caminho do tokenizador ausente")),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Verifica a configuração antes de qualquer inferência.
    pub fn validate(&self) -> Result<()> {
        match &self.model_source {
            None => return Err(GlinerError::configuration("fonte do modelo ausente")),
            Some(ModelSource::Bytes(bytes)) if bytes.is_empty() => {
                return Err(GlinerError::configuration("fonte do modelo vazia"))
            }
            Some(ModelSource::Path(path)) if path.as_os_str().is_empty() => {
                return Err(GlinerError::configuration("caminho do modelo vazio"))
            }
            Some(_) => {}
        }
        if self.max_width == 0 {
            return Err(GlinerError::configuration("max_width deve ser maior que zero"));
        }
        validate_chunking(self.max_words, self.batch_size)?;
        self.execution.validate()
    }
}

impl ExecutionSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_threads == Some(0) {
            return Err(GlinerError::configuration("max_threads deve ser maior que zero"));
        }
        if self.multi_thread && !self.provider.supports_threads() {
            return Err(GlinerError::configuration(format!(
                "multi_thread só é suportado nos provedores cpu e wasm, não em {:?}",
                self.provider
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_chunking(max_words: usize, batch_size: usize) -> Result<()> {
    if max_words == 0 {
        return Err(GlinerError::configuration("max_words deve ser maior que zero"));
    }
    if batch_size == 0 {
        return Err(GlinerError::configuration("batch_size deve ser maior que zero"));
    }
    Ok(())
}

/// Opções de uma chamada de inferência.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceOptions {
    /// `true`: nenhum span pode se sobrepor; `false`: aninhamento permitido, cruzamento proibido.
    pub flat_ner: bool,
    /// Probabilidade mínima para um candidato ser considerado.
    pub threshold: f32,
    /// Permite vários rótulos exatamente no mesmo span.
    pub multi_label: bool,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            flat_ner: true,
            threshold: DEFAULT_THRESHOLD,
            multi_label: false,
        }
    }
}

impl InferenceOptions {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(GlinerError::configuration(format!(
                "threshold deve estar em [0, 1], recebido {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GlinerConfig::default();
        assert_eq!(config.max_width, 12);
        assert_eq!(config.model_type, ModelType::SpanLevel);
        assert_eq!(config.max_words, 512);
        let opts = InferenceOptions::default();
        assert!(opts.flat_ner);
        assert!(!opts.multi_label);
        assert_eq!(opts.threshold, 0.5);
    }

    #[test]
    fn test_missing_model_source_is_rejected() {
        let err = GlinerConfig::default().validate().unwrap_err();
        assert!(matches!(err, GlinerError::Configuration(_)));
        let err = GlinerConfig::new(ModelSource::Bytes(vec![])).validate().unwrap_err();
        assert!(matches!(err, GlinerError::Configuration(_)));
    }

    #[test]
    fn test_invalid_execution_settings_are_rejected() {
        let mut config = GlinerConfig::new(ModelSource::Path("m.onnx".into()));
        assert!(config.validate().is_ok());

        config.execution = ExecutionSettings {
            provider: ExecutionProvider::Webgpu,
            multi_thread: true,
            max_threads: None,
        };
        assert!(config.validate().is_err());

        config.execution.provider = ExecutionProvider::Webgl;
        assert!(config.validate().is_err());

        config.execution.provider = ExecutionProvider::Wasm;
        assert!(config.validate().is_ok());

        config.execution = ExecutionSettings {
            max_threads: Some(0),
            ..ExecutionSettings::default()
        };
        assert!(config.validate().is_err());

        let config = GlinerConfig::new(ModelSource::Path("m.onnx".into())).with_max_width(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_range() {
        let mut opts = InferenceOptions::default();
        assert!(opts.validate().is_ok());
        opts.threshold = 1.5;
        assert!(opts.validate().is_err());
        opts.threshold = f32::NAN;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gliner.json");
        std::fs::write(
            &path,
            r#"{"model_source": {"path": "gliner.onnx"}, "max_width": 8,
                "tokenizer_path": "tokenizer.json",
                "execution": {"provider": "wasm", "multi_thread": true}}"#,
        )
        .unwrap();

        let config = GlinerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_width, 8);
        assert_eq!(config.execution.provider, ExecutionProvider::Wasm);
        assert_eq!(config.tokenizer_file().unwrap(), Path::new("tokenizer.json"));
        assert_eq!(config.model_source, Some(ModelSource::Path("gliner.onnx".into())));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tokenizer_file_required_when_read() {
        let config = GlinerConfig::new(ModelSource::Path("m.onnx".into()));
        assert!(matches!(config.tokenizer_file(), Err(GlinerError::Configuration(_))));
        assert!(config.clone().with_tokenizer_path("").tokenizer_file().is_err());
        let config = config.with_tokenizer_path("modelos/tokenizer.json");
        assert_eq!(config.tokenizer_file().unwrap(), Path::new("modelos/tokenizer.json"));
    }

    #[test]
    fn test_load_from_missing_file_is_io_error() {
        let err = GlinerConfig::from_json_file("/nao/existe/gliner.json").unwrap_err();
        assert!(matches!(err, GlinerError::Io(_)));
    }
}
