//! # Fachada Pública
//!
//! [`Gliner`] guarda a configuração, cria a sessão do modelo em [`Gliner::initialize`] e
//! expõe as duas formas de inferência. Chamar a inferência antes da inicialização é erro
//! do chamador ([`GlinerError::NotInitialized`]).
//!
//! ```rust,ignore
//! let mut gliner = Gliner::new(GlinerConfig::from_json_file("gliner.json")?);
//! gliner.initialize(&factory, tokenizer).await?;
//! let entities = gliner
//!     .inference(&["Kyiv is the capital of Ukraine."], &["city", "country"], &InferenceOptions::default())
//!     .await?;
//! ```

use std::sync::Arc;

use tracing::info;

use crate::config::{GlinerConfig, InferenceOptions};
use crate::decoder::Entity;
use crate::engine::{SessionFactory, SubwordTokenizer};
use crate::error::{GlinerError, Result};
use crate::pipeline::GlinerPipeline;
use crate::processor::Processor;

pub struct Gliner {
    config: GlinerConfig,
    pipeline: Option<GlinerPipeline>,
}

impl Gliner {
    pub fn new(config: GlinerConfig) -> Self {
        Self {
            config,
            pipeline: None,
        }
    }

    pub fn config(&self) -> &GlinerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Valida a configuração, cria a sessão do modelo e monta o pipeline.
    ///
    /// Chamadas repetidas substituem a sessão anterior.
    pub async fn initialize(
        &mut self,
        factory: &dyn SessionFactory,
        tokenizer: Arc<dyn SubwordTokenizer>,
    ) -> Result<()> {
        self.config.validate()?;
        let source = self
            .config
            .model_source
            .as_ref()
            .ok_or_else(|| GlinerError::configuration("fonte do modelo ausente"))?;

        let session = factory
            .create(source, &self.config.execution)
            .await
            .map_err(|e| GlinerError::configuration(format!("falha ao criar a sessão: {e}")))?;

        let processor = Processor::new(self.config.model_type, self.config.max_width, tokenizer);
        self.pipeline = Some(GlinerPipeline::new(processor, session));

        info!(
            model_type = ?self.config.model_type,
            max_width = self.config.max_width,
            provider = ?self.config.execution.provider,
            "GLiNER inicializado"
        );
        Ok(())
    }

    /// Inicializa carregando o tokenizador Hugging Face de `tokenizer_path`.
    #[cfg(feature = "hf-tokenizers")]
    pub async fn initialize_with_hf_tokenizer(&mut self, factory: &dyn SessionFactory) -> Result<()> {
        let tokenizer = crate::engine::HfTokenizer::from_file(self.config.tokenizer_file()?)?;
        self.initialize(factory, Arc::new(tokenizer)).await
    }

    fn pipeline(&self) -> Result<&GlinerPipeline> {
        self.pipeline.as_ref().ok_or(GlinerError::NotInitialized)
    }

    /// Extrai entidades de cada texto. Devolve uma lista ordenada por offset inicial por texto.
    pub async fn inference<S: AsRef<str>, L: AsRef<str>>(
        &self,
        texts: &[S],
        labels: &[L],
        options: &InferenceOptions,
    ) -> Result<Vec<Vec<Entity>>> {
        self.pipeline()?.inference(texts, labels, options).await
    }

    /// Como [`Gliner::inference`], mas dividindo textos longos em janelas de `max_words` palavras.
    pub async fn inference_with_chunking<S: AsRef<str>, L: AsRef<str>>(
        &self,
        texts: &[S],
        labels: &[L],
        options: &InferenceOptions,
        max_words: usize,
        batch_size: usize,
    ) -> Result<Vec<Vec<Entity>>> {
        self.pipeline()?
            .inference_with_chunking(texts, labels, options, max_words, batch_size)
            .await
    }

    /// Fatiamento com `max_words` e `batch_size` da configuração.
    pub async fn inference_with_chunking_default<S: AsRef<str>, L: AsRef<str>>(
        &self,
        texts: &[S],
        labels: &[L],
        options: &InferenceOptions,
    ) -> Result<Vec<Vec<Entity>>> {
        let (max_words, batch_size) = (self.config.max_words, self.config.batch_size);
        self.inference_with_chunking(texts, labels, options, max_words, batch_size)
            .await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::config::{ExecutionSettings, ModelSource, ModelType};
    use crate::engine::InferenceSession;
    use crate::error::BoxError;
    use crate::pipeline::tests::{capitalized_words_scorer, ScriptedSession};
    use crate::processor::tests::CharTokenizer;

    struct ScriptedFactory;

    #[async_trait]
    impl SessionFactory for ScriptedFactory {
        async fn create(
            &self,
            source: &ModelSource,
            _settings: &ExecutionSettings,
        ) -> std::result::Result<Arc<dyn InferenceSession>, BoxError> {
            match source {
                ModelSource::Path(p) if p.ends_with("ausente.onnx") => Err("arquivo não encontrado".into()),
                _ => Ok(Arc::new(ScriptedSession::new(capitalized_words_scorer(12)))),
            }
        }
    }

    fn config(path: &str) -> GlinerConfig {
        GlinerConfig::new(ModelSource::Path(path.into())).with_model_type(ModelType::SpanLevel)
    }

    #[tokio::test]
    async fn test_inference_before_initialize_fails() {
        let gliner = Gliner::new(config("gliner.onnx"));
        assert!(!gliner.is_initialized());
        let err = gliner
            .inference(&["Kyiv"], &["city"], &InferenceOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GlinerError::NotInitialized));

        let err = gliner
            .inference_with_chunking_default(&["Kyiv"], &["city"], &InferenceOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GlinerError::NotInitialized));
    }

    #[tokio::test]
    async fn test_initialize_rejects_bad_config() {
        let mut gliner = Gliner::new(GlinerConfig::default());
        let err = gliner.initialize(&ScriptedFactory, Arc::new(CharTokenizer)).await.unwrap_err();
        assert!(matches!(err, GlinerError::Configuration(_)));

        let mut gliner = Gliner::new(config("ausente.onnx"));
        let err = gliner.initialize(&ScriptedFactory, Arc::new(CharTokenizer)).await.unwrap_err();
        assert!(matches!(err, GlinerError::Configuration(_)));
        assert!(!gliner.is_initialized());
    }

    #[tokio::test]
    async fn test_initialize_then_infer() {
        let mut gliner = Gliner::new(config("gliner.onnx"));
        gliner.initialize(&ScriptedFactory, Arc::new(CharTokenizer)).await.unwrap();
        assert!(gliner.is_initialized());

        let texts = ["Kyiv is the capital of Ukraine."];
        let single = gliner
            .inference(&texts, &["location"], &InferenceOptions::default())
            .await
            .unwrap();
        let chunked = gliner
            .inference_with_chunking(&texts, &["location"], &InferenceOptions::default(), 3, 2)
            .await
            .unwrap();

        assert_eq!(single[0].len(), 2);
        assert_eq!(single, chunked);

        let json = serde_json::to_value(&single[0][0]).unwrap();
        assert_eq!(json["spanText"], "Kyiv");
        assert_eq!(json["start"], 0);
        assert_eq!(json["end"], 4);
        assert_eq!(json["label"], "location");
    }

    #[tokio::test]
    async fn test_invalid_threshold_rejected() {
        let mut gliner = Gliner::new(config("gliner.onnx"));
        gliner.initialize(&ScriptedFactory, Arc::new(CharTokenizer)).await.unwrap();
        let opts = InferenceOptions {
            threshold: -0.1,
            ..InferenceOptions::default()
        };
        let err = gliner.inference(&["Kyiv"], &["city"], &opts).await.unwrap_err();
        assert!(matches!(err, GlinerError::Configuration(_)));
    }
}
