//! # Colaboradores Externos
//!
//! O pipeline não carrega modelos nem tokenizadores: ambos são capacidades injetadas.
//!
//! - [`SubwordTokenizer`]: converte uma palavra em ids de sub-palavras.
//! - [`InferenceSession`]: executa o modelo sobre um lote de tensores nomeados.
//! - [`SessionFactory`]: cria uma sessão a partir da fonte do modelo.
//!
//! Uma sessão assume no máximo uma invocação em andamento; chamadas concorrentes
//! sobre a mesma sessão devem ser serializadas pelo chamador.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ExecutionSettings, ModelSource};
use crate::error::BoxError;
use crate::tensor::NamedTensors;

/// Tokenizador de sub-palavras.
pub trait SubwordTokenizer: Send + Sync {
    /// Codifica uma palavra. O resultado inclui os marcadores de início/fim do próprio
    /// tokenizador, que o processador remove.
    fn encode(&self, word: &str) -> Result<Vec<u32>, BoxError>;

    /// Id do separador anexado ao fim de cada sequência.
    fn sep_token_id(&self) -> u32;
}

/// Sessão de inferência sobre um modelo já carregado.
#[async_trait]
pub trait InferenceSession: Send + Sync {
    /// Executa o modelo. Deve devolver ao menos o tensor `logits`.
    async fn run(&self, inputs: NamedTensors) -> Result<NamedTensors, BoxError>;
}

/// Cria sessões de inferência.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(
        &self,
        source: &ModelSource,
        settings: &ExecutionSettings,
    ) -> Result<Arc<dyn InferenceSession>, BoxError>;
}

#[cfg(feature = "hf-tokenizers")]
pub use hf::HfTokenizer;

#[cfg(feature = "hf-tokenizers")]
mod hf {
    use std::path::Path;

    use tokenizers::Tokenizer;

    use super::SubwordTokenizer;
    use crate::error::{BoxError, GlinerError, Result};

    const SEP_TOKENS: &[&str] = &["[SEP]", "</s>"];

    /// Adaptador para arquivos `tokenizer.json` da Hugging Face.
    pub struct HfTokenizer {
        inner: Tokenizer,
        sep_id: u32,
    }

    impl HfTokenizer {
        pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
            let inner = Tokenizer::from_file(path.as_ref())
                .map_err(|e| GlinerError::configuration(format!("tokenizador: {e}")))?;
            let sep_id = SEP_TOKENS
                .iter()
                .find_map(|t| inner.token_to_id(t))
                .ok_or_else(|| GlinerError::configuration("tokenizador sem token separador"))?;
            Ok(Self { inner, sep_id })
        }
    }

    impl SubwordTokenizer for HfTokenizer {
        fn encode(&self, word: &str) -> std::result::Result<Vec<u32>, BoxError> {
            let encoding = self.inner.encode(word, true)?;
            Ok(encoding.get_ids().to_vec())
        }

        fn sep_token_id(&self) -> u32 {
            self.sep_id
        }
    }
}
