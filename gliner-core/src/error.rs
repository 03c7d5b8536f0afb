//! # Erros do Pipeline
//!
//! Todas as falhas são "tudo ou nada" por chamada: nenhuma saída parcial é
//! devolvida junto com um erro.

use thiserror::Error;

/// Erro genérico devolvido pelos colaboradores externos (tokenizador e motor de inferência).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Resultado padrão do crate.
pub type Result<T> = std::result::Result<T, GlinerError>;

/// Erros que o pipeline pode produzir.
#[derive(Debug, Error)]
pub enum GlinerError {
    /// Configuração de execução inválida ou fonte do modelo ausente.
    /// Fatal, levantado na inicialização antes de qualquer inferência.
    #[error("configuração inválida: {0}")]
    Configuration(String),

    /// Inferência chamada antes de `initialize` concluir.
    #[error("modelo não inicializado: chame initialize() primeiro")]
    NotInitialized,

    /// Invariante interno de construção do lote violado (ex: linhas com tamanhos diferentes).
    #[error("formato de entrada inválido: {0}")]
    InputShape(String),

    /// Saída do modelo incompatível com o lote enviado.
    #[error("formato de saída inválido: {0}")]
    OutputShape(String),

    /// O tokenizador de sub-palavras falhou ao codificar uma palavra.
    #[error("falha no tokenizador: {0}")]
    Tokenizer(String),

    /// O motor de inferência falhou. Propagado sem retentativa.
    #[error("falha na invocação do modelo: {0}")]
    ModelInvocation(#[source] BoxError),

    #[error("erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON inválido: {0}")]
    Json(#[from] serde_json::Error),
}

impl GlinerError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn input_shape(msg: impl Into<String>) -> Self {
        Self::InputShape(msg.into())
    }

    pub fn output_shape(msg: impl Into<String>) -> Self {
        Self::OutputShape(msg.into())
    }
}
