//! # gliner-core — Extração de Entidades de Vocabulário Aberto
//!
//! Este crate implementa o pré e o pós-processamento em torno de um modelo GLiNER: o chamador
//! informa, a cada chamada, a lista de tipos de entidade que quer encontrar (ex: "pessoa",
//! "cidade", "medicamento") e o pipeline devolve os trechos do texto que o modelo associou a
//! cada tipo.
//!
//! O modelo neural e o tokenizador de sub-palavras são colaboradores externos, injetados
//! como capacidades ([`engine`]).
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Entrada**: textos brutos + rótulos de entidade.
//! 2.  **Segmentação** ([`splitter`]): cada texto vira palavras com offsets de caractere.
//! 3.  **Processamento** ([`processor`]): prompt com os rótulos, codificação em sub-palavras,
//!     máscara de palavras, preenchimento e (na variante por span) a tabela de candidatos.
//! 4.  **Modelo** ([`engine`]): `run(tensores) -> logits`.
//! 5.  **Decodificação** ([`decoder`]): sigmoide, limiar, mapeamento para offsets e seleção
//!     gulosa sem conflitos (modo plano ou aninhado).
//! 6.  **Saída**: uma lista de [`Entity`] por texto, ordenada pelo offset inicial.
//!
//! Textos longos podem ser divididos em janelas de palavras ([`chunking`]).
//!
//! ## Módulos Principais
//!
//! - [`gliner`]: fachada pública com inicialização.
//! - [`pipeline`]: orquestrador que conecta todos os estágios.
//! - [`decoder`]: seleção gulosa e as variantes [`SpanDecoder`] e [`TokenDecoder`].

pub mod chunking;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod gliner;
pub mod labels;
pub mod pipeline;
pub mod processor;
pub mod span_decoder;
pub mod splitter;
pub mod tensor;
pub mod token_decoder;

pub use config::{ExecutionProvider, ExecutionSettings, GlinerConfig, InferenceOptions, ModelSource, ModelType};
pub use decoder::{greedy_search, Decoder, Entity, SpanDecoder, TokenDecoder};
pub use engine::{InferenceSession, SessionFactory, SubwordTokenizer};
pub use error::{BoxError, GlinerError, Result};
pub use gliner::Gliner;
pub use labels::LabelMap;
pub use pipeline::GlinerPipeline;
pub use processor::{EncodedBatch, Processor};
pub use splitter::{split_words, Word};
pub use tensor::{NamedTensors, Tensor, TensorData};
