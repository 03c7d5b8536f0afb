//! # Decodificador — Scores do Modelo → Entidades
//!
//! Inverte o tensor de scores do modelo em spans de entidade e resolve sobreposições.
//! Há duas variantes ([`SpanDecoder`], [`TokenDecoder`]) que compartilham a seleção gulosa
//! ([`greedy_search`]).
//!
//! ## Seleção Gulosa
//!
//! 1. Ordena os candidatos por probabilidade decrescente (ordenação estável: empates
//!    mantêm a ordem de entrada).
//! 2. Aceita cada candidato que não conflita com nenhum já aceito.
//! 3. Ordena os aceitos por offset inicial.
//!
//! Os spans são intervalos semiabertos de caracteres `[start, end)`. Dois spans conflitam quando:
//! - têm exatamente as mesmas fronteiras e `multi_label` é falso;
//! - `flat_ner` é verdadeiro e os intervalos se intersectam;
//! - `flat_ner` é falso e os intervalos se cruzam sem que um contenha o outro.

use serde::{Deserialize, Serialize};

use crate::config::{InferenceOptions, ModelType};
use crate::error::{GlinerError, Result};
use crate::labels::LabelMap;
use crate::processor::EncodedBatch;
use crate::splitter::{char_slice, TokenizedText};

pub use crate::span_decoder::SpanDecoder;
pub use crate::token_decoder::TokenDecoder;

/// Uma entidade encontrada no texto.
///
/// `start`/`end` são offsets de caractere no texto original e
/// `span_text == texto[start..end]` (em caracteres).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub span_text: String,
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub score: f32,
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Um intervalo contém o outro (em qualquer direção).
pub fn is_nested(a: &Entity, b: &Entity) -> bool {
    (a.start <= b.start && a.end >= b.end) || (b.start <= a.start && b.end >= a.end)
}

fn same_boundaries(a: &Entity, b: &Entity) -> bool {
    a.start == b.start && a.end == b.end
}

fn intersects(a: &Entity, b: &Entity) -> bool {
    a.start < b.end && b.start < a.end
}

/// Conflito no modo plano: qualquer interseção.
pub fn has_overlapping(a: &Entity, b: &Entity, multi_label: bool) -> bool {
    if same_boundaries(a, b) {
        return !multi_label;
    }
    intersects(a, b)
}

/// Conflito no modo aninhado: interseção sem contenção.
pub fn has_overlapping_nested(a: &Entity, b: &Entity, multi_label: bool) -> bool {
    if same_boundaries(a, b) {
        return !multi_label;
    }
    intersects(a, b) && !is_nested(a, b)
}

/// Seleciona um conjunto de spans sem conflitos, priorizando os de maior probabilidade.
pub fn greedy_search(mut candidates: Vec<Entity>, flat_ner: bool, multi_label: bool) -> Vec<Entity> {
    let conflicts = if flat_ner {
        has_overlapping
    } else {
        has_overlapping_nested
    };

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut selected: Vec<Entity> = Vec::new();
    for candidate in candidates {
        if !selected.iter().any(|s| conflicts(&candidate, s, multi_label)) {
            selected.push(candidate);
        }
    }

    selected.sort_by_key(|s| s.start);
    selected
}

/// Contexto de um lote necessário para transformar índices de palavra em entidades.
pub struct DecodeContext<'a, S: AsRef<str>> {
    pub batch: &'a EncodedBatch,
    /// Textos originais (podem ser mais numerosos que as linhas do lote).
    pub texts: &'a [S],
    /// Para cada linha do lote, o índice do texto original de onde ela veio.
    pub batch_ids: &'a [usize],
}

impl<'a, S: AsRef<str>> DecodeContext<'a, S> {
    pub fn new(batch: &'a EncodedBatch, texts: &'a [S], batch_ids: &'a [usize]) -> Result<Self> {
        if batch_ids.len() != batch.batch_size() {
            return Err(GlinerError::input_shape(format!(
                "{} ids de texto para {} linhas do lote",
                batch_ids.len(),
                batch.batch_size()
            )));
        }
        if let Some(&bad) = batch_ids.iter().find(|&&id| id >= texts.len()) {
            return Err(GlinerError::input_shape(format!(
                "linha aponta para o texto {bad}, mas só há {}",
                texts.len()
            )));
        }
        Ok(Self {
            batch,
            texts,
            batch_ids,
        })
    }

    pub fn words(&self, row: usize) -> &TokenizedText {
        &self.batch.words[row]
    }

    pub fn labels(&self) -> &LabelMap {
        &self.batch.label_map
    }

    /// Converte um span de palavras `[start_word, end_word]` (fim inclusivo) em entidade.
    ///
    /// Devolve `None` se algum índice estiver além do número real de palavras da linha.
    pub fn make_entity(
        &self,
        row: usize,
        start_word: usize,
        end_word: usize,
        entity: usize,
        score: f32,
    ) -> Result<Option<Entity>> {
        let words = self.words(row);
        if start_word >= words.len() || end_word >= words.len() {
            return Ok(None);
        }
        let label = self.labels().label_of(entity + 1).ok_or_else(|| {
            GlinerError::output_shape(format!("índice de rótulo {entity} fora do mapa"))
        })?;
        let start = words.starts[start_word];
        let end = words.ends[end_word];
        let text = self.texts[self.batch_ids[row]].as_ref();

        Ok(Some(Entity {
            span_text: char_slice(text, start, end).to_string(),
            start,
            end,
            label: label.to_string(),
            score,
        }))
    }
}

/// Decodificador de uma das duas variantes de modelo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    Span(SpanDecoder),
    Token(TokenDecoder),
}

impl Decoder {
    pub fn for_model(model_type: ModelType, max_width: usize) -> Self {
        match model_type {
            ModelType::SpanLevel => Decoder::Span(SpanDecoder::new(max_width)),
            ModelType::TokenLevel => Decoder::Token(TokenDecoder),
        }
    }

    /// Decodifica `logits` em uma lista ordenada de entidades por linha do lote.
    pub fn decode<S: AsRef<str>>(
        &self,
        ctx: &DecodeContext<'_, S>,
        logits: &[f32],
        options: &InferenceOptions,
    ) -> Result<Vec<Vec<Entity>>> {
        let candidates = match self {
            Decoder::Span(d) => d.candidates(ctx, logits, options.threshold)?,
            Decoder::Token(d) => d.candidates(ctx, logits, options.threshold)?,
        };
        Ok(candidates
            .into_iter()
            .map(|spans| greedy_search(spans, options.flat_ner, options.multi_label))
            .collect())
    }
}

/// Verifica que o buffer de saída tem exatamente o tamanho esperado.
pub(crate) fn check_logits_len(got: usize, expected: usize, layout: &str) -> Result<()> {
    if got != expected {
        return Err(GlinerError::output_shape(format!(
            "logits com {got} valores, esperado {expected} ({layout})"
        )));
    }
    Ok(())
}
