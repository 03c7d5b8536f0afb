//! # Pipeline GLiNER — Orquestrador
//!
//! Conecta os estágios: segmentação → processador → modelo (externo) → decodificador.
//!
//! Todo o trabalho é síncrono e limitado por CPU; o único ponto de suspensão é a chamada ao
//! modelo, aguardada uma vez por (sub-)lote. O pipeline não faz travamento interno: quem
//! compartilha uma sessão entre chamadas concorrentes deve serializá-las.
//!
//! ## Modos
//! - [`GlinerPipeline::inference`]: todos os textos num único lote.
//! - [`GlinerPipeline::inference_with_chunking`]: textos longos divididos em janelas de
//!   palavras, agrupadas em sub-lotes; os resultados de cada janela são concatenados ao
//!   texto de origem, na ordem das janelas.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::chunking::split_into_windows;
use crate::config::{validate_chunking, InferenceOptions};
use crate::decoder::{DecodeContext, Decoder, Entity};
use crate::engine::InferenceSession;
use crate::error::{GlinerError, Result};
use crate::processor::Processor;
use crate::splitter::{batch_tokenize_text, TokenizedText};

/// Nome do tensor de saída lido do modelo.
pub const LOGITS: &str = "logits";

/// O pipeline com suas capacidades injetadas (tokenizador via [`Processor`] e sessão do modelo).
#[derive(Clone)]
pub struct GlinerPipeline {
    processor: Processor,
    decoder: Decoder,
    session: Arc<dyn InferenceSession>,
}

impl GlinerPipeline {
    pub fn new(processor: Processor, session: Arc<dyn InferenceSession>) -> Self {
        let decoder = Decoder::for_model(processor.model_type(), processor.max_width());
        Self {
            processor,
            decoder,
            session,
        }
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Extrai entidades de todos os textos em um único lote.
    pub async fn inference<S: AsRef<str>, L: AsRef<str>>(
        &self,
        texts: &[S],
        labels: &[L],
        options: &InferenceOptions,
    ) -> Result<Vec<Vec<Entity>>> {
        options.validate()?;
        let start = Instant::now();

        let words = batch_tokenize_text(texts);
        let batch_ids: Vec<usize> = (0..texts.len()).collect();
        let results = self.run_batch(texts, words, &batch_ids, labels, options).await?;

        info!(
            texts = texts.len(),
            entities = results.iter().map(Vec::len).sum::<usize>(),
            processing_ms = start.elapsed().as_millis() as u64,
            "inferência concluída"
        );
        Ok(results)
    }

    /// Extrai entidades dividindo textos longos em janelas de até `max_words` palavras,
    /// executadas em sub-lotes de até `batch_size` janelas.
    pub async fn inference_with_chunking<S: AsRef<str>, L: AsRef<str>>(
        &self,
        texts: &[S],
        labels: &[L],
        options: &InferenceOptions,
        max_words: usize,
        batch_size: usize,
    ) -> Result<Vec<Vec<Entity>>> {
        options.validate()?;
        validate_chunking(max_words, batch_size)?;
        let start = Instant::now();

        let windows = split_into_windows(texts, max_words);
        debug!(windows = windows.len(), max_words, batch_size, "janelas construídas");

        let mut results: Vec<Vec<Entity>> = vec![Vec::new(); texts.len()];
        for chunk in windows.chunks(batch_size) {
            let batch_ids: Vec<usize> = chunk.iter().map(|w| w.text_index).collect();
            let words: Vec<TokenizedText> = chunk.iter().map(|w| w.words.clone()).collect();

            let decoded = self.run_batch(texts, words, &batch_ids, labels, options).await?;
            for (text_index, spans) in batch_ids.into_iter().zip(decoded) {
                results[text_index].extend(spans);
            }
        }

        info!(
            texts = texts.len(),
            windows = windows.len(),
            entities = results.iter().map(Vec::len).sum::<usize>(),
            processing_ms = start.elapsed().as_millis() as u64,
            "inferência com fatiamento concluída"
        );
        Ok(results)
    }

    /// Codifica um lote, chama o modelo e decodifica. Devolve uma lista por linha do lote.
    async fn run_batch<S: AsRef<str>, L: AsRef<str>>(
        &self,
        texts: &[S],
        words: Vec<TokenizedText>,
        batch_ids: &[usize],
        labels: &[L],
        options: &InferenceOptions,
    ) -> Result<Vec<Vec<Entity>>> {
        let rows = words.len();
        if labels.is_empty() || words.iter().all(TokenizedText::is_empty) {
            debug!(rows, labels = labels.len(), "lote sem palavras ou sem rótulos; modelo não chamado");
            return Ok(vec![Vec::new(); rows]);
        }

        let batch = self.processor.prepare_batch_from_words(words, labels)?;
        let feeds = batch.to_model_inputs()?;

        debug!(rows, "invocando o modelo");
        let mut outputs = self
            .session
            .run(feeds)
            .await
            .map_err(GlinerError::ModelInvocation)?;

        let logits = outputs
            .remove(LOGITS)
            .ok_or_else(|| GlinerError::output_shape("saída 'logits' ausente"))?
            .into_f32()?;

        let ctx = DecodeContext::new(&batch, texts, batch_ids)?;
        self.decoder.decode(&ctx, &logits, options)
    }
}
