//! # Decodificador por Span
//!
//! A saída do modelo é um buffer plano com formato lógico
//! `[batch, max_palavras, max_width, num_rótulos]` (row-major). Cada posição é um
//! candidato `(palavra inicial, largura, rótulo)`.

use tracing::debug;

use crate::decoder::{check_logits_len, sigmoid, DecodeContext, Entity};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanDecoder {
    max_width: usize,
}

impl SpanDecoder {
    pub fn new(max_width: usize) -> Self {
        Self { max_width }
    }

    /// Candidatos acima do limiar, agrupados por linha do lote, na ordem do buffer.
    pub fn candidates<S: AsRef<str>>(
        &self,
        ctx: &DecodeContext<'_, S>,
        logits: &[f32],
        threshold: f32,
    ) -> Result<Vec<Vec<Entity>>> {
        let batch_size = ctx.batch.batch_size();
        let input_length = ctx.batch.max_text_length();
        let num_entities = ctx.labels().len();
        let max_width = self.max_width;

        check_logits_len(
            logits.len(),
            batch_size * input_length * max_width * num_entities,
            "batch x palavras x largura x rótulos",
        )?;

        let mut spans = vec![Vec::new(); batch_size];
        if logits.is_empty() {
            return Ok(spans);
        }

        let batch_stride = input_length * max_width * num_entities;
        let start_stride = max_width * num_entities;

        for (idx, &value) in logits.iter().enumerate() {
            let prob = sigmoid(value);
            if prob.is_nan() || prob < threshold {
                continue;
            }

            let row = idx / batch_stride;
            let start_word = (idx / start_stride) % input_length;
            let width = (idx / num_entities) % max_width;
            let end_word = start_word + width;
            let entity = idx % num_entities;

            if let Some(span) = ctx.make_entity(row, start_word, end_word, entity, prob)? {
                spans[row].push(span);
            }
        }

        debug!(
            candidates = spans.iter().map(Vec::len).sum::<usize>(),
            "candidatos por span decodificados"
        );
        Ok(spans)
    }
}
