//! # Decodificador por Token
//!
//! O modelo devolve três planos empilhados, cada um com formato lógico
//! `[batch, max_palavras, num_rótulos]`:
//!
//! | Plano | Conteúdo                                  |
//! |-------|-------------------------------------------|
//! | 0     | logit de início de span                   |
//! | 1     | logit de fim de span                      |
//! | 2     | logit de pertencimento (dentro do span)   |
//!
//! Inícios e fins acima do limiar com o mesmo rótulo são pareados (`fim >= início`).
//! O par vira candidato apenas se todas as palavras do intervalo tiverem score de
//! pertencimento `>= limiar`; a probabilidade do candidato é a média desses scores.

use tracing::debug;

use crate::decoder::{check_logits_len, sigmoid, DecodeContext, Entity};
use crate::error::Result;

const START_PLANE: usize = 0;
const END_PLANE: usize = 1;
const INSIDE_PLANE: usize = 2;
const NUM_PLANES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenDecoder;

/// Fronteiras e scores de pertencimento de uma linha do lote.
#[derive(Debug, Default)]
struct RowScores {
    starts: Vec<(usize, usize)>,
    ends: Vec<(usize, usize)>,
    /// `inside[palavra][rótulo]`
    inside: Vec<Vec<f32>>,
}

impl TokenDecoder {
    pub fn candidates<S: AsRef<str>>(
        &self,
        ctx: &DecodeContext<'_, S>,
        logits: &[f32],
        threshold: f32,
    ) -> Result<Vec<Vec<Entity>>> {
        let batch_size = ctx.batch.batch_size();
        let input_length = ctx.batch.max_text_length();
        let num_entities = ctx.labels().len();

        check_logits_len(
            logits.len(),
            NUM_PLANES * batch_size * input_length * num_entities,
            "3 x batch x palavras x rótulos",
        )?;

        let mut rows: Vec<RowScores> = (0..batch_size)
            .map(|row| RowScores {
                inside: vec![vec![0.0; num_entities]; ctx.words(row).len()],
                ..RowScores::default()
            })
            .collect();

        if !logits.is_empty() {
            let plane_stride = batch_size * input_length * num_entities;
            let batch_stride = input_length * num_entities;

            for (idx, &value) in logits.iter().enumerate() {
                let plane = idx / plane_stride;
                let row = (idx / batch_stride) % batch_size;
                let word = (idx / num_entities) % input_length;
                let entity = idx % num_entities;

                if word >= ctx.words(row).len() {
                    continue;
                }

                let prob = sigmoid(value);
                let scores = &mut rows[row];
                match plane {
                    START_PLANE if prob >= threshold => scores.starts.push((word, entity)),
                    END_PLANE if prob >= threshold => scores.ends.push((word, entity)),
                    INSIDE_PLANE => scores.inside[word][entity] = prob,
                    _ => {}
                }
            }
        }

        let mut spans = Vec::with_capacity(batch_size);
        for (row, scores) in rows.iter().enumerate() {
            let mut row_spans = Vec::new();
            for &(start, start_label) in &scores.starts {
                for &(end, end_label) in &scores.ends {
                    if end_label != start_label || end < start {
                        continue;
                    }
                    let inside: Vec<f32> = (start..=end).map(|w| scores.inside[w][start_label]).collect();
                    if !inside.iter().all(|&p| p >= threshold) {
                        continue;
                    }
                    let prob = inside.iter().sum::<f32>() / inside.len() as f32;
                    if let Some(span) = ctx.make_entity(row, start, end, start_label, prob)? {
                        row_spans.push(span);
                    }
                }
            }
            spans.push(row_spans);
        }

        debug!(
            candidates = spans.iter().map(Vec::len).sum::<usize>(),
            "candidatos por token decodificados"
        );
        Ok(spans)
    }
}
