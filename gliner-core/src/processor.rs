//! # Processador — Textos e Rótulos → Lote Codificado
//!
//! Constrói, a partir dos textos brutos e dos rótulos de entidade, o lote pronto para o modelo.
//!
//! ## Fluxo
//!
//! 1. **Segmentação** ([`crate::splitter`]): cada texto vira uma lista de palavras com offsets.
//! 2. **Prompt**: para cada rótulo, `<<ENT>>` seguido do nome do rótulo; depois um `<<SEP>>`;
//!    depois as palavras do texto.
//! 3. **Codificação**: id inicial `1`, sub-palavras de cada palavra (sem os marcadores do
//!    tokenizador), id separador no fim. A `words_mask` marca a primeira sub-palavra de cada
//!    palavra real com o índice 1-based da palavra e tudo o mais com 0.
//! 4. **Preenchimento**: todas as linhas são completadas com zeros até o maior comprimento do lote.
//! 5. **Tabela de spans** (apenas [`ModelType::SpanLevel`]): para cada palavra `i` e largura
//!    `j < max_width`, o candidato `(i, min(i + j, n - 1))`, inválido quando `i + j >= n`.
//!
//! As duas variantes compartilham tudo exceto o passo 5.

use std::sync::Arc;

use tracing::debug;

use crate::config::ModelType;
use crate::engine::SubwordTokenizer;
use crate::error::{GlinerError, Result};
use crate::labels::{create_mappings, LabelMap};
use crate::splitter::{batch_tokenize_text, TokenizedText};
use crate::tensor::{flatten_rows, NamedTensors, Tensor};

/// Marcador que precede cada rótulo no prompt.
pub const ENT_TOKEN: &str = "<<ENT>>";
/// Marcador que separa o prompt das palavras do texto.
pub const SEP_TOKEN: &str = "<<SEP>>";
/// Id inicial de toda sequência.
pub const START_TOKEN_ID: i64 = 1;

/// Sequências com prompt, antes da codificação em sub-palavras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptedInputs {
    pub sequences: Vec<Vec<String>>,
    /// Número de palavras de cada texto (sem o prompt).
    pub text_lengths: Vec<usize>,
    /// Número de itens do prompt de cada texto.
    pub prompt_lengths: Vec<usize>,
}

/// Ids, máscara de atenção e máscara de palavras, uma linha por texto (ainda sem preenchimento).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedInputs {
    pub input_ids: Vec<Vec<i64>>,
    pub attention_mask: Vec<Vec<i64>>,
    pub words_mask: Vec<Vec<i64>>,
}

/// Tabela de spans candidatos da variante por span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanTable {
    /// Pares `[início, fim]` (índices de palavra, fim inclusivo).
    pub span_idx: Vec<Vec<[i64; 2]>>,
    pub span_mask: Vec<Vec<bool>>,
}

/// Lote pronto para o modelo, com os metadados necessários à decodificação.
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    pub input_ids: Vec<Vec<i64>>,
    pub attention_mask: Vec<Vec<i64>>,
    pub words_mask: Vec<Vec<i64>>,
    pub text_lengths: Vec<usize>,
    pub prompt_lengths: Vec<usize>,
    /// Presente apenas na variante por span.
    pub spans: Option<SpanTable>,
    pub label_map: LabelMap,
    /// Palavras e offsets de cada linha do lote.
    pub words: Vec<TokenizedText>,
}

impl EncodedBatch {
    pub fn batch_size(&self) -> usize {
        self.input_ids.len()
    }

    /// Maior número de palavras entre os textos do lote.
    pub fn max_text_length(&self) -> usize {
        self.text_lengths.iter().copied().max().unwrap_or(0)
    }

    /// Converte o lote nos tensores nomeados esperados pelo modelo.
    pub fn to_model_inputs(&self) -> Result<NamedTensors> {
        let batch_size = self.batch_size();
        let mut feeds = NamedTensors::new();

        let (seq_len, ids) = flatten_rows(&self.input_ids)?;
        feeds.insert("input_ids".into(), Tensor::int64(vec![batch_size, seq_len], ids)?);

        let (mask_len, attention) = flatten_rows(&self.attention_mask)?;
        check_width("attention_mask", mask_len, seq_len)?;
        feeds.insert(
            "attention_mask".into(),
            Tensor::int64(vec![batch_size, seq_len], attention)?,
        );

        let (words_len, words_mask) = flatten_rows(&self.words_mask)?;
        check_width("words_mask", words_len, seq_len)?;
        feeds.insert(
            "words_mask".into(),
            Tensor::int64(vec![batch_size, seq_len], words_mask)?,
        );

        let lengths = self.text_lengths.iter().map(|&n| n as i64).collect();
        feeds.insert("text_lengths".into(), Tensor::int64(vec![batch_size, 1], lengths)?);

        if let Some(spans) = &self.spans {
            let (num_spans, pairs) = flatten_rows(&spans.span_idx)?;
            let flat_pairs = pairs.into_iter().flatten().collect();
            feeds.insert(
                "span_idx".into(),
                Tensor::int64(vec![batch_size, num_spans, 2], flat_pairs)?,
            );
            let (mask_spans, mask) = flatten_rows(&spans.span_mask)?;
            check_width("span_mask", mask_spans, num_spans)?;
            feeds.insert("span_mask".into(), Tensor::bool(vec![batch_size, num_spans], mask)?);
        }

        Ok(feeds)
    }
}

fn check_width(name: &str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(GlinerError::input_shape(format!(
            "{name} tem largura {got}, esperado {expected}"
        )));
    }
    Ok(())
}

/// Monta as sequências com prompt: `<<ENT>> r1 <<ENT>> r2 ... <<SEP>> w1 w2 ...`.
pub fn prepare_text_inputs<S: AsRef<str>>(batch_words: &[Vec<String>], labels: &[S]) -> PromptedInputs {
    let mut prompt = Vec::with_capacity(labels.len() * 2 + 1);
    for label in labels {
        prompt.push(ENT_TOKEN.to_string());
        prompt.push(label.as_ref().to_string());
    }
    prompt.push(SEP_TOKEN.to_string());

    let mut inputs = PromptedInputs::default();
    for words in batch_words {
        let mut sequence = prompt.clone();
        sequence.extend(words.iter().cloned());
        inputs.text_lengths.push(words.len());
        inputs.prompt_lengths.push(prompt.len());
        inputs.sequences.push(sequence);
    }
    inputs
}

/// Codifica as sequências em sub-palavras.
///
/// Falha com `InputShape` se alguma palavra real não produzir sub-palavras, pois
/// isso quebraria a correspondência 1:1 entre palavras e posições da `words_mask`.
pub fn encode_inputs(
    tokenizer: &dyn SubwordTokenizer,
    sequences: &[Vec<String>],
    prompt_lengths: &[usize],
) -> Result<EncodedInputs> {
    if sequences.len() != prompt_lengths.len() {
        return Err(GlinerError::input_shape(format!(
            "{} sequências para {} comprimentos de prompt",
            sequences.len(),
            prompt_lengths.len()
        )));
    }

    let sep_id = i64::from(tokenizer.sep_token_id());
    let mut encoded = EncodedInputs::default();

    for (sequence, &prompt_length) in sequences.iter().zip(prompt_lengths) {
        let mut input_ids = vec![START_TOKEN_ID];
        let mut attention_mask = vec![1];
        let mut words_mask = vec![0];
        let mut word_index = 1;

        for (word_id, word) in sequence.iter().enumerate() {
            let ids = tokenizer
                .encode(word)
                .map_err(|e| GlinerError::Tokenizer(format!("'{word}': {e}")))?;
            let sub_words = strip_special(&ids);

            if word_id >= prompt_length && sub_words.is_empty() {
                return Err(GlinerError::input_shape(format!(
                    "a palavra '{word}' não gerou sub-palavras"
                )));
            }

            for (token_id, &id) in sub_words.iter().enumerate() {
                input_ids.push(i64::from(id));
                attention_mask.push(1);
                if word_id < prompt_length || token_id > 0 {
                    words_mask.push(0);
                } else {
                    words_mask.push(word_index);
                    word_index += 1;
                }
            }
        }

        input_ids.push(sep_id);
        attention_mask.push(1);
        words_mask.push(0);

        encoded.input_ids.push(input_ids);
        encoded.attention_mask.push(attention_mask);
        encoded.words_mask.push(words_mask);
    }

    Ok(encoded)
}

/// Remove os marcadores de início/fim que o tokenizador adiciona.
fn strip_special(ids: &[u32]) -> &[u32] {
    if ids.len() < 2 {
        return &[];
    }
    &ids[1..ids.len() - 1]
}

/// Completa cada linha com `T::default()` até o maior comprimento do lote.
///
/// Serve tanto para linhas escalares (`Vec<Vec<i64>>`) quanto para linhas de vetores de
/// largura fixa (`Vec<Vec<[i64; 2]>>`), que recebem o vetor zero.
pub fn pad_array<T: Clone + Default>(mut rows: Vec<Vec<T>>) -> Vec<Vec<T>> {
    let max_len = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(max_len, T::default());
    }
    rows
}

/// Gera a tabela de spans candidatos: `n * max_width` entradas por texto.
///
/// Candidatos cujo fim ultrapassaria o texto são mantidos (com o fim truncado em `n - 1`)
/// para preservar o formato da tabela, mas marcados como inválidos.
pub fn prepare_spans(text_lengths: &[usize], max_width: usize) -> SpanTable {
    let mut table = SpanTable::default();
    for &n in text_lengths {
        let mut span_idx = Vec::with_capacity(n * max_width);
        let mut span_mask = Vec::with_capacity(n * max_width);
        for i in 0..n {
            for j in 0..max_width {
                let end = (i + j).min(n - 1);
                span_idx.push([i as i64, end as i64]);
                span_mask.push(i + j < n);
            }
        }
        table.span_idx.push(span_idx);
        table.span_mask.push(span_mask);
    }
    table
}

/// Constrói lotes codificados para uma variante de modelo.
#[derive(Clone)]
pub struct Processor {
    model_type: ModelType,
    max_width: usize,
    tokenizer: Arc<dyn SubwordTokenizer>,
}

impl Processor {
    pub fn new(model_type: ModelType, max_width: usize, tokenizer: Arc<dyn SubwordTokenizer>) -> Self {
        Self {
            model_type,
            max_width,
            tokenizer,
        }
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn max_width(&self) -> usize {
        self.max_width
    }

    /// Segmenta os textos e monta o lote completo.
    pub fn prepare_batch<S: AsRef<str>, L: AsRef<str>>(&self, texts: &[S], labels: &[L]) -> Result<EncodedBatch> {
        self.prepare_batch_from_words(batch_tokenize_text(texts), labels)
    }

    /// Monta o lote a partir de palavras já segmentadas (usado pelas janelas do fatiamento).
    pub fn prepare_batch_from_words<L: AsRef<str>>(
        &self,
        words: Vec<TokenizedText>,
        labels: &[L],
    ) -> Result<EncodedBatch> {
        let label_map = create_mappings(labels);
        let batch_words: Vec<Vec<String>> = words.iter().map(|w| w.words.clone()).collect();
        let prompted = prepare_text_inputs(&batch_words, labels);
        let encoded = encode_inputs(self.tokenizer.as_ref(), &prompted.sequences, &prompted.prompt_lengths)?;

        for (row, mask) in encoded.words_mask.iter().enumerate() {
            let marked = mask.iter().filter(|&&m| m != 0).count();
            if marked != prompted.text_lengths[row] {
                return Err(GlinerError::input_shape(format!(
                    "texto {row}: {marked} posições na words_mask para {} palavras",
                    prompted.text_lengths[row]
                )));
            }
        }

        let spans = match self.model_type {
            ModelType::SpanLevel => {
                let table = prepare_spans(&prompted.text_lengths, self.max_width);
                Some(SpanTable {
                    span_idx: pad_array(table.span_idx),
                    span_mask: pad_array(table.span_mask),
                })
            }
            ModelType::TokenLevel => None,
        };

        let batch = EncodedBatch {
            input_ids: pad_array(encoded.input_ids),
            attention_mask: pad_array(encoded.attention_mask),
            words_mask: pad_array(encoded.words_mask),
            text_lengths: prompted.text_lengths,
            prompt_lengths: prompted.prompt_lengths,
            spans,
            label_map,
            words,
        };

        debug!(
            batch_size = batch.batch_size(),
            max_words = batch.max_text_length(),
            seq_len = batch.input_ids.first().map_or(0, Vec::len),
            "lote codificado"
        );

        Ok(batch)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::BoxError;

    /// Tokenizador de teste: `[CLS]=101`, um id por caractere, `[SEP]=102`.
    /// Os marcadores de prompt viram um único id.
    pub(crate) struct CharTokenizer;

    impl SubwordTokenizer for CharTokenizer {
        fn encode(&self, word: &str) -> std::result::Result<Vec<u32>, BoxError> {
            let mut ids = vec![101];
            match word {
                ENT_TOKEN => ids.push(500),
                SEP_TOKEN => ids.push(501),
                _ => ids.extend(word.chars().map(|c| c as u32)),
            }
            ids.push(102);
            Ok(ids)
        }

        fn sep_token_id(&self) -> u32 {
            102
        }
    }

    fn processor(model_type: ModelType) -> Processor {
        Processor::new(model_type, 12, Arc::new(CharTokenizer))
    }

    #[test]
    fn test_prompt_layout() {
        let words = vec![vec!["Lula".to_string(), "nasceu".to_string()]];
        let prompted = prepare_text_inputs(&words, &["pessoa", "local"]);
        assert_eq!(
            prompted.sequences[0],
            vec!["<<ENT>>", "pessoa", "<<ENT>>", "local", "<<SEP>>", "Lula", "nasceu"]
        );
        assert_eq!(prompted.prompt_lengths, vec![5]);
        assert_eq!(prompted.text_lengths, vec![2]);
    }

    #[test]
    fn test_encode_words_mask_marks_first_subword() {
        let sequences = vec![vec!["<<ENT>>".to_string(), "pe".to_string(), "<<SEP>>".to_string(), "ab".to_string(), "c".to_string()]];
        let encoded = encode_inputs(&CharTokenizer, &sequences, &[3]).unwrap();

        // start, <<ENT>>, p, e, <<SEP>>, a, b, c, sep
        assert_eq!(
            encoded.input_ids[0],
            vec![1, 500, 'p' as i64, 'e' as i64, 501, 'a' as i64, 'b' as i64, 'c' as i64, 102]
        );
        assert_eq!(encoded.words_mask[0], vec![0, 0, 0, 0, 0, 1, 0, 2, 0]);
        assert_eq!(encoded.attention_mask[0], vec![1; 9]);
    }

    #[test]
    fn test_encode_rejects_word_without_subwords() {
        struct EmptyTokenizer;
        impl SubwordTokenizer for EmptyTokenizer {
            fn encode(&self, _word: &str) -> std::result::Result<Vec<u32>, BoxError> {
                Ok(vec![101, 102])
            }
            fn sep_token_id(&self) -> u32 {
                102
            }
        }
        let sequences = vec![vec!["<<SEP>>".to_string(), "x".to_string()]];
        let err = encode_inputs(&EmptyTokenizer, &sequences, &[1]).unwrap_err();
        assert!(matches!(err, GlinerError::InputShape(_)));
    }

    #[test]
    fn test_tokenizer_failure_is_reported() {
        struct Failing;
        impl SubwordTokenizer for Failing {
            fn encode(&self, _word: &str) -> std::result::Result<Vec<u32>, BoxError> {
                Err("vocabulário corrompido".into())
            }
            fn sep_token_id(&self) -> u32 {
                0
            }
        }
        let err = encode_inputs(&Failing, &[vec!["a".to_string()]], &[0]).unwrap_err();
        assert!(matches!(err, GlinerError::Tokenizer(_)));
    }

    #[test]
    fn test_pad_array_rank_two_and_three() {
        let padded = pad_array(vec![vec![1i64, 2, 3], vec![4]]);
        assert_eq!(padded, vec![vec![1, 2, 3], vec![4, 0, 0]]);

        let padded = pad_array(vec![vec![[0i64, 1]], vec![]]);
        assert_eq!(padded, vec![vec![[0, 1]], vec![[0, 0]]]);
    }

    #[test]
    fn test_span_table_shape_and_mask() {
        let table = prepare_spans(&[7], 12);
        assert_eq!(table.span_idx[0].len(), 84);
        assert_eq!(table.span_mask[0].len(), 84);

        // palavra 5, largura 1 → (5, 6) válido; largura 2 → truncado em (5, 6) e inválido
        assert_eq!(table.span_idx[0][5 * 12 + 1], [5, 6]);
        assert!(table.span_mask[0][5 * 12 + 1]);
        assert_eq!(table.span_idx[0][5 * 12 + 2], [5, 6]);
        assert!(!table.span_mask[0][5 * 12 + 2]);

        let valid = table.span_mask[0].iter().filter(|&&v| v).count();
        assert_eq!(valid, 7 + 6 + 5 + 4 + 3 + 2 + 1);
    }

    #[test]
    fn test_prepare_batch_span_level_is_rectangular() {
        let batch = processor(ModelType::SpanLevel)
            .prepare_batch(&["Kyiv is the capital of Ukraine.", "Oi"], &["país"])
            .unwrap();

        assert_eq!(batch.text_lengths, vec![7, 1]);
        assert_eq!(batch.max_text_length(), 7);
        let width = batch.input_ids[0].len();
        assert!(batch.input_ids.iter().all(|r| r.len() == width));
        assert!(batch.words_mask.iter().all(|r| r.len() == width));
        // linha curta preenchida com zeros na atenção
        assert_eq!(*batch.attention_mask[1].last().unwrap(), 0);

        let spans = batch.spans.as_ref().unwrap();
        assert_eq!(spans.span_idx[0].len(), 84);
        assert_eq!(spans.span_idx[1].len(), 84);
        assert!(!spans.span_mask[1][12]);

        let mask: Vec<i64> = batch.words_mask[0].iter().copied().filter(|&m| m != 0).collect();
        assert_eq!(mask, (1..=7).collect::<Vec<i64>>());
    }

    #[test]
    fn test_prepare_batch_token_level_has_no_span_table() {
        let batch = processor(ModelType::TokenLevel)
            .prepare_batch(&["Kyiv"], &["cidade"])
            .unwrap();
        assert!(batch.spans.is_none());
        let feeds = batch.to_model_inputs().unwrap();
        assert!(!feeds.contains_key("span_idx"));
        assert!(feeds.contains_key("words_mask"));
    }

    #[test]
    fn test_model_inputs_shapes() {
        let batch = processor(ModelType::SpanLevel)
            .prepare_batch(&["a b c", "d"], &["x", "y"])
            .unwrap();
        let feeds = batch.to_model_inputs().unwrap();
        let seq_len = batch.input_ids[0].len();

        assert_eq!(feeds["input_ids"].shape(), &[2, seq_len]);
        assert_eq!(feeds["attention_mask"].shape(), &[2, seq_len]);
        assert_eq!(feeds["text_lengths"].shape(), &[2, 1]);
        assert_eq!(feeds["span_idx"].shape(), &[2, 36, 2]);
        assert_eq!(feeds["span_mask"].shape(), &[2, 36]);
        assert_eq!(
            feeds["text_lengths"].data(),
            &crate::tensor::TensorData::Int64(vec![3, 1])
        );
    }
}
