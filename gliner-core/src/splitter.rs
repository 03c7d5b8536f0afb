//! # Segmentador de Palavras
//!
//! Divide o texto bruto em palavras, preservando a posição de cada uma no texto original.
//! As posições são **offsets de caractere** (não de byte), para que um texto com acentos
//! como "São Paulo" tenha "Paulo" em `4..9`.
//!
//! ## Regras
//!
//! - Uma palavra é uma sequência de caracteres alfanuméricos/sublinhado, podendo conter
//!   hífens ou sublinhados internos (ex: "bem-vindo", "snake_case").
//! - Qualquer outro caractere que não seja espaço vira uma palavra de um caractere (ex: ".", ",").
//! - Espaços em branco são descartados.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use gliner_core::splitter::split_words;
//!
//! let words = split_words("Kyiv is the capital of Ukraine.");
//! assert_eq!(words.len(), 7);
//! assert_eq!((words[6].text.as_str(), words[6].start, words[6].end), (".", 30, 31));
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const WORD_PATTERN: &str = r"\w+(?:[-_]\w+)*|\S";

/// Uma palavra extraída do texto original.
///
/// `start` e `end` são offsets de caractere: `text.chars().skip(start).take(end - start)`
/// reproduz exatamente `text` da palavra.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Word {
    /// O texto da palavra (ex: "Kyiv", ".").
    pub text: String,
    /// Offset de caractere inicial (inclusivo).
    pub start: usize,
    /// Offset de caractere final (exclusivo).
    pub end: usize,
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(WORD_PATTERN).expect("padrão de palavras é uma regex válida"))
}

/// Segmenta `text` em palavras na ordem em que aparecem.
///
/// Cada chamada produz uma sequência nova; não há estado compartilhado entre chamadas.
pub fn split_words(text: &str) -> Vec<Word> {
    let mut words = Vec::new();
    // Conversão incremental byte -> caractere: cada trecho é contado uma única vez
    let mut byte_cursor = 0;
    let mut char_cursor = 0;

    for m in word_regex().find_iter(text) {
        char_cursor += text[byte_cursor..m.start()].chars().count();
        let start = char_cursor;
        let len = m.as_str().chars().count();
        char_cursor += len;
        byte_cursor = m.end();

        words.push(Word {
            text: m.as_str().to_string(),
            start,
            end: start + len,
        });
    }

    words
}

/// Palavras de um texto materializadas em listas paralelas (texto, início, fim).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedText {
    pub words: Vec<String>,
    pub starts: Vec<usize>,
    pub ends: Vec<usize>,
}

impl TokenizedText {
    pub fn from_words(words: &[Word]) -> Self {
        let mut out = Self::default();
        for w in words {
            out.words.push(w.text.clone());
            out.starts.push(w.start);
            out.ends.push(w.end);
        }
        out
    }

    /// Número de palavras reais do texto.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Segmenta um texto e devolve as listas paralelas de palavras e offsets.
pub fn tokenize_text(text: &str) -> TokenizedText {
    TokenizedText::from_words(&split_words(text))
}

/// Aplica [`tokenize_text`] a cada texto, preservando a ordem.
pub fn batch_tokenize_text<S: AsRef<str>>(texts: &[S]) -> Vec<TokenizedText> {
    texts.iter().map(|t| tokenize_text(t.as_ref())).collect()
}

/// Fatia `text` por offsets de caractere `[start, end)`.
///
/// Offsets além do fim do texto são truncados ao seu comprimento.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let mut indices = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len()));
    let byte_start = indices.nth(start).unwrap_or(text.len());
    let byte_end = if end > start {
        indices.nth(end - start - 1).unwrap_or(text.len())
    } else {
        byte_start
    };
    &text[byte_start..byte_end]
}
