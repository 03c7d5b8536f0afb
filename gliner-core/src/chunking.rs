//! # Fatiamento de Textos Longos
//!
//! Textos com mais de `max_words` palavras são divididos em janelas consecutivas e
//! disjuntas de até `max_words` palavras. Cada janela guarda o índice do texto de origem e
//! os offsets originais das suas palavras, de modo que as entidades decodificadas numa
//! janela já saem com posições relativas ao texto completo.

use crate::splitter::{tokenize_text, TokenizedText};

/// Uma janela de palavras de um texto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Índice do texto de origem.
    pub text_index: usize,
    pub words: TokenizedText,
}

/// Divide `words` em janelas de até `max_words` palavras (`max_words > 0`).
pub fn windows_for_text(text_index: usize, words: &TokenizedText, max_words: usize) -> Vec<Window> {
    let mut windows = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + max_words).min(words.len());
        windows.push(Window {
            text_index,
            words: TokenizedText {
                words: words.words[start..end].to_vec(),
                starts: words.starts[start..end].to_vec(),
                ends: words.ends[start..end].to_vec(),
            },
        });
        start = end;
    }
    windows
}

/// Segmenta cada texto uma única vez e produz todas as janelas, na ordem dos textos.
///
/// Textos sem palavras não geram janelas.
pub fn split_into_windows<S: AsRef<str>>(texts: &[S], max_words: usize) -> Vec<Window> {
    texts
        .iter()
        .enumerate()
        .flat_map(|(i, text)| windows_for_text(i, &tokenize_text(text.as_ref()), max_words))
        .collect()
}
