//! # Mapeamento de Rótulos
//!
//! Bijeção entre os nomes de entidade fornecidos pelo chamador e ids inteiros a partir de 1.
//! O id 0 é reservado pela convenção de saída do modelo e nunca é atribuído.

use std::collections::HashMap;

/// Mapa rótulo ↔ id, reconstruído a cada chamada a partir da lista do chamador.
///
/// Rótulos duplicados são erro do chamador e não são validados aqui.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    class_to_id: HashMap<String, usize>,
    id_to_class: Vec<String>,
}

impl LabelMap {
    /// Cria o mapa preservando a ordem dos rótulos (primeiro rótulo → id 1).
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut map = Self::default();
        for (index, label) in labels.iter().enumerate() {
            let label = label.as_ref().to_string();
            map.class_to_id.insert(label.clone(), index + 1);
            map.id_to_class.push(label);
        }
        map
    }

    pub fn id_of(&self, label: &str) -> Option<usize> {
        self.class_to_id.get(label).copied()
    }

    /// Nome do rótulo para um id 1-based. `None` para 0 ou ids fora do intervalo.
    pub fn label_of(&self, id: usize) -> Option<&str> {
        id.checked_sub(1)
            .and_then(|i| self.id_to_class.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_class.is_empty()
    }

    /// Rótulos na ordem original.
    pub fn labels(&self) -> &[String] {
        &self.id_to_class
    }
}

/// Constrói o [`LabelMap`] de uma lista de rótulos.
pub fn create_mappings<S: AsRef<str>>(labels: &[S]) -> LabelMap {
    LabelMap::new(labels)
}
