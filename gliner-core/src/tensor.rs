//! # Tensores Nomeados
//!
//! Representação mínima, independente de runtime, dos tensores trocados com o motor de
//! inferência: um buffer plano em ordem row-major mais o seu formato.

use std::collections::BTreeMap;

use crate::error::{GlinerError, Result};

/// Buffer de dados de um tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Int64(Vec<i64>),
    Bool(Vec<bool>),
    Float32(Vec<f32>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            TensorData::Int64(v) => v.len(),
            TensorData::Bool(v) => v.len(),
            TensorData::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            TensorData::Int64(_) => "int64",
            TensorData::Bool(_) => "bool",
            TensorData::Float32(_) => "float32",
        }
    }
}

/// Um tensor retangular: `shape` multiplicado deve bater com o tamanho do buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: TensorData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(GlinerError::input_shape(format!(
                "tensor {:?} espera {} elementos, recebeu {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn int64(shape: Vec<usize>, values: Vec<i64>) -> Result<Self> {
        Self::new(shape, TensorData::Int64(values))
    }

    pub fn bool(shape: Vec<usize>, values: Vec<bool>) -> Result<Self> {
        Self::new(shape, TensorData::Bool(values))
    }

    pub fn float32(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        Self::new(shape, TensorData::Float32(values))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Consome o tensor e devolve o buffer `f32`, ou `OutputShape` se o tipo for outro.
    pub fn into_f32(self) -> Result<Vec<f32>> {
        match self.data {
            TensorData::Float32(v) => Ok(v),
            other => Err(GlinerError::output_shape(format!(
                "esperado float32, recebido {}",
                other.dtype()
            ))),
        }
    }
}

/// Tensores indexados por nome (`input_ids`, `logits`, ...).
pub type NamedTensors = BTreeMap<String, Tensor>;

/// Achata linhas já preenchidas (todas do mesmo tamanho) em um buffer row-major.
pub(crate) fn flatten_rows<T: Clone>(rows: &[Vec<T>]) -> Result<(usize, Vec<T>)> {
    let width = rows.first().map_or(0, Vec::len);
    let mut flat = Vec::with_capacity(rows.len() * width);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(GlinerError::input_shape(format!(
                "linha {} tem {} elementos, esperado {}",
                i,
                row.len(),
                width
            )));
        }
        flat.extend_from_slice(row);
    }
    Ok((width, flat))
}
