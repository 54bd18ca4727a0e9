use crate::matrix::WeightMatrix;
use crate::tolerance::clamp01;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One-dimensional weight map: a single influence column serialized to a
/// flat numeric file. Thin persistence wrapper over the live matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightMap {
    pub deformer: String,
    pub attribute: String,
    pub vertex_count: usize,
    pub weights: Vec<f64>,
}

#[derive(Debug)]
pub enum MapError {
    Json(serde_json::Error),
    ColumnOutOfRange { column: usize, columns: usize },
    CountMismatch { expected: usize, got: usize },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Json(e) => write!(f, "json: {}", e),
            MapError::ColumnOutOfRange { column, columns } => {
                write!(f, "column {} out of range (matrix has {})", column, columns)
            }
            MapError::CountMismatch { expected, got } => {
                write!(f, "map has {} weights, matrix has {} rows", got, expected)
            }
        }
    }
}

impl std::error::Error for MapError {}

impl From<serde_json::Error> for MapError {
    fn from(e: serde_json::Error) -> Self {
        MapError::Json(e)
    }
}

pub fn export_column(
    matrix: &WeightMatrix,
    deformer: &str,
    column: usize,
) -> Result<WeightMap, MapError> {
    if column >= matrix.column_count() {
        return Err(MapError::ColumnOutOfRange {
            column,
            columns: matrix.column_count(),
        });
    }
    Ok(WeightMap {
        deformer: deformer.to_string(),
        attribute: matrix.influences()[column].attribute.clone(),
        vertex_count: matrix.row_count(),
        weights: (0..matrix.row_count())
            .map(|row| matrix.value(row, column))
            .collect(),
    })
}

/// New full value array with `map` written into `column` for unlocked rows,
/// clamped to [0, 1]. Validated before anything is produced; the caller
/// commits the result and follows up with a normalize pass.
pub fn import_column(
    matrix: &WeightMatrix,
    map: &WeightMap,
    column: usize,
) -> Result<Vec<f64>, MapError> {
    if column >= matrix.column_count() {
        return Err(MapError::ColumnOutOfRange {
            column,
            columns: matrix.column_count(),
        });
    }
    if map.weights.len() != matrix.row_count() {
        return Err(MapError::CountMismatch {
            expected: matrix.row_count(),
            got: map.weights.len(),
        });
    }
    let columns = matrix.column_count();
    let mut values = matrix.values().to_vec();
    for (row, &w) in map.weights.iter().enumerate() {
        if matrix.is_locked(row, column) {
            continue;
        }
        values[row * columns + column] = clamp01(w);
    }
    Ok(values)
}

pub fn to_json(map: &WeightMap) -> Result<String, MapError> {
    Ok(serde_json::to_string_pretty(map)?)
}

pub fn from_json(text: &str) -> Result<WeightMap, MapError> {
    Ok(serde_json::from_str(text)?)
}
