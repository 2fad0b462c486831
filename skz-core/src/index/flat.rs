// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exact nearest-neighbour index over a dense row-major matrix.
//!
//! The on-disk artifact is this structure's bincode serialization;
//! consumers treat the bytes as opaque and only ever load them through
//! [`FlatIndex::from_bytes`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlatIndexError {
    #[error("vector has dimension {got}, index expects {expected}")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("index data is corrupt: {0}")]
    Corrupt(String),
}

/// An exact L2 search structure: `rows x dim` single-precision values,
/// row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: u32,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: u32) -> Self {
        FlatIndex {
            dim,
            data: Vec::new(),
        }
    }

    pub fn dim(&self) -> u32 {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            return 0;
        }
        self.data.len() / self.dim as usize
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends one row. The row index of the appended vector is the value
    /// `len()` returned before the call.
    pub fn add(&mut self, vector: &[f32]) -> Result<(), FlatIndexError> {
        if vector.len() != self.dim as usize {
            return Err(FlatIndexError::DimensionMismatch {
                got: vector.len(),
                expected: self.dim as usize,
            });
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Returns the `k` nearest rows to `query` as `(row, squared L2
    /// distance)` pairs, nearest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u32, f32)>, FlatIndexError> {
        if query.len() != self.dim as usize {
            return Err(FlatIndexError::DimensionMismatch {
                got: query.len(),
                expected: self.dim as usize,
            });
        }
        let mut scored: Vec<(u32, f32)> = self
            .data
            .chunks_exact(self.dim as usize)
            .enumerate()
            .map(|(row, candidate)| {
                let dist = candidate
                    .iter()
                    .zip(query)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>();
                (row as u32, dist)
            })
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        Ok(scored)
    }

    /// The native serialized form written to disk.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FlatIndexError> {
        bincode::serialize(self).map_err(|e| FlatIndexError::Corrupt(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FlatIndexError> {
        let index: FlatIndex =
            bincode::deserialize(bytes).map_err(|e| FlatIndexError::Corrupt(e.to_string()))?;
        if index.dim == 0 || index.data.len() % index.dim as usize != 0 {
            return Err(FlatIndexError::Corrupt(format!(
                "{} values do not fill rows of dimension {}",
                index.data.len(),
                index.dim
            )));
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn nearest_row_is_exact() {
        let mut index = FlatIndex::new(4);
        for axis in 0..4 {
            index.add(&unit(4, axis)).unwrap();
        }

        let hits = index.search(&unit(4, 2), 2).unwrap();
        assert_eq!(hits[0].0, 2);
        assert_eq!(hits[0].1, 0.0);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn serialized_form_round_trips() {
        let mut index = FlatIndex::new(3);
        index.add(&[1.0, 2.0, 3.0]).unwrap();
        index.add(&[4.0, 5.0, 6.0]).unwrap();

        let bytes = index.to_bytes().unwrap();
        let back = FlatIndex::from_bytes(&bytes).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.dim(), 3);
        let hits = back.search(&[4.0, 5.0, 6.0], 1).unwrap();
        assert_eq!(hits[0], (1, 0.0));
    }

    #[test]
    fn wrong_dimension_rejected() {
        let mut index = FlatIndex::new(4);
        assert!(index.add(&[1.0, 2.0]).is_err());
        index.add(&unit(4, 0)).unwrap();
        assert!(index.search(&[0.0; 3], 1).is_err());
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        assert!(FlatIndex::from_bytes(&[0xde, 0xad, 0xbe]).is_err());
    }
}
