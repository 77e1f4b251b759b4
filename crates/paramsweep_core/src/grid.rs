//! N-dimensional result storage.
//!
//! `SweepGrid<T>` keeps a flat row-major backing array (last dimension varies
//! fastest) plus precomputed strides. Sweep values, coordinates and cached
//! arrays all use it, so reshaping and merging never copy through nested
//! vectors.

use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// N-dimensional grid storage with flat backing array and stride-based indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepGrid<T> {
    /// The data stored in row-major order
    data: Vec<T>,
    /// Shape of each dimension (e.g., [5, 10, 3] for a 5x10x3 grid)
    shape: Vec<usize>,
    /// Precomputed strides for index calculation
    #[serde(skip)]
    strides: Vec<usize>,
}

impl<T: Clone> SweepGrid<T> {
    /// Create a new grid with the given shape, filled with the given value.
    pub fn new(shape: Vec<usize>, fill: T) -> Self {
        let total_size: usize = shape.iter().product();
        let strides = compute_strides(&shape);
        Self {
            data: vec![fill; total_size],
            shape,
            strides,
        }
    }

    /// Create a grid from existing data. Data must be in row-major order.
    pub fn from_data(shape: Vec<usize>, data: Vec<T>) -> Option<Self> {
        let total_size: usize = shape.iter().product();
        if data.len() != total_size {
            return None;
        }
        let strides = compute_strides(&shape);
        Some(Self {
            data,
            shape,
            strides,
        })
    }

    /// One-dimensional grid over the given values
    pub fn from_vec(data: Vec<T>) -> Self {
        let shape = vec![data.len()];
        let strides = compute_strides(&shape);
        Self {
            data,
            shape,
            strides,
        }
    }

    /// Get the shape of the grid
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get the total number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the grid is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Convert multi-dimensional indices to flat index
    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (i, (&idx, &size)) in indices.iter().zip(&self.shape).enumerate() {
            if idx >= size {
                return None;
            }
            flat += idx * self.strides()[i];
        }
        Some(flat)
    }

    /// Convert flat index to multi-dimensional indices
    pub fn multi_index(&self, flat: usize) -> Option<Vec<usize>> {
        if flat >= self.data.len() {
            return None;
        }
        let mut indices = Vec::with_capacity(self.shape.len());
        let mut remaining = flat;
        for &stride in self.strides().iter() {
            indices.push(remaining / stride);
            remaining %= stride;
        }
        Some(indices)
    }

    /// Get a reference to the value at the given indices
    pub fn get(&self, indices: &[usize]) -> Option<&T> {
        self.flat_index(indices).map(|i| &self.data[i])
    }

    /// Set the value at the given indices
    pub fn set(&mut self, indices: &[usize], value: T) -> bool {
        if let Some(i) = self.flat_index(indices) {
            self.data[i] = value;
            true
        } else {
            false
        }
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Consume the grid, returning the row-major data
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Iterate over all indices in row-major order
    pub fn indices(&self) -> GridIndices {
        GridIndices {
            shape: self.shape.clone(),
            current: vec![0; self.shape.len()],
            done: self.data.is_empty(),
        }
    }

    /// Iterate over (indices, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (Vec<usize>, &T)> {
        self.indices().zip(self.data.iter())
    }

    /// Number of elements in one entry along the leading dimension
    pub fn row_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Sub-grid at `index` along the leading dimension
    pub fn row(&self, index: usize) -> Option<Self> {
        if self.shape.is_empty() || index >= self.shape[0] {
            return None;
        }
        let width = self.row_len();
        let start = index * width;
        Self::from_data(
            self.shape[1..].to_vec(),
            self.data[start..start + width].to_vec(),
        )
    }

    /// Same data under a new shape with an equal number of elements
    pub fn reshape(self, shape: Vec<usize>) -> Option<Self> {
        Self::from_data(shape, self.data)
    }

    /// Grid with a trailing dimension of length 1 appended
    pub fn expand_trailing(self) -> Self {
        let mut shape = self.shape;
        shape.push(1);
        let strides = compute_strides(&shape);
        Self {
            data: self.data,
            shape,
            strides,
        }
    }

    /// Copy into a larger grid of the same rank, filling new cells with `fill`
    pub fn pad_to(&self, shape: &[usize], fill: T) -> Option<Self> {
        if shape.len() != self.shape.len() || shape.iter().zip(&self.shape).any(|(t, s)| t < s) {
            return None;
        }
        if shape == self.shape.as_slice() {
            return Some(self.clone());
        }
        let mut padded = Self::new(shape.to_vec(), fill);
        for (indices, value) in self.iter() {
            padded.set(&indices, value.clone());
        }
        Some(padded)
    }

    fn strides(&self) -> std::borrow::Cow<'_, [usize]> {
        // Strides are skipped during serialization and rebuilt on demand
        if self.strides.len() == self.shape.len() {
            std::borrow::Cow::Borrowed(&self.strides)
        } else {
            std::borrow::Cow::Owned(compute_strides(&self.shape))
        }
    }
}

impl<T: PartialEq> PartialEq for SweepGrid<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.data == other.data
    }
}

impl SweepGrid<f64> {
    /// Bitwise equality, so NaN padding compares equal to itself
    pub fn bits_eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// Stack equally ranked rows along a new leading dimension.
    ///
    /// Rows whose shapes differ are padded with NaN to the largest extent of
    /// each dimension; a rank difference of one (scalar rows mixed with
    /// vector rows) is resolved by giving the lower rank rows a trailing
    /// dimension of length 1.
    pub fn stack(rows: Vec<SweepGrid<f64>>) -> Result<Self, SweepError> {
        let count = rows.len();
        let rows = harmonize(rows)?;
        let inner = rows.first().map(|row| row.shape.clone()).unwrap_or_default();

        let mut shape = Vec::with_capacity(inner.len() + 1);
        shape.push(count);
        shape.extend_from_slice(&inner);

        let data: Vec<f64> = rows.into_iter().flat_map(SweepGrid::into_data).collect();
        Self::from_data(shape, data)
            .ok_or_else(|| SweepError::Shape("stacked rows do not fill the grid".to_string()))
    }

    /// Concatenate grids along their leading dimension.
    ///
    /// Trailing dimensions are harmonized like [`SweepGrid::stack`].
    pub fn concat(parts: Vec<SweepGrid<f64>>) -> Result<Self, SweepError> {
        if parts.iter().any(|part| part.ndim() == 0) {
            return Err(SweepError::Shape(
                "cannot concatenate zero-dimensional grids".to_string(),
            ));
        }
        let leading: usize = parts.iter().map(|part| part.shape[0]).sum();

        // Harmonize the per-row shapes, then rebuild each part
        let mut rows = Vec::with_capacity(leading);
        for part in &parts {
            for index in 0..part.shape[0] {
                rows.extend(part.row(index));
            }
        }
        if rows.len() != leading {
            return Err(SweepError::Shape("failed to split grid rows".to_string()));
        }
        Self::stack(rows)
    }
}

/// Bring rows to a common shape, padding with NaN.
fn harmonize(rows: Vec<SweepGrid<f64>>) -> Result<Vec<SweepGrid<f64>>, SweepError> {
    let max_rank = rows.iter().map(SweepGrid::ndim).max().unwrap_or(0);
    let min_rank = rows.iter().map(SweepGrid::ndim).min().unwrap_or(0);
    if max_rank > min_rank + 1 {
        return Err(SweepError::Shape(format!(
            "cannot combine rows of rank {min_rank} and {max_rank}"
        )));
    }

    let rows: Vec<SweepGrid<f64>> = rows
        .into_iter()
        .map(|row| {
            if row.ndim() < max_rank {
                row.expand_trailing()
            } else {
                row
            }
        })
        .collect();

    let mut target = vec![0; max_rank];
    for row in &rows {
        for (extent, &size) in target.iter_mut().zip(&row.shape) {
            *extent = (*extent).max(size);
        }
    }

    rows.into_iter()
        .map(|row| {
            row.pad_to(&target, f64::NAN).ok_or_else(|| {
                SweepError::Shape(format!(
                    "cannot pad row of shape {:?} to {:?}",
                    row.shape, target
                ))
            })
        })
        .collect()
}

/// Compute strides for row-major order
fn compute_strides(shape: &[usize]) -> Vec<usize> {
    if shape.is_empty() {
        return Vec::new();
    }
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len() - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Iterator over all indices in a grid
pub struct GridIndices {
    shape: Vec<usize>,
    current: Vec<usize>,
    done: bool,
}

impl Iterator for GridIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current.clone();

        if self.shape.is_empty() {
            self.done = true;
            return Some(result);
        }

        // Increment indices (row-major: last dimension varies fastest)
        for i in (0..self.shape.len()).rev() {
            self.current[i] += 1;
            if self.current[i] < self.shape[i] {
                break;
            }
            self.current[i] = 0;
            if i == 0 {
                self.done = true;
            }
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_and_multi_index() {
        let grid = SweepGrid::from_data(vec![2, 3], (0..6).map(f64::from).collect()).unwrap();
        assert_eq!(grid.flat_index(&[1, 2]), Some(5));
        assert_eq!(grid.multi_index(4), Some(vec![1, 1]));
        assert_eq!(grid.get(&[0, 1]), Some(&1.0));
        assert_eq!(grid.flat_index(&[2, 0]), None);
    }

    #[test]
    fn test_from_data_rejects_wrong_length() {
        assert!(SweepGrid::from_data(vec![2, 2], vec![1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_indices_row_major() {
        let grid = SweepGrid::new(vec![2, 2], 0.0);
        let indices: Vec<Vec<usize>> = grid.indices().collect();
        assert_eq!(indices, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn test_row_extracts_leading_slice() {
        let grid = SweepGrid::from_data(vec![2, 2, 2], (0..8).map(f64::from).collect()).unwrap();
        let row = grid.row(1).unwrap();
        assert_eq!(row.shape(), &[2, 2]);
        assert_eq!(row.data(), &[4.0, 5.0, 6.0, 7.0]);
        assert!(grid.row(2).is_none());
    }

    #[test]
    fn test_stack_pads_ragged_rows() {
        let rows = vec![
            SweepGrid::from_data(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            SweepGrid::from_data(vec![2, 3], vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0]).unwrap(),
        ];
        let stacked = SweepGrid::stack(rows).unwrap();

        assert_eq!(stacked.shape(), &[2, 2, 3]);
        assert!(stacked.get(&[0, 0, 2]).unwrap().is_nan());
        assert_eq!(stacked.get(&[0, 1, 1]), Some(&4.0));
        assert_eq!(stacked.get(&[1, 1, 2]), Some(&10.0));
    }

    #[test]
    fn test_stack_mixed_scalar_and_vector_rows() {
        let rows = vec![
            SweepGrid::from_vec(vec![1.0, 2.0]),
            SweepGrid::from_data(vec![2, 2], vec![3.0, 4.0, 5.0, 6.0]).unwrap(),
        ];
        let stacked = SweepGrid::stack(rows).unwrap();
        assert_eq!(stacked.shape(), &[2, 2, 2]);
        assert_eq!(stacked.get(&[0, 1, 0]), Some(&2.0));
        assert!(stacked.get(&[0, 1, 1]).unwrap().is_nan());
    }

    #[test]
    fn test_concat_along_leading_dimension() {
        let parts = vec![
            SweepGrid::from_data(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            SweepGrid::from_data(vec![1, 2], vec![5.0, 6.0]).unwrap(),
        ];
        let merged = SweepGrid::concat(parts).unwrap();
        assert_eq!(merged.shape(), &[3, 2]);
        assert_eq!(merged.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_zero_dimensional_grid() {
        let grid = SweepGrid::from_data(vec![], vec![7.0]).unwrap();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.get(&[]), Some(&7.0));
        assert_eq!(grid.indices().count(), 1);
    }
}
