//! Strided n-dimensional arrays.
//!
//! An [`NDArray`] owns a flat buffer plus a shape, per-axis strides (in
//! elements) and a start offset. Arrays built with [`NDArray::from_vec`] are
//! contiguous row-major; [`NDArray::permuted_axes`] and
//! [`NDArray::from_vec_with_strides`] produce other layouts over the same
//! buffer. Logical contents are always visited in row-major order.

use std::fmt;

use crate::error::{Error, Result};

/// An owned n-dimensional array.
#[derive(Clone)]
pub struct NDArray<T> {
    data: Vec<T>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    offset: usize,
}

/// Row-major strides for `shape`.
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1].saturating_mul(shape[axis + 1].max(1));
    }
    strides
}

/// Number of elements held by an array of `shape`, saturating at
/// `usize::MAX`.
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().fold(1usize, |acc, &dim| acc.saturating_mul(dim))
}

impl<T> NDArray<T> {
    /// Wraps a row-major buffer.
    pub fn from_vec(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Result<Self> {
        let shape = shape.into();
        let expected = element_count(&shape);
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        let strides = row_major_strides(&shape);
        Ok(Self {
            data,
            shape,
            strides,
            offset: 0,
        })
    }

    /// Wraps a buffer with an explicit layout.
    pub fn from_vec_with_strides(
        shape: impl Into<Vec<usize>>,
        strides: impl Into<Vec<usize>>,
        offset: usize,
        data: Vec<T>,
    ) -> Result<Self> {
        let shape = shape.into();
        let strides = strides.into();
        if strides.len() != shape.len() {
            return Err(Error::RankMismatch {
                expected: shape.len(),
                actual: strides.len(),
            });
        }
        if element_count(&shape) > 0 {
            let last = shape
                .iter()
                .zip(&strides)
                .try_fold(offset, |acc, (dim, stride)| (dim - 1).checked_mul(*stride)?.checked_add(acc));
            match last {
                Some(last) if last < data.len() => {}
                _ => {
                    return Err(Error::ElementCountMismatch {
                        shape,
                        expected: last.map_or(usize::MAX, |last| last.saturating_add(1)),
                        actual: data.len(),
                    });
                }
            }
        }
        Ok(Self {
            data,
            shape,
            strides,
            offset,
        })
    }

    /// A rank-0 array holding one value.
    pub fn scalar(value: T) -> Self {
        Self {
            data: vec![value],
            shape: Vec::new(),
            strides: Vec::new(),
            offset: 0,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of logical elements.
    pub fn len(&self) -> usize {
        element_count(&self.shape)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the logical elements occupy a contiguous row-major run of
    /// the buffer.
    pub fn is_standard_layout(&self) -> bool {
        if self.is_empty() {
            return true;
        }
        let mut expected = 1;
        for (&dim, &stride) in self.shape.iter().zip(&self.strides).rev() {
            if dim != 1 && stride != expected {
                return false;
            }
            expected *= dim;
        }
        true
    }

    /// The elements as one row-major slice, if the layout allows it.
    pub fn as_slice(&self) -> Option<&[T]> {
        if !self.is_standard_layout() {
            return None;
        }
        let len = self.len();
        if len == 0 {
            return Some(&[]);
        }
        self.data.get(self.offset..self.offset + len)
    }

    /// Element at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, d)| i >= d) {
            return None;
        }
        self.data.get(self.flat_index(index))
    }

    /// Iterates elements in row-major order regardless of layout.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            array: self,
            index: vec![0; self.shape.len()],
            remaining: self.len(),
        }
    }

    /// Reorders the axes without moving data: axis `i` of the result is axis
    /// `axes[i]` of `self`.
    pub fn permuted_axes(self, axes: &[usize]) -> Result<Self> {
        let mut seen = vec![false; self.shape.len()];
        if axes.len() != self.shape.len() {
            return Err(Error::RankMismatch {
                expected: self.shape.len(),
                actual: axes.len(),
            });
        }
        for &axis in axes {
            if axis >= seen.len() || seen[axis] {
                return Err(Error::ShapeMismatch {
                    expected: (0..seen.len()).collect(),
                    actual: axes.to_vec(),
                });
            }
            seen[axis] = true;
        }
        let shape = axes.iter().map(|&a| self.shape[a]).collect();
        let strides = axes.iter().map(|&a| self.strides[a]).collect();
        Ok(Self {
            data: self.data,
            shape,
            strides,
            offset: self.offset,
        })
    }

    /// Reverses the axes.
    pub fn reversed_axes(mut self) -> Self {
        self.shape.reverse();
        self.strides.reverse();
        self
    }

    fn flat_index(&self, index: &[usize]) -> usize {
        self.offset
            + index
                .iter()
                .zip(&self.strides)
                .map(|(i, s)| i * s)
                .sum::<usize>()
    }
}

impl<T: Clone> NDArray<T> {
    /// An array of `shape` with every element set to `value`.
    pub fn filled(shape: impl Into<Vec<usize>>, value: T) -> Self {
        let shape = shape.into();
        let data = vec![value; element_count(&shape)];
        let strides = row_major_strides(&shape);
        Self {
            data,
            shape,
            strides,
            offset: 0,
        }
    }

    /// A contiguous row-major copy.
    pub fn to_standard_layout(&self) -> Self {
        Self {
            data: self.iter().cloned().collect(),
            shape: self.shape.clone(),
            strides: row_major_strides(&self.shape),
            offset: 0,
        }
    }

    /// Elements in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T: PartialEq> PartialEq for NDArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.iter().eq(other.iter())
    }
}

impl<T: fmt::Debug> fmt::Debug for NDArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NDArray")
            .field("shape", &self.shape)
            .field("data", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<T> Default for NDArray<T> {
    fn default() -> Self {
        // Rank-1 with zero elements.
        Self {
            data: Vec::new(),
            shape: vec![0],
            strides: vec![1],
            offset: 0,
        }
    }
}

/// Row-major iterator over an [`NDArray`].
pub struct Iter<'a, T> {
    array: &'a NDArray<T>,
    index: Vec<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.array.data.get(self.array.flat_index(&self.index));
        self.remaining -= 1;
        for axis in (0..self.index.len()).rev() {
            self.index[axis] += 1;
            if self.index[axis] < self.array.shape[axis] {
                break;
            }
            self.index[axis] = 0;
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a NDArray<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
