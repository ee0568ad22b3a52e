//! Content digests over raw byte representations.
//!
//! A content digest identifies a value by its logical content, independent
//! of physical memory layout. Non-contiguous data is first copied into a
//! contiguous buffer, so that e.g. a column-major matrix and its row-major
//! twin digest identically.

use serde::{Deserialize, Serialize};

use crate::hash::hash_bytes;

/// A fixed-width numeric cell that can be laid out as raw bytes.
pub trait Scalar: Copy {
    /// Append the little-endian byte representation to a buffer.
    fn write_le(&self, buf: &mut Vec<u8>);
}

macro_rules! scalar {
    ($($ty:ty),*) => {
        $(impl Scalar for $ty {
            #[inline]
            fn write_le(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }
        })*
    };
}

scalar!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, usize, isize);

/// Types identified by a digest of their raw content.
pub trait ContentHash {
    /// Produce a 128-bit digest of the value's content.
    fn content_hash(&self) -> u128;
}

impl<T: Scalar> ContentHash for [T] {
    fn content_hash(&self) -> u128 {
        hash_bytes(&contiguous(self.iter().copied()))
    }
}

impl<T: Scalar> ContentHash for Vec<T> {
    fn content_hash(&self) -> u128 {
        self.as_slice().content_hash()
    }
}

impl<T: ContentHash + ?Sized> ContentHash for &T {
    fn content_hash(&self) -> u128 {
        (**self).content_hash()
    }
}

/// Materialize scalars into one contiguous little-endian buffer.
pub(crate) fn contiguous<T: Scalar>(values: impl Iterator<Item = T>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.size_hint().0 * size_of::<T>());
    for value in values {
        value.write_le(&mut buf);
    }
    buf
}

/// Physical element order of an [`Array2`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Layout {
    /// Elements of one row are adjacent in memory.
    RowMajor,
    /// Elements of one column are adjacent in memory.
    ColMajor,
}

/// A dense two-dimensional numeric array.
///
/// The backing buffer may be in either layout. The content digest is
/// computed over the logical row-major byte sequence, so two arrays with
/// the same cells digest identically regardless of how they are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Array2<T> {
    rows: usize,
    cols: usize,
    layout: Layout,
    data: Vec<T>,
}

impl<T: Scalar> Array2<T> {
    /// Create an array from row-major data.
    ///
    /// Panics if `data.len() != rows * cols`.
    pub fn from_rows(rows: usize, cols: usize, data: Vec<T>) -> Self {
        assert_eq!(data.len(), rows * cols, "array data does not match shape");
        Self { rows, cols, layout: Layout::RowMajor, data }
    }

    /// The `(rows, cols)` shape.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Read the cell at `(row, col)`.
    ///
    /// Panics if the position is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(row < self.rows && col < self.cols, "position out of bounds");
        match self.layout {
            Layout::RowMajor => self.data[row * self.cols + col],
            Layout::ColMajor => self.data[col * self.rows + row],
        }
    }

    /// Overwrite the cell at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(row < self.rows && col < self.cols, "position out of bounds");
        match self.layout {
            Layout::RowMajor => self.data[row * self.cols + col] = value,
            Layout::ColMajor => self.data[col * self.rows + row] = value,
        }
    }

    /// Transpose without moving data.
    ///
    /// Swaps the shape and flips the layout marker, so the backing buffer
    /// stays untouched. Transposing twice restores the logical content but
    /// leaves the physical layout as it was.
    pub fn transpose(self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
            layout: match self.layout {
                Layout::RowMajor => Layout::ColMajor,
                Layout::ColMajor => Layout::RowMajor,
            },
            data: self.data,
        }
    }

    /// Rewrite the backing buffer into the given physical layout.
    pub fn to_layout(mut self, layout: Layout) -> Self {
        if self.layout != layout {
            let mut data = Vec::with_capacity(self.data.len());
            match layout {
                Layout::RowMajor => {
                    for row in 0..self.rows {
                        for col in 0..self.cols {
                            data.push(self.get(row, col));
                        }
                    }
                }
                Layout::ColMajor => {
                    for col in 0..self.cols {
                        for row in 0..self.rows {
                            data.push(self.get(row, col));
                        }
                    }
                }
            }
            self.data = data;
            self.layout = layout;
        }
        self
    }

    /// Iterate over cells in logical row-major order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| self.get(row, col)))
    }
}

impl<T: Scalar> ContentHash for Array2<T> {
    /// Digest of the shape followed by the cells in logical row-major
    /// order. The shape participates so that a matrix and its transpose
    /// never collide.
    fn content_hash(&self) -> u128 {
        let mut buf = Vec::with_capacity(16 + self.data.len() * size_of::<T>());
        buf.extend_from_slice(&(self.rows as u64).to_le_bytes());
        buf.extend_from_slice(&(self.cols as u64).to_le_bytes());
        match self.layout {
            // Already contiguous in logical order.
            Layout::RowMajor => {
                for value in &self.data {
                    value.write_le(&mut buf);
                }
            }
            Layout::ColMajor => {
                for value in self.iter() {
                    value.write_le(&mut buf);
                }
            }
        }
        hash_bytes(&buf)
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn test_layout_independence() {
        let a = Array2::from_rows(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = a.clone().to_layout(Layout::ColMajor);
        assert_eq!(a.get(1, 2), b.get(1, 2));
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_double_transpose() {
        let a = Array2::from_rows(2, 2, vec![1i64, 2, 3, 4]);
        let back = a.clone().transpose().transpose();
        assert_eq!(a.content_hash(), back.content_hash());
    }

    #[test]
    fn test_cell_change() {
        let a = Array2::from_rows(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let mut b = a.clone();
        b.set(0, 1, 2.5);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_transpose_differs() {
        let a = Array2::from_rows(1, 2, vec![1.0, 2.0]);
        assert_ne!(a.content_hash(), a.clone().transpose().content_hash());
    }

    #[quickcheck]
    fn prop_digest_is_deterministic(data: Vec<i64>) -> bool {
        data.content_hash() == data.content_hash()
    }

    #[quickcheck]
    fn prop_layout_never_matters(mut data: Vec<f64>) -> bool {
        data.truncate(data.len() - data.len() % 4);
        let rows = data.len() / 4;
        let a = Array2::from_rows(rows, 4, data);
        let b = a.clone().to_layout(Layout::ColMajor);
        a.content_hash() == b.content_hash()
    }
}
