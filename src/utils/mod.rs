pub mod channel;
pub mod code;
pub mod merkle;
pub mod mle;

use crate::field::{BinaryField, FieldElement};

/// Base-2 logarithm of a power of two.
pub fn log2(x: usize) -> usize {
    assert!(x.is_power_of_two(), "{x} is not a power of two");
    x.trailing_zeros() as usize
}

pub fn inner_product(
    xs: &[FieldElement],
    ys: &[FieldElement],
    field: BinaryField,
) -> FieldElement {
    assert_eq!(xs.len(), ys.len(), "inner product of unequal lengths");
    xs.iter().zip(ys).fold(field.zero(), |acc, (&x, &y)| acc + x * y)
}

/// Row-major transpose of a rectangular matrix.
pub fn transpose<T: Copy>(mat: &[Vec<T>]) -> Vec<Vec<T>> {
    let n_cols = mat.first().map_or(0, Vec::len);
    assert!(mat.iter().all(|row| row.len() == n_cols), "matrix must be rectangular");
    (0..n_cols).map(|j| mat.iter().map(|row| row[j]).collect()).collect()
}
