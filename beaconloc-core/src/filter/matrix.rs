//! Fixed-size linear algebra for the distance filters
//!
//! Row-major arrays sized by const generics, so every operation runs on
//! the stack. Results are returned by value; at the 1×1 and 2×2 sizes the
//! filters use, copies are cheaper than workspace bookkeeping.

use crate::constants::filter::SINGULAR_PIVOT_EPSILON;

/// Matrix type using const generics
pub type Matrix<const R: usize, const C: usize> = [[f32; C]; R];

/// Square matrix type
pub type SquareMatrix<const N: usize> = Matrix<N, N>;

/// Vector type
pub type Vector<const N: usize> = [f32; N];

/// Identity matrix
pub fn identity<const N: usize>() -> SquareMatrix<N> {
    let mut m = [[0.0; N]; N];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// Diagonal matrix with `value` on the diagonal
pub fn scaled_identity<const N: usize>(value: f32) -> SquareMatrix<N> {
    let mut m = [[0.0; N]; N];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = value;
    }
    m
}

/// Matrix multiplication: A[R×K] × B[K×C]
pub fn multiply<const R: usize, const K: usize, const C: usize>(
    a: &Matrix<R, K>,
    b: &Matrix<K, C>,
) -> Matrix<R, C> {
    let mut result = [[0.0; C]; R];
    for i in 0..R {
        for j in 0..C {
            for k in 0..K {
                result[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    result
}

/// Transpose
pub fn transpose<const R: usize, const C: usize>(a: &Matrix<R, C>) -> Matrix<C, R> {
    let mut result = [[0.0; R]; C];
    for i in 0..R {
        for j in 0..C {
            result[j][i] = a[i][j];
        }
    }
    result
}

/// Element-wise sum
pub fn add<const R: usize, const C: usize>(a: &Matrix<R, C>, b: &Matrix<R, C>) -> Matrix<R, C> {
    let mut result = *a;
    for i in 0..R {
        for j in 0..C {
            result[i][j] += b[i][j];
        }
    }
    result
}

/// Element-wise difference
pub fn subtract<const R: usize, const C: usize>(a: &Matrix<R, C>, b: &Matrix<R, C>) -> Matrix<R, C> {
    let mut result = *a;
    for i in 0..R {
        for j in 0..C {
            result[i][j] -= b[i][j];
        }
    }
    result
}

/// Matrix-vector product
pub fn matvec<const R: usize, const C: usize>(matrix: &Matrix<R, C>, vector: &Vector<C>) -> Vector<R> {
    let mut result = [0.0; R];
    for i in 0..R {
        for j in 0..C {
            result[i] += matrix[i][j] * vector[j];
        }
    }
    result
}

/// Make matrix symmetric: A = (A + Aᵀ) / 2
///
/// Rounding in `P·Fᵀ` style products leaves covariance slightly
/// asymmetric; left alone the asymmetry grows.
pub fn make_symmetric<const N: usize>(matrix: &mut SquareMatrix<N>) {
    for i in 0..N {
        for j in i + 1..N {
            let avg = (matrix[i][j] + matrix[j][i]) * 0.5;
            matrix[i][j] = avg;
            matrix[j][i] = avg;
        }
    }
}

/// Raise every diagonal entry to at least `floor`
pub fn floor_diagonal<const N: usize>(matrix: &mut SquareMatrix<N>, floor: f32) {
    for (i, row) in matrix.iter_mut().enumerate() {
        if row[i] < floor {
            row[i] = floor;
        }
    }
}

/// Every entry is finite
pub fn is_finite<const R: usize, const C: usize>(matrix: &Matrix<R, C>) -> bool {
    matrix.iter().all(|row| row.iter().all(|v| v.is_finite()))
}

/// Inverse by Gauss-Jordan elimination with partial pivoting
///
/// Returns `None` when a pivot falls below [`SINGULAR_PIVOT_EPSILON`]
/// instead of dividing through a near-zero value.
pub fn invert<const N: usize>(a: &SquareMatrix<N>) -> Option<SquareMatrix<N>> {
    let mut work = *a;
    let mut inv = identity::<N>();

    for k in 0..N {
        // Find pivot
        let mut max_row = k;
        let mut max_val = libm::fabsf(work[k][k]);
        for (i, row) in work.iter().enumerate().skip(k + 1) {
            let candidate = libm::fabsf(row[k]);
            if candidate > max_val {
                max_val = candidate;
                max_row = i;
            }
        }

        if max_val.is_nan() || max_val < SINGULAR_PIVOT_EPSILON {
            return None;
        }

        if max_row != k {
            work.swap(k, max_row);
            inv.swap(k, max_row);
        }

        // Scale pivot row
        let pivot = work[k][k];
        for j in 0..N {
            work[k][j] /= pivot;
            inv[k][j] /= pivot;
        }

        // Eliminate column
        for i in 0..N {
            if i != k {
                let factor = work[i][k];
                for j in 0..N {
                    work[i][j] -= factor * work[k][j];
                    inv[i][j] -= factor * inv[k][j];
                }
            }
        }
    }

    if is_finite(&inv) {
        Some(inv)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_operations() {
        let a: Matrix<2, 3> = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let b: Matrix<3, 2> = [[7.0, 8.0], [9.0, 10.0], [11.0, 12.0]];

        let c = multiply(&a, &b);
        assert_eq!(c[0][0], 58.0); // 1×7 + 2×9 + 3×11
        assert_eq!(c[0][1], 64.0); // 1×8 + 2×10 + 3×12

        let t = transpose(&a);
        assert_eq!(t[2][1], 6.0);

        assert_eq!(matvec(&a, &[1.0, 0.0, 1.0]), [4.0, 10.0]);

        let mut m: SquareMatrix<2> = [[1.0, 2.0], [3.0, 4.0]];
        make_symmetric(&mut m);
        assert_eq!(m[0][1], 2.5);
        assert_eq!(m[1][0], 2.5);
    }

    #[test]
    fn matrix_inversion() {
        let a: SquareMatrix<2> = [[4.0, 7.0], [2.0, 6.0]];
        let inv = invert(&a).unwrap();

        // A × A⁻¹ = I
        let product = multiply(&a, &inv);
        assert!((product[0][0] - 1.0).abs() < 1e-6);
        assert!((product[1][1] - 1.0).abs() < 1e-6);
        assert!(product[0][1].abs() < 1e-6);
        assert!(product[1][0].abs() < 1e-6);
    }

    #[test]
    fn pivoting_handles_zero_leading_entry() {
        let a: SquareMatrix<2> = [[0.0, 1.0], [1.0, 0.0]];
        assert_eq!(invert(&a), Some(a));
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let a: SquareMatrix<2> = [[1.0, 2.0], [2.0, 4.0]];
        assert!(invert(&a).is_none());

        let zero: SquareMatrix<1> = [[0.0]];
        assert!(invert(&zero).is_none());

        let nan: SquareMatrix<1> = [[f32::NAN]];
        assert!(invert(&nan).is_none());
    }

    #[test]
    fn diagonal_floor() {
        let mut m: SquareMatrix<2> = [[0.0, 0.5], [0.5, 3.0]];
        floor_diagonal(&mut m, 1e-3);
        assert_eq!(m, [[1e-3, 0.5], [0.5, 3.0]]);
    }
}
