//! Small GEMM wrapper used by the batched header forward passes.
//!
//! Every header computes `logits = features · weightsᵀ` with row-major
//! operands, so this module exposes exactly that product:
//! - default: a simple, safe dot-product loop
//! - optional: a faster backend via the `matrixmultiply` feature

/// Computes `c = a · bᵀ` where `a` is `(m, k)`, `b` is `(n, k)` and `c` is
/// `(m, n)`, all row-major.
///
/// Shapes are validated by callers in performance-sensitive code. Keep this
/// function minimal and inlineable.
#[inline]
pub(crate) fn gemm_nt(m: usize, n: usize, k: usize, a: &[f32], b: &[f32], c: &mut [f32]) {
    debug_assert!(m > 0 && n > 0 && k > 0);
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), n * k);
    debug_assert_eq!(c.len(), m * n);

    #[cfg(feature = "matrixmultiply")]
    {
        // `b` is (n, k) row-major; striding it as (k, n) with a row stride of
        // one element yields bᵀ without a copy.
        unsafe {
            matrixmultiply::sgemm(
                m,
                k,
                n,
                1.0,
                a.as_ptr(),
                k as isize,
                1,
                b.as_ptr(),
                1,
                k as isize,
                0.0,
                c.as_mut_ptr(),
                n as isize,
                1,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for i in 0..m {
        let x = &a[i * k..(i + 1) * k];
        for j in 0..n {
            let w = &b[j * k..(j + 1) * k];
            let mut acc = 0.0_f32;
            for p in 0..k {
                acc = x[p].mul_add(w[p], acc);
            }
            c[i * n + j] = acc;
        }
    }
}
