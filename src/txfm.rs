// Forward and inverse 8x8 DCT, and the quantize/dequantize steps built on
// top of it.
//
// Architecture grounded on tinyavif's txfm.rs: a 1D transform applied to
// columns via `Array2D::transpose`/`transpose_into`, then to rows, exactly
// the `fwd_txfm2d`/`inv_txfm2d` shape. tinyavif's 1D stage is AV1's
// fixed-point butterfly network (`fwd_dct8`/`inv_dct8`), which is lossy by
// design and not meant to invert exactly. The round-trip invariant here
// (§8, law 2) requires `idct(dct(x)) == x` exactly when the quant step is 1,
// so the 1D stage here is the textbook orthonormal DCT-II/DCT-III pair
// instead: DCT-III with matching normalization is the exact transpose of
// DCT-II, so composing them is the identity up to floating-point rounding,
// which the final integer pixel rounding absorbs.

use crate::array2d::Array2D;
use crate::frame::{CoeffPlane, Plane};
use crate::quant::{QuantTable, BLOCK_SIDE, BLOCK_SIZE};
use crate::util::round_f64_away_from_zero;
use std::f64::consts::PI;
use std::sync::OnceLock;

// basis[k][n] = alpha_k * cos(pi/8 * (n + 0.5) * k), the orthonormal DCT-II
// matrix. Forward: X = basis * x. Inverse (DCT-III): x = basis^T * X.
fn basis_matrix() -> &'static [[f64; BLOCK_SIDE]; BLOCK_SIDE] {
  static MATRIX: OnceLock<[[f64; BLOCK_SIDE]; BLOCK_SIDE]> = OnceLock::new();
  MATRIX.get_or_init(|| {
    let mut m = [[0.0f64; BLOCK_SIDE]; BLOCK_SIDE];
    for k in 0..BLOCK_SIDE {
      let alpha = if k == 0 {
        (1.0 / BLOCK_SIDE as f64).sqrt()
      } else {
        (2.0 / BLOCK_SIDE as f64).sqrt()
      };
      for n in 0..BLOCK_SIDE {
        m[k][n] = alpha * (PI / BLOCK_SIDE as f64 * (n as f64 + 0.5) * k as f64).cos();
      }
    }
    m
  })
}

fn dct_1d(input: &[f64; BLOCK_SIDE]) -> [f64; BLOCK_SIDE] {
  let basis = basis_matrix();
  let mut out = [0.0f64; BLOCK_SIDE];
  for k in 0..BLOCK_SIDE {
    out[k] = (0..BLOCK_SIDE).map(|n| basis[k][n] * input[n]).sum();
  }
  out
}

fn idct_1d(input: &[f64; BLOCK_SIDE]) -> [f64; BLOCK_SIDE] {
  let basis = basis_matrix();
  let mut out = [0.0f64; BLOCK_SIDE];
  for n in 0..BLOCK_SIDE {
    out[n] = (0..BLOCK_SIDE).map(|k| basis[k][n] * input[k]).sum();
  }
  out
}

fn apply_1d_to_rows<F: Fn(&[f64; BLOCK_SIDE]) -> [f64; BLOCK_SIDE]>(block: &mut Array2D<f64>, f: F) {
  for i in 0..block.rows() {
    let mut row = [0.0f64; BLOCK_SIDE];
    row.copy_from_slice(&block[i]);
    block[i].copy_from_slice(&f(&row));
  }
}

fn forward_dct8x8(block: &Array2D<f64>) -> Array2D<f64> {
  let mut transposed = block.transpose();
  apply_1d_to_rows(&mut transposed, dct_1d);
  let mut out = transposed.transpose();
  apply_1d_to_rows(&mut out, dct_1d);
  out
}

fn inverse_dct8x8(coeffs: &Array2D<f64>) -> Array2D<f64> {
  let mut transposed = coeffs.transpose();
  apply_1d_to_rows(&mut transposed, idct_1d);
  let mut out = transposed.transpose();
  apply_1d_to_rows(&mut out, idct_1d);
  out
}

// Tile `input - pred` into 8x8 blocks, forward-DCT each, quantize against
// `qtable` and pack the result block-by-block into a `CoeffPlane`.
pub fn dct_quantize(input: &Plane, pred: &Plane, qtable: &QuantTable) -> CoeffPlane {
  debug_assert_eq!(input.width, pred.width);
  debug_assert_eq!(input.height, pred.height);

  let mut out = CoeffPlane::new(input.width, input.height);
  let block_rows = input.height / BLOCK_SIDE;
  let block_cols = input.width / BLOCK_SIDE;

  for br in 0..block_rows {
    for bc in 0..block_cols {
      let mut residual = Array2D::<f64>::zeroed(BLOCK_SIDE, BLOCK_SIDE);
      residual.fill_with(|i, j| {
        let row = br * BLOCK_SIDE + i;
        let col = bc * BLOCK_SIDE + j;
        input[(row, col)] as f64 - pred[(row, col)] as f64
      });

      let coeffs = forward_dct8x8(&residual);
      let dest = out.block_mut(br, bc);
      for i in 0..BLOCK_SIDE {
        for j in 0..BLOCK_SIDE {
          let idx = i * BLOCK_SIDE + j;
          let q = qtable[idx] as f64;
          dest[idx] = round_f64_away_from_zero(coeffs[i][j] / q) as i16;
        }
      }
    }
  }

  out
}

// Inverse of `dct_quantize`: dequantize, inverse-DCT each block, add `pred`
// and clamp to `[0, 255]`.
pub fn dequantize_idct(coeffs: &CoeffPlane, pred: &Plane, qtable: &QuantTable) -> Plane {
  debug_assert_eq!(coeffs.width, pred.width);
  debug_assert_eq!(coeffs.height, pred.height);

  let mut out = Plane::new(coeffs.width, coeffs.height);
  let block_rows = coeffs.height / BLOCK_SIDE;
  let block_cols = coeffs.width / BLOCK_SIDE;

  for br in 0..block_rows {
    for bc in 0..block_cols {
      let block = coeffs.block(br, bc);
      let mut dequantized = Array2D::<f64>::zeroed(BLOCK_SIDE, BLOCK_SIDE);
      dequantized.fill_with(|i, j| {
        let idx = i * BLOCK_SIDE + j;
        block[idx] as f64 * qtable[idx] as f64
      });

      let residual = inverse_dct8x8(&dequantized);
      for i in 0..BLOCK_SIDE {
        for j in 0..BLOCK_SIDE {
          let row = br * BLOCK_SIDE + i;
          let col = bc * BLOCK_SIDE + j;
          let value = pred[(row, col)] as f64 + residual[i][j];
          out[(row, col)] = crate::util::clamp(round_f64_away_from_zero(value), 0, 255) as u8;
        }
      }
    }
  }

  out
}
