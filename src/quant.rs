// Quantization tables.
//
// Grounded on src/consts.rs in tinyavif, which holds standard
// constant tables (AV1 CDFs) indexed the same way these are: a flat 64-entry
// per-component table in raster order. The contents here are the classic
// JPEG luminance/chrominance quantization tables, required by c63's
// quantization step (common.h's `dct_quantize`/`dequantize_idct`).

use crate::util::round_div_away_from_zero;

pub const BLOCK_SIDE: usize = 8;
pub const BLOCK_SIZE: usize = BLOCK_SIDE * BLOCK_SIDE;

pub type QuantTable = [u8; BLOCK_SIZE];

#[rustfmt::skip]
pub const DEFAULT_LUMA_QTABLE: [u16; BLOCK_SIZE] = [
  16,  11,  10,  16,  24,  40,  51,  61,
  12,  12,  14,  19,  26,  58,  60,  55,
  14,  13,  16,  24,  40,  57,  69,  56,
  14,  17,  22,  29,  51,  87,  80,  62,
  18,  22,  37,  56,  68, 109, 103,  77,
  24,  35,  55,  64,  81, 104, 113,  92,
  49,  64,  78,  87, 103, 121, 120, 101,
  72,  92,  95,  98, 112, 100, 103,  99,
];

#[rustfmt::skip]
pub const DEFAULT_CHROMA_QTABLE: [u16; BLOCK_SIZE] = [
  17,  18,  24,  47,  99,  99,  99,  99,
  18,  21,  26,  66,  99,  99,  99,  99,
  24,  26,  56,  99,  99,  99,  99,  99,
  47,  66,  99,  99,  99,  99,  99,  99,
  99,  99,  99,  99,  99,  99,  99,  99,
  99,  99,  99,  99,  99,  99,  99,  99,
  99,  99,  99,  99,  99,  99,  99,  99,
  99,  99,  99,  99,  99,  99,  99,  99,
];

// Scale a default table by 1 / (qp / 10.0), rounding to nearest and
// clamping to the 8-bit range a quantization divisor can occupy. A zero
// divisor would make `round_div_away_from_zero` undefined, so the result
// is clamped to at least 1.
pub fn scale_table(default: &[u16; BLOCK_SIZE], qp: u8) -> QuantTable {
  debug_assert!((1..=50).contains(&qp));
  let mut out = [0u8; BLOCK_SIZE];
  for i in 0..BLOCK_SIZE {
    // entry / (qp/10.0) == entry*10 / qp, rounded to nearest.
    let scaled = round_div_away_from_zero((default[i] as i32) * 10, qp as i32);
    out[i] = crate::util::clamp(scaled, 1, 255) as u8;
  }
  out
}

#[derive(Clone, Debug)]
pub struct QuantTables {
  pub y: QuantTable,
  pub u: QuantTable,
  pub v: QuantTable,
}

impl QuantTables {
  pub fn for_qp(qp: u8) -> Self {
    Self {
      y: scale_table(&DEFAULT_LUMA_QTABLE, qp),
      u: scale_table(&DEFAULT_CHROMA_QTABLE, qp),
      v: scale_table(&DEFAULT_CHROMA_QTABLE, qp),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scaling_matches_closed_form_for_every_qp() {
    for qp in 1u8..=50 {
      let table = scale_table(&DEFAULT_LUMA_QTABLE, qp);
      for i in 0..BLOCK_SIZE {
        let expected = round_div_away_from_zero((DEFAULT_LUMA_QTABLE[i] as i32) * 10, qp as i32);
        let expected = crate::util::clamp(expected, 1, 255) as u8;
        assert_eq!(table[i], expected);
      }
    }
  }

  #[test]
  fn default_qp_produces_finer_quantization_than_high_qp() {
    let fine = scale_table(&DEFAULT_LUMA_QTABLE, 50);
    let coarse = scale_table(&DEFAULT_LUMA_QTABLE, 1);
    assert!(fine[0] < coarse[0]);
  }
}
