// Frame geometry: pure derivation of padded plane dimensions and the
// macroblock grid from a raw (width, height), grounded on
// `AV1Encoder::new` in tinyavif's av1_encoder.rs (which derives padded
// luma/chroma dims from crop dims the same way) and on `init_c63_enc` in
// original_source/c63enc.c, which the rounding rules here are pinned to.

use crate::error::{Error, Result};
use crate::quant::BLOCK_SIDE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
  pub width: usize,
  pub height: usize,

  pub y_pw: usize,
  pub y_ph: usize,
  pub u_pw: usize,
  pub u_ph: usize,
  pub v_pw: usize,
  pub v_ph: usize,

  pub mb_rows: usize,
  pub mb_cols: usize,
}

fn round_up(value: usize, multiple: usize) -> usize {
  value.div_ceil(multiple) * multiple
}

impl Geometry {
  pub fn new(width: usize, height: usize) -> Result<Self> {
    if width == 0 || height == 0 {
      return Err(Error::Geometry(format!(
        "width and height must be non-zero, got {width}x{height}"
      )));
    }

    let y_pw = round_up(width, 16);
    let y_ph = round_up(height, 16);
    let u_pw = round_up(width, 16) / 2;
    let u_ph = round_up(height, 16) / 2;

    let mb_cols = y_pw / BLOCK_SIDE;
    let mb_rows = y_ph / BLOCK_SIDE;

    Ok(Self {
      width,
      height,
      y_pw,
      y_ph,
      u_pw,
      u_ph,
      v_pw: u_pw,
      v_ph: u_ph,
      mb_rows,
      mb_cols,
    })
  }

  pub fn chroma_mb_rows(&self) -> usize {
    self.mb_rows / 2
  }

  pub fn chroma_mb_cols(&self) -> usize {
    self.mb_cols / 2
  }

  pub fn y_plane_size(&self) -> usize {
    self.y_pw * self.y_ph
  }

  pub fn u_plane_size(&self) -> usize {
    self.u_pw * self.u_ph
  }

  pub fn v_plane_size(&self) -> usize {
    self.v_pw * self.v_ph
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_dimensions_are_rejected() {
    assert!(Geometry::new(0, 16).is_err());
    assert!(Geometry::new(16, 0).is_err());
  }

  #[test]
  fn padded_dims_satisfy_invariants() {
    for &(w, h) in &[(16, 16), (176, 144), (1, 1), (1920, 1080), (17, 33)] {
      let g = Geometry::new(w, h).unwrap();
      assert_eq!(g.y_pw % 16, 0);
      assert_eq!(g.y_ph % 16, 0);
      assert_eq!(g.u_pw, (w as f64 / 16.0).ceil() as usize * 8);
      assert_eq!(g.v_pw, g.u_pw);
      assert_eq!(g.u_ph, (h as f64 / 16.0).ceil() as usize * 8);
      assert_eq!(g.v_ph, g.u_ph);
      assert_eq!(g.mb_rows * 8, g.y_ph);
      assert_eq!(g.mb_cols * 8, g.y_pw);
    }
  }

  #[test]
  fn smallest_frame_is_one_macroblock() {
    let g = Geometry::new(16, 16).unwrap();
    assert_eq!(g.mb_rows, 2);
    assert_eq!(g.mb_cols, 2);
    assert_eq!(g.chroma_mb_rows(), 1);
    assert_eq!(g.chroma_mb_cols(), 1);
  }
}
