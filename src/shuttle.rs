// Serialize frame artifacts into (and back out of) the flat byte buffers
// carried by `RawSeg`/`ResultSeg`.
//
// Grounded on tinyavif's y4m.rs, which reads/writes `Frame` planes
// directly against a `Read`/`Write` stream with `byteorder`; here the
// stream is an in-memory segment buffer instead of a file, and reads
// propagate `Error::Transport` instead of `.unwrap()`ing, per this crate's
// error-handling convention (§4.8).

use crate::error::{Error, Result};
use crate::frame::{CoeffPlane, Frame, MacroblockGrid, Plane, YuvFrame};
use crate::geometry::Geometry;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

fn io_err(err: std::io::Error) -> Error {
  Error::Transport(err.to_string())
}

pub fn raw_seg_size(geometry: &Geometry) -> usize {
  geometry.y_plane_size() + geometry.u_plane_size() + geometry.v_plane_size()
}

// Exact byte length `pack_result` produces for this geometry: 1 keyframe
// byte, then 9 bytes (use_mv + mv_x + mv_y) per macroblock across the three
// planes, then 2 bytes per coefficient across the three padded planes.
pub fn result_seg_size(geometry: &Geometry) -> usize {
  let mb_bytes = |rows: usize, cols: usize| rows * cols * 9;
  1
    + mb_bytes(geometry.mb_rows, geometry.mb_cols)
    + 2 * mb_bytes(geometry.chroma_mb_rows(), geometry.chroma_mb_cols())
    + 2 * geometry.y_plane_size()
    + 2 * geometry.u_plane_size()
    + 2 * geometry.v_plane_size()
}

pub fn pack_raw(yuv: &YuvFrame) -> Vec<u8> {
  let mut out = Vec::with_capacity(yuv.y.data.len() + yuv.u.data.len() + yuv.v.data.len());
  out.extend_from_slice(yuv.y.as_slice());
  out.extend_from_slice(yuv.u.as_slice());
  out.extend_from_slice(yuv.v.as_slice());
  out
}

pub fn unpack_raw(bytes: &[u8], geometry: &Geometry) -> Result<YuvFrame> {
  if bytes.len() < raw_seg_size(geometry) {
    return Err(Error::Transport("raw segment shorter than expected frame size".into()));
  }

  let mut cursor = Cursor::new(bytes);
  let mut read_plane = |width: usize, height: usize| -> Result<Plane> {
    let mut plane = Plane::new(width, height);
    cursor.read_exact(plane.as_slice_mut()).map_err(io_err)?;
    Ok(plane)
  };

  Ok(YuvFrame {
    y: read_plane(geometry.y_pw, geometry.y_ph)?,
    u: read_plane(geometry.u_pw, geometry.u_ph)?,
    v: read_plane(geometry.v_pw, geometry.v_ph)?,
  })
}

fn write_mbs<W: Write>(w: &mut W, mbs: &MacroblockGrid) -> Result<()> {
  for row in 0..mbs.rows {
    for col in 0..mbs.cols {
      let mb = mbs[(row, col)];
      w.write_u8(mb.use_mv as u8).map_err(io_err)?;
      w.write_i32::<LittleEndian>(mb.mv_x).map_err(io_err)?;
      w.write_i32::<LittleEndian>(mb.mv_y).map_err(io_err)?;
    }
  }
  Ok(())
}

fn read_mbs<R: Read>(r: &mut R, rows: usize, cols: usize) -> Result<MacroblockGrid> {
  let mut grid = MacroblockGrid::new(rows, cols);
  for row in 0..rows {
    for col in 0..cols {
      let use_mv = r.read_u8().map_err(io_err)? != 0;
      let mv_x = r.read_i32::<LittleEndian>().map_err(io_err)?;
      let mv_y = r.read_i32::<LittleEndian>().map_err(io_err)?;
      let mb = &mut grid[(row, col)];
      mb.use_mv = use_mv;
      mb.mv_x = mv_x;
      mb.mv_y = mv_y;
    }
  }
  Ok(grid)
}

fn write_coeffs<W: Write>(w: &mut W, plane: &CoeffPlane) -> Result<()> {
  for &coeff in plane.as_flat_slice() {
    w.write_i16::<LittleEndian>(coeff).map_err(io_err)?;
  }
  Ok(())
}

fn read_coeffs<R: Read>(r: &mut R, width: usize, height: usize) -> Result<CoeffPlane> {
  let mut plane = CoeffPlane::new(width, height);
  for coeff in plane.as_flat_slice_mut() {
    *coeff = r.read_i16::<LittleEndian>().map_err(io_err)?;
  }
  Ok(plane)
}

// Pack the artifacts `ResultSeg` carries for one frame: keyframe flag,
// the three macroblock grids, then the three quantized coefficient
// planes (§3).
pub fn pack_result(frame: &Frame) -> Result<Vec<u8>> {
  let mut out = Vec::new();
  out.write_u8(frame.keyframe as u8).map_err(io_err)?;
  write_mbs(&mut out, &frame.mbs.y)?;
  write_mbs(&mut out, &frame.mbs.u)?;
  write_mbs(&mut out, &frame.mbs.v)?;
  write_coeffs(&mut out, &frame.residuals.y)?;
  write_coeffs(&mut out, &frame.residuals.u)?;
  write_coeffs(&mut out, &frame.residuals.v)?;
  Ok(out)
}

pub struct EncodedArtifacts {
  pub keyframe: bool,
  pub mbs_y: MacroblockGrid,
  pub mbs_u: MacroblockGrid,
  pub mbs_v: MacroblockGrid,
  pub residuals_y: CoeffPlane,
  pub residuals_u: CoeffPlane,
  pub residuals_v: CoeffPlane,
}

pub fn unpack_result(bytes: &[u8], geometry: &Geometry) -> Result<EncodedArtifacts> {
  let mut cursor = Cursor::new(bytes);
  let keyframe = cursor.read_u8().map_err(io_err)? != 0;
  let mbs_y = read_mbs(&mut cursor, geometry.mb_rows, geometry.mb_cols)?;
  let mbs_u = read_mbs(&mut cursor, geometry.chroma_mb_rows(), geometry.chroma_mb_cols())?;
  let mbs_v = read_mbs(&mut cursor, geometry.chroma_mb_rows(), geometry.chroma_mb_cols())?;
  let residuals_y = read_coeffs(&mut cursor, geometry.y_pw, geometry.y_ph)?;
  let residuals_u = read_coeffs(&mut cursor, geometry.u_pw, geometry.u_ph)?;
  let residuals_v = read_coeffs(&mut cursor, geometry.v_pw, geometry.v_ph)?;

  Ok(EncodedArtifacts { keyframe, mbs_y, mbs_u, mbs_v, residuals_y, residuals_u, residuals_v })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::codec::CodecState;

  #[test]
  fn raw_round_trips_through_pack_unpack() {
    let geometry = Geometry::new(16, 16).unwrap();
    let mut yuv = YuvFrame::new(&geometry);
    yuv.y.data.iter_mut().enumerate().for_each(|(i, v)| *v = (i % 255) as u8);

    let packed = pack_raw(&yuv);
    let unpacked = unpack_raw(&packed, &geometry).unwrap();
    assert_eq!(yuv.y.as_slice(), unpacked.y.as_slice());
    assert_eq!(yuv.u.as_slice(), unpacked.u.as_slice());
    assert_eq!(yuv.v.as_slice(), unpacked.v.as_slice());
  }

  #[test]
  fn unpack_raw_rejects_truncated_segment() {
    let geometry = Geometry::new(16, 16).unwrap();
    let short = vec![0u8; raw_seg_size(&geometry) - 1];
    assert!(unpack_raw(&short, &geometry).is_err());
  }

  #[test]
  fn result_round_trips_through_pack_unpack() {
    let mut cm = CodecState::init(16, 16).unwrap();
    let raw = YuvFrame::new(&cm.geometry);
    let frame = crate::pipeline::encode_one(&mut cm, &raw);

    let packed = pack_result(frame).unwrap();
    let unpacked = unpack_result(&packed, &cm.geometry).unwrap();
    assert_eq!(unpacked.keyframe, frame.keyframe);
    assert_eq!(unpacked.residuals_y.as_flat_slice(), frame.residuals.y.as_flat_slice());
  }

  #[test]
  fn result_seg_size_matches_packed_length() {
    let mut cm = CodecState::init(16, 16).unwrap();
    let raw = YuvFrame::new(&cm.geometry);
    let frame = crate::pipeline::encode_one(&mut cm, &raw);
    let packed = pack_result(frame).unwrap();
    assert_eq!(packed.len(), result_seg_size(&cm.geometry));
  }
}
