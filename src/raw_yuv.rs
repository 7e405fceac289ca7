// Thin raw planar 4:2:0 YUV file reader/writer for the two binaries.
//
// Grounded on `read_yuv` in original_source/c63enc.c (reads exact
// width*height Y bytes and (width*height)/4 U/V bytes per frame, zero-pads
// the rest of the padded plane) and on tinyavif's Y4MReader/Y4MWriter
// shape in y4m.rs, minus the YUV4MPEG2 container header this format
// doesn't have. Per §1 this is binary-level plumbing, not part of the
// tested core contract, so unlike the core modules it is not wired through
// `Geometry`'s padded sizes for the on-disk row length.

use crate::error::{Error, Result};
use crate::frame::{Plane, YuvFrame};
use crate::geometry::Geometry;
use std::io::{Read, Write};

pub struct YuvReader<R> {
  inner: R,
  width: usize,
  height: usize,
  geometry: Geometry,
}

impl<R: Read> YuvReader<R> {
  pub fn new(inner: R, width: usize, height: usize) -> Result<Self> {
    let geometry = Geometry::new(width, height)?;
    Ok(Self { inner, width, height, geometry })
  }

  fn read_plane(&mut self, plane_width: usize, plane_height: usize, row_len: usize, padded: &mut Plane) -> Result<usize> {
    let mut total = 0;
    let mut row = vec![0u8; row_len];
    for r in 0..plane_height {
      let n = read_up_to(&mut self.inner, &mut row)?;
      total += n;
      if n == 0 {
        break;
      }
      let dest_row_start = r * padded.width;
      padded.data[dest_row_start..dest_row_start + plane_width.min(n)].copy_from_slice(&row[..plane_width.min(n)]);
      if n < row_len {
        break;
      }
    }
    Ok(total)
  }

  // Returns `Ok(None)` on a clean EOF between frames, and an error if the
  // stream ends partway through a frame (§8 scenario S5).
  pub fn read_frame(&mut self) -> Result<Option<YuvFrame>> {
    let chroma_w = self.width / 2;
    let chroma_h = self.height / 2;
    let expected = self.width * self.height + 2 * chroma_w * chroma_h;

    let mut frame = YuvFrame::new(&self.geometry);
    let mut total = self.read_plane(self.width, self.height, self.width, &mut frame.y)?;
    if total == 0 {
      return Ok(None);
    }
    total += self.read_plane(chroma_w, chroma_h, chroma_w, &mut frame.u)?;
    total += self.read_plane(chroma_w, chroma_h, chroma_w, &mut frame.v)?;

    if total != expected {
      return Err(Error::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        format!("partial frame: read {total} of {expected} bytes"),
      )));
    }

    Ok(Some(frame))
  }
}

fn read_up_to<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
  let mut total = 0;
  while total < buf.len() {
    let n = r.read(&mut buf[total..]).map_err(Error::from)?;
    if n == 0 {
      break;
    }
    total += n;
  }
  Ok(total)
}

pub struct YuvWriter<W> {
  inner: W,
  width: usize,
  height: usize,
}

impl<W: Write> YuvWriter<W> {
  pub fn new(inner: W, width: usize, height: usize) -> Self {
    Self { inner, width, height }
  }

  pub fn write_frame(&mut self, frame: &YuvFrame) -> Result<()> {
    let chroma_w = self.width / 2;
    let chroma_h = self.height / 2;

    self.write_plane(&frame.y, self.width, self.height)?;
    self.write_plane(&frame.u, chroma_w, chroma_h)?;
    self.write_plane(&frame.v, chroma_w, chroma_h)?;
    Ok(())
  }

  fn write_plane(&mut self, plane: &Plane, width: usize, height: usize) -> Result<()> {
    for row in 0..height {
      let start = row * plane.width;
      self.inner.write_all(&plane.data[start..start + width]).map_err(Error::from)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[test]
  fn reads_back_a_written_frame() {
    let geometry = Geometry::new(16, 16).unwrap();
    let mut frame = YuvFrame::new(&geometry);
    frame.y.data.iter_mut().enumerate().for_each(|(i, v)| *v = (i % 255) as u8);

    let mut buf = Vec::new();
    YuvWriter::new(&mut buf, 16, 16).write_frame(&frame).unwrap();

    let mut reader = YuvReader::new(Cursor::new(buf), 16, 16).unwrap();
    let read_back = reader.read_frame().unwrap().unwrap();
    assert_eq!(read_back.y.as_slice(), frame.y.as_slice());
  }

  #[test]
  fn clean_eof_between_frames_yields_none() {
    let mut reader = YuvReader::new(Cursor::new(Vec::<u8>::new()), 16, 16).unwrap();
    assert!(reader.read_frame().unwrap().is_none());
  }

  #[test]
  fn partial_frame_is_an_error() {
    let bytes = vec![0u8; 16 * 16 / 2];
    let mut reader = YuvReader::new(Cursor::new(bytes), 16, 16).unwrap();
    assert!(reader.read_frame().is_err());
  }
}
