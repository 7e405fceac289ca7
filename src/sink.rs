// Result sink: a thin, self-describing dump of per-frame artifacts.
//
// Stands in for the entropy coder / container muxer this format leaves out
// of scope (§1); the format is deliberately simple, a length-prefixed
// concatenation of `shuttle::pack_result` blobs, grounded on tinyavif's
// `write_u32::<BigEndian>` box-length pattern in isobmff.rs (here little-
// endian, matching the rest of this crate's wire encoding).

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub struct DumpWriter<W> {
  inner: W,
}

impl<W: Write> DumpWriter<W> {
  pub fn new(inner: W) -> Self {
    Self { inner }
  }

  pub fn write_frame(&mut self, packed: &[u8]) -> Result<()> {
    self
      .inner
      .write_u32::<LittleEndian>(packed.len() as u32)
      .map_err(Error::from)?;
    self.inner.write_all(packed).map_err(Error::from)
  }
}

pub struct DumpReader<R> {
  inner: R,
}

impl<R: Read> DumpReader<R> {
  pub fn new(inner: R) -> Self {
    Self { inner }
  }

  pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
    let len = match self.inner.read_u32::<LittleEndian>() {
      Ok(len) => len,
      Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
      Err(err) => return Err(Error::from(err)),
    };

    let mut buf = vec![0u8; len as usize];
    self.inner.read_exact(&mut buf).map_err(Error::from)?;
    Ok(Some(buf))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[test]
  fn round_trips_several_frames() {
    let mut buf = Vec::new();
    {
      let mut writer = DumpWriter::new(&mut buf);
      writer.write_frame(&[1, 2, 3]).unwrap();
      writer.write_frame(&[4, 5]).unwrap();
    }

    let mut reader = DumpReader::new(Cursor::new(buf));
    assert_eq!(reader.read_frame().unwrap(), Some(vec![1, 2, 3]));
    assert_eq!(reader.read_frame().unwrap(), Some(vec![4, 5]));
    assert_eq!(reader.read_frame().unwrap(), None);
  }
}
