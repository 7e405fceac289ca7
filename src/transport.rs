// Shared-memory transport abstraction.
//
// The wire model in original_source (SISCI segments addressed by
// `(group << 16) | role`, `SCIRegisterSegment`/`SCIConnectSegment`,
// `SCIStartDmaTransfer`) is expressed here as a trait over opaque handles
// rather than typed `#[repr(C)]` structs: segment contents here are flat
// byte buffers with externally derived offsets (§3, §9), unlike the
// fixed-field segment structs in evo-core's shm-segments.rs. Handles
// (not borrowed slices) keep the trait object-safe and free of the
// lifetime entanglement a `&mut [u8]`-returning trait would need.

use crate::error::Result;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentId(pub u32);

impl SegmentId {
  pub fn compose(group: u16, role: u16) -> Self {
    Self(((group as u32) << 16) | role as u32)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RemoteHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DmaQueueHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DmaHandle(pub u32);

pub trait Transport {
  fn create_segment(&mut self, id: SegmentId, size: usize) -> Result<SegmentHandle>;
  fn prepare(&mut self, segment: SegmentHandle) -> Result<()>;
  fn set_available(&mut self, segment: SegmentHandle) -> Result<()>;
  fn connect_remote(&mut self, node: u32, id: SegmentId, timeout: Option<Duration>) -> Result<RemoteHandle>;

  fn write_local(&mut self, segment: SegmentHandle, offset: usize, data: &[u8]) -> Result<()>;
  fn read_local(&self, segment: SegmentHandle, offset: usize, len: usize) -> Result<Vec<u8>>;
  fn read_remote(&self, remote: RemoteHandle, offset: usize, len: usize) -> Result<Vec<u8>>;

  fn create_dma_queue(&mut self, max_entries: usize) -> Result<DmaQueueHandle>;
  fn start_dma(
    &mut self,
    queue: DmaQueueHandle,
    src: SegmentHandle,
    dst: RemoteHandle,
    local_off: usize,
    size: usize,
    remote_off: usize,
  ) -> Result<DmaHandle>;
  fn wait_dma(&mut self, queue: DmaQueueHandle, handle: DmaHandle, timeout: Option<Duration>) -> Result<()>;

  fn terminate(&mut self) -> Result<()>;
}

// Roles within a connection group, per §6.
pub const ROLE_RAW_CLIENT: u16 = 1;
pub const ROLE_RAW_SERVER: u16 = 2;
pub const ROLE_CMD_CLIENT: u16 = 3;
pub const ROLE_CMD_SERVER: u16 = 4;
pub const ROLE_RESULT_CLIENT: u16 = 5;
pub const ROLE_RESULT_SERVER: u16 = 6;

// In-process mock transport, backing both the integration tests and a
// same-process demo run. Segments are plain byte buffers keyed by the
// composed id; "remote" access reads straight out of the peer's buffer,
// since there is only one process. DMA is synchronous: `start_dma` performs
// the copy immediately and `wait_dma` is a no-op.
pub mod mock {
  use super::*;
  use crate::error::Error;
  use std::collections::HashMap;
  use std::sync::{Arc, Mutex};

  #[derive(Clone, Default)]
  pub struct MockTransport {
    segments: Arc<Mutex<HashMap<u32, Vec<u8>>>>,
    next_handle: Arc<Mutex<u32>>,
  }

  impl MockTransport {
    pub fn new() -> Self {
      Self::default()
    }

    // Two `MockTransport` handles over the same backing store, standing in
    // for the client and server nodes sharing one interconnect.
    pub fn paired() -> (Self, Self) {
      let shared = Self::new();
      (shared.clone(), shared)
    }

    fn alloc_handle(&self) -> u32 {
      let mut next = self.next_handle.lock().unwrap();
      let handle = *next;
      *next += 1;
      handle
    }
  }

  impl Transport for MockTransport {
    fn create_segment(&mut self, id: SegmentId, size: usize) -> Result<SegmentHandle> {
      self.segments.lock().unwrap().insert(id.0, vec![0u8; size]);
      Ok(SegmentHandle(id.0))
    }

    fn prepare(&mut self, _segment: SegmentHandle) -> Result<()> {
      Ok(())
    }

    fn set_available(&mut self, _segment: SegmentHandle) -> Result<()> {
      Ok(())
    }

    fn connect_remote(&mut self, _node: u32, id: SegmentId, _timeout: Option<Duration>) -> Result<RemoteHandle> {
      if self.segments.lock().unwrap().contains_key(&id.0) {
        Ok(RemoteHandle(id.0))
      } else {
        Err(Error::Transport(format!("no segment registered for id {}", id.0)))
      }
    }

    fn write_local(&mut self, segment: SegmentHandle, offset: usize, data: &[u8]) -> Result<()> {
      let mut segments = self.segments.lock().unwrap();
      let buf = segments
        .get_mut(&segment.0)
        .ok_or_else(|| Error::Transport(format!("unknown segment {}", segment.0)))?;
      if offset + data.len() > buf.len() {
        return Err(Error::Transport("write out of bounds".into()));
      }
      buf[offset..offset + data.len()].copy_from_slice(data);
      Ok(())
    }

    fn read_local(&self, segment: SegmentHandle, offset: usize, len: usize) -> Result<Vec<u8>> {
      let segments = self.segments.lock().unwrap();
      let buf = segments
        .get(&segment.0)
        .ok_or_else(|| Error::Transport(format!("unknown segment {}", segment.0)))?;
      if offset + len > buf.len() {
        return Err(Error::Transport("read out of bounds".into()));
      }
      Ok(buf[offset..offset + len].to_vec())
    }

    fn read_remote(&self, remote: RemoteHandle, offset: usize, len: usize) -> Result<Vec<u8>> {
      self.read_local(SegmentHandle(remote.0), offset, len)
    }

    fn create_dma_queue(&mut self, _max_entries: usize) -> Result<DmaQueueHandle> {
      Ok(DmaQueueHandle(self.alloc_handle()))
    }

    fn start_dma(
      &mut self,
      _queue: DmaQueueHandle,
      src: SegmentHandle,
      dst: RemoteHandle,
      local_off: usize,
      size: usize,
      remote_off: usize,
    ) -> Result<DmaHandle> {
      let data = self.read_local(src, local_off, size)?;
      self.write_local(SegmentHandle(dst.0), remote_off, &data)?;
      Ok(DmaHandle(self.alloc_handle()))
    }

    fn wait_dma(&mut self, _queue: DmaQueueHandle, _handle: DmaHandle, _timeout: Option<Duration>) -> Result<()> {
      Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
      self.segments.lock().unwrap().clear();
      Ok(())
    }
  }

  #[cfg(test)]
  mod tests {
    use super::*;

    #[test]
    fn dma_copies_bytes_between_paired_transports() {
      let (mut client, mut server) = MockTransport::paired();
      let id = SegmentId::compose(1, ROLE_RAW_CLIENT);
      client.create_segment(id, 16).unwrap();
      server.create_segment(SegmentId::compose(1, ROLE_RAW_SERVER), 16).unwrap();

      client.write_local(SegmentHandle(id.0), 0, &[1, 2, 3, 4]).unwrap();
      let remote = server.connect_remote(0, id, None).unwrap();
      let queue = server.create_dma_queue(1).unwrap();
      let dst = SegmentId::compose(1, ROLE_RAW_SERVER);
      let handle = server.start_dma(queue, SegmentHandle(remote.0), RemoteHandle(dst.0), 0, 4, 0).unwrap();
      server.wait_dma(queue, handle, None).unwrap();

      let copied = server.read_local(SegmentHandle(dst.0), 0, 4).unwrap();
      assert_eq!(copied, vec![1, 2, 3, 4]);
    }

    #[test]
    fn read_out_of_bounds_is_an_error() {
      let mut transport = MockTransport::new();
      let id = SegmentId::compose(1, ROLE_RAW_CLIENT);
      transport.create_segment(id, 4).unwrap();
      assert!(transport.read_local(SegmentHandle(id.0), 0, 8).is_err());
    }
  }
}
