// Handshake protocol: command word alphabet and the atomic cell it is
// exchanged through.
//
// Grounded on `enum cmd` and `struct packet` in original_source/common.h,
// which this polls via a raw volatile pointer; here the same busy-wait is
// expressed as a `std::sync::atomic::AtomicU8` with release/acquire
// ordering (§5 "Ordering guarantees"), matching how tinyavif favors typed,
// checked abstractions over raw pointer pokes elsewhere (e.g. `Array2D`
// instead of a bare `Box<[T]>` with manual indexing).

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
  Invalid = 0,
  Quit = 1,
  Done = 2,
}

impl Command {
  pub(crate) fn from_u8(value: u8) -> Self {
    match value {
      1 => Command::Quit,
      2 => Command::Done,
      _ => Command::Invalid,
    }
  }
}

// `struct packet` in original_source/common.h: the command word plus the
// image dimensions the client announces once, at the initial handshake.
pub const PACKET_SIZE: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandPacket {
  pub cmd: Command,
  pub img_width: u32,
  pub img_height: u32,
}

impl CommandPacket {
  pub fn encode(&self) -> [u8; PACKET_SIZE] {
    let mut out = [0u8; PACKET_SIZE];
    out[0] = self.cmd as u8;
    out[1..5].copy_from_slice(&self.img_width.to_le_bytes());
    out[5..9].copy_from_slice(&self.img_height.to_le_bytes());
    out
  }

  pub fn decode(bytes: &[u8]) -> Self {
    debug_assert!(bytes.len() >= PACKET_SIZE);
    let cmd = Command::from_u8(bytes[0]);
    let img_width = u32::from_le_bytes(bytes[1..5].try_into().unwrap());
    let img_height = u32::from_le_bytes(bytes[5..9].try_into().unwrap());
    Self { cmd, img_width, img_height }
  }
}

// One polled command cell, as carried by a `CmdSeg`. `img_width`/`img_height`
// ride alongside it only on the client->server cell, carried once at the
// initial handshake (§4.6); later frames reuse the same dimensions.
pub struct CommandCell {
  cmd: AtomicU8,
}

impl CommandCell {
  pub fn new() -> Self {
    Self { cmd: AtomicU8::new(Command::Invalid as u8) }
  }

  pub fn store(&self, cmd: Command, ordering: Ordering) {
    self.cmd.store(cmd as u8, ordering);
  }

  pub fn load(&self, ordering: Ordering) -> Command {
    Command::from_u8(self.cmd.load(ordering))
  }

  // Busy-wait until the predicate holds, yielding between polls so the
  // spin does not peg a core (§5 "Suspension points").
  pub fn spin_until<F: Fn(Command) -> bool>(&self, ordering: Ordering, predicate: F) -> Command {
    loop {
      let observed = self.load(ordering);
      if predicate(observed) {
        return observed;
      }
      std::thread::yield_now();
    }
  }
}

impl Default for CommandCell {
  fn default() -> Self {
    Self::new()
  }
}
