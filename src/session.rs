// Node drivers: the client and server loops, wiring the handshake protocol
// (§4.6) and a `Transport` onto the encode pipeline (§4.5).
//
// Grounded on `client_main`/`server_main` in original_source/c63enc.c and
// c63server.c, which set segments up once, exchange a `struct packet`
// carrying the image dimensions, then loop frame by frame until the client
// sends `CMD_QUIT`. Unlike the original, which reuses one shared packet both
// sides poll and mutate, each side here only ever `write_local`s its OWN
// command segment; the peer only ever reads it, through `read_remote`. A
// single Done/Invalid toggle would leave a window where a fast peer could
// skip past the brief Invalid state between two Done values, so each round
// (including the initial handshake) is a four-step exchange: signal, wait
// for the peer's signal, ack, wait for the peer's ack. Neither side moves
// past its own ack-wait until the peer has actually observed the step
// before it, so no transition can be missed by polling.

use crate::codec::CodecState;
use crate::error::Result;
use crate::geometry::Geometry;
use crate::pipeline::encode_one;
use crate::protocol::{Command, CommandPacket, PACKET_SIZE};
use crate::raw_yuv::YuvReader;
use crate::shuttle;
use crate::sink::DumpWriter;
use crate::transport::{
  RemoteHandle, SegmentHandle, SegmentId, Transport, ROLE_CMD_CLIENT, ROLE_CMD_SERVER, ROLE_RAW_CLIENT,
  ROLE_RAW_SERVER, ROLE_RESULT_CLIENT, ROLE_RESULT_SERVER,
};
use std::io::{Read, Write};
use std::time::{Duration, Instant};

const CONNECT_GROUP: u16 = 1;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientSummary {
  pub frames_encoded: u64,
}

fn write_cmd<T: Transport>(transport: &mut T, seg: SegmentHandle, cmd: Command, width: u32, height: u32) -> Result<()> {
  let packet = CommandPacket { cmd, img_width: width, img_height: height };
  transport.write_local(seg, 0, &packet.encode())
}

fn read_remote_packet<T: Transport + ?Sized>(transport: &T, remote: RemoteHandle) -> Result<CommandPacket> {
  let bytes = transport.read_remote(remote, 0, PACKET_SIZE)?;
  Ok(CommandPacket::decode(&bytes))
}

// Busy-wait until the peer's command cell satisfies `predicate`, yielding
// between polls (§5 "Suspension points").
fn spin_remote<T: Transport + ?Sized>(
  transport: &T,
  remote: RemoteHandle,
  predicate: impl Fn(Command) -> bool,
) -> Result<CommandPacket> {
  loop {
    let packet = read_remote_packet(transport, remote)?;
    if predicate(packet.cmd) {
      return Ok(packet);
    }
    std::thread::yield_now();
  }
}

// `connect_remote` is a one-shot lookup in the mock transport; a real
// interconnect may need the peer's segment to actually be registered first,
// so retry until the deadline instead of failing on the first miss.
fn connect_retry<T: Transport>(transport: &mut T, node: u32, id: SegmentId, deadline: Duration) -> Result<RemoteHandle> {
  let start = Instant::now();
  loop {
    match transport.connect_remote(node, id, Some(deadline)) {
      Ok(handle) => return Ok(handle),
      Err(err) => {
        if start.elapsed() >= deadline {
          return Err(err);
        }
        std::thread::yield_now();
      }
    }
  }
}

pub fn run_client<T, R, W>(
  transport: &mut T,
  remote_node: u32,
  width: usize,
  height: usize,
  input: R,
  output: W,
  frame_cap: Option<u64>,
) -> Result<ClientSummary>
where
  T: Transport,
  R: Read,
  W: Write,
{
  let w = width as u32;
  let h = height as u32;
  let geometry = Geometry::new(width, height)?;
  let raw_size = shuttle::raw_seg_size(&geometry);
  let result_size = shuttle::result_seg_size(&geometry);

  let own_cmd = transport.create_segment(SegmentId::compose(CONNECT_GROUP, ROLE_CMD_CLIENT), PACKET_SIZE)?;
  transport.prepare(own_cmd)?;
  transport.set_available(own_cmd)?;

  let own_raw = transport.create_segment(SegmentId::compose(CONNECT_GROUP, ROLE_RAW_CLIENT), raw_size)?;
  transport.prepare(own_raw)?;
  transport.set_available(own_raw)?;

  let own_result = transport.create_segment(SegmentId::compose(CONNECT_GROUP, ROLE_RESULT_CLIENT), result_size)?;
  transport.prepare(own_result)?;
  transport.set_available(own_result)?;

  log::info!("client: segments ready, connecting to node {remote_node}");
  let peer_cmd = connect_retry(transport, remote_node, SegmentId::compose(CONNECT_GROUP, ROLE_CMD_SERVER), HANDSHAKE_TIMEOUT)?;

  // Handshake: announce dimensions, wait for the server to size and connect
  // its own segments, then ack so it can reset for the first real frame.
  write_cmd(transport, own_cmd, Command::Done, w, h)?;
  spin_remote(&*transport, peer_cmd, |c| c == Command::Done)?;
  write_cmd(transport, own_cmd, Command::Invalid, w, h)?;
  spin_remote(&*transport, peer_cmd, |c| c == Command::Invalid)?;
  log::info!("client: handshake complete ({width}x{height})");

  let peer_raw = connect_retry(transport, remote_node, SegmentId::compose(CONNECT_GROUP, ROLE_RAW_SERVER), HANDSHAKE_TIMEOUT)?;
  let peer_result = connect_retry(transport, remote_node, SegmentId::compose(CONNECT_GROUP, ROLE_RESULT_SERVER), HANDSHAKE_TIMEOUT)?;
  let dma_queue = transport.create_dma_queue(4)?;

  let mut reader = YuvReader::new(input, width, height)?;
  let mut sink = DumpWriter::new(output);
  let mut frames_encoded = 0u64;

  loop {
    if frame_cap.is_some_and(|cap| frames_encoded >= cap) {
      log::info!("client: frame cap reached, stopping");
      break;
    }

    let frame = match reader.read_frame() {
      Ok(Some(frame)) => frame,
      Ok(None) => {
        log::info!("client: clean end of input after {frames_encoded} frames");
        break;
      }
      Err(err) => {
        log::warn!("client: short read discarded, stopping: {err}");
        break;
      }
    };

    let packed = shuttle::pack_raw(&frame);
    transport.write_local(own_raw, 0, &packed)?;
    let dma = transport.start_dma(dma_queue, own_raw, peer_raw, 0, raw_size, 0)?;
    transport.wait_dma(dma_queue, dma, Some(HANDSHAKE_TIMEOUT))?;

    write_cmd(transport, own_cmd, Command::Done, w, h)?;
    spin_remote(&*transport, peer_cmd, |c| c == Command::Done)?;

    let result = transport.read_local(own_result, 0, result_size)?;
    sink.write_frame(&result)?;
    frames_encoded += 1;

    write_cmd(transport, own_cmd, Command::Invalid, w, h)?;
    spin_remote(&*transport, peer_cmd, |c| c == Command::Invalid)?;
  }

  write_cmd(transport, own_cmd, Command::Quit, w, h)?;
  transport.terminate()?;
  Ok(ClientSummary { frames_encoded })
}

pub fn run_server<T: Transport>(transport: &mut T, remote_node: u32) -> Result<u64> {
  let own_cmd = transport.create_segment(SegmentId::compose(CONNECT_GROUP, ROLE_CMD_SERVER), PACKET_SIZE)?;
  transport.prepare(own_cmd)?;
  transport.set_available(own_cmd)?;

  log::info!("server: waiting for client handshake");
  let peer_cmd = connect_retry(transport, remote_node, SegmentId::compose(CONNECT_GROUP, ROLE_CMD_CLIENT), HANDSHAKE_TIMEOUT)?;
  let handshake = spin_remote(&*transport, peer_cmd, |c| c != Command::Invalid)?;
  let width = handshake.img_width as usize;
  let height = handshake.img_height as usize;
  let w = handshake.img_width;
  let h = handshake.img_height;

  let mut cm = CodecState::init(width, height)?;
  let raw_size = shuttle::raw_seg_size(&cm.geometry);
  let result_size = shuttle::result_seg_size(&cm.geometry);

  let own_raw = transport.create_segment(SegmentId::compose(CONNECT_GROUP, ROLE_RAW_SERVER), raw_size)?;
  transport.prepare(own_raw)?;
  transport.set_available(own_raw)?;

  let own_result = transport.create_segment(SegmentId::compose(CONNECT_GROUP, ROLE_RESULT_SERVER), result_size)?;
  transport.prepare(own_result)?;
  transport.set_available(own_result)?;

  let peer_raw = connect_retry(transport, remote_node, SegmentId::compose(CONNECT_GROUP, ROLE_RAW_CLIENT), HANDSHAKE_TIMEOUT)?;
  let peer_result = connect_retry(transport, remote_node, SegmentId::compose(CONNECT_GROUP, ROLE_RESULT_CLIENT), HANDSHAKE_TIMEOUT)?;
  let dma_queue = transport.create_dma_queue(4)?;

  write_cmd(transport, own_cmd, Command::Done, w, h)?;
  spin_remote(&*transport, peer_cmd, |c| c == Command::Invalid)?;
  write_cmd(transport, own_cmd, Command::Invalid, w, h)?;
  log::info!("server: handshake complete ({width}x{height})");

  let mut frames_encoded = 0u64;

  loop {
    let signal = spin_remote(&*transport, peer_cmd, |c| c != Command::Invalid)?;
    if signal.cmd == Command::Quit {
      log::info!("server: client quit after {frames_encoded} frames");
      break;
    }

    let raw_bytes = transport.read_local(own_raw, 0, raw_size)?;
    let raw = shuttle::unpack_raw(&raw_bytes, &cm.geometry)?;
    let frame = encode_one(&mut cm, &raw);
    let packed = shuttle::pack_result(frame)?;

    transport.write_local(own_result, 0, &packed)?;
    let dma = transport.start_dma(dma_queue, own_result, peer_result, 0, packed.len(), 0)?;
    transport.wait_dma(dma_queue, dma, Some(HANDSHAKE_TIMEOUT))?;
    frames_encoded += 1;

    write_cmd(transport, own_cmd, Command::Done, w, h)?;
    spin_remote(&*transport, peer_cmd, |c| c == Command::Invalid)?;
    write_cmd(transport, own_cmd, Command::Invalid, w, h)?;
  }

  transport.terminate()?;
  Ok(frames_encoded)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transport::mock::MockTransport;

  fn synthetic_yuv(width: usize, height: usize, frames: usize) -> Vec<u8> {
    let frame_len = width * height + 2 * (width / 2) * (height / 2);
    let mut buf = vec![0u8; frame_len * frames];
    for (i, b) in buf.iter_mut().enumerate() {
      *b = (i % 251) as u8;
    }
    buf
  }

  #[test]
  fn client_and_server_exchange_a_full_stream() {
    let (mut client_transport, mut server_transport) = MockTransport::paired();
    let input = synthetic_yuv(16, 16, 3);
    let mut output = Vec::new();

    let server = std::thread::spawn(move || run_server(&mut server_transport, 0).unwrap());
    let summary = run_client(&mut client_transport, 0, 16, 16, std::io::Cursor::new(input), &mut output, None).unwrap();
    let frames_on_server = server.join().unwrap();

    assert_eq!(summary.frames_encoded, 3);
    assert_eq!(frames_on_server, 3);
    assert!(!output.is_empty());
  }

  #[test]
  fn frame_cap_stops_the_client_early() {
    let (mut client_transport, mut server_transport) = MockTransport::paired();
    let input = synthetic_yuv(16, 16, 5);
    let mut output = Vec::new();

    let server = std::thread::spawn(move || run_server(&mut server_transport, 0).unwrap());
    let summary = run_client(&mut client_transport, 0, 16, 16, std::io::Cursor::new(input), &mut output, Some(2)).unwrap();
    let frames_on_server = server.join().unwrap();

    assert_eq!(summary.frames_encoded, 2);
    assert_eq!(frames_on_server, 2);
  }

  #[test]
  fn short_trailing_frame_is_dropped_cleanly() {
    let (mut client_transport, mut server_transport) = MockTransport::paired();
    let mut input = synthetic_yuv(16, 16, 2);
    input.extend_from_slice(&[0u8; 10]); // a partial third frame
    let mut output = Vec::new();

    let server = std::thread::spawn(move || run_server(&mut server_transport, 0).unwrap());
    let summary = run_client(&mut client_transport, 0, 16, 16, std::io::Cursor::new(input), &mut output, None).unwrap();
    let frames_on_server = server.join().unwrap();

    assert_eq!(summary.frames_encoded, 2);
    assert_eq!(frames_on_server, 2);
  }
}
