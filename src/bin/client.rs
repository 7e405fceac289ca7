// Client node: reads raw YUV frames from disk and drives the handshake
// protocol and encode pipeline running on the server node (§6).
//
// CLI surface grounded on tinyavif's main.rs (clap derive, env_logger
// init, error logged at `error!` and a non-zero exit on failure).

use c63::session;
use c63::transport::mock::MockTransport;
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "c63-client", about = "Distributed c63 encoder client")]
struct Args {
  /// Path to the raw planar 4:2:0 YUV input file.
  input: PathBuf,

  /// Frame width in pixels.
  #[arg(short, long)]
  width: usize,

  /// Frame height in pixels.
  // `-h` is reserved by clap for `--help`, so this takes `-H` instead.
  #[arg(short = 'H', long)]
  height: usize,

  /// Where to write the encoded frame dump.
  #[arg(short, long)]
  output: PathBuf,

  /// Remote node identifier of the server.
  #[arg(short, long, default_value_t = 0)]
  remote: u32,

  /// Stop after this many frames, regardless of input length.
  #[arg(short = 'f', long = "frame-cap")]
  frame_cap: Option<u64>,
}

fn main() {
  env_logger::init();
  let args = Args::parse();

  if let Err(err) = run(args) {
    log::error!("client: {err}");
    std::process::exit(1);
  }
}

fn run(args: Args) -> c63::Result<()> {
  let input = File::open(&args.input)?;
  let output = BufWriter::new(File::create(&args.output)?);

  // A production deployment supplies a SISCI-backed `Transport`; this demo
  // wires the client and server through the in-process mock instead, since
  // that is the only transport this crate implements.
  let mut transport = MockTransport::new();

  let summary = session::run_client(&mut transport, args.remote, args.width, args.height, input, output, args.frame_cap)?;
  log::info!("client: encoded {} frames", summary.frames_encoded);
  Ok(())
}
