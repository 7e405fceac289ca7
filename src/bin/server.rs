// Server node: runs the codec against frames handed over by the client
// and sends the encoded results back (§6).

use c63::session;
use c63::transport::mock::MockTransport;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "c63-server", about = "Distributed c63 encoder server")]
struct Args {
  /// Remote node identifier of the client.
  #[arg(short, long, default_value_t = 0)]
  remote: u32,
}

fn main() {
  env_logger::init();
  let args = Args::parse();

  if let Err(err) = run(args) {
    log::error!("server: {err}");
    std::process::exit(1);
  }
}

fn run(args: Args) -> c63::Result<()> {
  // See src/bin/client.rs: this demo only ships the in-process mock
  // transport, so these two binaries only interoperate within one process.
  let mut transport = MockTransport::new();
  let frames = session::run_server(&mut transport, args.remote)?;
  log::info!("server: processed {frames} frames");
  Ok(())
}
