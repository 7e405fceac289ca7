// Error type, grounded on avif_parse::Error (examples/kornelski-avif-parse/src/lib.rs):
// a single hand-rolled enum with `Display`/`std::error::Error` impls and
// `From` conversions at the boundaries that actually produce errors, rather
// than a generated-boilerplate crate. tinyavif itself never propagates
// errors (main.rs only ever `.unwrap()`s), so this is grounded in the wider
// pack instead.

use std::fmt;

#[derive(Debug)]
pub enum Error {
  /// Bad CLI flags or unparseable integers.
  Config(String),
  /// Width/height that cannot be turned into a valid macroblock grid.
  Geometry(String),
  /// Propagated from `std::io`.
  Io(std::io::Error),
  /// A transport call failed. Carries the transport's own error rendered
  /// to a string, since the transport's error type is generic to the core.
  Transport(String),
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::Config(msg) => write!(f, "configuration error: {msg}"),
      Error::Geometry(msg) => write!(f, "geometry error: {msg}"),
      Error::Io(err) => write!(f, "I/O error: {err}"),
      Error::Transport(msg) => write!(f, "transport error: {msg}"),
    }
  }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Error {
    Error::Io(err)
  }
}

impl From<clap::error::Error> for Error {
  fn from(err: clap::error::Error) -> Error {
    Error::Config(err.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;
