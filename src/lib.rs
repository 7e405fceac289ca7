//! Core of a two-node distributed video encoder: a client that reads raw
//! YUV frames and a server that runs the codec, talking over a shared-
//! memory interconnect coordinated by a polled command protocol.
//!
//! The two hard subsystems are the handshake protocol ([`protocol`],
//! [`transport`]) and the per-frame encode pipeline ([`pipeline`],
//! [`motion`], [`txfm`]). Everything else ([`geometry`], [`quant`],
//! [`frame`], [`codec`]) is the supporting data model; [`raw_yuv`] and
//! [`sink`] are thin binary-level plumbing, not part of the tested core
//! contract.

pub mod array2d;
pub mod codec;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod motion;
pub mod pipeline;
pub mod protocol;
pub mod quant;
pub mod raw_yuv;
pub mod session;
pub mod shuttle;
pub mod sink;
pub mod transport;
pub mod txfm;
pub mod util;

pub use error::{Error, Result};
