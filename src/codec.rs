// Codec state: geometry, quantization tables and the frame ring.
//
// Grounded on `struct c63_common` in original_source/common.h (qp, padw/padh,
// me_search_range, keyframe_interval, framenum fields) and on tinyavif's
// convention of a plain owning struct with an explicit `new`/`init`
// constructor (see `AV1Encoder::new` in av1_encoder.rs).

use crate::error::Result;
use crate::frame::Frame;
use crate::geometry::Geometry;
use crate::quant::QuantTables;

pub const DEFAULT_QP: u8 = 25;
pub const DEFAULT_SEARCH_RANGE: i32 = 16;
pub const DEFAULT_KEYFRAME_INTERVAL: u64 = 100;

pub struct CodecState {
  pub geometry: Geometry,
  pub qtables: QuantTables,
  pub qp: u8,
  pub me_search_range: i32,
  pub keyframe_interval: u64,
  pub framenum: u64,
  pub frames_since_keyframe: u64,
  pub refframe: Option<Box<Frame>>,
  pub curframe: Box<Frame>,
}

impl CodecState {
  pub fn init(width: usize, height: usize) -> Result<Self> {
    let geometry = Geometry::new(width, height)?;
    let qtables = QuantTables::for_qp(DEFAULT_QP);
    let curframe = Box::new(Frame::new(&geometry));

    Ok(Self {
      geometry,
      qtables,
      qp: DEFAULT_QP,
      me_search_range: DEFAULT_SEARCH_RANGE,
      keyframe_interval: DEFAULT_KEYFRAME_INTERVAL,
      framenum: 0,
      frames_since_keyframe: 0,
      refframe: None,
      curframe,
    })
  }

  pub fn is_keyframe_due(&self) -> bool {
    self.framenum == 0 || self.frames_since_keyframe == self.keyframe_interval
  }
}
