//! Wire codec for sample frames.
//!
//! Frames travel as a FlatBuffers table (see `schema/continuous_data.fbs`):
//!
//! ```text
//! table ContinuousData {
//!   samples:     [int];    // 0, required
//!   stream:      string;   // 1, required
//!   n_channels:  uint;     // 2, > 0
//!   n_samples:   uint;     // 3, > 0
//!   sample_num:  long;     // 4
//!   timestamp:   double;   // 5
//!   message_id:  ulong;    // 6
//!   sample_rate: uint;     // 7
//! }
//! ```
//!
//! Absent scalars read as 0, as FlatBuffers writers omit default values.

pub mod decoder;
pub mod encoder;
pub mod reshaper;

pub use decoder::FrameDecoder;
pub use encoder::FrameEncoder;
pub use reshaper::{SampleLayout, SampleReshaper};

/// Field slots of the frame table, in vtable order
pub(crate) mod field {
    pub const SAMPLES: usize = 0;
    pub const STREAM: usize = 1;
    pub const N_CHANNELS: usize = 2;
    pub const N_SAMPLES: usize = 3;
    pub const SAMPLE_NUM: usize = 4;
    pub const TIMESTAMP: usize = 5;
    pub const MESSAGE_ID: usize = 6;
    pub const SAMPLE_RATE: usize = 7;

    pub const COUNT: usize = 8;
}
