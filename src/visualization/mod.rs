pub mod console;
pub mod ring_buffer;
pub mod summary;

pub use console::{render_lines, ConsoleRenderer};
pub use ring_buffer::{RingBuffer, RingReader, Snapshot, WriteRegion};
pub use summary::ChannelSummary;
