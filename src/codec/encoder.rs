use super::field;
use crate::core::Frame;

const VTABLE_POS: usize = 4;
const VTABLE_LEN: usize = 4 + 2 * field::COUNT;
const TABLE_POS: usize = VTABLE_POS + VTABLE_LEN;
const TABLE_LEN: usize = 48;

// Inline offsets inside the table; 64-bit scalars sit on 8-byte boundaries
const SLOT_OFFSETS: [(usize, u16); field::COUNT] = [
    (field::SAMPLES, 4),
    (field::STREAM, 8),
    (field::N_CHANNELS, 12),
    (field::N_SAMPLES, 16),
    (field::SAMPLE_NUM, 24),
    (field::TIMESTAMP, 32),
    (field::MESSAGE_ID, 40),
    (field::SAMPLE_RATE, 20),
];

/// Publisher-side writer for frame tables
///
/// Layout: root offset, vtable, table, stream string, samples vector. The
/// samples vector goes last so the message carries no trailing padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameEncoder;

impl FrameEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, frame: &Frame) -> Vec<u8> {
        let stream = frame.stream_id.as_bytes();
        let mut buf = Vec::with_capacity(TABLE_POS + TABLE_LEN + 8 + stream.len() + 4 * frame.payload.len());

        buf.extend_from_slice(&(TABLE_POS as u32).to_le_bytes());

        // vtable
        buf.extend_from_slice(&(VTABLE_LEN as u16).to_le_bytes());
        buf.extend_from_slice(&(TABLE_LEN as u16).to_le_bytes());
        let mut slots = [0u16; field::COUNT];
        for (slot, offset) in SLOT_OFFSETS {
            slots[slot] = offset;
        }
        for offset in slots {
            buf.extend_from_slice(&offset.to_le_bytes());
        }
        debug_assert_eq!(buf.len(), TABLE_POS);

        // table body, uoffsets patched below
        buf.resize(TABLE_POS + TABLE_LEN, 0);
        put(&mut buf, TABLE_POS, &((TABLE_POS - VTABLE_POS) as i32).to_le_bytes());
        put(&mut buf, slot_pos(field::N_CHANNELS), &(frame.num_channels as u32).to_le_bytes());
        put(&mut buf, slot_pos(field::N_SAMPLES), &(frame.num_samples as u32).to_le_bytes());
        put(&mut buf, slot_pos(field::SAMPLE_RATE), &frame.sample_rate.to_le_bytes());
        put(&mut buf, slot_pos(field::SAMPLE_NUM), &frame.sample_number.to_le_bytes());
        put(&mut buf, slot_pos(field::TIMESTAMP), &frame.timestamp.to_bits().to_le_bytes());
        put(&mut buf, slot_pos(field::MESSAGE_ID), &frame.message_id.to_le_bytes());

        let stream_pos = buf.len();
        buf.extend_from_slice(&(stream.len() as u32).to_le_bytes());
        buf.extend_from_slice(stream);
        buf.push(0);
        while buf.len() % 4 != 0 {
            buf.push(0);
        }
        link(&mut buf, field::STREAM, stream_pos);

        let samples_pos = buf.len();
        buf.extend_from_slice(&(frame.payload.len() as u32).to_le_bytes());
        for sample in &frame.payload {
            buf.extend_from_slice(&sample.to_le_bytes());
        }
        link(&mut buf, field::SAMPLES, samples_pos);

        buf
    }
}

fn slot_pos(slot: usize) -> usize {
    let offset = SLOT_OFFSETS
        .iter()
        .find(|(s, _)| *s == slot)
        .map(|(_, offset)| *offset)
        .unwrap_or(0);
    TABLE_POS + offset as usize
}

fn put(buf: &mut [u8], at: usize, bytes: &[u8]) {
    buf[at..at + bytes.len()].copy_from_slice(bytes);
}

/// Point the uoffset stored in `slot` at `target`
fn link(buf: &mut [u8], slot: usize, target: usize) {
    let at = slot_pos(slot);
    put(buf, at, &((target - at) as u32).to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let frame = Frame::new(7, "a", 1, 1, vec![5]);
        let buf = FrameEncoder::new().encode(&frame);

        assert_eq!(&buf[0..4], &(TABLE_POS as u32).to_le_bytes());
        assert_eq!(&buf[4..6], &(VTABLE_LEN as u16).to_le_bytes());
        assert_eq!(&buf[6..8], &(TABLE_LEN as u16).to_le_bytes());
        // stream string: len 1, "a", NUL, 2 pad; then samples: len 1, value 5
        assert_eq!(buf.len(), TABLE_POS + TABLE_LEN + 8 + 8);
        assert_eq!(&buf[buf.len() - 4..], &5i32.to_le_bytes());
    }

    #[test]
    fn test_vectors_are_aligned() {
        let frame = Frame::new(1, "abc", 1, 2, vec![1, 2]);
        let buf = FrameEncoder::new().encode(&frame);

        let samples_at = slot_pos(field::SAMPLES);
        let offset = u32::from_le_bytes(buf[samples_at..samples_at + 4].try_into().unwrap()) as usize;
        assert_eq!((samples_at + offset) % 4, 0);
        assert_eq!(slot_pos(field::MESSAGE_ID) % 8, 0);
    }
}
