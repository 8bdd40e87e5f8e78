use super::field;
use crate::core::Frame;
use crate::error::DecodeError;

/// Validating decoder for frame tables
///
/// Every offset read from the message is bounds-checked before use, so a
/// truncated or hostile buffer produces a [`DecodeError`] instead of a panic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder;

impl FrameDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, raw: &[u8]) -> Result<Frame, DecodeError> {
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }

        let table = Table::root(raw)?;

        // Writers omit scalars equal to their default, so an absent scalar reads as 0
        let message_id = table.scalar_u64(field::MESSAGE_ID)?.unwrap_or(0);
        let stream_id = table
            .string(field::STREAM)?
            .ok_or(DecodeError::MissingField("stream"))?;
        let num_channels = table.scalar_u32(field::N_CHANNELS)?.unwrap_or(0);
        let num_samples = table.scalar_u32(field::N_SAMPLES)?.unwrap_or(0);
        let payload = table
            .vector_i32(field::SAMPLES)?
            .ok_or(DecodeError::MissingField("samples"))?;

        if num_channels == 0 {
            return Err(DecodeError::InvalidField {
                field: "n_channels",
                reason: "must be positive".to_string(),
            });
        }
        if num_samples == 0 {
            return Err(DecodeError::InvalidField {
                field: "n_samples",
                reason: "must be positive".to_string(),
            });
        }

        let sample_number = table.scalar_u64(field::SAMPLE_NUM)?.unwrap_or(0) as i64;
        let timestamp = table
            .scalar_u64(field::TIMESTAMP)?
            .map(f64::from_bits)
            .unwrap_or(0.0);
        let sample_rate = table.scalar_u32(field::SAMPLE_RATE)?.unwrap_or(0);

        Ok(Frame {
            message_id,
            stream_id,
            num_channels: num_channels as usize,
            num_samples: num_samples as usize,
            payload,
            sample_number,
            timestamp,
            sample_rate,
        })
    }
}

/// Bounds-checked view of one table inside a message
struct Table<'a> {
    buf: &'a [u8],
    pos: usize,
    vtable: usize,
    vtable_len: usize,
    table_len: usize,
}

impl<'a> Table<'a> {
    fn root(buf: &'a [u8]) -> Result<Self, DecodeError> {
        let pos = read_u32(buf, 0)? as usize;
        let soffset = read_u32(buf, pos)? as i32 as i64;
        let vtable = pos as i64 - soffset;
        if vtable < 0 {
            return Err(DecodeError::InvalidVTable("vtable offset points before message start"));
        }
        let vtable = vtable as usize;

        let vtable_len = read_u16(buf, vtable)? as usize;
        let table_len = read_u16(buf, vtable + 2)? as usize;
        if vtable_len < 4 || vtable_len % 2 != 0 {
            return Err(DecodeError::InvalidVTable("bad vtable length"));
        }
        if table_len < 4 {
            return Err(DecodeError::InvalidVTable("bad table length"));
        }
        check_range(buf, vtable, vtable_len)?;
        check_range(buf, pos, table_len)?;

        Ok(Self {
            buf,
            pos,
            vtable,
            vtable_len,
            table_len,
        })
    }

    /// Absolute position of a present field holding `size` inline bytes
    fn field(&self, slot: usize, size: usize) -> Result<Option<usize>, DecodeError> {
        let entry = 4 + 2 * slot;
        if entry + 2 > self.vtable_len {
            return Ok(None);
        }
        let offset = read_u16(self.buf, self.vtable + entry)? as usize;
        if offset == 0 {
            return Ok(None);
        }
        if offset < 4 || offset + size > self.table_len {
            return Err(DecodeError::InvalidVTable("field lies outside its table"));
        }
        Ok(Some(self.pos + offset))
    }

    fn scalar_u32(&self, slot: usize) -> Result<Option<u32>, DecodeError> {
        match self.field(slot, 4)? {
            Some(at) => read_u32(self.buf, at).map(Some),
            None => Ok(None),
        }
    }

    fn scalar_u64(&self, slot: usize) -> Result<Option<u64>, DecodeError> {
        match self.field(slot, 8)? {
            Some(at) => read_u64(self.buf, at).map(Some),
            None => Ok(None),
        }
    }

    /// Element count and start of a vector referenced from `slot`
    fn vector(&self, slot: usize, elem_size: usize) -> Result<Option<(usize, usize)>, DecodeError> {
        let Some(at) = self.field(slot, 4)? else {
            return Ok(None);
        };
        let start = at
            .checked_add(read_u32(self.buf, at)? as usize)
            .ok_or(DecodeError::InvalidVTable("vector offset overflows"))?;
        let len = read_u32(self.buf, start)? as usize;
        let bytes = len.checked_mul(elem_size).ok_or(DecodeError::OutOfBounds {
            offset: start + 4,
            len: usize::MAX,
            size: self.buf.len(),
        })?;
        check_range(self.buf, start + 4, bytes)?;
        Ok(Some((len, start + 4)))
    }

    fn vector_i32(&self, slot: usize) -> Result<Option<Vec<i32>>, DecodeError> {
        let Some((len, start)) = self.vector(slot, 4)? else {
            return Ok(None);
        };
        let values = self.buf[start..start + len * 4]
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Some(values))
    }

    fn string(&self, slot: usize) -> Result<Option<String>, DecodeError> {
        let Some((len, start)) = self.vector(slot, 1)? else {
            return Ok(None);
        };
        check_range(self.buf, start, len + 1)?;
        if self.buf[start + len] != 0 {
            return Err(DecodeError::InvalidField {
                field: "stream",
                reason: "missing string terminator".to_string(),
            });
        }
        let text = std::str::from_utf8(&self.buf[start..start + len]).map_err(|e| {
            DecodeError::InvalidField {
                field: "stream",
                reason: e.to_string(),
            }
        })?;
        Ok(Some(text.to_string()))
    }
}

fn check_range(buf: &[u8], offset: usize, len: usize) -> Result<(), DecodeError> {
    match offset.checked_add(len) {
        Some(end) if end <= buf.len() => Ok(()),
        _ => Err(DecodeError::OutOfBounds {
            offset,
            len,
            size: buf.len(),
        }),
    }
}

fn read_u16(buf: &[u8], at: usize) -> Result<u16, DecodeError> {
    check_range(buf, at, 2)?;
    Ok(u16::from_le_bytes([buf[at], buf[at + 1]]))
}

fn read_u32(buf: &[u8], at: usize) -> Result<u32, DecodeError> {
    check_range(buf, at, 4)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64(buf: &[u8], at: usize) -> Result<u64, DecodeError> {
    check_range(buf, at, 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    Ok(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FrameEncoder;

    fn sample_frame() -> Frame {
        let mut frame = Frame::new(42, "stream-0", 2, 3, vec![1, -2, 3, 4, -5, 6]);
        frame.sample_number = 9000;
        frame.timestamp = 12.5;
        frame.sample_rate = 30000;
        frame
    }

    #[test]
    fn test_decode_encoded_frame() {
        let bytes = FrameEncoder::new().encode(&sample_frame());
        let frame = FrameDecoder::new().decode(&bytes).unwrap();

        assert_eq!(frame, sample_frame());
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(FrameDecoder::new().decode(&[]), Err(DecodeError::Empty));
    }

    #[test]
    fn test_every_truncation_is_rejected() {
        let bytes = FrameEncoder::new().encode(&sample_frame());
        let decoder = FrameDecoder::new();

        for len in 1..bytes.len() {
            assert!(
                decoder.decode(&bytes[..len]).is_err(),
                "truncation to {} bytes decoded",
                len
            );
        }
    }

    #[test]
    fn test_root_offset_past_end() {
        let bytes = [0xFFu8, 0xFF, 0xFF, 0x7F, 0, 0, 0, 0];
        assert!(matches!(
            FrameDecoder::new().decode(&bytes),
            Err(DecodeError::OutOfBounds { .. })
        ));
    }
}
