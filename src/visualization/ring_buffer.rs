use crate::core::SampleMatrix;
use crate::error::RingBufferError;
use std::sync::atomic::{fence, AtomicU64, Ordering};
use std::sync::Arc;


/// Descriptor of where one write landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRegion {
    /// Cursor before the write
    pub start: usize,
    /// Samples written to `[start, start + first_len)`
    pub first_len: usize,
    /// Samples written to `[0, wrapped_len)`
    pub wrapped_len: usize,
    /// Cursor after the write
    pub cursor: usize,
}

impl WriteRegion {
    /// Samples written per channel
    pub fn num_samples(&self) -> usize {
        self.first_len + self.wrapped_len
    }

    pub fn wrapped(&self) -> bool {
        self.wrapped_len > 0
    }
}

/// Point-in-time copy of the ring contents
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub channel_count: usize,
    pub capacity: usize,
    /// One sequence of exactly `capacity` samples per channel
    pub channels: Vec<Vec<f64>>,
    /// Next index to be overwritten; samples before it are the newest
    pub cursor: usize,
    /// Total samples committed per channel since creation
    pub samples_written: u64,
}

impl Snapshot {
    /// Empty snapshot sized for reuse with [`RingReader::snapshot_into`]
    pub fn empty() -> Self {
        Self {
            channel_count: 0,
            capacity: 0,
            channels: Vec::new(),
            cursor: 0,
            samples_written: 0,
        }
    }

    /// Channel samples from oldest to newest; `None` for an unknown channel
    pub fn chronological(&self, channel: usize) -> Option<impl Iterator<Item = f64> + '_> {
        let data = self.channels.get(channel)?;
        let cursor = self.cursor.min(data.len());
        Some(data[cursor..].iter().chain(data[..cursor].iter()).copied())
    }
}

/// Copy attempts before a snapshot settles for the post-copy count
const SNAPSHOT_ATTEMPTS: usize = 4;

struct Shared {
    // f64 bit patterns; each cell is written and read atomically
    channels: Box<[Box<[AtomicU64]>]>,
    capacity: usize,
    // The cursor is derived from this single counter, so a reader can
    // never pair a cursor with a mismatched count.
    samples_written: AtomicU64,
    // Count at which the most recently started write began. Published
    // before any of that write's samples.
    write_start: AtomicU64,
}

impl Shared {
    fn cursor_for(&self, samples_written: u64) -> usize {
        (samples_written % self.capacity as u64) as usize
    }

    /// Copy the ring into `out`
    ///
    /// The copy is accepted once no write other than the one starting at
    /// the loaded count began while it ran; the sample data is then at most
    /// one write ahead of the reported cursor and holds nothing older than
    /// it. When the writer keeps lapping the copy, the last attempt is
    /// reported with the count loaded after it, which keeps the one-write
    /// bound ahead of the cursor but may leave older samples behind it.
    fn snapshot_into(&self, out: &mut Snapshot) {
        out.channel_count = self.channels.len();
        out.capacity = self.capacity;
        out.channels.resize_with(self.channels.len(), Vec::new);

        for attempt in 1..=SNAPSHOT_ATTEMPTS {
            // Acquire pairs with the writer's Release: every sample committed
            // before this count is visible below.
            let samples_written = self.samples_written.load(Ordering::Acquire);
            self.copy_cells(out);

            // Any sample copied above from a later write implies that write's
            // start is visible here (writer's release fence before its stores).
            fence(Ordering::Acquire);
            let latest_start = self.write_start.load(Ordering::Acquire);

            let settled = if latest_start <= samples_written {
                Some(samples_written)
            } else if attempt == SNAPSHOT_ATTEMPTS {
                Some(self.samples_written.load(Ordering::Acquire))
            } else {
                None
            };

            if let Some(samples_written) = settled {
                out.cursor = self.cursor_for(samples_written);
                out.samples_written = samples_written;
                return;
            }
        }
    }

    fn copy_cells(&self, out: &mut Snapshot) {
        for (dst, src) in out.channels.iter_mut().zip(self.channels.iter()) {
            dst.clear();
            dst.extend(src.iter().map(|cell| f64::from_bits(cell.load(Ordering::Relaxed))));
        }
    }
}

/// Fixed-capacity per-channel circular buffer
///
/// `RingBuffer` is the single writer: `write` takes `&mut self` and the type
/// is not `Clone`. Readers get a [`RingReader`] handle. Samples live in
/// atomic cells and the write counter (from which the cursor is derived) is
/// published with release ordering after each write. Each write also
/// announces where it starts before touching any cell, and a snapshot
/// retries its copy when a later write overlapped it, so readers see every
/// sample behind the cursor and at most part of one in-flight write ahead of
/// it. No lock is shared between writer and readers.
pub struct RingBuffer {
    shared: Arc<Shared>,
}

impl RingBuffer {
    pub fn new(num_channels: usize, capacity: usize) -> Result<Self, RingBufferError> {
        if num_channels == 0 || capacity == 0 {
            return Err(RingBufferError::InvalidDimensions {
                channels: num_channels,
                capacity,
            });
        }

        let channels: Box<[Box<[AtomicU64]>]> = (0..num_channels)
            .map(|_| {
                (0..capacity)
                    .map(|_| AtomicU64::new(0.0f64.to_bits()))
                    .collect::<Box<[AtomicU64]>>()
            })
            .collect();

        Ok(Self {
            shared: Arc::new(Shared {
                channels,
                capacity,
                samples_written: AtomicU64::new(0),
                write_start: AtomicU64::new(0),
            }),
        })
    }

    pub fn num_channels(&self) -> usize {
        self.shared.channels.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn cursor(&self) -> usize {
        self.shared
            .cursor_for(self.shared.samples_written.load(Ordering::Acquire))
    }

    pub fn reader(&self) -> RingReader {
        RingReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut snap = Snapshot::empty();
        self.shared.snapshot_into(&mut snap);
        snap
    }

    /// Write the first `num_samples` of each retained channel at the cursor
    ///
    /// Channels of `matrix` beyond `num_channels()` are ignored. The write is
    /// rejected as a whole when it would not fit.
    pub fn write(&mut self, matrix: &SampleMatrix, num_samples: usize) -> Result<WriteRegion, RingBufferError> {
        let shared = &self.shared;
        let capacity = shared.capacity;

        if num_samples > capacity {
            return Err(RingBufferError::ExceedsCapacity {
                requested: num_samples,
                capacity,
            });
        }
        if matrix.num_channels() < shared.channels.len() {
            return Err(RingBufferError::MissingChannels {
                required: shared.channels.len(),
                available: matrix.num_channels(),
            });
        }
        if num_samples > matrix.num_samples() {
            return Err(RingBufferError::ShortMatrix {
                requested: num_samples,
                available: matrix.num_samples(),
            });
        }

        // Only this handle advances the counter
        let written = shared.samples_written.load(Ordering::Relaxed);
        let start = shared.cursor_for(written);
        let first_len = num_samples.min(capacity - start);
        let wrapped_len = num_samples - first_len;

        shared.write_start.store(written, Ordering::Release);
        fence(Ordering::Release);

        for (ch, cells) in shared.channels.iter().enumerate() {
            let row = &matrix.channel(ch)[..num_samples];
            let (head, tail) = row.split_at(first_len);
            for (cell, value) in cells[start..start + first_len].iter().zip(head) {
                cell.store(value.to_bits(), Ordering::Relaxed);
            }
            for (cell, value) in cells[..wrapped_len].iter().zip(tail) {
                cell.store(value.to_bits(), Ordering::Relaxed);
            }
        }

        let cursor = (start + num_samples) % capacity;
        shared
            .samples_written
            .store(written + num_samples as u64, Ordering::Release);

        Ok(WriteRegion {
            start,
            first_len,
            wrapped_len,
            cursor,
        })
    }
}

/// Cloneable read-only handle onto a [`RingBuffer`]
#[derive(Clone)]
pub struct RingReader {
    shared: Arc<Shared>,
}

impl RingReader {
    pub fn num_channels(&self) -> usize {
        self.shared.channels.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut snap = Snapshot::empty();
        self.shared.snapshot_into(&mut snap);
        snap
    }

    /// Refill `out` in place, reusing its allocations
    pub fn snapshot_into(&self, out: &mut Snapshot) {
        self.shared.snapshot_into(out);
    }
}
