//! Host-rate ingestion ring.
//!
//! Lock-free SPSC queue of stereo frames between the host PCM boundary
//! (writer) and the resampler (reader). A push onto a full ring drops the
//! frame; the writer never blocks.

use rtrb::{Consumer, Producer, RingBuffer};

/// Default ring capacity in frames (~170 ms at 48 kHz).
pub const INGEST_CAPACITY: usize = 8192;

/// One stereo pair of 16-bit samples in the host sample-rate domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioFrame {
    pub l: i16,
    pub r: i16,
}

/// Create a connected writer/reader pair over a ring of `capacity` frames.
pub fn ingest_ring(capacity: usize) -> (IngestWriter, IngestReader) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (IngestWriter { producer }, IngestReader { consumer })
}

/// Writer half, owned by the host audio boundary.
pub struct IngestWriter {
    producer: Producer<AudioFrame>,
}

impl IngestWriter {
    /// Push one frame. Returns false when the ring is full and the frame
    /// was dropped; the writer never overwrites unread data.
    pub fn push(&mut self, frame: AudioFrame) -> bool {
        self.producer.push(frame).is_ok()
    }

    pub fn is_full(&self) -> bool {
        self.producer.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.producer.buffer().capacity()
    }
}

/// Reader half, owned by the resampler.
pub struct IngestReader {
    consumer: Consumer<AudioFrame>,
}

impl IngestReader {
    /// Pop the oldest frame, or None when the ring is empty.
    pub fn pop(&mut self) -> Option<AudioFrame> {
        self.consumer.pop().ok()
    }

    /// Number of unread frames; drives the resampler's rate adaptation.
    pub fn fill(&self) -> usize {
        self.consumer.slots()
    }

    pub fn capacity(&self) -> usize {
        self.consumer.buffer().capacity()
    }
}
