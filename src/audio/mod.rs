pub mod ingest;
pub mod input;
pub mod resampler;

pub use ingest::{ingest_ring, AudioFrame, IngestReader, IngestWriter, INGEST_CAPACITY};
pub use resampler::Resampler;
