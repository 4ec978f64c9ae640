pub mod block_ring;
pub mod producer;

pub use block_ring::{
    block_ring, BlockConsumer, BlockProducer, SampleCommand, BLOCK_SAMPLES, NUM_BLOCKS,
};
pub use producer::PipelineProducer;
