pub mod chain;
pub mod compressor;
pub mod filter;

pub use chain::ShapingChain;
pub use compressor::Compressor;
pub use filter::Biquad;

/// Below this magnitude a filter state cell is treated as zero.
const DENORMAL_THRESHOLD: f32 = 1e-15;

/// Flush denormals and non-finite values out of recursive filter state.
#[inline]
fn flush_denormal(x: f32) -> f32 {
    if !x.is_finite() || x.abs() < DENORMAL_THRESHOLD {
        0.0
    } else {
        x
    }
}
