pub mod dither;
pub mod hilbert;
pub mod ssb;

pub use dither::ErrorFeedback;
pub use hilbert::{HilbertFir, HILBERT_TAPS};
pub use ssb::{SsbModulator, F_OFF_LIMIT_HZ};
