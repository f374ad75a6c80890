pub mod error;
pub mod polynomial;
pub mod random;
pub mod secret_sharing;
pub mod utils;

pub const BENCH_DEGREES: [usize; 5] = [4, 16, 64, 128, 256];
