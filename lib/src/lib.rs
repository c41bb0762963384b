//! CCWT Library
//!
//! Complex continuous wavelet transform of real signals. The signal is
//! transformed once; each output row is then obtained by windowing that
//! spectrum with a Gabor (Gaussian) window, folding it down to the requested
//! output length and running a single inverse FFT.
//!
//! ```no_run
//! use ccwt_lib::{compute_rows, forward_spectrum, frequency_band};
//!
//! let signal: Vec<f64> = (0..4096).map(|i| (i as f64 * 0.1).sin()).collect();
//! let spectrum = forward_spectrum(&signal, 256, 1.0)?;
//! let band = frequency_band(512, 0.0, 0.0, 0.0, 1.0);
//! compute_rows(&spectrum, &band, 1024, 0..band.len(), |y, row, padding| {
//!     println!("row {}: {} samples, {} padding", y, row.len(), padding);
//! })?;
//! # Ok::<(), ccwt_lib::CwtError>(())
//! ```

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

pub mod audio_io;
pub mod band;
pub mod config;
pub mod error;
pub mod fft;
pub mod processor;
pub mod rows;
pub mod scalogram;
pub mod signal;
pub mod spectrum;
pub mod utils;
pub mod wavelet;

pub use band::{frequency_band, FrequencyBand, FrequencyBandEntry};
pub use config::CwtConfig;
pub use error::CwtError;
pub use num_complex::Complex64;
pub use processor::CwtProcessor;
pub use rows::{compute_rows, compute_scalogram, partition_rows};
pub use scalogram::Scalogram;
pub use spectrum::{forward_spectrum, Spectrum};
pub use wavelet::{compute_row, OutputGeometry, Row, RowWorkspace};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
///
/// Sets up logging and other initialization for the library.
/// For WASM targets, this will set up browser-specific error handling.
#[cfg_attr(feature = "wasm", wasm_bindgen)]
pub fn init() {
    #[cfg(feature = "wasm")]
    {
        console_error_panic_hook::set_once();
    }

    #[cfg(all(not(target_arch = "wasm32"), feature = "env_logger"))]
    {
        let _ = env_logger::try_init();
    }
}

/// Result type for wavelet operations
pub type Result<T> = std::result::Result<T, CwtError>;
