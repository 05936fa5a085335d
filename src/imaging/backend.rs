//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the one operation the asset pipeline
//! needs: optimize.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked into the binary.

use super::params::OptimizeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can serve the whole rayon pool.
pub trait ImageBackend: Sync {
    /// Scale down to the width limit and re-encode to the output path.
    /// Returns the size of the written image.
    fn optimize(&self, params: &OptimizeParams) -> Result<Dimensions, BackendError>;
}
