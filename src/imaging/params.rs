//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the asset pipeline (which decides which images to
//! produce) and the [`backend`](super::backend) (which does the pixel work),
//! so a mock backend can stand in during tests.

use std::path::PathBuf;

/// Optimize one image: scale down to fit `max_width`, re-encode as WebP.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Images wider than this are scaled down; narrower ones keep their size.
    pub max_width: u32,
}
