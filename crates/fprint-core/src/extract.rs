//! Contract for the fingerprint extractor.
//!
//! Audio decoding, resampling and spectral analysis live outside this
//! workspace; any extractor that fills the documented record shape can
//! feed the matching kernels and the index. The constants here fix the
//! audio conditioning every conforming extractor applies.

use crate::record::FPrint;
use thiserror::Error;

/// Samples are standardised to this rate before analysis.
pub const STD_SAMPLE_RATE: u32 = 44_100;
/// Samples are standardised to mono.
pub const STD_CHANNELS: u16 = 1;
/// Analysis may stop after this many seconds; `songlen` still reports the
/// full source duration.
pub const SAMPLE_TIME_LIMIT_SECS: u32 = 60;
/// Approximate chroma codeword density of a conforming extractor.
pub const CODEWORDS_PER_SECOND: f64 = 15.8;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no audio samples to fingerprint")]
    NoSamples,
    #[error("chroma analysis produced no codewords")]
    EmptyChroma,
    #[error("extractor backend failed: {0}")]
    Backend(String),
}

/// Produces a fingerprint record from conditioned PCM audio.
///
/// Implementations receive 16-bit samples already resampled to
/// [`STD_SAMPLE_RATE`] Hz mono and must populate the full record shape:
/// both fixed feature vectors and at least one chroma codeword
/// (about [`CODEWORDS_PER_SECOND`] per second of analysed audio).
pub trait FingerprintExtractor {
    fn extract(&mut self, samples: &[i16], source_duration_secs: u32) -> Result<FPrint, ExtractError>;
}
