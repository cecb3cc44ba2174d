use num_complex::Complex;

/// A unit of work travelling between pipeline stages.
///
/// The queues transport one handle type end to end; the variants tag which
/// sample format a chunk carries, so adjacent stages can exchange different
/// shapes along the chain (I/Q into the demodulator, PCM out of it).
#[derive(Debug, Clone, PartialEq)]
pub enum SampleChunk {
    /// Complex baseband samples from the SDR front end.
    Iq(Vec<Complex<f32>>),
    /// Demodulated 16-bit mono audio.
    Pcm(Vec<i16>),
}

impl SampleChunk {
    /// Unwraps an I/Q chunk, or `None` for a mismatched variant.
    pub fn into_iq(self) -> Option<Vec<Complex<f32>>> {
        match self {
            SampleChunk::Iq(samples) => Some(samples),
            SampleChunk::Pcm(_) => None,
        }
    }

    /// Unwraps a PCM chunk, or `None` for a mismatched variant.
    pub fn into_pcm(self) -> Option<Vec<i16>> {
        match self {
            SampleChunk::Pcm(samples) => Some(samples),
            SampleChunk::Iq(_) => None,
        }
    }
}
