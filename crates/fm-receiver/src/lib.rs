//! Narrow-band FM receiver built on the ringpipe staged pipeline.
//!
//! Three stages connected by bounded SPSC queues: an I/Q byte producer
//! (RTL-SDR device or cu8 capture file), an FM demodulator that decimates
//! twice around a polar discriminator, and a PCM sink emitting
//! little-endian signed 16-bit mono audio at 48 kHz.
//!
//! ```bash
//! fm-receiver -f 99500000 | aplay -r 48000 -f S16_LE -t raw -c 1
//! ```

pub mod dsp;
mod error;
pub mod sample;
pub mod sink;
pub mod source;
pub mod stages;

pub use error::{Error, Result};
pub use sample::SampleChunk;
pub use sink::PcmSink;
#[cfg(feature = "rtlsdr")]
pub use source::RtlSdrByteSource;
pub use source::{FileByteSource, IqByteSource};
