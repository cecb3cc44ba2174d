use crate::error::Result;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A byte-oriented source of raw interleaved unsigned 8-bit I/Q samples.
///
/// Implementations fill as much of `buf` as they can and return the byte
/// count; `0` signals end of stream. The producer stage tolerates short
/// reads by dropping the chunk, mirroring how sample drops from the
/// device are handled.
pub trait IqByteSource: Send {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Plays back a cu8 capture file (interleaved unsigned 8-bit I/Q).
pub struct FileByteSource {
    reader: BufReader<File>,
}

impl FileByteSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
        })
    }
}

impl IqByteSource for FileByteSource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let read = self.reader.read(&mut buf[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        Ok(filled)
    }
}

#[cfg(feature = "rtlsdr")]
pub use self::rtlsdr::RtlSdrByteSource;

#[cfg(feature = "rtlsdr")]
mod rtlsdr {
    use super::IqByteSource;
    use crate::dsp::SDR_SAMPLE_RATE;
    use crate::error::{Error, Result};
    use rtl_sdr_rs::{RtlSdr, TunerGain};
    use std::thread;
    use std::time::Duration;
    use tracing::info;

    /// An RTL-SDR dongle configured for the receiver's capture rate.
    pub struct RtlSdrByteSource {
        device: RtlSdr,
    }

    impl RtlSdrByteSource {
        /// Opens device `device_index` and tunes it a quarter of the sample
        /// rate above `frequency`; the producer stage's byte rotation
        /// shifts the station back to baseband.
        pub fn open(device_index: usize, frequency: u32) -> Result<Self> {
            let mut device =
                RtlSdr::open_with_index(device_index).map_err(|e| Error::Device(e.to_string()))?;

            let tuned = frequency + SDR_SAMPLE_RATE / 4;
            info!(frequency, tuned, rate = SDR_SAMPLE_RATE, "configuring rtl-sdr");

            device
                .set_sample_rate(SDR_SAMPLE_RATE)
                .map_err(|e| Error::Device(e.to_string()))?;
            device
                .set_center_freq(tuned)
                .map_err(|e| Error::Device(e.to_string()))?;
            device
                .set_tuner_gain(TunerGain::Auto)
                .map_err(|e| Error::Device(e.to_string()))?;
            let _ = device.set_bias_tee(false);
            // Mandatory before the first read.
            device
                .reset_buffer()
                .map_err(|e| Error::Device(e.to_string()))?;

            // Give the tuner a moment to settle on the new frequency.
            thread::sleep(Duration::from_millis(10));

            Ok(Self { device })
        }
    }

    impl IqByteSource for RtlSdrByteSource {
        fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.device
                .read_sync(buf)
                .map_err(|e| Error::Device(e.to_string()))
        }
    }
}
