use std::io::{self, Write};

/// Serializes PCM chunks as little-endian signed 16-bit mono samples.
///
/// Flushes after every chunk so a downstream player sees audio with
/// bounded latency.
pub struct PcmSink<W: Write> {
    writer: W,
}

impl<W: Write> PcmSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        self.writer.write_all(&bytes)?;
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_serialize_little_endian() {
        let mut sink = PcmSink::new(Vec::new());
        sink.write_samples(&[0x0102, -2]).unwrap();
        assert_eq!(sink.into_inner(), vec![0x02, 0x01, 0xFE, 0xFF]);
    }
}
