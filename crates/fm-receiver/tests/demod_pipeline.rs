//! End-to-end run of the three receiver stages over a synthetic capture.
//!
//! The source emits a pure tone a fixed offset below the tuning point (the
//! same spectral position a station occupies after the quarter-rate tuning
//! offset), so the demodulated PCM must settle to a constant value.

use fm_receiver::sink::PcmSink;
use fm_receiver::source::IqByteSource;
use fm_receiver::{dsp, stages, Result, SampleChunk};
use ringpipe::Pipeline;
use std::f64::consts::PI;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Generates `chunks` full chunks of a cu8 tone, then reports end of
/// stream.
struct ToneSource {
    phase_step: f64,
    sample: u64,
    chunks_left: usize,
}

impl ToneSource {
    fn new(chunks: usize) -> Self {
        // 1/16 cycle per sample once the producer's rotation has shifted
        // the spectrum up by a quarter of the sample rate.
        Self {
            phase_step: 2.0 * PI * (1.0 / 16.0 - 0.25),
            sample: 0,
            chunks_left: chunks,
        }
    }
}

impl IqByteSource for ToneSource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.chunks_left == 0 {
            return Ok(0);
        }
        self.chunks_left -= 1;

        for pair in buf.chunks_exact_mut(2) {
            let phase = self.phase_step * self.sample as f64;
            pair[0] = (127.5 + 100.0 * phase.cos()).round() as u8;
            pair[1] = (127.5 + 100.0 * phase.sin()).round() as u8;
            self.sample += 1;
        }
        Ok(buf.len())
    }
}

/// A `Write` that appends into shared memory, standing in for the PCM
/// output file.
#[derive(Clone)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn pcm_per_chunk() -> usize {
    let iq = dsp::IQ_CHUNK_BYTES / 2;
    (iq / dsp::IF_DECIMATION) / dsp::AUDIO_DECIMATION
}

#[test]
fn test_tone_capture_demodulates_to_constant_pcm() {
    // Three chunks: one eaten by the producer's warm-up, two demodulated.
    let source = ToneSource::new(3);
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = PcmSink::new(SharedSink(Arc::clone(&captured)));

    let mut pipeline = Pipeline::new(
        vec![
            stages::sdr_producer(Box::new(source)),
            stages::fm_demodulator(),
            stages::pcm_writer(sink),
        ],
        42,
    );
    pipeline.start();

    let expected_bytes = 2 * pcm_per_chunk() * 2;
    let deadline = Instant::now() + Duration::from_secs(10);
    while captured.lock().unwrap().len() < expected_bytes && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    pipeline.stop();
    pipeline.join();

    let bytes = captured.lock().unwrap();
    assert_eq!(bytes.len(), expected_bytes, "unexpected PCM volume");

    let pcm: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    // A constant frequency offset of 1/16 cycle per capture sample is a
    // phase step of 6/16 cycle at the decimated rate, i.e. 3/4 of full
    // scale. The first sample of each chunk is excluded: chunk 0's
    // compares against the demodulator's zero history, and later ones
    // straddle the partial decimation group discarded at a chunk boundary.
    let expected = (i16::MAX as f64 * 2.0 * 6.0 / 16.0) as i16;
    for (index, &sample) in pcm.iter().enumerate() {
        if index % pcm_per_chunk() == 0 {
            continue;
        }
        assert!(
            (sample as i32 - expected as i32).abs() < 800,
            "sample {sample} at {index} far from expected {expected}"
        );
    }
}

#[test]
fn test_mismatched_payload_terminates_stage() {
    // Feed a PCM chunk into the demodulator stage: it must refuse and exit.
    let mut stage = stages::fm_demodulator();

    let input = ringpipe::RingBuffer::new(4, ringpipe::Flags::RD_BLOCKING_WR_NONBLOCKING);
    let output = ringpipe::RingBuffer::new(4, ringpipe::Flags::RD_BLOCKING_WR_NONBLOCKING);
    let tx = input.producer().unwrap();
    let rx = input.consumer().unwrap();
    let out_tx = output.producer().unwrap();

    tx.write_one(SampleChunk::Pcm(vec![1, 2, 3])).unwrap();
    assert!(!stage(Some(&rx), Some(&out_tx)));
}
