//! The three pipeline stage bodies.
//!
//! Each builder captures the state its stage needs (device handle,
//! demodulator history, output writer) and returns a [`StageFn`] ready to
//! hand to [`Pipeline::new`](ringpipe::Pipeline::new). Recoverable trouble
//! is logged and the stage keeps going; a cancelled queue read or a fatal
//! I/O error terminates the worker by returning `false`.

use crate::dsp::{self, FmDemodulator};
use crate::sample::SampleChunk;
use crate::sink::PcmSink;
use crate::source::IqByteSource;
use ringpipe::{RingError, StageFn};
use std::io::Write;
use tracing::{error, info, warn};

/// Chunks discarded after start while the tuner settles.
const WARMUP_CHUNKS: usize = 1;

/// Stage 0: reads raw I/Q bytes, undoes the quarter-rate tuning offset and
/// publishes complex baseband chunks.
///
/// The outbound queue face is non-blocking; a full queue costs one chunk
/// and a bump of the queue's drop counter, never a stalled capture loop.
pub fn sdr_producer(mut source: Box<dyn IqByteSource>) -> StageFn<SampleChunk> {
    let mut bytes = vec![0u8; dsp::IQ_CHUNK_BYTES];
    let mut warmed_up = 0usize;

    Box::new(move |input, output| {
        debug_assert!(input.is_none());
        let Some(output) = output else { return false };

        let read = match source.read_chunk(&mut bytes) {
            Ok(0) => {
                info!("sample source drained");
                return false;
            }
            Ok(read) => read,
            Err(err) => {
                error!(%err, "sample source read failed");
                return false;
            }
        };

        if read != bytes.len() {
            warn!(requested = bytes.len(), read, "short read, chunk dropped");
            return true;
        }

        if warmed_up < WARMUP_CHUNKS {
            warmed_up += 1;
            return true;
        }

        dsp::rotate_90(&mut bytes);
        let iq = dsp::bytes_to_iq(&bytes);

        match output.write_one(SampleChunk::Iq(iq)) {
            Ok(_) => {}
            Err(RingError::WouldBlock) => {
                if let Ok(counters) = output.counters() {
                    warn!(dropped = counters.dropped, "demodulator queue full, chunk dropped");
                }
            }
            Err(err) => {
                error!(%err, "queue write failed");
                return false;
            }
        }

        true
    })
}

/// Stage 1: decimates to the intermediate rate, demodulates, decimates to
/// the audio rate.
pub fn fm_demodulator() -> StageFn<SampleChunk> {
    let mut demod = FmDemodulator::new();

    Box::new(move |input, output| {
        let (Some(input), Some(output)) = (input, output) else {
            return false;
        };

        let chunk = match input.read_one() {
            Ok(chunk) => chunk,
            Err(RingError::Cancelled) => return false,
            Err(err) => {
                error!(%err, "queue read failed");
                return false;
            }
        };

        let Some(mut iq) = chunk.into_iq() else {
            error!("unexpected payload on demodulator input");
            return false;
        };

        dsp::decimate_iq(&mut iq, dsp::IF_DECIMATION);
        let mut pcm = demod.demodulate(&iq);
        dsp::decimate_pcm(&mut pcm, dsp::AUDIO_DECIMATION);

        match output.write_one(SampleChunk::Pcm(pcm)) {
            Ok(_) => {}
            Err(RingError::WouldBlock) => {
                if let Ok(counters) = output.counters() {
                    warn!(dropped = counters.dropped, "sink queue full, chunk dropped");
                }
            }
            Err(err) => {
                error!(%err, "queue write failed");
                return false;
            }
        }

        true
    })
}

/// Stage 2: writes demodulated audio to the output.
pub fn pcm_writer<W: Write + Send + 'static>(mut sink: PcmSink<W>) -> StageFn<SampleChunk> {
    Box::new(move |input, output| {
        debug_assert!(output.is_none());
        let Some(input) = input else { return false };

        let chunk = match input.read_one() {
            Ok(chunk) => chunk,
            Err(RingError::Cancelled) => return false,
            Err(err) => {
                error!(%err, "queue read failed");
                return false;
            }
        };

        let Some(pcm) = chunk.into_pcm() else {
            error!("unexpected payload on sink input");
            return false;
        };

        if let Err(err) = sink.write_samples(&pcm) {
            error!(%err, "pcm write failed");
            return false;
        }

        true
    })
}
