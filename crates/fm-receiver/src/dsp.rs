//! The demodulation math: quarter-rate rotation, boxcar decimation and the
//! polar discriminator.
//!
//! The receiver tunes a quarter of the sample rate above the station and
//! undoes the shift with [`rotate_90`] directly on the raw bytes, which
//! keeps the DC spike of cheap tuners out of the audio band.

use num_complex::Complex;
use std::f32::consts::PI;

/// Output sample rate of the receiver.
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;
/// Second decimation factor, intermediate rate down to audio.
pub const AUDIO_DECIMATION: usize = 4;
/// Intermediate sample rate after the first decimation (192 kHz).
pub const IF_SAMPLE_RATE: u32 = AUDIO_SAMPLE_RATE * AUDIO_DECIMATION as u32;
/// First decimation factor, capture rate down to intermediate.
pub const IF_DECIMATION: usize = 6;
/// Capture sample rate requested from the SDR device (1.152 MHz).
pub const SDR_SAMPLE_RATE: u32 = IF_SAMPLE_RATE * IF_DECIMATION as u32;
/// Raw interleaved I/Q bytes read from the device per pipeline chunk.
pub const IQ_CHUNK_BYTES: usize = 16 * 1024 * 2;

/// Multiplies interleaved unsigned I/Q pairs by `j^n` in place, shifting
/// the spectrum up by a quarter of the sample rate.
///
/// Works on the raw bytes: with samples centred on 127.5, negation is the
/// bitwise complement, so the rotation sequence `1, j, -1, -j` reduces to
/// swaps and complements.
///
/// # Panics
///
/// Panics unless `data.len()` is a multiple of 8 (four I/Q pairs).
pub fn rotate_90(data: &mut [u8]) {
    assert!(data.len() % 8 == 0, "buffer must hold whole rotation periods");

    for chunk in data.chunks_exact_mut(8) {
        // pair 1: (I, Q) -> (-Q, I)
        let tmp = !chunk[3];
        chunk[3] = chunk[2];
        chunk[2] = tmp;

        // pair 2: (I, Q) -> (-I, -Q)
        chunk[4] = !chunk[4];
        chunk[5] = !chunk[5];

        // pair 3: (I, Q) -> (Q, -I)
        let tmp = !chunk[6];
        chunk[6] = chunk[7];
        chunk[7] = tmp;
    }
}

/// Converts raw unsigned 8-bit interleaved I/Q into complex floats in
/// roughly [-1, 1].
pub fn bytes_to_iq(data: &[u8]) -> Vec<Complex<f32>> {
    data.chunks_exact(2)
        .map(|pair| {
            Complex::new(
                (pair[0] as f32 - 127.5) / 128.0,
                (pair[1] as f32 - 127.5) / 128.0,
            )
        })
        .collect()
}

/// Boxcar-decimates complex samples in place by `factor`.
///
/// Each output sample is the plain sum of its group; the common gain
/// cancels in the discriminator's ratio, so no divide is spent here. A
/// trailing partial group is discarded.
pub fn decimate_iq(samples: &mut Vec<Complex<f32>>, factor: usize) {
    assert!(factor > 0, "decimation factor must be positive");

    let mut write = 0;
    let mut sum = Complex::new(0.0, 0.0);
    for read in 0..samples.len() {
        sum += samples[read];
        if (read + 1) % factor == 0 {
            samples[write] = sum;
            write += 1;
            sum = Complex::new(0.0, 0.0);
        }
    }
    samples.truncate(write);
}

/// Boxcar-decimates PCM samples in place by `factor`, averaging each group.
pub fn decimate_pcm(samples: &mut Vec<i16>, factor: usize) {
    assert!(factor > 0, "decimation factor must be positive");

    let mut write = 0;
    let mut sum = 0i32;
    for read in 0..samples.len() {
        sum += samples[read] as i32;
        if (read + 1) % factor == 0 {
            samples[write] = (sum / factor as i32) as i16;
            write += 1;
            sum = 0;
        }
    }
    samples.truncate(write);
}

/// Frequency demodulator based on the polar discriminator.
///
/// Carries the last sample of each chunk over to the next call so the
/// first output of a chunk still measures a real phase step.
#[derive(Debug, Default)]
pub struct FmDemodulator {
    previous: Complex<f32>,
}

impl FmDemodulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Demodulates a chunk of baseband samples into PCM.
    ///
    /// Full deviation (a phase step of pi per sample) maps to i16 full
    /// scale.
    pub fn demodulate(&mut self, iq: &[Complex<f32>]) -> Vec<i16> {
        let mut pcm = Vec::with_capacity(iq.len());
        let mut previous = self.previous;

        for &sample in iq {
            pcm.push(polar_discriminator(sample, previous));
            previous = sample;
        }

        self.previous = previous;
        pcm
    }
}

/// Phase difference between consecutive samples, scaled to i16.
fn polar_discriminator(a: Complex<f32>, b: Complex<f32>) -> i16 {
    let c = a * b.conj();
    let angle = c.im.atan2(c.re);
    (angle / PI * i16::MAX as f32) as i16
}
