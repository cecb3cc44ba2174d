use clap::Parser;
use fm_receiver::{dsp, stages, FileByteSource, IqByteSource, PcmSink, Result};
use ringpipe::Pipeline;
use signal_hook::consts::signal::{SIGINT, SIGPIPE, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use tracing::info;

/// Narrow-band FM receiver.
///
/// Reads I/Q samples from an RTL-SDR device (or a cu8 capture file),
/// demodulates, and writes 48 kHz mono s16le PCM. Listen with:
/// fm-receiver -f 99500000 | aplay -r 48000 -f S16_LE -t raw -c 1
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Center frequency to tune to, in Hz
    #[arg(short, long)]
    frequency: u32,

    /// Read raw cu8 I/Q samples from a capture file instead of a device
    #[arg(long)]
    input_file: Option<PathBuf>,

    /// RTL-SDR device index
    #[arg(long, default_value_t = 0)]
    device_index: usize,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write PCM samples to this file (default: stdout)
    output: Option<PathBuf>,
}

/// Chunks buffered between adjacent stages.
const QUEUE_CAPACITY: usize = 42;

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    // PCM goes to stdout, so diagnostics must not.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .try_init();

    let source = open_source(&args)?;
    let sink: PcmSink<Box<dyn Write + Send>> = match &args.output {
        Some(path) => PcmSink::new(Box::new(File::create(path)?)),
        None => PcmSink::new(Box::new(io::stdout())),
    };

    info!(
        capture_rate = dsp::SDR_SAMPLE_RATE,
        intermediate_rate = dsp::IF_SAMPLE_RATE,
        audio_rate = dsp::AUDIO_SAMPLE_RATE,
        "starting receiver"
    );

    let mut pipeline = Pipeline::new(
        vec![
            stages::sdr_producer(source),
            stages::fm_demodulator(),
            stages::pcm_writer(sink),
        ],
        QUEUE_CAPACITY,
    );

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGQUIT, SIGPIPE])?;
    let stop = pipeline.stop_handle();
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(signal, "caught signal, stopping");
            stop.stop();
        }
    });

    pipeline.start();
    pipeline.join();

    for (index, queue) in pipeline.queues().iter().enumerate() {
        if let Ok(counters) = queue.counters() {
            info!(
                queue = index,
                produced = counters.produced,
                dropped = counters.dropped,
                "queue totals"
            );
        }
    }

    Ok(())
}

fn open_source(args: &Args) -> Result<Box<dyn IqByteSource>> {
    if let Some(path) = &args.input_file {
        info!(path = %path.display(), "reading I/Q samples from capture file");
        return Ok(Box::new(FileByteSource::open(path)?));
    }

    #[cfg(feature = "rtlsdr")]
    return Ok(Box::new(fm_receiver::RtlSdrByteSource::open(
        args.device_index,
        args.frequency,
    )?));

    #[cfg(not(feature = "rtlsdr"))]
    Err(fm_receiver::Error::NoSource)
}
