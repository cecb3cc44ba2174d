//! ringpipe - staged streaming pipelines over bounded SPSC ring buffers.
//!
//! A [`Pipeline`] wires an ordered chain of worker stages together with
//! bounded single-producer/single-consumer queues. Each stage runs on its
//! own OS thread and exchanges owned buffer objects with its neighbours;
//! the queues are [`RingBuffer`]s whose two faces can independently be
//! configured blocking or non-blocking.
//!
//! The design targets soft real-time signal chains: the producer face of a
//! pipeline queue never blocks (overruns are recorded in a drop counter),
//! while consumers park on a [`BinarySemaphore`] until data arrives and can
//! be woken out-of-band through [`RingBuffer::cancel`].
//!
//! # Example
//!
//! ```
//! use ringpipe::{Flags, RingBuffer};
//!
//! let ring = RingBuffer::<u64>::new(8, Flags::RD_NONBLOCKING_WR_NONBLOCKING);
//! let tx = ring.producer().unwrap();
//! let rx = ring.consumer().unwrap();
//!
//! tx.write_slice(&[1, 2, 3]).unwrap();
//!
//! let mut out = [0u64; 3];
//! assert_eq!(rx.read_slice(&mut out).unwrap(), 3);
//! assert_eq!(out, [1, 2, 3]);
//! ```

mod consumer;
mod error;
mod flags;
mod invariants;
mod pipeline;
mod producer;
mod ring;
mod semaphore;

pub use consumer::Consumer;
pub use error::{FaceClaimed, RingError};
pub use flags::{Flags, Role};
pub use pipeline::{Pipeline, StageFn, StopHandle};
pub use producer::Producer;
pub use ring::{Counters, RingBuffer};
pub use semaphore::BinarySemaphore;
