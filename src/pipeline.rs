use crate::consumer::Consumer;
use crate::flags::{Flags, Role};
use crate::producer::Producer;
use crate::ring::RingBuffer;
use crate::semaphore::BinarySemaphore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// A stage body.
///
/// Invoked repeatedly by its worker thread with the stage's queue faces;
/// `None` marks the ends of the chain (the first stage has no input, the
/// last no output). Each invocation is expected to dequeue, process and
/// enqueue roughly one unit of work. Returning `false` terminates the
/// worker; the conventional trigger is a read that came back
/// [`Cancelled`](crate::RingError::Cancelled) or a fatal device error.
pub type StageFn<T> = Box<dyn FnMut(Option<&Consumer<T>>, Option<&Producer<T>>) -> bool + Send>;

struct PipelineCore<T> {
    running: AtomicBool,
    queues: Vec<RingBuffer<T>>,
}

impl<T> PipelineCore<T> {
    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        // Producers never park (the queues are write-non-blocking), so only
        // the consumer side of each queue needs an out-of-band wake.
        for queue in &self.queues {
            queue.cancel(Role::Consumer);
        }
    }
}

struct StageExecEnv {
    gate: Arc<BinarySemaphore>,
    thread: Option<JoinHandle<()>>,
}

/// An ordered chain of worker stages connected by bounded SPSC queues.
///
/// Construction wires stage `i`'s output and stage `i+1`'s input to the two
/// faces of queue `i` and spawns one worker thread per stage; every worker
/// immediately parks on a start gate. [`start`](Self::start) releases the
/// gates, [`stop`](Self::stop) clears the run flag and unblocks parked
/// readers, [`join`](Self::join) awaits the workers.
///
/// Queues are configured read-blocking / write-non-blocking: a producer
/// stage never stalls its capture loop, and queue-full incidents stay
/// visible through the drop counters (see [`queues`](Self::queues)).
///
/// A stage returning `false` terminates only its own worker; the chain is
/// torn down deterministically by calling `stop`.
pub struct Pipeline<T> {
    core: Arc<PipelineCore<T>>,
    stages: Vec<StageExecEnv>,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Builds the chain and spawns one parked worker per stage.
    pub fn new(stages: Vec<StageFn<T>>, queue_capacity: usize) -> Self {
        let count = stages.len();

        let mut queues = Vec::with_capacity(count.saturating_sub(1));
        let mut producers = Vec::with_capacity(count.saturating_sub(1));
        let mut consumers = Vec::with_capacity(count.saturating_sub(1));
        for _ in 1..count {
            let queue = RingBuffer::new(queue_capacity, Flags::RD_BLOCKING_WR_NONBLOCKING);
            // A queue nothing else has seen hands out its faces exactly once.
            producers.push(queue.producer().expect("fresh queue producer face"));
            consumers.push(queue.consumer().expect("fresh queue consumer face"));
            queues.push(queue);
        }

        let core = Arc::new(PipelineCore {
            running: AtomicBool::new(false),
            queues,
        });

        let mut consumers = consumers.into_iter();
        let mut producers = producers.into_iter();
        let envs = stages
            .into_iter()
            .enumerate()
            .map(|(index, mut stage)| {
                let input = if index == 0 { None } else { consumers.next() };
                let output = if index == count - 1 {
                    None
                } else {
                    producers.next()
                };

                let gate = Arc::new(BinarySemaphore::new(false));
                let worker_gate = Arc::clone(&gate);
                let worker_core = Arc::clone(&core);
                let thread = thread::Builder::new()
                    .name(format!("stage-{index}"))
                    .spawn(move || {
                        worker_gate.wait();
                        while worker_core.running.load(Ordering::Acquire)
                            && stage(input.as_ref(), output.as_ref())
                        {}
                        debug!(stage = index, "stage worker exited");
                    })
                    .expect("failed to spawn stage worker");

                StageExecEnv {
                    gate,
                    thread: Some(thread),
                }
            })
            .collect();

        Self { core, stages: envs }
    }
}

impl<T> Pipeline<T> {
    /// Sets the run flag and releases every stage's start gate.
    pub fn start(&self) {
        debug!(stages = self.stages.len(), "starting pipeline");
        self.core.running.store(true, Ordering::Release);
        for stage in &self.stages {
            stage.gate.post();
        }
    }

    /// Clears the run flag and cancels any read parked on a queue.
    ///
    /// Safe to call from a signal-relay thread: two atomic writes plus one
    /// semaphore post per queue.
    pub fn stop(&self) {
        debug!("stopping pipeline");
        self.core.stop();
    }

    /// Awaits every worker thread.
    ///
    /// A worker that panicked is reported and does not abort the join of
    /// the remaining stages.
    pub fn join(&mut self) {
        for (index, stage) in self.stages.iter_mut().enumerate() {
            if let Some(handle) = stage.thread.take() {
                if handle.join().is_err() {
                    error!(stage = index, "stage worker panicked");
                }
            }
        }
    }

    /// The inter-stage queues, in chain order, for operator visibility
    /// (drop counters, fill levels).
    pub fn queues(&self) -> &[RingBuffer<T>] {
        &self.core.queues
    }

    /// A cloneable stop endpoint holding only a weak reference to the
    /// pipeline, suitable for handing to a signal-relay thread.
    pub fn stop_handle(&self) -> StopHandle<T> {
        StopHandle {
            core: Arc::downgrade(&self.core),
        }
    }
}

impl<T> Drop for Pipeline<T> {
    fn drop(&mut self) {
        self.core.stop();
        // Workers still parked at their start gate observe the cleared run
        // flag and exit.
        for stage in &self.stages {
            stage.gate.post();
        }
        self.join();
    }
}

/// Stop endpoint detached from the pipeline's lifetime.
///
/// Calling [`stop`](Self::stop) after the pipeline has been dropped is a
/// no-op.
pub struct StopHandle<T> {
    core: Weak<PipelineCore<T>>,
}

impl<T> StopHandle<T> {
    /// Clears the run flag and wakes parked readers, if the pipeline is
    /// still alive.
    pub fn stop(&self) {
        if let Some(core) = self.core.upgrade() {
            core.stop();
        }
    }
}

impl<T> Clone for StopHandle<T> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}
