use ringpipe::{Pipeline, RingError, StageFn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_three_stage_end_to_end() {
    let recorded = Arc::new(Mutex::new(Vec::new()));

    let mut next = 0i64;
    let producer: StageFn<i64> = Box::new(move |_input, output| {
        let Some(output) = output else { return false };
        if next >= 100 {
            return false;
        }
        match output.write_one(next) {
            Ok(_) => {
                next += 1;
                true
            }
            Err(RingError::WouldBlock) => true,
            Err(_) => false,
        }
    });

    let doubler: StageFn<i64> = Box::new(|input, output| {
        let (Some(input), Some(output)) = (input, output) else {
            return false;
        };
        match input.read_one() {
            Ok(value) => {
                let _ = output.write_one(value * 2);
                true
            }
            Err(_) => false,
        }
    });

    let sink = Arc::clone(&recorded);
    let consumer: StageFn<i64> = Box::new(move |input, _output| {
        let Some(input) = input else { return false };
        match input.read_one() {
            Ok(value) => {
                sink.lock().unwrap().push(value);
                true
            }
            Err(_) => false,
        }
    });

    let mut pipeline = Pipeline::new(vec![producer, doubler, consumer], 128);
    pipeline.start();

    assert!(
        wait_until(Duration::from_secs(5), || recorded.lock().unwrap().len() == 100),
        "consumer did not record all items in time"
    );

    pipeline.stop();
    pipeline.join();

    let expected: Vec<i64> = (0..100).map(|i| i * 2).collect();
    assert_eq!(*recorded.lock().unwrap(), expected);
}

#[test]
fn test_stop_unblocks_parked_consumer() {
    // The producer exits immediately, so the consumer parks on an empty
    // queue until stop() cancels its read.
    let producer: StageFn<u32> = Box::new(|_input, _output| false);
    let consumer: StageFn<u32> = Box::new(|input, _output| {
        let Some(input) = input else { return false };
        match input.read_one() {
            Ok(_) => true,
            Err(RingError::Cancelled) => false,
            Err(_) => false,
        }
    });

    let mut pipeline = Pipeline::new(vec![producer, consumer], 8);
    pipeline.start();
    thread::sleep(Duration::from_millis(50));

    pipeline.stop();
    pipeline.join();
}

#[test]
fn test_single_stage_pipeline() {
    let iterations = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&iterations);
    let stage: StageFn<u32> = Box::new(move |input, output| {
        assert!(input.is_none());
        assert!(output.is_none());
        counter.fetch_add(1, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(1));
        true
    });

    let mut pipeline = Pipeline::new(vec![stage], 4);
    assert!(pipeline.queues().is_empty());

    pipeline.start();
    assert!(wait_until(Duration::from_secs(2), || {
        iterations.load(Ordering::Relaxed) > 0
    }));

    pipeline.stop();
    pipeline.join();
}

#[test]
fn test_stages_wait_for_start() {
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&ran);
    let stage: StageFn<u32> = Box::new(move |_input, _output| {
        counter.fetch_add(1, Ordering::Relaxed);
        false
    });

    let pipeline = Pipeline::new(vec![stage], 4);
    thread::sleep(Duration::from_millis(50));
    // The worker exists but is parked on its start gate.
    assert_eq!(ran.load(Ordering::Relaxed), 0);

    pipeline.start();
    assert!(wait_until(Duration::from_secs(2), || {
        ran.load(Ordering::Relaxed) == 1
    }));
}

#[test]
fn test_failed_stage_does_not_cascade() {
    let consumed = Arc::new(AtomicUsize::new(0));

    // Producer pushes one value, then dies.
    let mut sent = false;
    let producer: StageFn<u32> = Box::new(move |_input, output| {
        let Some(output) = output else { return false };
        if sent {
            return false;
        }
        let _ = output.write_one(1);
        sent = true;
        true
    });

    let counter = Arc::clone(&consumed);
    let consumer: StageFn<u32> = Box::new(move |input, _output| {
        let Some(input) = input else { return false };
        match input.read_one() {
            Ok(_) => {
                counter.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(RingError::Cancelled) => false,
            Err(_) => false,
        }
    });

    let mut pipeline = Pipeline::new(vec![producer, consumer], 8);
    pipeline.start();

    // The consumer keeps running after the producer terminated.
    assert!(wait_until(Duration::from_secs(2), || {
        consumed.load(Ordering::Relaxed) == 1
    }));

    pipeline.stop();
    pipeline.join();
}

#[test]
fn test_queue_drop_counter_visible() {
    // A producer that floods a tiny queue while the consumer sleeps: the
    // overflow shows up on the queue's drop counter.
    let producer: StageFn<u32> = Box::new(move |_input, output| {
        let Some(output) = output else { return false };
        let _ = output.write_one(1);
        true
    });

    let consumer: StageFn<u32> = Box::new(|input, _output| {
        let Some(input) = input else { return false };
        thread::sleep(Duration::from_millis(20));
        match input.read_one() {
            Ok(_) => true,
            Err(_) => false,
        }
    });

    let mut pipeline = Pipeline::new(vec![producer, consumer], 2);
    pipeline.start();
    thread::sleep(Duration::from_millis(100));

    let dropped = pipeline.queues()[0].counters().unwrap().dropped;
    assert!(dropped > 0, "expected overflow on the tiny queue");

    pipeline.stop();
    pipeline.join();
}
