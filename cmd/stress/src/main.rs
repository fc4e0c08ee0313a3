//! Stress test: many submitters against a small pool
//!
//! Hammers a deliberately undersized executor from several submitter
//! threads and tallies completions vs rejections. Tune with:
//!
//! - `TP_SUBMITTERS` - Submitter thread count (default 8)
//! - `TP_TASKS_PER_SUBMITTER` - Tasks per submitter (default 500)
//! - `TP_SATURATION=block` - Make saturated submits wait instead of reject
//! - `TP_QUEUE_BACKEND=sem` - Use the semaphore queue backend

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use taskpool::{env_get, Callable, Executor, ExecutorConfig, TaskError};

fn main() {
    println!("=== taskpool stress ===\n");

    let submitters: usize = env_get("TP_SUBMITTERS", 8);
    let per_submitter: usize = env_get("TP_TASKS_PER_SUBMITTER", 500);

    let config = ExecutorConfig::from_env()
        .core_pool_size(2)
        .max_pool_size(4)
        .queue_capacity(32);
    config.print();

    let exec = Arc::new(Executor::new(config).expect("valid config"));
    let completed = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let mut handles = Vec::new();
    for s in 0..submitters {
        let exec = Arc::clone(&exec);
        let completed = Arc::clone(&completed);
        let rejected = Arc::clone(&rejected);
        handles.push(thread::spawn(move || {
            for i in 0..per_submitter {
                let future = exec.submit(Callable::once(move || s * per_submitter + i));
                match future.wait() {
                    Ok(_) => completed.fetch_add(1, Ordering::Relaxed),
                    Err(TaskError::Rejected) => rejected.fetch_add(1, Ordering::Relaxed),
                    Err(err) => panic!("unexpected outcome: {}", err),
                };
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
    let elapsed = start.elapsed();
    exec.shutdown();

    let done = completed.load(Ordering::Relaxed);
    let refused = rejected.load(Ordering::Relaxed);
    println!("\n{} tasks submitted in {:?}", submitters * per_submitter, elapsed);
    println!("  completed: {}", done);
    println!("  rejected:  {}", refused);
    assert_eq!(done + refused, submitters * per_submitter);
    println!("\n=== stress complete ===");
}
