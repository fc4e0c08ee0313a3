//! Basic taskpool example
//!
//! Submits a batch of one-shot callables to a small pool and collects the
//! results through their futures.
//!
//! # Environment Variables
//!
//! - `TP_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `TP_QUEUE_BACKEND=sem` - Use the semaphore queue backend

use std::sync::Arc;
use std::time::Duration;

use taskpool::{tp_info, Callable, Executor, ExecutorConfig, LogObserver};

// TP_LOG_LEVEL=debug cargo run -p taskpool-basic
fn main() {
    println!("=== taskpool basic example ===\n");

    let config = ExecutorConfig::from_env()
        .core_pool_size(2)
        .max_pool_size(4)
        .queue_capacity(8);
    config.print();

    let exec = Executor::with_observer(config, Arc::new(LogObserver)).expect("valid config");

    let futures: Vec<_> = (0..10u64)
        .map(|i| {
            exec.submit(Callable::once(move || {
                // Simulate some work
                std::thread::sleep(Duration::from_millis(20 + 5 * i));
                i * i
            }))
        })
        .collect();

    for (i, future) in futures.iter().enumerate() {
        match future.wait() {
            Ok(square) => println!("task {:2}: {}^2 = {}", i, i, square),
            Err(err) => println!("task {:2}: {}", i, err),
        }
    }

    tp_info!("all futures resolved, shutting down");
    exec.shutdown();
    println!("\n=== example complete ===");
}
