//! Periodic task example
//!
//! Runs a ticker alongside one-shot work. Iteration deadlines are
//! absolute (start + n * period), so the tick cadence stays put even when
//! an iteration is slow - watch the offsets printed below.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use taskpool::{Callable, Executor, ExecutorConfig};

fn main() {
    println!("=== taskpool periodic example ===\n");

    let exec = Executor::new(
        ExecutorConfig::from_env()
            .core_pool_size(2)
            .max_pool_size(2)
            .queue_capacity(4),
    )
    .expect("valid config");

    let start = Instant::now();
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);

    let ticker = exec.submit(Callable::periodic(Duration::from_millis(100), move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        println!("tick {:2} at {:>4}ms", n, start.elapsed().as_millis());
        // Odd iterations are slow; the cadence must not care
        if n % 2 == 1 {
            std::thread::sleep(Duration::from_millis(60));
        }
        n
    }));

    // Some one-shot work sharing the pool with the ticker
    for i in 0..3usize {
        let f = exec.submit(Callable::once(move || i + 100));
        println!("one-shot {} -> {:?}", i, f.wait());
    }

    std::thread::sleep(Duration::from_secs(1));
    println!("\nshutting down mid-period...");
    let before = Instant::now();
    exec.shutdown();
    println!(
        "shutdown took {}ms, last tick result {:?}",
        before.elapsed().as_millis(),
        ticker.wait()
    );
}
