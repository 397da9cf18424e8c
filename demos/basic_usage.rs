//! Basic usage example for safemap
//!
//! Shares one map between writer and reader threads, walks it with `for_each`
//! and prints the access metrics. Set `RUST_LOG=safemap=trace` to see the
//! library's log events.

use safemap::{ConcurrentMap, Error, MetricsCollector};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("safemap Usage Example");
    println!("=====================");

    let sessions: Arc<ConcurrentMap<String, u32>> = Arc::new(ConcurrentMap::with_capacity(64));

    // Basic operations
    println!("\n1. Basic Operations:");
    sessions.insert("alice".to_string(), 1);
    sessions.insert("bob".to_string(), 2);
    let previous = sessions.insert("alice".to_string(), 3);
    println!("   Overwrote alice, previous value: {:?}", previous);
    println!(
        "   len = {}, alice = {:?}, carol = {:?}",
        sessions.len(),
        sessions.get("alice"),
        sessions.get("carol"),
    );

    // Writers and readers sharing the map
    println!("\n2. Concurrent Access:");
    let writers: Vec<_> = (0..4)
        .map(|w| {
            let sessions = Arc::clone(&sessions);
            thread::spawn(move || {
                for i in 0..25 {
                    sessions.insert(format!("user-{}-{}", w, i), i);
                }
            })
        })
        .collect();

    let reader = {
        let sessions = Arc::clone(&sessions);
        thread::spawn(move || {
            let mut observed = Vec::new();
            for _ in 0..5 {
                observed.push(sessions.len());
                thread::sleep(Duration::from_micros(50));
            }
            observed
        })
    };

    for writer in writers {
        writer.join().map_err(|_| "writer thread panicked")?;
    }
    let observed = reader.join().map_err(|_| "reader thread panicked")?;
    println!("   Reader observed lengths: {:?}", observed);
    println!("   Final length: {}", sessions.len());

    // Traversal holds the read lock for its whole duration
    println!("\n3. Traversal:");
    let mut total = 0;
    sessions.for_each(|_, v| total += v);
    println!("   Sum of all values: {}", total);

    // Bounded waits
    println!("\n4. Bounded Waits:");
    match sessions.try_get_for("bob", Duration::from_millis(10)) {
        Ok(value) => println!("   bob = {:?}", value),
        Err(Error::TimedOut) => println!("   Gave up waiting for the lock"),
        Err(e) => println!("   Unexpected error: {}", e),
    }

    sessions.retain(|key, _| !key.starts_with("user-0-"));
    println!("   After retain: {} entries", sessions.len());

    let metrics = sessions.metrics();
    println!("\n5. Metrics:");
    println!(
        "   reads: {}, writes: {}, removals: {}",
        metrics.reads, metrics.writes, metrics.removals
    );
    println!("   hit rate: {:.1}%", metrics.hit_rate());
    println!("   contention rate: {:.1}%", metrics.contention_rate());

    Ok(())
}
