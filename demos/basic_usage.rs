//! Basic usage example for syncdeque
//!
//! Producers feed both ends of a deque, consumers block on pops, a reader
//! traverses the contents, and a final shutdown releases everyone.
//!
//! Run with `RUST_LOG=syncdeque=debug cargo run --example basic_usage` to see
//! the deque's lifecycle events.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use syncdeque::metrics::MetricsCollector;
use syncdeque::{BlockingDeque, DequeConfig, Error};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("syncdeque Usage Example");
    println!("=======================");

    let deque: Arc<BlockingDeque<u32>> =
        Arc::new(BlockingDeque::with_config(DequeConfig::new().initial_capacity(64))?);

    // Basic operations at both ends
    println!("\n1. Basic Operations:");
    deque.push_back(2)?;
    deque.push_front(1)?;
    deque.push_back(3)?;
    let mut contents = Vec::new();
    deque.traverse(|value| contents.push(*value))?;
    println!("   Contents front-to-back: {:?}", contents);
    println!("   Popped front: {:?}", deque.pop_front());
    println!("   Popped back: {:?}", deque.pop_back());
    println!("   Remaining: {}", deque.len());

    // Blocking consumers
    println!("\n2. Producers and Blocking Consumers:");
    let consumers: Vec<_> = (0..2)
        .map(|id| {
            let deque = Arc::clone(&deque);
            thread::spawn(move || {
                let pop = |deque: &BlockingDeque<u32>| {
                    if id == 0 {
                        deque.pop_front()
                    } else {
                        deque.pop_back()
                    }
                };
                let mut taken = 0usize;
                // pop blocks until an element arrives or the deque shuts down
                while let Some(value) = pop(&deque) {
                    taken += 1;
                    if value % 25 == 0 {
                        println!("   Consumer {} took {}", id, value);
                    }
                }
                println!("   Consumer {} released after {} items", id, taken);
                taken
            })
        })
        .collect();

    let producers: Vec<_> = (0..4)
        .map(|id: u32| {
            let deque = Arc::clone(&deque);
            thread::spawn(move || {
                for j in 0..25 {
                    let value = id * 25 + j;
                    let pushed = if id % 2 == 0 {
                        deque.push_back(value)
                    } else {
                        deque.push_front(value)
                    };
                    match pushed.map_err(|rejected| rejected.error()) {
                        Ok(()) => {}
                        Err(Error::ShutDown) => {
                            println!("   Producer {}: deque shut down", id);
                            break;
                        }
                        Err(e) => {
                            println!("   Producer {}: unexpected error: {}", id, e);
                            break;
                        }
                    }
                }
            })
        })
        .collect();

    for handle in producers {
        handle.join().expect("producer panicked");
    }

    // Give consumers a moment to drain, then release them
    thread::sleep(Duration::from_millis(50));
    let leftover = deque.shutdown();
    println!("   Shutdown handed back {} items", leftover.len());

    let consumed: usize = consumers
        .into_iter()
        .map(|handle| handle.join().expect("consumer panicked"))
        .sum();
    println!("   Consumed {} items in total", consumed + leftover.len());

    // Operations after shutdown fail instead of blocking
    println!("\n3. After Shutdown:");
    println!("   push_back -> {:?}", deque.push_back(0));
    println!("   pop_front -> {:?}", deque.pop_front());

    // Metrics
    println!("\n4. Metrics:");
    let metrics = deque.metrics();
    println!("   Operations: {}", metrics.total_operations);
    println!("   Success rate: {:.1}%", metrics.success_rate());
    println!("   Contention rate: {:.1}%", metrics.contention_rate());
    println!("   Avg op time: {:?}", metrics.avg_operation_time());
    println!("   Peak node storage: {} bytes", metrics.peak_memory_usage_bytes);

    Ok(())
}
