//! A fixed-size set of workers draining a queue that is filled up front

use std::collections::VecDeque;
use std::sync::{mpsc, Mutex};
use std::thread;

use log::trace;

/// Apply `work` to every item using at most `workers` threads
///
/// Blocks until every item has been processed. Results come back in the
/// order of `items`, so the caller can fold them into an `Aggregator`
/// deterministically.
pub fn run_all<T, R, F>(items: Vec<T>, workers: usize, work: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let total = items.len();
    let workers = workers.max(1).min(total.max(1));
    let queue = Mutex::new(items.into_iter().enumerate().collect::<VecDeque<_>>());
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for id in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            let work = &work;
            scope.spawn(move || loop {
                let next = match queue.lock() {
                    Ok(mut q) => q.pop_front(),
                    Err(poisoned) => poisoned.into_inner().pop_front(),
                };
                match next {
                    Some((idx, item)) => {
                        trace!("worker {} took item {}", id, idx);
                        // the receiver outlives the scope
                        let _ = tx.send((idx, work(item)));
                    }
                    None => break,
                }
            });
        }
    });
    drop(tx);

    let mut results: Vec<(usize, R)> = rx.into_iter().collect();
    results.sort_by_key(|&(idx, _)| idx);
    results.into_iter().map(|(_, r)| r).collect()
}
