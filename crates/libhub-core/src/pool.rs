//! Fixed-size pool of worker threads draining one job queue.

use std::{
    sync::{mpsc, Mutex, PoisonError},
    thread,
};

use tracing::debug;

/// Outcome of a pool run.
#[derive(Debug)]
pub struct PoolReport<E> {
    pub completed: usize,
    pub errors: Vec<E>,
}

impl<E> Default for PoolReport<E> {
    fn default() -> Self {
        Self {
            completed: 0,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Creates a pool of `workers` threads. A size of zero is raised to one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `job` on every item and blocks until the queue is drained.
    ///
    /// A producer thread feeds a bounded queue and closes it after the last item. Each worker
    /// takes one item at a time until the queue is closed and empty. Job errors are collected and
    /// never stop the other workers.
    pub fn run<T, E, F>(&self, jobs: Vec<T>, job: F) -> PoolReport<E>
    where
        T: Send,
        E: Send,
        F: Fn(T) -> Result<(), E> + Sync,
    {
        let (sender, receiver) = mpsc::sync_channel::<T>(self.workers);
        let receiver = Mutex::new(receiver);
        let report = Mutex::new(PoolReport::default());

        thread::scope(|scope| {
            scope.spawn(move || {
                for item in jobs {
                    if sender.send(item).is_err() {
                        break;
                    }
                }
            });

            for id in 0..self.workers {
                let receiver = &receiver;
                let report = &report;
                let job = &job;

                scope.spawn(move || {
                    debug!("Started worker {id}");
                    loop {
                        let next = receiver
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .recv();
                        let Ok(item) = next else {
                            break;
                        };

                        let outcome = job(item);
                        let mut report = report.lock().unwrap_or_else(PoisonError::into_inner);
                        match outcome {
                            Ok(()) => report.completed += 1,
                            Err(err) => report.errors.push(err),
                        }
                    }
                    debug!("Completed worker {id}");
                });
            }
        });

        report.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
