use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        mpsc::{channel, Sender},
        Arc, Mutex, PoisonError,
    },
    thread::JoinHandle,
};

use log::{debug, error};

use crate::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of threads pulling jobs off one shared channel.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Self {
        let (sender, receiver) = channel::<Job>();
        let recv = Arc::new(Mutex::new(receiver));
        let workers = (0..num_threads.max(1))
            .map(|id| {
                let recv_clone = Arc::clone(&recv);
                std::thread::spawn(move || loop {
                    //  the guard is a temporary, so the lock is released before the job runs
                    let job = recv_clone
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .recv();
                    match job {
                        Ok(job) => {
                            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                                error!("worker {id} caught a panicking job");
                            }
                        }
                        Err(_) => {
                            debug!("worker {id} saw the job channel close, shutting down");
                            break;
                        }
                    }
                })
            })
            .collect();
        Self {
            sender: Some(sender),
            workers,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(Error::PoolClosed)?;
        sender.send(Box::new(job)).map_err(|_| Error::PoolClosed)
    }

    /// Lets queued jobs finish, then joins every worker.
    pub fn shutdown(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("a worker thread panicked outside of a job");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
