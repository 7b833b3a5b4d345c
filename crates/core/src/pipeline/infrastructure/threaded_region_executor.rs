use std::thread;

/// Runs independent per-face jobs on a bounded pool of scoped threads.
///
/// Layout: `jobs → [worker × N] → results`, each job tagged with its input
/// position so results come back in input order no matter which worker
/// finished first. Nothing here touches the request's raster; callers
/// composite the gathered results themselves, on one thread.
pub struct ThreadedRegionExecutor {
    workers: usize,
}

impl ThreadedRegionExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Applies `work` to every job and returns the results in job order.
    ///
    /// A panicking job propagates its panic once all workers have stopped.
    pub fn gather<J, R, F>(&self, jobs: Vec<J>, work: F) -> Vec<R>
    where
        J: Send,
        R: Send,
        F: Fn(J) -> R + Sync,
    {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.workers.min(total);

        let (job_tx, job_rx) = crossbeam_channel::bounded::<(usize, J)>(total);
        let (result_tx, result_rx) = crossbeam_channel::bounded::<(usize, R)>(total);

        for (index, job) in jobs.into_iter().enumerate() {
            if job_tx.send((index, job)).is_err() {
                break;
            }
        }
        drop(job_tx);

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let work = &work;
                scope.spawn(move || {
                    for (index, job) in job_rx {
                        if result_tx.send((index, work(job))).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut results: Vec<(usize, R)> = result_rx.into_iter().collect();
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

impl Default for ThreadedRegionExecutor {
    fn default() -> Self {
        Self::new(4)
    }
}
