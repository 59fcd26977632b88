//! Fixed-size worker pool
//!
//! Workers pull jobs from a shared channel until it is drained and send one
//! report back per job. A failing job never stops its siblings.

use crate::job::{Job, run_job};
use crossbeam_channel::unbounded;
use curators_core::{Error, Result, Settings};
use curators_economy::RunSummary;
use std::sync::Arc;
use std::thread;

#[derive(Debug)]
pub struct JobReport {
    pub job: Job,
    pub result: Result<RunSummary>,
}

/// Run every job on `threads` workers; reports come back ordered by job index
pub fn run_pool(settings: Arc<Settings>, jobs: Vec<Job>, threads: usize) -> Result<Vec<JobReport>> {
    let total = jobs.len();
    let (job_tx, job_rx) = unbounded::<Job>();
    let (report_tx, report_rx) = unbounded::<JobReport>();
    for job in jobs {
        // the receiver is alive, sending cannot fail
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let workers = threads.max(1).min(total.max(1));
    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let jobs = job_rx.clone();
        let reports = report_tx.clone();
        let settings = Arc::clone(&settings);
        let handle = thread::Builder::new()
            .name(format!("curators-worker-{worker}"))
            .spawn(move || {
                while let Ok(job) = jobs.recv() {
                    let result = run_job(&settings, &job);
                    if let Err(e) = &result {
                        log::error!("job {} ({}) failed: {e}", job.index, job.name());
                    }
                    if reports.send(JobReport { job, result }).is_err() {
                        break;
                    }
                }
            })
            .map_err(|source| Error::Io {
                path: format!("worker thread {worker}"),
                source,
            })?;
        handles.push(handle);
    }
    drop(report_tx);

    let mut reports: Vec<JobReport> = report_rx.iter().collect();
    for handle in handles {
        if handle.join().is_err() {
            log::error!("a worker thread panicked");
        }
    }
    if reports.len() != total {
        return Err(Error::invariant(format!(
            "{} of {total} jobs reported back",
            reports.len()
        )));
    }

    reports.sort_by_key(|report| report.job.index);
    Ok(reports)
}
