use super::{Classification, Progress, ScanSettings, classify};
use crate::github::{Client, DiscoveredRepo};
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const LOG_TARGET: &str = "      scan";

/// Outcome of classifying a batch of repositories.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Accepted records, in completion order
    pub accepted: Vec<Classification>,

    /// Repositories that were classified but failed at least one gate
    pub rejected: usize,

    /// Classification tasks that panicked
    pub failed: usize,
}

/// Classify every repository on a bounded pool of concurrent workers.
///
/// Workers push accepted records into a shared collection as they finish. A worker
/// that panics is logged and counted, and the rest of the batch carries on. The
/// pool always drains fully.
pub async fn classify_all(
    client: &Client,
    settings: &ScanSettings,
    repos: Vec<DiscoveredRepo>,
    progress: &dyn Progress,
) -> ScanReport {
    let client = client.clone();
    let shared = Arc::new(settings.clone());
    run_pool(settings.workers, repos, progress, move |repo| {
        let client = client.clone();
        let settings = Arc::clone(&shared);
        async move { classify(&client, &settings, repo).await }
    })
    .await
}

async fn run_pool<F, Fut>(workers: usize, repos: Vec<DiscoveredRepo>, progress: &dyn Progress, classify_one: F) -> ScanReport
where
    F: Fn(DiscoveredRepo) -> Fut,
    Fut: Future<Output = Classification> + Send + 'static,
{
    let total = repos.len() as u64;
    let completed = Arc::new(AtomicU64::new(0));
    let accepted: Arc<Mutex<Vec<Classification>>> = Arc::new(Mutex::new(Vec::new()));
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));

    progress.set_phase("Classifying");
    {
        let completed = Arc::clone(&completed);
        let accepted = Arc::clone(&accepted);
        progress.set_determinate(Box::new(move || {
            let done = completed.load(Ordering::Relaxed);
            let kept = accepted.lock().map_or(0, |v| v.len());
            (total, done, format!("{done}/{total} repositories, {kept} accepted"))
        }));
    }

    let mut tasks = JoinSet::new();
    for repo in repos {
        let semaphore = Arc::clone(&semaphore);
        let accepted = Arc::clone(&accepted);
        let work = classify_one(repo);

        let _ = tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            let record = work.await;
            let is_accepted = record.is_accepted();
            if is_accepted {
                accepted.lock().expect("lock poisoned").push(record);
            }
            is_accepted
        });
    }

    let mut report = ScanReport::default();
    while let Some(result) = tasks.join_next().await {
        let _ = completed.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(true) => {}
            Ok(false) => report.rejected += 1,
            Err(e) => {
                log::error!(target: LOG_TARGET, "Classification task failed: {e}");
                report.failed += 1;
            }
        }
    }

    progress.done();

    report.accepted = core::mem::take(&mut *accepted.lock().expect("lock poisoned"));
    log::info!(
        target: LOG_TARGET,
        "Classified {total} repositories: {} accepted, {} rejected, {} failed",
        report.accepted.len(),
        report.rejected,
        report.failed
    );
    report
}
