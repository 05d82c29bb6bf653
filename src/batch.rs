//! Bounded-concurrency batch runner.
//!
//! Sites are split into consecutive chunks of `batch_size`. Chunks run one
//! after another; the sites inside a chunk run concurrently. A chunk starts
//! only once every site of the previous chunk has settled, which caps the
//! number of in-flight upstream requests at `batch_size` sites' worth.
//!
//! A site whose function returns an error, or panics, is logged and left
//! out of the results. It never stops the other sites or later chunks.

use crate::logging::{log_batch_summary, log_site_failure};
use crate::model::Site;
use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Why a site was dropped from a batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SiteError {
    #[error("site processing failed: {0}")]
    Failed(String),
    #[error("site processing panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteFailure {
    pub site_id: String,
    pub error: SiteError,
}

/// Results of the sites that succeeded, in site order, plus the failures.
#[derive(Debug)]
pub struct BatchOutcome<R> {
    pub results: Vec<R>,
    pub failures: Vec<SiteFailure>,
}

impl<R> BatchOutcome<R> {
    /// Number of sites dropped from `results`.
    pub fn dropped(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run `per_site` over every site, `batch_size` at a time.
pub async fn process_all<'a, R, E, F, Fut>(sites: &'a [Site], per_site: F, batch_size: usize) -> BatchOutcome<R>
where
    F: Fn(&'a Site) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: fmt::Display,
{
    let batch_size = batch_size.max(1);
    let per_site = &per_site;
    let mut results = Vec::with_capacity(sites.len());
    let mut failures = Vec::new();

    for (index, chunk) in sites.chunks(batch_size).enumerate() {
        tracing::debug!(chunk = index, sites = chunk.len(), "starting chunk");

        let settled = join_all(
            chunk
                .iter()
                // The call itself runs inside the guarded future, so a panic
                // before the per-site future exists is caught too
                .map(|site| AssertUnwindSafe(async move { per_site(site).await }).catch_unwind()),
        )
        .await;

        for (site, outcome) in chunk.iter().zip(settled) {
            let error = match outcome {
                Ok(Ok(result)) => {
                    results.push(result);
                    continue;
                }
                Ok(Err(e)) => SiteError::Failed(e.to_string()),
                Err(payload) => SiteError::Panicked(panic_message(payload.as_ref())),
            };
            log_site_failure(&site.id, &error.to_string());
            failures.push(SiteFailure {
                site_id: site.id.clone(),
                error,
            });
        }
    }

    log_batch_summary(sites.len(), results.len(), failures.len());
    BatchOutcome { results, failures }
}
