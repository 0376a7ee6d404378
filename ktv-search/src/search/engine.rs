//! Fan-out search engine
//!
//! Crosses the configured companies with the generated strategies and runs
//! one upstream request per pair. Politeness toward the catalog service is
//! kept by two limits:
//! - at most `max_concurrency` requests in flight (bounded worker pool)
//! - request starts spaced by `request_interval` (shared token bucket)
//!
//! Each request runs as its own task with its own timeout, so one slow or
//! failing request never holds up or cancels the others: a freed slot is
//! refilled as soon as any task settles. Settled results are slotted by plan
//! index and aggregated in plan order by the engine itself, which is the only
//! writer of the per-search [`Aggregator`]. If a task dies, the rest are
//! aborted before the search fails. An overall deadline bounds the
//! whole search; work not finished by then is dropped and the result is
//! flagged partial.

use super::aggregator::Aggregator;
use super::filter::KeywordFilter;
use super::strategy::generate_strategies;
use super::vendor::VendorPriority;
use crate::services::catalog_client::{CatalogError, CatalogSource};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use ktv_common::config::{UpstreamConfig, CATCH_ALL_COMPANY, MAX_CONCURRENCY_CEILING};
use ktv_common::models::normalize_keyword;
use ktv_common::{AggregatedSong, Error, QueryType, RawSongRecord, Result, SearchStrategy, SearchType};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Fan-out policy for one engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Companies to query, in fan-out order
    pub companies: Vec<String>,
    /// Requests allowed in flight at once
    pub max_concurrency: usize,
    /// Minimum spacing between request starts
    pub request_interval: Duration,
    /// Budget for a whole search
    pub search_deadline: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            companies: config.effective_companies(),
            max_concurrency: config.max_concurrency,
            request_interval: Duration::from_millis(config.request_interval_ms),
            search_deadline: Duration::from_millis(config.search_deadline_ms),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&UpstreamConfig::default())
    }
}

/// One (company, strategy) request of the fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutJob {
    pub company: String,
    pub strategy: SearchStrategy,
}

/// How one fan-out request settled
#[derive(Debug)]
enum JobOutcome {
    Fetched(Vec<RawSongRecord>),
    Failed(CatalogError),
    /// Not run, or abandoned, because the search deadline passed
    Skipped,
}

/// Counters for one search run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub requests_planned: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_skipped: usize,
    pub records_received: usize,
    pub records_matched: usize,
    pub elapsed_ms: u64,
}

/// Result of one aggregated search
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub keyword: String,
    pub search_type: SearchType,
    pub songs: Vec<AggregatedSong>,
    /// True when the deadline cut the fan-out short
    pub partial: bool,
    pub stats: SearchStats,
}

/// Aggregated catalog search over many companies and strategies
pub struct SearchEngine {
    source: Arc<dyn CatalogSource>,
    settings: EngineSettings,
    priority: VendorPriority,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl SearchEngine {
    pub fn new(source: Arc<dyn CatalogSource>, mut settings: EngineSettings) -> Self {
        settings.max_concurrency = settings.max_concurrency.clamp(1, MAX_CONCURRENCY_CEILING);

        // One permit per interval, no burst
        let period = settings.request_interval.max(Duration::from_millis(1));
        let quota = Quota::with_period(period).unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            source,
            settings,
            priority: VendorPriority::default(),
            rate_limiter,
        }
    }

    pub fn with_priority(mut self, priority: VendorPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Every (company, strategy) pair for a keyword, company-major
    pub fn plan(&self, keyword: &str, search_type: SearchType) -> Vec<FanOutJob> {
        let strategies = generate_strategies(keyword, search_type);
        self.settings
            .companies
            .iter()
            .flat_map(|company| {
                strategies.iter().map(move |strategy| FanOutJob {
                    company: company.clone(),
                    strategy: strategy.clone(),
                })
            })
            .collect()
    }

    /// Run one aggregated search
    ///
    /// Upstream failures only shrink the result. Errors are returned for
    /// blank keywords and for fan-out tasks that die unexpectedly.
    pub async fn search(&self, keyword: &str, search_type: SearchType) -> Result<SearchOutcome> {
        let keyword = normalize_keyword(keyword)?;
        let started = Instant::now();
        let deadline = started + self.settings.search_deadline;

        let jobs = self.plan(&keyword, search_type);
        let filter = KeywordFilter::new(&keyword, search_type);
        let mut aggregator = Aggregator::new();
        let mut stats = SearchStats {
            requests_planned: jobs.len(),
            ..SearchStats::default()
        };

        info!(
            keyword = %keyword,
            search_type = %search_type,
            requests = jobs.len(),
            concurrency = self.settings.max_concurrency,
            "Starting catalog fan-out"
        );

        // Bounded pool: at most `max_concurrency` tasks alive, refilled as
        // each one settles in whatever order they finish
        let mut pending = jobs.into_iter().enumerate();
        let mut running = JoinSet::new();
        let mut settled: Vec<Option<(FanOutJob, JobOutcome)>> =
            std::iter::repeat_with(|| None).take(stats.requests_planned).collect();

        for (index, job) in pending.by_ref().take(self.settings.max_concurrency) {
            self.spawn_job(&mut running, index, job, deadline);
        }

        while let Some(joined) = running.join_next().await {
            let (index, job, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    running.abort_all();
                    return Err(Error::Internal(format!("fan-out task failed: {}", e)));
                }
            };
            settled[index] = Some((job, outcome));

            if let Some((index, job)) = pending.next() {
                self.spawn_job(&mut running, index, job, deadline);
            }
        }

        // Aggregate in plan order so the output never depends on timing
        for (job, outcome) in settled.into_iter().flatten() {
            match outcome {
                JobOutcome::Fetched(records) => {
                    stats.requests_succeeded += 1;
                    stats.records_received += records.len();
                    let matched = filter.apply(records);
                    stats.records_matched += matched.len();
                    debug!(
                        company = %job.company,
                        strategy = %job.strategy,
                        matched = matched.len(),
                        "Catalog request settled"
                    );
                    aggregator.extend(matched.iter());
                }
                JobOutcome::Failed(err) => {
                    stats.requests_failed += 1;
                    warn!(
                        company = %job.company,
                        query_type = %job.strategy.query_type,
                        keyword = %job.strategy.keyword,
                        malformed = err.is_malformed(),
                        error = %err,
                        "Catalog request failed, treating as no results"
                    );
                }
                JobOutcome::Skipped => {
                    stats.requests_skipped += 1;
                }
            }
        }

        let partial = stats.requests_skipped > 0;
        if partial {
            warn!(
                keyword = %keyword,
                skipped = stats.requests_skipped,
                "Search deadline reached, returning partial result"
            );
        }

        if aggregator.dropped() > 0 {
            debug!(
                dropped = aggregator.dropped(),
                "Dropped records without a title or singer"
            );
        }

        let songs = aggregator.finish(&self.priority);
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            keyword = %keyword,
            songs = songs.len(),
            succeeded = stats.requests_succeeded,
            failed = stats.requests_failed,
            skipped = stats.requests_skipped,
            elapsed_ms = stats.elapsed_ms,
            "Catalog search completed"
        );

        Ok(SearchOutcome {
            keyword,
            search_type,
            songs,
            partial,
            stats,
        })
    }

    fn spawn_job(
        &self,
        running: &mut JoinSet<(usize, FanOutJob, JobOutcome)>,
        index: usize,
        job: FanOutJob,
        deadline: Instant,
    ) {
        let source = Arc::clone(&self.source);
        let limiter = Arc::clone(&self.rate_limiter);
        running.spawn(async move {
            let (job, outcome) = run_job(source, limiter, job, deadline).await;
            (index, job, outcome)
        });
    }

    /// Single catch-all `searchList` request, unfiltered
    ///
    /// Unlike [`SearchEngine::search`], upstream failure is returned to the
    /// caller.
    pub async fn lookup_catch_all(
        &self,
        keyword: &str,
    ) -> std::result::Result<Vec<RawSongRecord>, CatalogError> {
        self.rate_limiter.until_ready().await;
        let strategy = SearchStrategy::new(QueryType::SongSearch, keyword);
        self.source.fetch(CATCH_ALL_COMPANY, &strategy).await
    }
}

async fn run_job(
    source: Arc<dyn CatalogSource>,
    limiter: Arc<DefaultDirectRateLimiter>,
    job: FanOutJob,
    deadline: Instant,
) -> (FanOutJob, JobOutcome) {
    if Instant::now() >= deadline {
        return (job, JobOutcome::Skipped);
    }

    let request = async {
        limiter.until_ready().await;
        source.fetch(&job.company, &job.strategy).await
    };

    let outcome = match tokio::time::timeout_at(deadline, request).await {
        Ok(Ok(records)) => JobOutcome::Fetched(records),
        Ok(Err(err)) => JobOutcome::Failed(err),
        Err(_) => JobOutcome::Skipped,
    };
    (job, outcome)
}
