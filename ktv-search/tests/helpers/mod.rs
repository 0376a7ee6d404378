//! Shared test sources for integration tests
//!
//! In-memory `CatalogSource` implementations standing in for the upstream
//! catalog, so fan-out behavior can be checked without the network.

#![allow(dead_code)]

pub mod log_capture;

use async_trait::async_trait;
use ktv_common::{QueryType, RawSongRecord, SearchStrategy};
use ktv_search::search::EngineSettings;
use ktv_search::services::{CatalogError, CatalogSource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Settings with a fast interval and a generous deadline
pub fn fast_settings(companies: &[&str]) -> EngineSettings {
    EngineSettings {
        companies: companies.iter().map(|c| c.to_string()).collect(),
        max_concurrency: 4,
        request_interval: Duration::from_millis(1),
        search_deadline: Duration::from_secs(10),
    }
}

/// Canned answers per company, with every request recorded
///
/// A company without canned records answers with an empty list. Companies
/// can also be made slow, failing or panicking.
#[derive(Default)]
pub struct ScriptedSource {
    by_company: HashMap<String, Vec<RawSongRecord>>,
    failing: HashMap<String, fn() -> CatalogError>,
    delays: HashMap<String, Duration>,
    panicking: Option<String>,
    calls: Mutex<Vec<(String, QueryType, String)>>,
    completed: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records returned for every strategy sent to `company`
    pub fn with_records(mut self, company: &str, records: Vec<RawSongRecord>) -> Self {
        self.by_company.insert(company.to_string(), records);
        self
    }

    /// Make every request to `company` fail
    pub fn with_failure(mut self, company: &str, make: fn() -> CatalogError) -> Self {
        self.failing.insert(company.to_string(), make);
        self
    }

    /// Sleep `delay` before answering requests to `company`
    pub fn with_delay(mut self, company: &str, delay: Duration) -> Self {
        self.delays.insert(company.to_string(), delay);
        self
    }

    /// Panic on every request to `company`
    pub fn with_panic(mut self, company: &str) -> Self {
        self.panicking = Some(company.to_string());
        self
    }

    /// Requests that ran to the end (answered or failed)
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, QueryType, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn companies_called(&self) -> Vec<String> {
        let mut companies: Vec<String> = self.calls().into_iter().map(|(c, _, _)| c).collect();
        companies.sort();
        companies.dedup();
        companies
    }
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    async fn fetch(
        &self,
        company: &str,
        strategy: &SearchStrategy,
    ) -> Result<Vec<RawSongRecord>, CatalogError> {
        self.calls.lock().unwrap().push((
            company.to_string(),
            strategy.query_type,
            strategy.keyword.clone(),
        ));

        if self.panicking.as_deref() == Some(company) {
            panic!("catalog source exploded for {}", company);
        }
        if let Some(delay) = self.delays.get(company) {
            tokio::time::sleep(*delay).await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        if let Some(make) = self.failing.get(company) {
            return Err(make());
        }
        Ok(self.by_company.get(company).cloned().unwrap_or_default())
    }
}

/// Every request fails
pub struct FailingSource;

#[async_trait]
impl CatalogSource for FailingSource {
    async fn fetch(
        &self,
        _company: &str,
        _strategy: &SearchStrategy,
    ) -> Result<Vec<RawSongRecord>, CatalogError> {
        Err(CatalogError::Network("connection refused".to_string()))
    }
}

/// Sleeps on every request while tracking peak concurrency
pub struct SlowSource {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl SlowSource {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for SlowSource {
    async fn fetch(
        &self,
        _company: &str,
        _strategy: &SearchStrategy,
    ) -> Result<Vec<RawSongRecord>, CatalogError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Panics on every request
pub struct PanickingSource;

#[async_trait]
impl CatalogSource for PanickingSource {
    async fn fetch(
        &self,
        _company: &str,
        _strategy: &SearchStrategy,
    ) -> Result<Vec<RawSongRecord>, CatalogError> {
        panic!("catalog source exploded");
    }
}
