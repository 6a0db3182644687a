pub mod fetcher;
pub mod retry;

pub use fetcher::{HttpPageFetcher, PageFetcher, PageQuery};
pub use retry::RetryPolicy;

use crate::columnar::Columnar;
use crate::error::{PipelineError, Result};
use crate::records::IngestedRecord;
use crate::storage::BatchStore;
use crate::validation;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub pages: usize,
    pub records: usize,
}

/// Pages through the remote source, validates each page, stamps ingestion
/// metadata and persists one batch file per page.
pub struct Ingestor {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn BatchStore>,
    retry: RetryPolicy,
    base_params: BTreeMap<String, String>,
    output_dir: PathBuf,
}

impl Ingestor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn BatchStore>,
        retry: RetryPolicy,
        base_params: BTreeMap<String, String>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            store,
            retry,
            base_params,
            output_dir,
        }
    }

    /// Fetches `total_records` in pages of `page_size` and stores each page
    /// as one batch file. Every run starts from a cleared destination, so a
    /// failed run can simply be re-run.
    pub async fn run(&self, total_records: u64, page_size: u64) -> Result<IngestSummary> {
        self.store.clear(&self.output_dir)?;

        if total_records > 0 && page_size == 0 {
            return Err(PipelineError::Config(
                "page size must be nonzero when records are requested".to_string(),
            ));
        }

        let mut summary = IngestSummary { pages: 0, records: 0 };
        let mut offset = 0u64;
        while offset < total_records {
            let quantity = page_size.min(total_records - offset);
            let query = PageQuery::new(&self.base_params, offset, quantity);
            let payload = self.fetch_with_retries(&query).await?;
            let page = self.ingest_page(&payload)?;
            self.store
                .write(&self.output_dir, &IngestedRecord::to_batch(&page)?, None)?;
            info!(offset, rows = page.len(), "ingested page");

            summary.pages += 1;
            summary.records += page.len();
            offset += page_size;
        }
        Ok(summary)
    }

    /// Fetches one page under the retry policy. Retries reset per page;
    /// only transient failures are retried.
    async fn fetch_with_retries(&self, query: &PageQuery) -> Result<Value> {
        let mut last_error = None;
        for attempt in 0..self.retry.max_attempts {
            match self.fetcher.fetch_page(query).await {
                Ok(payload) => return Ok(payload),
                Err(err) if err.is_transient() => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "page fetch failed"
                    );
                    last_error = Some(err);
                    if attempt + 1 < self.retry.max_attempts {
                        let delay = self.retry.delay_for(attempt);
                        info!(delay_secs = delay.as_secs_f64(), "retrying after backoff");
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
        match last_error {
            Some(source) => Err(PipelineError::RetriesExhausted {
                attempts: self.retry.max_attempts,
                source: Box::new(source),
            }),
            None => Err(PipelineError::Config(
                "retry policy allows zero fetch attempts".to_string(),
            )),
        }
    }

    /// Validates one page's payload and stamps the ingestion metadata.
    fn ingest_page(&self, payload: &Value) -> Result<Vec<IngestedRecord>> {
        let persons = validation::validate_envelope(payload)?;
        let processed_at = Utc::now().to_rfc3339();
        persons
            .iter()
            .map(|person| IngestedRecord::from_person(person, &processed_at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::sample_person;
    use crate::storage::ParquetDirStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Scripted fetcher: fails transiently a fixed number of times, then
    /// serves the same single-record page for every query, recording the
    /// pagination parameters it saw.
    struct FakeFetcher {
        payload: Value,
        failures_left: Mutex<u32>,
        seen: Mutex<Vec<(u64, u64)>>,
    }

    impl FakeFetcher {
        fn new(payload: Value) -> Self {
            Self {
                payload,
                failures_left: Mutex::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(payload: Value, failures: u32) -> Self {
            let fetcher = Self::new(payload);
            *fetcher.failures_left.lock().unwrap() = failures;
            fetcher
        }

        fn seen(&self) -> Vec<(u64, u64)> {
            self.seen.lock().unwrap().clone()
        }
    }

    // An unparseable URL makes reqwest fail in the builder, so a transient
    // error can be produced without touching the network.
    async fn transient_error() -> PipelineError {
        let err = reqwest::Client::new()
            .get("http://")
            .send()
            .await
            .unwrap_err();
        PipelineError::Http(err)
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch_page(&self, query: &PageQuery) -> Result<Value> {
            self.seen.lock().unwrap().push((query.offset, query.quantity));
            let should_fail = {
                let mut failures = self.failures_left.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    true
                } else {
                    false
                }
            };
            if should_fail {
                return Err(transient_error().await);
            }
            Ok(self.payload.clone())
        }
    }

    fn single_person_payload() -> Value {
        json!({
            "status": "OK",
            "code": 200,
            "total": 1000,
            "data": [serde_json::to_value(sample_person(1)).unwrap()]
        })
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            backoff_factor: 2,
        }
    }

    fn ingestor_over(dir: &std::path::Path, fetcher: Arc<FakeFetcher>, retry: RetryPolicy) -> Ingestor {
        Ingestor::new(
            fetcher,
            Arc::new(ParquetDirStore::new()),
            retry,
            BTreeMap::new(),
            dir.to_path_buf(),
        )
    }

    #[tokio::test]
    async fn single_record_run_writes_one_stamped_file() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(single_person_payload()));
        let ingestor = ingestor_over(dir.path(), fetcher, fast_retry(3));

        let summary = ingestor.run(1, 1).await.unwrap();
        assert_eq!(summary, IngestSummary { pages: 1, records: 1 });

        let store = ParquetDirStore::new();
        assert_eq!(store.read(dir.path(), 1_000).unwrap().count(), 1);

        let rows = IngestedRecord::from_batch(&store.read_all(dir.path()).unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        let expected = IngestedRecord::from_person(&sample_person(1), &rows[0].processed_at).unwrap();
        assert_eq!(rows[0], expected);
    }

    #[tokio::test]
    async fn pages_cover_the_total_with_a_short_last_page() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(single_person_payload()));
        let ingestor = ingestor_over(dir.path(), fetcher.clone(), fast_retry(3));

        ingestor.run(5, 2).await.unwrap();
        assert_eq!(fetcher.seen(), vec![(0, 2), (2, 2), (4, 1)]);
    }

    #[tokio::test]
    async fn zero_total_clears_and_fetches_nothing() {
        let dir = tempdir().unwrap();
        let store = ParquetDirStore::new();
        store
            .write(
                dir.path(),
                &IngestedRecord::to_batch(&[IngestedRecord::from_person(
                    &sample_person(1),
                    "2024-01-01T00:00:00+00:00",
                )
                .unwrap()])
                .unwrap(),
                None,
            )
            .unwrap();

        let fetcher = Arc::new(FakeFetcher::new(single_person_payload()));
        let ingestor = ingestor_over(dir.path(), fetcher.clone(), fast_retry(3));
        let summary = ingestor.run(0, 10).await.unwrap();

        assert_eq!(summary, IngestSummary { pages: 0, records: 0 });
        assert!(fetcher.seen().is_empty());
        // Destination was cleared even though nothing was fetched
        assert!(matches!(
            store.read_all(dir.path()),
            Err(PipelineError::NoBatchFiles(_))
        ));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::failing(single_person_payload(), 2));
        let ingestor = ingestor_over(dir.path(), fetcher.clone(), fast_retry(3));

        let summary = ingestor.run(1, 1).await.unwrap();
        assert_eq!(summary.records, 1);
        assert_eq!(fetcher.seen().len(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_abort_the_run() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::failing(single_person_payload(), 10));
        let ingestor = ingestor_over(dir.path(), fetcher.clone(), fast_retry(3));

        let err = ingestor.run(1, 1).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(fetcher.seen().len(), 3);
    }

    #[tokio::test]
    async fn malformed_envelope_is_fatal_without_retry() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(json!({ "status": "OK" })));
        let ingestor = ingestor_over(dir.path(), fetcher.clone(), fast_retry(3));

        let err = ingestor.run(1, 1).await.unwrap_err();
        assert!(matches!(err, PipelineError::Envelope(_)));
        assert_eq!(fetcher.seen().len(), 1);
    }

    #[tokio::test]
    async fn invalid_record_fails_the_whole_page() {
        let dir = tempdir().unwrap();
        let mut item = serde_json::to_value(sample_person(1)).unwrap();
        item["email"] = json!("not-an-email");
        let fetcher = Arc::new(FakeFetcher::new(json!({ "data": [item] })));
        let ingestor = ingestor_over(dir.path(), fetcher, fast_retry(3));

        let err = ingestor.run(1, 1).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        // The failed page left nothing behind
        assert!(matches!(
            ParquetDirStore::new().read_all(dir.path()),
            Err(PipelineError::NoBatchFiles(_))
        ));
    }
}
