use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::error::AppError;
use common::storage::counts::CouponCountRepository;
use common::utils::config::{AppConfig, AppEnv};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cache::ValidationCache;
use crate::error::{LoadError, SourceError, SourceFailure};
use crate::extract::{self, PROMO_CODE_MAX_LEN, PROMO_CODE_MIN_LEN};
use crate::source::{self, SourceDescriptor};

/// Distinct codes accumulated before a batch is committed to the repository.
/// Amortizes one repository write over many extracted tokens.
const AGGREGATION_BATCH_SIZE: usize = 100_000;

/// Deadline for one source download, covering connect and body read.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const CACHE_CAPACITY: usize = 100_000;
const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// A code is valid once it has been seen in at least this many sources.
const MIN_SOURCES_FOR_VALID: u32 = 2;

const VALID_MESSAGE: &str = "Promo code is valid.";
const NOT_FOUND_MESSAGE: &str = "Promo code not found in at least two files.";

fn length_message() -> String {
    format!(
        "Promo code must be between {PROMO_CODE_MIN_LEN} and {PROMO_CODE_MAX_LEN} characters long."
    )
}

/// Verdict of a single validation request. The message texts are part of the
/// external contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub message: String,
}

impl Validation {
    fn from_valid(valid: bool) -> Self {
        if valid {
            Self {
                valid: true,
                message: VALID_MESSAGE.to_string(),
            }
        } else {
            Self {
                valid: false,
                message: NOT_FOUND_MESSAGE.to_string(),
            }
        }
    }
}

/// The promo-code validation engine.
///
/// Owns the count repository, the lookup cache and the ingestion lifecycle.
/// Construct once at process start, call [`PromoEngine::load`] to ingest the
/// configured sources, then serve [`PromoEngine::validate`] from the request
/// path. [`PromoEngine::close`] releases the cache and backend resources;
/// every call afterwards fails with [`AppError::EngineClosed`].
pub struct PromoEngine {
    repository: Arc<dyn CouponCountRepository>,
    cache: ValidationCache,
    sources: Vec<SourceDescriptor>,
    local_coupon_dir: PathBuf,
    app_env: AppEnv,
    max_decompressed_bytes: u64,
    aggregation_batch_size: usize,
    http: reqwest::Client,
    closed: AtomicBool,
}

impl PromoEngine {
    /// Build an engine over the source list from configuration
    /// (`coupon_file_urls` carries any override of the baked-in list).
    pub fn new(
        config: &AppConfig,
        repository: Arc<dyn CouponCountRepository>,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;

        Ok(Self {
            repository,
            cache: ValidationCache::new(CACHE_CAPACITY, CACHE_TTL),
            sources: SourceDescriptor::from_urls(&config.coupon_file_urls),
            local_coupon_dir: PathBuf::from(&config.local_coupon_dir),
            app_env: config.app_env.clone(),
            max_decompressed_bytes: config.max_decompressed_bytes(),
            aggregation_batch_size: AGGREGATION_BATCH_SIZE,
            http,
            closed: AtomicBool::new(false),
        })
    }

    #[cfg(test)]
    fn with_aggregation_batch_size(mut self, batch_size: usize) -> Self {
        self.aggregation_batch_size = batch_size;
        self
    }

    fn ensure_open(&self) -> Result<(), AppError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::EngineClosed);
        }
        Ok(())
    }

    /// Run one full ingestion pass: reset the repository, extract every
    /// configured source concurrently and aggregate the per-source token sets
    /// into batched counts.
    ///
    /// Per-source failures do not abort the pass; the sources that succeeded
    /// are fully counted and the failures come back joined in
    /// [`LoadError::Sources`]. A repository write failure aborts the pass.
    /// The lookup cache is invalidated on every path out of this function.
    #[tracing::instrument(skip_all, fields(sources = self.sources.len()))]
    pub async fn load(&self) -> Result<(), LoadError> {
        self.ensure_open().map_err(|_| LoadError::Closed)?;
        info!("Starting to load promo codes from sources");

        let result = self.run_ingestion_pass().await;
        self.cache.clear().await;

        match &result {
            Ok(()) => info!("Finished loading promo codes"),
            Err(LoadError::Sources { failures, total }) => {
                for failure in failures {
                    warn!(%failure, "Coupon source failed during ingestion");
                }
                warn!(
                    failed = failures.len(),
                    total, "Finished loading promo codes with source failures"
                );
            }
            Err(err) => error!(%err, "Ingestion pass aborted"),
        }

        result
    }

    async fn run_ingestion_pass(&self) -> Result<(), LoadError> {
        self.repository.reset().await.map_err(LoadError::Repository)?;

        let total = self.sources.len();
        let channel_capacity = total.max(1);
        let (results_tx, mut results_rx) = mpsc::channel::<HashSet<String>>(channel_capacity);
        let (errors_tx, mut errors_rx) = mpsc::channel::<SourceFailure>(channel_capacity);

        let mut workers = Vec::with_capacity(total);
        for descriptor in self.sources.clone() {
            let results = results_tx.clone();
            let errors = errors_tx.clone();
            let local_coupon_dir = self.local_coupon_dir.clone();
            let app_env = self.app_env.clone();
            let client = self.http.clone();
            let cap = self.max_decompressed_bytes;

            let origin = descriptor.url.clone();
            let index = descriptor.index;
            workers.push((
                index,
                origin.clone(),
                tokio::spawn(async move {
                    match process_source(descriptor, local_coupon_dir, app_env, client, cap).await
                    {
                        Ok(tokens) => {
                            let _ = results.send(tokens).await;
                        }
                        Err(err) => {
                            let _ = errors
                                .send(SourceFailure {
                                    index,
                                    origin,
                                    error: err,
                                })
                                .await;
                        }
                    }
                }),
            ));
        }
        drop(results_tx);
        drop(errors_tx);

        // Drain concurrently with the workers. The coordinator is the only
        // writer into the running batch and the only caller of
        // bulk_increment during the pass.
        let mut current: HashMap<String, u32> = HashMap::new();
        let mut aggregated: u64 = 0;
        while let Some(tokens) = results_rx.recv().await {
            for code in tokens {
                *current.entry(code).or_insert(0) += 1;
                aggregated += 1;

                if current.len() >= self.aggregation_batch_size {
                    let batch = std::mem::take(&mut current);
                    debug!(
                        batch = batch.len(),
                        aggregated, "Committing aggregation batch to repository"
                    );
                    self.repository
                        .bulk_increment(batch)
                        .await
                        .map_err(LoadError::Repository)?;
                }
            }
        }
        if !current.is_empty() {
            debug!(
                batch = current.len(),
                aggregated, "Committing final aggregation batch to repository"
            );
            self.repository
                .bulk_increment(std::mem::take(&mut current))
                .await
                .map_err(LoadError::Repository)?;
        }

        let mut failures = Vec::new();
        while let Some(failure) = errors_rx.recv().await {
            failures.push(failure);
        }
        for (index, origin, worker) in workers {
            if let Err(join_error) = worker.await {
                failures.push(SourceFailure {
                    index,
                    origin,
                    error: SourceError::Task(join_error),
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            failures.sort_by_key(|failure| failure.index);
            Err(LoadError::Sources { failures, total })
        }
    }

    /// Decide whether a code is a valid promo code.
    ///
    /// Never an error for user input: out-of-window and unknown codes come
    /// back as `valid: false` with the contractual message.
    pub async fn validate(&self, code: &str) -> Result<Validation, AppError> {
        self.ensure_open()?;

        if !(PROMO_CODE_MIN_LEN..=PROMO_CODE_MAX_LEN).contains(&code.len()) {
            return Ok(Validation {
                valid: false,
                message: length_message(),
            });
        }

        if let Some(valid) = self.cache.get(code).await {
            return Ok(Validation::from_valid(valid));
        }

        let count = self.repository.get(code).await?.unwrap_or(0);
        let verdict = Validation::from_valid(count >= MIN_SOURCES_FOR_VALID);
        self.cache.insert(code, verdict.valid).await;

        Ok(verdict)
    }

    /// Copy of the full count table, for operator inspection.
    pub async fn counts_snapshot(&self) -> Result<HashMap<String, u32>, AppError> {
        self.ensure_open()?;
        self.repository.snapshot().await
    }

    /// Cheap backend reachability check for readiness probes. Bypasses the
    /// lookup cache so a dead backend is noticed.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.ensure_open()?;
        self.repository.get("READYPROBE").await.map(|_| ())
    }

    /// Release the lookup cache and backend resources. Idempotent; every
    /// other call made after this one fails with [`AppError::EngineClosed`].
    pub async fn close(&self) -> Result<(), AppError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Closing promo engine");
        self.cache.clear().await;
        self.repository.close().await
    }
}

/// One source worker: resolve the compressed bytes (C1), then run the
/// blocking decompress-and-scan stage (C2/C3) off the async runtime.
async fn process_source(
    descriptor: SourceDescriptor,
    local_coupon_dir: PathBuf,
    app_env: AppEnv,
    client: reqwest::Client,
    max_decompressed_bytes: u64,
) -> Result<HashSet<String>, SourceError> {
    info!(
        source = descriptor.index + 1,
        url = %descriptor.url,
        "Processing coupon source"
    );

    let input = source::acquire(&descriptor, &local_coupon_dir, &app_env, &client).await?;

    let tokens = tokio::task::spawn_blocking(move || {
        let file = input.open()?;
        extract::extract_distinct_tokens(file, max_decompressed_bytes)
    })
    .await??;

    info!(
        source = descriptor.index + 1,
        tokens = tokens.len(),
        "Extracted distinct candidate codes"
    );
    Ok(tokens)
}
