//! Work queue over the article store.
//!
//! The coordinator moves articles from `pending`/`failed` to a terminal state
//! in two modes:
//!
//! - **Drain**: batches of pending or failed articles are enriched in
//!   parallel behind a semaphore, each unit under its own timeout. Batches
//!   repeat until one comes back short. Articles already attempted during the
//!   current drain are not selected again, so a batch that fails entirely
//!   cannot keep the loop alive.
//! - **Backfill**: articles that are pending, failed, or missing enrichment
//!   fields are reset to pending and re-analyzed one at a time with a pause
//!   between items.
//!
//! A unit of work is scrape, then bias lookup, then analysis. Every unit
//! ends with the article persisted, whatever the outcome.

use crate::analyzer::Analyzer;
use crate::api::TextGenerator;
use crate::bias::BiasResolver;
use crate::config::QueueConfig;
use crate::models::{Article, ProcessingStatus};
use crate::scrapers::TextSource;
use crate::store::{ArticleQuery, ArticleStore};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{error, info, instrument, warn};

/// Text shorter than this is replaced by `headline + ". " + summary`.
pub const MIN_ANALYSIS_TEXT_CHARS: usize = 50;

/// Runtime queue tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    pub batch_size: usize,
    pub item_timeout: Duration,
    pub backfill_timeout: Duration,
    pub backfill_delay: Duration,
    pub backfill_window: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        (&QueueConfig::default()).into()
    }
}

/// Summary of one drain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub batches: usize,
    pub processed: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// True when another drain was already running and this one did nothing.
    pub skipped: bool,
}

/// Summary of one backfill pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub candidates: usize,
    pub processed: usize,
    pub failed: usize,
    pub timed_out: usize,
}

/// Result of persisting harvested drafts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnqueueReport {
    pub saved: usize,
    pub already_stored: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    Processed,
    Failed,
    TimedOut,
}

impl UnitOutcome {
    fn of(article: &Article) -> Self {
        match article.processing_status {
            ProcessingStatus::Processed => UnitOutcome::Processed,
            _ => UnitOutcome::Failed,
        }
    }
}

/// Clears the drain flag when the drain ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives articles through scraping and analysis.
pub struct QueueCoordinator<S, G, T> {
    store: Arc<S>,
    analyzer: Analyzer<G>,
    source: T,
    bias: BiasResolver,
    settings: QueueSettings,
    draining: AtomicBool,
}

impl<S, G, T> QueueCoordinator<S, G, T>
where
    S: ArticleStore + 'static,
    G: TextGenerator + 'static,
    T: TextSource + 'static,
{
    pub fn new(store: Arc<S>, analyzer: Analyzer<G>, source: T, settings: QueueSettings) -> Self {
        Self {
            store,
            analyzer,
            source,
            bias: BiasResolver::default(),
            settings,
            draining: AtomicBool::new(false),
        }
    }

    fn try_begin_drain(&self) -> Option<DrainGuard<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard(&self.draining))
    }

    /// Persist harvested drafts. URLs that already have a document keep it,
    /// so re-harvesting a story never discards its enrichment.
    #[instrument(level = "info", skip_all, fields(drafts = drafts.len()))]
    pub async fn enqueue(&self, drafts: &[Article]) -> EnqueueReport {
        let mut report = EnqueueReport::default();
        for draft in drafts {
            match self.store.get(&draft.url).await {
                Ok(Some(_)) => {
                    report.already_stored += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(url = %draft.url, error = %e, "Store lookup failed; skipping draft");
                    report.errors += 1;
                    continue;
                }
            }
            match self.store.save(draft).await {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    error!(url = %draft.url, error = %e, "Failed to persist draft");
                    report.errors += 1;
                }
            }
        }
        info!(
            saved = report.saved,
            already_stored = report.already_stored,
            errors = report.errors,
            "Harvested drafts persisted"
        );
        report
    }

    /// Scrape, look up the baseline bias and analyze one article.
    async fn enrich(&self, article: Article) -> Article {
        let text = self
            .source
            .article_text(&article.url, &article.summary)
            .await;
        let text = if text.trim().chars().count() < MIN_ANALYSIS_TEXT_CHARS {
            format!("{}. {}", article.headline, article.summary)
        } else {
            text
        };
        let baseline = self.bias.resolve(&article.url);
        self.analyzer.analyze(article, &text, baseline).await
    }

    /// Run one unit under `limit` and persist the result.
    async fn run_unit(&self, article: Article, limit: Duration) -> UnitOutcome {
        let t0 = Instant::now();
        let original = article.clone();

        let (finished, outcome) = match timeout(limit, self.enrich(article)).await {
            Ok(done) => {
                let outcome = UnitOutcome::of(&done);
                (done, outcome)
            }
            Err(_) => {
                warn!(
                    url = %original.url,
                    timeout_secs = limit.as_secs_f64(),
                    "Analysis timed out; marking failed"
                );
                let mut failed = original;
                failed.processing_status = ProcessingStatus::Failed;
                (failed, UnitOutcome::TimedOut)
            }
        };

        if let Err(e) = self.store.save(&finished).await {
            error!(url = %finished.url, error = %e, "Failed to persist article");
        }
        info!(
            url = %finished.url,
            status = ?finished.processing_status,
            elapsed_ms = t0.elapsed().as_millis(),
            "Unit finished"
        );
        outcome
    }

    /// Process pending and failed articles until a batch comes back short.
    ///
    /// At most `concurrency` units run at once. Returns immediately with
    /// `skipped = true` if a drain is already running on this coordinator.
    #[instrument(level = "info", skip_all, fields(concurrency = concurrency))]
    pub async fn drain(&self, concurrency: usize) -> DrainReport {
        let Some(_guard) = self.try_begin_drain() else {
            warn!("Drain already in progress; skipping trigger");
            return DrainReport {
                skipped: true,
                ..DrainReport::default()
            };
        };

        let t0 = Instant::now();
        let batch_size = self.settings.batch_size.max(1);
        let gate = Semaphore::new(concurrency.max(1));
        let mut attempted: HashSet<String> = HashSet::new();
        let mut report = DrainReport::default();

        loop {
            let query = ArticleQuery::new()
                .statuses(&[ProcessingStatus::Pending, ProcessingStatus::Failed])
                .limit(batch_size + attempted.len());
            let candidates = match self.store.query(&query).await {
                Ok(found) => found,
                Err(e) => {
                    error!(error = %e, "Could not select pending articles; ending drain");
                    break;
                }
            };

            let batch: Vec<Article> = candidates
                .into_iter()
                .filter(|a| !attempted.contains(&a.url))
                .take(batch_size)
                .collect();
            if batch.is_empty() {
                break;
            }

            report.batches += 1;
            let full = batch.len() == batch_size;
            attempted.extend(batch.iter().map(|a| a.url.clone()));
            info!(batch = report.batches, size = batch.len(), "Processing batch");

            let gate = &gate;
            let outcomes = join_all(batch.into_iter().map(|article| async move {
                let _permit = gate.acquire().await.ok();
                self.run_unit(article, self.settings.item_timeout).await
            }))
            .await;

            for outcome in outcomes {
                match outcome {
                    UnitOutcome::Processed => report.processed += 1,
                    UnitOutcome::Failed => report.failed += 1,
                    UnitOutcome::TimedOut => {
                        report.failed += 1;
                        report.timed_out += 1;
                    }
                }
            }

            if !full {
                break;
            }
        }

        info!(
            batches = report.batches,
            processed = report.processed,
            failed = report.failed,
            timed_out = report.timed_out,
            elapsed_ms = t0.elapsed().as_millis(),
            "Drain complete"
        );
        report
    }

    /// Run [`drain`](Self::drain) on a background task.
    pub fn spawn_drain(self: Arc<Self>, concurrency: usize) -> JoinHandle<DrainReport> {
        tokio::spawn(async move { self.drain(concurrency).await })
    }

    /// Articles a backfill pass would process, in processing order: every
    /// pending article, then, among the newest `backfill_window` articles,
    /// those not processed or missing enrichment.
    #[instrument(level = "info", skip_all, fields(limit = ?limit))]
    pub async fn backfill_candidates(&self, limit: Option<usize>) -> Vec<Article> {
        let pending_query = ArticleQuery::new().statuses(&[ProcessingStatus::Pending]);
        let mut candidates = self.store.query(&pending_query).await.unwrap_or_else(|e| {
            error!(error = %e, "Could not list pending articles");
            Vec::new()
        });

        let recent_query = ArticleQuery::new()
            .newest_first()
            .limit(self.settings.backfill_window);
        let recent = self.store.query(&recent_query).await.unwrap_or_else(|e| {
            error!(error = %e, "Could not list recent articles");
            Vec::new()
        });

        let mut seen: HashSet<String> = candidates.iter().map(|a| a.url.clone()).collect();
        for article in recent {
            if article.needs_backfill() && seen.insert(article.url.clone()) {
                candidates.push(article);
            }
        }

        if let Some(limit) = limit {
            candidates.truncate(limit);
        }
        info!(count = candidates.len(), "Backfill candidates selected");
        candidates
    }

    /// Re-analyze backfill candidates one at a time.
    #[instrument(level = "info", skip_all, fields(limit = ?limit))]
    pub async fn backfill(&self, limit: Option<usize>) -> BackfillReport {
        let candidates = self.backfill_candidates(limit).await;
        let mut report = BackfillReport {
            candidates: candidates.len(),
            ..BackfillReport::default()
        };

        for (i, mut article) in candidates.into_iter().enumerate() {
            if i > 0 {
                sleep(self.settings.backfill_delay).await;
            }

            article.processing_status = ProcessingStatus::Pending;
            if let Err(e) = self.store.save(&article).await {
                error!(url = %article.url, error = %e, "Failed to reset article to pending");
            }

            match self.run_unit(article, self.settings.backfill_timeout).await {
                UnitOutcome::Processed => report.processed += 1,
                UnitOutcome::Failed => report.failed += 1,
                UnitOutcome::TimedOut => {
                    report.failed += 1;
                    report.timed_out += 1;
                }
            }
        }

        info!(
            candidates = report.candidates,
            processed = report.processed,
            failed = report.failed,
            "Backfill complete"
        );
        report
    }
}
