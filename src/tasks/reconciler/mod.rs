//! Drives every pending code judge record one step closer to a terminal
//! state and announces records that got there.
//!
//! One [`Reconciler::tick`] loads the due NEW/SUBMITTED records, advances each
//! of them concurrently, then sweeps terminal records whose announcement was
//! never confirmed. A record is only ever changed through a conditional store
//! update; the local copy used for announcing is built after that update
//! succeeded.

mod backoff;
pub(crate) mod leader;


use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use time::PrimitiveDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::config::ReconcilerSettings;
use crate::core::time::{after, primitive_now_utc};
use crate::db::models::CodeJudge;
use crate::db::types::CodeJudgeStatus;
use crate::services::announcer::{CompletionEvent, EventPublisher};
use crate::services::judge0::{EngineError, GradingEngine, JudgeJob, JudgeResult};
use crate::services::submission_store::{StoreError, SubmissionStore};

pub(crate) use backoff::SubmitBackoff;

#[derive(Debug, Clone)]
pub(crate) struct ReconcilerConfig {
    pub(crate) batch_size: u32,
    pub(crate) concurrency: usize,
    pub(crate) max_submit_attempts: u32,
    pub(crate) backoff: SubmitBackoff,
}

impl ReconcilerConfig {
    pub(crate) fn from_settings(settings: &ReconcilerSettings) -> Self {
        Self {
            batch_size: settings.batch_size.max(1),
            concurrency: settings.concurrency.max(1),
            max_submit_attempts: settings.max_submit_attempts.max(1),
            backoff: SubmitBackoff::from_settings(settings),
        }
    }
}

/// Counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TickReport {
    pub(crate) loaded: usize,
    pub(crate) submitted: usize,
    pub(crate) submit_deferred: usize,
    pub(crate) abandoned: usize,
    pub(crate) running: usize,
    pub(crate) completed: usize,
    pub(crate) poll_failed: usize,
    pub(crate) conflicts: usize,
    pub(crate) store_failures: usize,
    pub(crate) announced: usize,
    pub(crate) announce_failures: usize,
}

/// What happened to one record this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    Submitted,
    SubmitDeferred,
    Abandoned(Delivery),
    Running,
    Completed(Delivery),
    PollFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Confirmed,
    Pending,
}

impl TickReport {
    fn record(&mut self, advance: Advance) {
        match advance {
            Advance::Submitted => self.submitted += 1,
            Advance::SubmitDeferred => self.submit_deferred += 1,
            Advance::Abandoned(delivery) => {
                self.abandoned += 1;
                self.delivery(delivery);
            }
            Advance::Running => self.running += 1,
            Advance::Completed(delivery) => {
                self.completed += 1;
                self.delivery(delivery);
            }
            Advance::PollFailed => self.poll_failed += 1,
        }
    }

    fn delivery(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Confirmed => self.announced += 1,
            Delivery::Pending => self.announce_failures += 1,
        }
    }

    fn store_error(&mut self, err: &StoreError) {
        match err {
            StoreError::NoRowsAffected { .. } => self.conflicts += 1,
            _ => self.store_failures += 1,
        }
    }
}

#[derive(Clone)]
pub(crate) struct Reconciler {
    store: Arc<dyn SubmissionStore>,
    engine: Arc<dyn GradingEngine>,
    publisher: Arc<dyn EventPublisher>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub(crate) fn new(
        store: Arc<dyn SubmissionStore>,
        engine: Arc<dyn GradingEngine>,
        publisher: Arc<dyn EventPublisher>,
        config: ReconcilerConfig,
    ) -> Self {
        Self { store, engine, publisher, config }
    }

    pub(crate) async fn tick(&self) -> Result<TickReport, StoreError> {
        self.tick_at(primitive_now_utc()).await
    }

    /// Runs one cycle as of `now`. Fails only when the pending set cannot be
    /// loaded; per-record failures are counted and retried next cycle.
    pub(crate) async fn tick_at(&self, now: PrimitiveDateTime) -> Result<TickReport, StoreError> {
        let started = Instant::now();
        let result = self.run_cycle(now).await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!("reconciler_ticks_total", "outcome" => outcome).increment(1);
        metrics::histogram!("reconciler_tick_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(report) if report.loaded > 0 || report.announced > 0 => {
                tracing::info!(
                    loaded = report.loaded,
                    submitted = report.submitted,
                    submit_deferred = report.submit_deferred,
                    running = report.running,
                    poll_failed = report.poll_failed,
                    completed = report.completed,
                    abandoned = report.abandoned,
                    announced = report.announced,
                    announce_failures = report.announce_failures,
                    conflicts = report.conflicts,
                    store_failures = report.store_failures,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Reconciler cycle finished"
                );
            }
            Ok(_) => tracing::debug!("Reconciler cycle found nothing to do"),
            Err(err) => tracing::error!(error = %err, "Failed to load pending code judges"),
        }

        result
    }

    async fn run_cycle(&self, now: PrimitiveDateTime) -> Result<TickReport, StoreError> {
        let records = self.store.load_pending(now, self.config.batch_size).await?;
        let mut report = TickReport { loaded: records.len(), ..TickReport::default() };
        // Records touched this cycle are not re-announced by the sweep below.
        let handled: HashSet<String> = records.iter().map(|record| record.id.clone()).collect();

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        for record in records {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let this = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let id = record.id.clone();
                (id, this.advance(record, now).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(advance))) => report.record(advance),
                Ok((id, Err(err))) => {
                    report.store_error(&err);
                    log_store_error(&id, &err);
                }
                Err(err) => {
                    report.store_failures += 1;
                    tracing::error!(error = %err, "Reconciler task join failed");
                }
            }
        }

        self.sweep_unannounced(&handled, &mut report).await;
        Ok(report)
    }

    async fn advance(&self, record: CodeJudge, now: PrimitiveDateTime) -> Result<Advance, StoreError> {
        match record.status {
            CodeJudgeStatus::New => self.submit(record, now).await,
            CodeJudgeStatus::Submitted => self.poll(record).await,
            CodeJudgeStatus::Done | CodeJudgeStatus::Failed => {
                tracing::warn!(
                    code_judge_id = %record.id,
                    status = %record.status,
                    "Terminal record returned as pending"
                );
                Ok(Advance::Running)
            }
        }
    }

    async fn submit(&self, record: CodeJudge, now: PrimitiveDateTime) -> Result<Advance, StoreError> {
        let job = JudgeJob::from_record(&record);
        match self.engine.submit(&job).await {
            Ok(token) => {
                metrics::counter!("judge_submit_total", "outcome" => "ok").increment(1);
                self.store.update_token(&record.id, &token).await?;
                metrics::counter!("code_judge_transitions_total", "to" => "SUBMITTED")
                    .increment(1);
                tracing::info!(
                    code_judge_id = %record.id,
                    submission_id = record.submission_id,
                    token = %token,
                    "Code judge submitted to grading engine"
                );
                Ok(Advance::Submitted)
            }
            Err(err) => {
                metrics::counter!("judge_submit_total", "outcome" => err.kind()).increment(1);
                self.submit_failed(record, now, &err).await
            }
        }
    }

    async fn submit_failed(
        &self,
        mut record: CodeJudge,
        now: PrimitiveDateTime,
        err: &EngineError,
    ) -> Result<Advance, StoreError> {
        let attempt = u32::try_from(record.submit_attempts).unwrap_or(0).saturating_add(1);
        let message = err.to_string();
        let delay = self.config.backoff.delay(attempt);
        let next_attempt_at = after(now, delay);

        log_engine_error(&record.id, "submit", err, attempt);
        self.store.record_submit_failure(&record.id, &message, next_attempt_at).await?;

        if attempt < self.config.max_submit_attempts {
            tracing::debug!(
                code_judge_id = %record.id,
                attempt,
                retry_in_secs = delay.as_secs(),
                "Submit deferred"
            );
            return Ok(Advance::SubmitDeferred);
        }

        self.store.update_status(&record.id, CodeJudgeStatus::Failed).await?;
        metrics::counter!("code_judge_transitions_total", "to" => "FAILED").increment(1);
        tracing::warn!(
            code_judge_id = %record.id,
            submission_id = record.submission_id,
            attempts = attempt,
            error = %message,
            "Giving up on code judge after repeated submit failures"
        );

        record.status = CodeJudgeStatus::Failed;
        record.submit_attempts = i32::try_from(attempt).unwrap_or(i32::MAX);
        record.last_error = Some(message);
        Ok(Advance::Abandoned(self.announce(&record).await?))
    }

    async fn poll(&self, mut record: CodeJudge) -> Result<Advance, StoreError> {
        let Some(token) = record.token.clone() else {
            tracing::error!(code_judge_id = %record.id, "Submitted code judge has no token");
            return Ok(Advance::PollFailed);
        };

        let result = match self.engine.poll(&token).await {
            Ok(result) => result,
            Err(err) => {
                metrics::counter!("judge_poll_total", "outcome" => err.kind()).increment(1);
                log_engine_error(&record.id, "poll", &err, 0);
                return Ok(Advance::PollFailed);
            }
        };

        let verdict = result.verdict;
        metrics::counter!("judge_poll_total", "outcome" => verdict.as_str()).increment(1);
        if !verdict.is_terminal() {
            tracing::debug!(code_judge_id = %record.id, token = %token, "Grading still running");
            return Ok(Advance::Running);
        }

        self.store.update_result(&record.id, &result).await?;
        metrics::counter!("code_judge_transitions_total", "to" => "DONE").increment(1);
        tracing::info!(
            code_judge_id = %record.id,
            submission_id = record.submission_id,
            verdict = verdict.as_str(),
            description = %result.description,
            "Code judge graded"
        );

        apply_result(&mut record, &result);
        Ok(Advance::Completed(self.announce(&record).await?))
    }

    /// Publishes the completion event, then confirms it on the record. A
    /// failed publish leaves the record for the next sweep.
    async fn announce(&self, record: &CodeJudge) -> Result<Delivery, StoreError> {
        let event = match CompletionEvent::from_record(record) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(code_judge_id = %record.id, error = %err, "Cannot build announcement");
                return Ok(Delivery::Pending);
            }
        };

        if let Err(err) = self.publisher.publish(&event).await {
            metrics::counter!("announcements_total", "outcome" => "failed").increment(1);
            tracing::warn!(
                code_judge_id = %record.id,
                error = %err,
                "Failed to announce completion, will retry"
            );
            return Ok(Delivery::Pending);
        }

        metrics::counter!("announcements_total", "outcome" => "published").increment(1);
        self.store.mark_announced(&record.id).await?;
        Ok(Delivery::Confirmed)
    }

    async fn sweep_unannounced(&self, handled: &HashSet<String>, report: &mut TickReport) {
        let records = match self.store.load_unannounced(self.config.batch_size).await {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(error = %err, "Failed to load unannounced code judges");
                return;
            }
        };

        for record in records.iter().filter(|record| !handled.contains(&record.id)) {
            match self.announce(record).await {
                Ok(delivery) => report.delivery(delivery),
                Err(err) => {
                    report.store_error(&err);
                    log_store_error(&record.id, &err);
                }
            }
        }
    }
}

fn apply_result(record: &mut CodeJudge, result: &JudgeResult) {
    record.status = CodeJudgeStatus::Done;
    record.result_code = Some(result.result_code());
    record.result_message = Some(result.description.clone());
    record.test_output = result.output().map(ToString::to_string);
}

fn log_engine_error(id: &str, operation: &'static str, err: &EngineError, attempt: u32) {
    if err.is_structural() {
        tracing::warn!(
            code_judge_id = %id,
            operation,
            kind = err.kind(),
            attempt,
            error = %err,
            "Grading engine broke its response contract"
        );
    } else {
        tracing::warn!(
            code_judge_id = %id,
            operation,
            kind = err.kind(),
            attempt,
            error = %err,
            "Grading engine call failed"
        );
    }
}

fn log_store_error(id: &str, err: &StoreError) {
    match err {
        StoreError::NoRowsAffected { operation, .. } => {
            metrics::counter!("store_conflicts_total", "operation" => *operation).increment(1);
            tracing::error!(
                code_judge_id = %id,
                operation = *operation,
                "Conditional update matched no row, skipping record"
            );
        }
        _ => tracing::error!(code_judge_id = %id, error = %err, "Failed to persist code judge"),
    }
}
