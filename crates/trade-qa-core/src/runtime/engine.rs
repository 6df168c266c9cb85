// crates/trade-qa-core/src/runtime/engine.rs
// ============================================================================
// Module: Trade QA Engine
// Description: Concurrent test graph evaluation with a completeness barrier.
// Purpose: Turn one ticket and its platform data into a persisted run report.
// Dependencies: crate::{core, interfaces, runtime}, thiserror, tokio
// ============================================================================

//! ## Overview
//! A run proceeds in four phases:
//! 1. Validate the ticket. An invalid ticket is rejected before any result
//!    exists.
//! 2. Resolve applicability. Inapplicable tests are recorded as skipped.
//! 3. Evaluate applicable tests 1-15 concurrently on a semaphore-bounded
//!    pool, then evaluate the barrier test with every prior result in view.
//! 4. Aggregate, persist, and notify on a fail decision.
//!
//! Results are recorded by the single driving task, so no test slot is ever
//! written twice. Cancellation aborts in-flight tasks and marks every test
//! that is not yet terminal as a cancelled error; the report is then flagged
//! incomplete and carries no decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::sync::watch;
use tokio::task::Id as TaskId;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::core::Decision;
use crate::core::HashError;
use crate::core::InvalidTicket;
use crate::core::PlatformSnapshot;
use crate::core::RunReport;
use crate::core::RunStatus;
use crate::core::TestCatalog;
use crate::core::TestDefinition;
use crate::core::TestId;
use crate::core::TestResult;
use crate::core::Ticket;
use crate::core::TicketId;
use crate::core::TicketRecord;
use crate::core::Verdict;
use crate::core::report::DEFAULT_DECISION_THRESHOLD;
use crate::interfaces::EvaluationContext;
use crate::interfaces::EvaluationError;
use crate::interfaces::ExceptionNotifier;
use crate::interfaces::ReportStore;
use crate::interfaces::RunEvent;
use crate::interfaces::RunEventSink;
use crate::interfaces::StoreError;
use crate::runtime::events::NoopEventSink;
use crate::runtime::notify::NoopNotifier;
use crate::runtime::policy::Resolution;
use crate::runtime::policy::ResolutionScope;
use crate::runtime::policy::RetryPolicy;
use crate::runtime::policy::TimeoutPolicy;
use crate::runtime::registry::EvaluatorRegistry;
use crate::runtime::store::InMemoryReportStore;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default cap on concurrently evaluated tests.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Maximum tests evaluated at once.
    pub max_concurrency: usize,
    /// Execution success rate required for a pass decision.
    pub decision_threshold: f64,
    /// Per-attempt timeouts.
    pub timeouts: TimeoutPolicy,
    /// Timeout retry policy.
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            timeouts: TimeoutPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Run-level failures. Per-test failures never surface here.
#[derive(Debug, Error)]
pub enum RunError {
    /// Ticket failed validation; no test was attempted.
    #[error(transparent)]
    InvalidTicket(#[from] InvalidTicket),
    /// The report could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The report fingerprint could not be computed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Caller-side handle that stops a run.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    /// Shared cancellation flag.
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Engine-side view of a cancellation request.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    /// Cancellation flag receiver.
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Creates a linked handle and signal.
    #[must_use]
    pub fn new() -> (CancelHandle, Self) {
        let (sender, receiver) = watch::channel(false);
        (
            CancelHandle {
                sender: Arc::new(sender),
            },
            Self {
                receiver,
            },
        )
    }

    /// Creates a signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        Self::new().1
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes when cancellation is requested; pends forever otherwise.
    pub async fn cancelled(&mut self) {
        if self.receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Concurrent evaluator for the sixteen-test graph.
pub struct QaEngine {
    /// Test catalog.
    catalog: TestCatalog,
    /// Evaluators per test.
    registry: Arc<EvaluatorRegistry>,
    /// Engine configuration.
    config: EngineConfig,
    /// Exception notifier.
    notifier: Arc<dyn ExceptionNotifier>,
    /// Report persistence.
    store: Arc<dyn ReportStore>,
    /// Structured event sink.
    events: Arc<dyn RunEventSink>,
}

/// Outcome of a spawned test task.
struct TaskOutcome {
    /// Test identifier.
    test_id: TestId,
    /// Resolved outcome.
    resolution: Resolution,
    /// Evaluation wall time.
    duration_ms: u64,
}

/// Single-writer result table for one run.
struct ResultTable {
    /// Ticket under evaluation.
    ticket_id: TicketId,
    /// Run start instant.
    started: Instant,
    /// Results keyed by test id.
    results: BTreeMap<TestId, TestResult>,
    /// Last assigned completion sequence number.
    seq: u32,
    /// Sink receiving one event per recorded result.
    events: Arc<dyn RunEventSink>,
}

impl ResultTable {
    /// Creates an empty table anchored at `started`.
    const fn new(ticket_id: TicketId, started: Instant, events: Arc<dyn RunEventSink>) -> Self {
        Self {
            ticket_id,
            started,
            results: BTreeMap::new(),
            seq: 0,
            events,
        }
    }

    /// Records a terminal result; later writes to the same slot are ignored.
    fn record(
        &mut self,
        definition: &TestDefinition,
        verdict: Verdict,
        message: Option<String>,
        detail: ResultDetail,
    ) {
        if self.results.contains_key(&definition.id) {
            return;
        }
        self.seq = self.seq.saturating_add(1);
        let result = TestResult {
            test_id: definition.id,
            label: definition.label.to_string(),
            verdict,
            message,
            duration_ms: detail.duration_ms,
            attempts: detail.attempts,
            degraded: detail.degraded,
            error_kind: detail.error.map(|err| err.kind()),
            completion_seq: self.seq,
            finished_at_ms: millis(self.started.elapsed().as_millis()),
        };
        self.events.record(&RunEvent::test_finished(&self.ticket_id, &result));
        self.results.insert(definition.id, result);
    }

    /// Records a resolved evaluator outcome.
    fn record_resolution(
        &mut self,
        definition: &TestDefinition,
        resolution: Resolution,
        duration_ms: u64,
    ) {
        let Resolution {
            outcome,
            attempts,
            degraded,
        } = resolution;
        let detail = |error: Option<&EvaluationError>| ResultDetail {
            duration_ms,
            attempts,
            degraded,
            error: error.cloned(),
        };
        match outcome {
            Ok(check) => {
                let verdict = if check.passed { Verdict::Pass } else { Verdict::Fail };
                self.record(definition, verdict, check.message, detail(None))
            }
            Err(err) => {
                let message = Some(err.to_string());
                self.record(definition, Verdict::Error, message, detail(Some(&err)))
            }
        }
    }

    /// Returns true when the test already has a result.
    fn contains(&self, id: TestId) -> bool {
        self.results.contains_key(&id)
    }

    /// Returns the recorded results in test id order.
    fn snapshot(&self) -> Vec<TestResult> {
        self.results.values().cloned().collect()
    }
}

/// Execution detail accompanying a verdict.
struct ResultDetail {
    /// Evaluation wall time.
    duration_ms: u64,
    /// Evaluator attempts.
    attempts: u8,
    /// Fallback flag.
    degraded: bool,
    /// Error for error verdicts.
    error: Option<EvaluationError>,
}

impl ResultDetail {
    /// Detail for a test that never ran.
    const fn not_run(error: Option<EvaluationError>) -> Self {
        Self {
            duration_ms: 0,
            attempts: 0,
            degraded: false,
            error,
        }
    }
}

/// Converts milliseconds to `u64`, saturating.
fn millis(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

impl QaEngine {
    /// Creates an engine with the standard catalog and no-op collaborators.
    #[must_use]
    pub fn new(registry: EvaluatorRegistry, config: EngineConfig) -> Self {
        Self {
            catalog: TestCatalog::standard(),
            registry: Arc::new(registry),
            config,
            notifier: Arc::new(NoopNotifier),
            store: Arc::new(InMemoryReportStore::new()),
            events: Arc::new(NoopEventSink),
        }
    }

    /// Replaces the exception notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ExceptionNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces the report store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn RunEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the catalog in use.
    #[must_use]
    pub const fn catalog(&self) -> &TestCatalog {
        &self.catalog
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the report store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn ReportStore> {
        Arc::clone(&self.store)
    }

    /// Evaluates a ticket to completion.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when the ticket is invalid or the report cannot be
    /// fingerprinted or persisted.
    pub async fn evaluate(
        &self,
        record: &TicketRecord,
        snapshot: PlatformSnapshot,
    ) -> Result<RunReport, RunError> {
        self.evaluate_with_cancel(record, snapshot, CancelSignal::never()).await
    }

    /// Evaluates a ticket, stopping early when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when the ticket is invalid or the report cannot be
    /// fingerprinted or persisted.
    pub async fn evaluate_with_cancel(
        &self,
        record: &TicketRecord,
        snapshot: PlatformSnapshot,
        mut cancel: CancelSignal,
    ) -> Result<RunReport, RunError> {
        let ticket = Arc::new(Ticket::from_record(record)?);
        let snapshot = Arc::new(snapshot);
        let scope = ResolutionScope {
            ticket_id: ticket.ticket_id.clone(),
            timeouts: self.config.timeouts,
            retry: self.config.retry,
            events: Arc::clone(&self.events),
        };
        let mut table =
            ResultTable::new(ticket.ticket_id.clone(), Instant::now(), Arc::clone(&self.events));

        let (barrier, independent): (Vec<&TestDefinition>, Vec<&TestDefinition>) =
            self.catalog.iter().partition(|definition| definition.is_barrier());
        let mut applicable: Vec<&TestDefinition> = Vec::new();
        let mut skipped = Vec::new();
        for definition in independent {
            match definition.applicability.evaluate(&ticket) {
                Ok(()) => applicable.push(definition),
                Err(reason) => skipped.push((definition, reason)),
            }
        }
        let planned = applicable.len() + barrier.len();
        self.events.record(&RunEvent::run_started(&ticket.ticket_id, planned));
        for (definition, reason) in skipped {
            let message = Some(reason.to_string());
            table.record(definition, Verdict::Skipped, message, ResultDetail::not_run(None));
        }

        let mut cancelled = cancel.is_cancelled();
        if !cancelled {
            cancelled = self
                .run_independent(&applicable, &ticket, &snapshot, &scope, &mut table, &mut cancel)
                .await;
        }
        for definition in barrier {
            if cancelled {
                break;
            }
            match definition.applicability.evaluate(&ticket) {
                Err(reason) => {
                    let message = Some(reason.to_string());
                    let detail = ResultDetail::not_run(None);
                    table.record(definition, Verdict::Skipped, message, detail);
                }
                Ok(()) => {
                    let ctx = EvaluationContext {
                        ticket: Arc::clone(&ticket),
                        definition: definition.clone(),
                        snapshot: Arc::clone(&snapshot),
                        prior_results: table.snapshot(),
                    };
                    let started = Instant::now();
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => cancelled = true,
                        resolution = resolve(&self.registry, &scope, &ctx) => {
                            let duration_ms = millis(started.elapsed().as_millis());
                            table.record_resolution(definition, resolution, duration_ms);
                        }
                    }
                }
            }
        }

        let run_status = if cancelled {
            for definition in self.catalog.iter() {
                if !table.contains(definition.id) {
                    let error = EvaluationError::Cancelled;
                    let message = Some(error.to_string());
                    let detail = ResultDetail::not_run(Some(error));
                    table.record(definition, Verdict::Error, message, detail);
                }
            }
            RunStatus::Incomplete
        } else {
            RunStatus::Complete
        };

        self.finish(&ticket, run_status, table.snapshot())
    }

    /// Evaluates independent tests on the bounded pool.
    ///
    /// Returns true when the run was cancelled.
    async fn run_independent(
        &self,
        applicable: &[&TestDefinition],
        ticket: &Arc<Ticket>,
        snapshot: &Arc<PlatformSnapshot>,
        scope: &ResolutionScope,
        table: &mut ResultTable,
        cancel: &mut CancelSignal,
    ) -> bool {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        let mut spawned: HashMap<TaskId, TestId> = HashMap::new();
        for definition in applicable {
            let ctx = EvaluationContext {
                ticket: Arc::clone(ticket),
                definition: (*definition).clone(),
                snapshot: Arc::clone(snapshot),
                prior_results: Vec::new(),
            };
            let permits = Arc::clone(&permits);
            let registry = Arc::clone(&self.registry);
            let scope = scope.clone();
            let handle = tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let started = Instant::now();
                let resolution = resolve(&registry, &scope, &ctx).await;
                TaskOutcome {
                    test_id: ctx.definition.id,
                    resolution,
                    duration_ms: millis(started.elapsed().as_millis()),
                }
            });
            spawned.insert(handle.id(), definition.id);
        }

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tasks.shutdown().await;
                    return true;
                }
                joined = tasks.join_next_with_id() => match joined {
                    None => return false,
                    Some(Ok((_, outcome))) => {
                        let Some(definition) = self.catalog.get(outcome.test_id) else {
                            continue;
                        };
                        table.record_resolution(
                            definition,
                            outcome.resolution,
                            outcome.duration_ms,
                        );
                    }
                    Some(Err(err)) => {
                        let definition =
                            spawned.get(&err.id()).and_then(|test_id| self.catalog.get(*test_id));
                        if let Some(definition) = definition {
                            let error = EvaluationError::Failed(format!(
                                "evaluator task aborted: {err}"
                            ));
                            let message = Some(error.to_string());
                            let detail = ResultDetail::not_run(Some(error));
                            table.record(definition, Verdict::Error, message, detail);
                        }
                    }
                }
            }
        }
    }

    /// Aggregates, persists, and notifies.
    fn finish(
        &self,
        ticket: &Ticket,
        run_status: RunStatus,
        results: Vec<TestResult>,
    ) -> Result<RunReport, RunError> {
        let report = RunReport::assemble(
            ticket.ticket_id.clone(),
            run_status,
            results,
            self.config.decision_threshold,
            |test_id| {
                self.catalog
                    .get(test_id)
                    .map(|definition| definition.error_code.to_string())
                    .unwrap_or_default()
            },
        )?;
        if let Err(err) = self.store.save(&report) {
            self.events.record(&RunEvent::store_failed(&report.ticket_id, &err));
            return Err(RunError::Store(err));
        }
        if report.decision == Some(Decision::Fail)
            && let Some(notice) = &report.exception
            && let Err(err) = self.notifier.notify(notice)
        {
            self.events.record(&RunEvent::notification_failed(&report.ticket_id, &err));
        }
        self.events.record(&RunEvent::run_finished(&report));
        Ok(report)
    }
}

/// Resolves one test against the registry.
async fn resolve(
    registry: &EvaluatorRegistry,
    scope: &ResolutionScope,
    ctx: &EvaluationContext,
) -> Resolution {
    let id = ctx.definition.id;
    let Some(primary) = registry.primary(id) else {
        return Resolution {
            outcome: Err(EvaluationError::Failed(format!("no evaluator registered for test {id}"))),
            attempts: 0,
            degraded: false,
        };
    };
    let fallback = registry.fallback(id);
    scope.resolve(primary.as_ref(), fallback.as_deref(), ctx).await
}
