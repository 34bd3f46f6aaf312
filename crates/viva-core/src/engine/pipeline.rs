use crate::errors::{InterviewError, Result};
use crate::lifecycle::LifecycleManager;
use crate::model::{
    EvaluationState, InterviewSession, Response, ResponseOutcome, ResponseResult, RunSummary,
    SessionStatus,
};
use crate::providers::transcription::Transcriber;
use crate::scoring::{Scorer, Verdict};
use crate::storage::EntityStore;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PipelinePolicy {
    pub parallel: usize,
    pub transcription_timeout: Duration,
    pub scoring_timeout: Duration,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            parallel: 4,
            transcription_timeout: Duration::from_secs(300),
            scoring_timeout: Duration::from_secs(60),
        }
    }
}

/// Sessions with a batch currently fanned out.
#[derive(Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<String>>>);

impl InFlight {
    fn claim(&self, session_id: &str) -> Result<Claim> {
        let mut active = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(session_id.to_string()) {
            return Err(InterviewError::EvaluationInProgress {
                session_id: session_id.to_string(),
            });
        }
        Ok(Claim {
            set: self.0.clone(),
            session_id: session_id.to_string(),
        })
    }
}

/// Released on drop, including when the run fails or its future is dropped.
struct Claim {
    set: Arc<Mutex<HashSet<String>>>,
    session_id: String,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.session_id);
    }
}

/// Transcribes and scores every Response of a completed session, then moves
/// the session to `evaluated`.
///
/// At most one run per session is in flight across this pipeline and its
/// clones; an overlapping call fails with
/// [`InterviewError::EvaluationInProgress`] before any adapter call.
#[derive(Clone)]
pub struct EvaluationPipeline {
    store: Arc<dyn EntityStore>,
    lifecycle: LifecycleManager,
    transcriber: Arc<dyn Transcriber>,
    scorer: Scorer,
    policy: PipelinePolicy,
    in_flight: InFlight,
}

impl EvaluationPipeline {
    pub fn new(
        lifecycle: LifecycleManager,
        transcriber: Arc<dyn Transcriber>,
        scorer: Scorer,
        policy: PipelinePolicy,
    ) -> Self {
        Self {
            store: lifecycle.store().clone(),
            lifecycle,
            transcriber,
            scorer,
            policy,
            in_flight: InFlight::default(),
        }
    }

    pub async fn run_evaluation(&self, session_id: &str) -> Result<RunSummary> {
        self.run(session_id, CancellationToken::new()).await
    }

    /// Evaluates a `completed` session. Per-Response failures are folded into
    /// the summary; the session reaches `evaluated` once every Response has
    /// resolved. A run in which cancellation interrupted at least one Response
    /// skips the final transition.
    pub async fn run(&self, session_id: &str, cancel: CancellationToken) -> Result<RunSummary> {
        let _claim = self.in_flight.claim(session_id)?;
        let session = self.load_ready(session_id, SessionStatus::Completed)?;
        let summary = self.process_batch(&session, &cancel).await?;
        self.finalize(session_id)?;
        tracing::info!(
            event = "viva.eval.finished",
            session_id = %session_id,
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
        );
        Ok(summary)
    }

    /// Reprocesses the unresolved Responses of an already `evaluated`
    /// session. The session status is left alone.
    pub async fn retry_unresolved(
        &self,
        session_id: &str,
        cancel: CancellationToken,
    ) -> Result<RunSummary> {
        let _claim = self.in_flight.claim(session_id)?;
        let session = self.load_ready(session_id, SessionStatus::Evaluated)?;
        let summary = self.process_batch(&session, &cancel).await?;
        tracing::info!(
            event = "viva.eval.retry_finished",
            session_id = %session_id,
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
        );
        Ok(summary)
    }

    fn load_ready(&self, session_id: &str, required: SessionStatus) -> Result<InterviewSession> {
        let session = self
            .store
            .find_session(session_id)?
            .ok_or_else(|| InterviewError::not_found("session", session_id))?;
        if session.status != required {
            return Err(InterviewError::SessionNotReady {
                session_id: session_id.to_string(),
                status: session.status,
            });
        }
        Ok(session)
    }

    async fn process_batch(
        &self,
        session: &InterviewSession,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        let responses = self.store.find_responses(&session.id)?;
        if responses.is_empty() {
            return Err(InterviewError::NoResponses {
                session_id: session.id.clone(),
            });
        }

        tracing::info!(
            event = "viva.eval.started",
            session_id = %session.id,
            responses = responses.len(),
            parallel = self.policy.parallel,
            scorer = self.scorer.provider_name(),
            transcriber = self.transcriber.engine_name(),
        );

        let sem = Arc::new(Semaphore::new(self.policy.parallel.max(1)));
        let mut handles = Vec::with_capacity(responses.len());

        for response in responses {
            let response_id = response.id.clone();
            let this = self.clone();
            let sem = sem.clone();
            let cancel = cancel.clone();
            let h = tokio::spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return None,
                    permit = sem.acquire_owned() => match permit {
                        Ok(p) => p,
                        Err(e) => return Some(ResponseOutcome::Failed { reason: e.to_string() }),
                    },
                };
                this.evaluate_response(response, &cancel).await
            });
            handles.push((response_id, h));
        }

        // Barrier: every chain resolves before anything else touches the session.
        let mut results = Vec::with_capacity(handles.len());
        let mut interrupted = 0usize;
        for (response_id, h) in handles {
            let outcome = match h.await {
                Ok(Some(outcome)) => outcome,
                Ok(None) => {
                    interrupted += 1;
                    continue;
                }
                Err(e) => ResponseOutcome::Failed {
                    reason: format!("task error: {}", e),
                },
            };
            results.push(ResponseResult {
                response_id,
                outcome,
            });
        }

        // A cancel that lands after every chain resolved interrupted nothing.
        if interrupted > 0 {
            tracing::warn!(
                event = "viva.eval.cancelled",
                session_id = %session.id,
                interrupted,
            );
            return Err(InterviewError::Cancelled);
        }

        Ok(RunSummary::from_results(&session.id, results))
    }

    /// `None` when cancellation interrupted the chain.
    async fn evaluate_response(
        &self,
        response: Response,
        cancel: &CancellationToken,
    ) -> Option<ResponseOutcome> {
        if response.evaluation.is_evaluated() {
            return Some(ResponseOutcome::AlreadyEvaluated);
        }

        let start = Instant::now();
        let outcome = match self.evaluate_pending(&response, cancel).await {
            Ok(outcome) => outcome,
            Err(InterviewError::Cancelled) => return None,
            Err(e) => ResponseOutcome::Failed {
                reason: e.to_string(),
            },
        };

        match &outcome {
            ResponseOutcome::Failed { reason } => tracing::warn!(
                event = "viva.eval.response_failed",
                response_id = %response.id,
                session_id = %response.session_id,
                reason = %reason,
            ),
            ResponseOutcome::Unresolved { reason } => tracing::warn!(
                event = "viva.eval.response_unresolved",
                response_id = %response.id,
                session_id = %response.session_id,
                reason = %reason,
            ),
            ResponseOutcome::Evaluated { score } => tracing::debug!(
                event = "viva.eval.response_evaluated",
                response_id = %response.id,
                score = score.get(),
                duration_ms = start.elapsed().as_millis() as u64,
            ),
            _ => {}
        }
        Some(outcome)
    }

    async fn evaluate_pending(
        &self,
        response: &Response,
        cancel: &CancellationToken,
    ) -> Result<ResponseOutcome> {
        let Some(question) = self.store.find_question(&response.question_id)? else {
            tracing::warn!(
                event = "viva.eval.question_missing",
                response_id = %response.id,
                question_id = %response.question_id,
            );
            return Ok(ResponseOutcome::MissingQuestion {
                question_id: response.question_id.clone(),
            });
        };

        // A transcript kept from an earlier unresolved run is reused.
        let (transcript, stored) = match &response.evaluation {
            EvaluationState::Transcribed { transcription } => (transcription.clone(), true),
            _ => {
                let text = bounded(
                    "transcription",
                    self.policy.transcription_timeout,
                    cancel,
                    self.transcriber.transcribe(&response.audio_path),
                )
                .await?;
                (text, false)
            }
        };

        let verdict = bounded(
            "scoring",
            self.policy.scoring_timeout,
            cancel,
            self.scorer.score(&question.text, &transcript),
        )
        .await?;

        match verdict {
            Verdict::Scored {
                score,
                justification,
            } => {
                let state = EvaluationState::Evaluated {
                    transcription: transcript,
                    score,
                    justification,
                };
                self.store.update_response_evaluation(&response.id, &state)?;
                Ok(ResponseOutcome::Evaluated { score })
            }
            Verdict::Unresolved { reason } => {
                if !stored {
                    let state = EvaluationState::Transcribed {
                        transcription: transcript,
                    };
                    self.store.update_response_evaluation(&response.id, &state)?;
                }
                Ok(ResponseOutcome::Unresolved { reason })
            }
        }
    }

    /// `completed -> evaluated`, with one re-read and retry if another writer
    /// got in between.
    fn finalize(&self, session_id: &str) -> Result<()> {
        match self.lifecycle.mark_evaluated(session_id) {
            Err(InterviewError::Conflict { .. }) => {
                let current = self
                    .store
                    .find_session(session_id)?
                    .ok_or_else(|| InterviewError::not_found("session", session_id))?;
                tracing::warn!(
                    event = "viva.eval.finalize_conflict",
                    session_id = %session_id,
                    observed = %current.status,
                );
                self.lifecycle.mark_evaluated(session_id)
            }
            other => other,
        }
    }
}

async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(InterviewError::Cancelled),
        r = timeout(limit, fut) => match r {
            Ok(r) => r,
            Err(_) => Err(InterviewError::Timeout {
                operation,
                after_ms: limit.as_millis() as u64,
            }),
        },
    }
}
