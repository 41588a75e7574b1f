//! Strategy executor

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use strategy_builder::{Interaction, SelectorStrategy, Step, StepKind, Strategy, Target};
use testpilot_core_types::RunId;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::driver::{BrowserDriver, BrowserSession, ElementHandle};
use crate::errors::{DriverError, ExecutionError};
use crate::strategies::StepRetryPolicy;
use crate::types::{ExecutionSettings, ExecutionTrace, SessionPhase, StepError, StepResult};

/// Drives one browser session through a strategy, one step at a time.
pub struct AutomationExecutor {
    driver: Arc<dyn BrowserDriver>,
    artifacts: ArtifactStore,
}

/// What a step produced before the result is finalised.
#[derive(Debug, Default)]
struct StepOk {
    selector_used: Option<String>,
    artifact: Option<std::path::PathBuf>,
    notes: Vec<String>,
}

#[derive(Debug)]
struct StepFailed {
    error: StepError,
    selector_used: Option<String>,
}

impl From<DriverError> for StepFailed {
    fn from(err: DriverError) -> Self {
        StepFailed {
            error: StepError::Failed(err.to_string()),
            selector_used: None,
        }
    }
}

impl StepFailed {
    fn message(message: impl Into<String>) -> Self {
        StepFailed {
            error: StepError::Failed(message.into()),
            selector_used: None,
        }
    }
}

/// Per-run mutable state shared by the step loop.
struct RunState<'a> {
    run_id: &'a RunId,
    settings: &'a ExecutionSettings,
    retry: StepRetryPolicy,
    handles: HashMap<String, (Target, ElementHandle)>,
    attempts: u32,
}

impl AutomationExecutor {
    pub fn new(driver: Arc<dyn BrowserDriver>, artifacts: ArtifactStore) -> Self {
        Self { driver, artifacts }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Execute every step of `strategy`. Always returns one result per
    /// step, in order, and always closes the session it opened.
    pub async fn execute(
        &self,
        run_id: &RunId,
        strategy: &Strategy,
        settings: &ExecutionSettings,
        cancel: &CancellationToken,
    ) -> ExecutionTrace {
        let mut phase = SessionPhase::Idle;
        info!(
            run_id = %run_id,
            driver = self.driver.name(),
            steps = strategy.steps.len(),
            "Executing strategy for {}", strategy.platform
        );

        if cancel.is_cancelled() {
            return ExecutionTrace {
                run_id: run_id.clone(),
                step_results: skip_all(&strategy.steps, StepError::Cancelled),
                session_error: None,
                cancelled: true,
                final_phase: phase,
            };
        }

        let session = match self.driver.open_session(settings).await {
            Ok(session) => session,
            Err(err) => {
                warn!(run_id = %run_id, error = %err, "browser session unavailable");
                let error = ExecutionError::SessionUnavailable(err.clone());
                return ExecutionTrace {
                    run_id: run_id.clone(),
                    step_results: skip_all(
                        &strategy.steps,
                        StepError::SessionUnavailable(err.to_string()),
                    ),
                    session_error: Some(error.to_string()),
                    cancelled: false,
                    final_phase: phase,
                };
            }
        };
        transition(&mut phase, SessionPhase::SessionOpen);

        let mut guard = SessionGuard::new(session);
        let mut results = Vec::with_capacity(strategy.steps.len());
        let run = match guard.session_mut() {
            Some(session) => {
                AssertUnwindSafe(self.run_steps(
                    session,
                    run_id,
                    strategy,
                    settings,
                    cancel,
                    &mut results,
                    &mut phase,
                ))
                .catch_unwind()
                .await
            }
            None => Ok(()),
        };

        let mut session_error = None;
        if let Err(panic) = run {
            let message = panic_message(panic);
            warn!(run_id = %run_id, "step execution faulted: {}", message);
            let fault = ExecutionError::Fault(message);
            let mut remaining = strategy.steps[results.len()..].iter();
            // The step that was running when the fault hit counts as attempted.
            if let Some(step) = remaining.next() {
                let mut faulted =
                    StepResult::new(step).with_error(StepError::Failed(fault.to_string()));
                faulted.attempts = 1;
                results.push(faulted);
            }
            let reason = StepError::Failed(fault.to_string());
            results.extend(remaining.map(|step| StepResult::skipped(step, reason.clone())));
            session_error = Some(fault.to_string());
        }

        guard.close(run_id).await;
        transition(&mut phase, SessionPhase::SessionClosed);

        let cancelled = cancel.is_cancelled();
        info!(
            run_id = %run_id,
            succeeded = results.iter().filter(|r| r.succeeded()).count(),
            total = results.len(),
            cancelled,
            "Strategy execution finished"
        );

        ExecutionTrace {
            run_id: run_id.clone(),
            step_results: results,
            session_error,
            cancelled,
            final_phase: phase,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_steps(
        &self,
        session: &mut dyn BrowserSession,
        run_id: &RunId,
        strategy: &Strategy,
        settings: &ExecutionSettings,
        cancel: &CancellationToken,
        results: &mut Vec<StepResult>,
        phase: &mut SessionPhase,
    ) {
        let mut state = RunState {
            run_id,
            settings,
            retry: StepRetryPolicy::from_settings(settings),
            handles: HashMap::new(),
            attempts: 0,
        };

        for step in &strategy.steps {
            if cancel.is_cancelled() {
                debug!(step_id = %step.id, "run cancelled before step");
                results.push(StepResult::skipped(step, StepError::Cancelled));
                continue;
            }

            if let Some(dep) = &step.depends_on {
                let satisfied = results
                    .iter()
                    .find(|r| &r.step_id == dep)
                    .is_some_and(StepResult::succeeded);
                if !satisfied {
                    debug!(step_id = %step.id, depends_on = %dep, "prerequisite failed; skipping");
                    results.push(StepResult::skipped(
                        step,
                        StepError::SkippedDependency(dep.clone()),
                    ));
                    continue;
                }
            }

            transition(phase, SessionPhase::StepRunning);
            let mut result = self.run_step(session, step, &mut state).await;
            transition(phase, SessionPhase::StepDone);

            if cancel.is_cancelled() {
                result = result.with_skip(StepError::Cancelled);
            } else if settings.screenshot_each_step && !step.is_screenshot() {
                result = self.capture_after(session, step, result, &state).await;
            }
            results.push(result);
        }
    }

    async fn run_step(
        &self,
        session: &mut dyn BrowserSession,
        step: &Step,
        state: &mut RunState<'_>,
    ) -> StepResult {
        let started = Instant::now();
        let bound = state.settings.timeout_for(step);
        state.attempts = 0;
        debug!(step_id = %step.id, kind = step.kind.as_str(), "Running step: {}", step.description);

        let outcome = timeout(bound, self.perform(session, step, state)).await;
        let result = StepResult::new(step);
        let attempts = state.attempts.max(1);
        let result = match outcome {
            Ok(Ok(ok)) => {
                let mut result = result.with_success();
                if let Some(selector) = ok.selector_used {
                    result = result.with_element(selector);
                }
                if let Some(path) = ok.artifact {
                    result = result.with_artifact(path);
                }
                for note in ok.notes {
                    result = result.with_note(note);
                }
                result
            }
            Ok(Err(failed)) => {
                warn!(step_id = %step.id, error = %failed.error, "step failed");
                let mut result = result.with_error(failed.error);
                result.selector_used = failed.selector_used;
                result
            }
            Err(_) => {
                warn!(step_id = %step.id, bound_ms = bound.as_millis() as u64, "step timed out");
                state.handles.remove(&step.id);
                result.with_error(StepError::Timeout {
                    after_ms: bound.as_millis() as u64,
                    action: step.description.clone(),
                })
            }
        };
        let mut result = result.finish(started.elapsed());
        result.attempts = attempts;
        result
    }

    async fn perform(
        &self,
        session: &mut dyn BrowserSession,
        step: &Step,
        state: &mut RunState<'_>,
    ) -> Result<StepOk, StepFailed> {
        match step.kind {
            StepKind::Navigate => {
                let url = page_target(step, SelectorStrategy::Url)?;
                state.attempts += 1;
                session.navigate(url).await.map_err(|err| driver_failure(err, step))?;
                Ok(StepOk::default())
            }
            StepKind::LocateElement => {
                let target = element_target(step)?;
                let (handle, selector_used) = locate(session, target, state).await?;
                state
                    .handles
                    .insert(step.id.clone(), (target.clone(), handle));
                Ok(StepOk {
                    selector_used: Some(selector_used),
                    ..StepOk::default()
                })
            }
            StepKind::Interact => self.interact(session, step, state).await,
            StepKind::Assert => assert_step(session, step, state).await,
            StepKind::CaptureScreenshot => {
                state.attempts += 1;
                let mut ok = StepOk::default();
                match self.capture(session, step, state.run_id).await {
                    Ok(path) => ok.artifact = Some(path),
                    Err(note) => ok.notes.push(note),
                }
                Ok(ok)
            }
        }
    }

    async fn interact(
        &self,
        session: &mut dyn BrowserSession,
        step: &Step,
        state: &mut RunState<'_>,
    ) -> Result<StepOk, StepFailed> {
        let interaction = step.params.interaction.unwrap_or(Interaction::Click);
        if interaction == Interaction::Scroll {
            state.attempts += 1;
            session.scroll().await.map_err(|err| driver_failure(err, step))?;
            return Ok(StepOk::default());
        }

        let target = element_target(step)?;
        let text = match interaction {
            Interaction::Type => Some(step.params.text.as_deref().ok_or_else(|| {
                StepFailed::message("type interaction requires text")
            })?),
            _ => None,
        };

        let mut cached = step
            .depends_on
            .as_ref()
            .and_then(|dep| state.handles.get(dep))
            .filter(|(located, _)| located == target)
            .map(|(_, handle)| handle.clone());
        let mut selector_used = cached.as_ref().map(|_| target.selector.describe());

        loop {
            let handle = match cached.take() {
                Some(handle) => handle,
                None => {
                    let (handle, used) = locate(session, target, state).await?;
                    selector_used = Some(used);
                    handle
                }
            };
            state.attempts += 1;
            let result = match interaction {
                Interaction::Click => session.click(&handle).await,
                Interaction::Type => session.type_text(&handle, text.unwrap_or_default()).await,
                Interaction::Submit => session.submit(&handle).await,
                Interaction::Scroll => session.scroll().await,
            };
            match result {
                Ok(()) => {
                    return Ok(StepOk {
                        selector_used,
                        ..StepOk::default()
                    })
                }
                Err(err) if state.retry.should_retry(&err, state.attempts) && err.is_retryable() => {
                    let backoff = state.retry.calculate_backoff(state.attempts);
                    debug!(step_id = %step.id, error = %err, "interaction failed, retrying after {}ms", backoff.as_millis());
                    sleep(backoff).await;
                }
                Err(err) => {
                    let mut failed = driver_failure(err, step);
                    failed.selector_used = selector_used;
                    return Err(failed);
                }
            }
        }
    }

    async fn capture(
        &self,
        session: &mut dyn BrowserSession,
        step: &Step,
        run_id: &RunId,
    ) -> Result<std::path::PathBuf, String> {
        let png = session.screenshot().await.map_err(|err| {
            warn!(step_id = %step.id, error = %err, "screenshot capture failed");
            format!("screenshot unavailable: {err}")
        })?;
        self.artifacts
            .save_screenshot(run_id, &step.id, step.artifact_label(), &png)
            .await
            .map_err(|err| {
                warn!(step_id = %step.id, error = %err, "screenshot not saved");
                format!("screenshot not saved: {err}")
            })
    }

    /// Best-effort per-step screenshot; never changes the outcome.
    async fn capture_after(
        &self,
        session: &mut dyn BrowserSession,
        step: &Step,
        result: StepResult,
        state: &RunState<'_>,
    ) -> StepResult {
        let bound = state.settings.step_timeout;
        match timeout(bound, self.capture(session, step, state.run_id)).await {
            Ok(Ok(path)) => result.with_artifact(path),
            Ok(Err(note)) => result.with_note(note),
            Err(_) => result.with_note("screenshot timed out"),
        }
    }
}

/// Owns the open session and closes it on every exit path. If the
/// execute future is dropped before it reaches `close`, `Drop` hands the
/// session to a background task so the remote session is still deleted.
struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn session_mut(&mut self) -> Option<&mut (dyn BrowserSession + 'static)> {
        self.session.as_deref_mut()
    }

    async fn close(mut self, run_id: &RunId) {
        if let Some(session) = self.session.as_deref_mut() {
            if let Err(err) = session.close().await {
                warn!(run_id = %run_id, error = %err, "failed to close browser session");
            }
        }
        // Only disarm once close has completed; a drop mid-close retries in Drop.
        self.session = None;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let session_id = session.id().to_string();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(session = %session_id, "execution abandoned; closing browser session in background");
                handle.spawn(async move {
                    if let Err(err) = session.close().await {
                        warn!(session = %session_id, error = %err, "failed to close abandoned browser session");
                    }
                });
            }
            Err(_) => {
                warn!(session = %session_id, "no runtime available to close abandoned browser session");
            }
        }
    }
}

fn transition(phase: &mut SessionPhase, next: SessionPhase) {
    debug!(from = ?*phase, to = ?next, "executor phase");
    *phase = next;
}

fn skip_all(steps: &[Step], reason: StepError) -> Vec<StepResult> {
    steps
        .iter()
        .map(|step| StepResult::skipped(step, reason.clone()))
        .collect()
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn driver_failure(err: DriverError, step: &Step) -> StepFailed {
    if err.is_timeout() {
        StepFailed {
            error: StepError::Timeout {
                after_ms: 0,
                action: format!("{}: {err}", step.description),
            },
            selector_used: None,
        }
    } else {
        StepFailed::from(err)
    }
}

fn page_target(step: &Step, strategy: SelectorStrategy) -> Result<&str, StepFailed> {
    step.target
        .as_ref()
        .filter(|t| t.selector.strategy == strategy)
        .map(|t| t.selector.value.as_str())
        .ok_or_else(|| {
            StepFailed::message(format!(
                "{} step requires a {} target",
                step.kind.as_str(),
                strategy.as_str()
            ))
        })
}

fn element_target(step: &Step) -> Result<&Target, StepFailed> {
    step.target
        .as_ref()
        .filter(|t| t.selector.strategy.is_element())
        .ok_or_else(|| {
            StepFailed::message(format!("{} step requires an element target", step.kind.as_str()))
        })
}

/// Try every candidate selector; retry the round on transient errors or
/// when nothing matched.
async fn locate(
    session: &mut dyn BrowserSession,
    target: &Target,
    state: &mut RunState<'_>,
) -> Result<(ElementHandle, String), StepFailed> {
    loop {
        state.attempts += 1;
        let mut last_error = None;
        for candidate in target.candidates() {
            match session.find_element(candidate).await {
                Ok(handle) => return Ok((handle, candidate.describe())),
                Err(err) => {
                    debug!(selector = %candidate.describe(), error = %err, "selector did not resolve");
                    last_error = Some(err);
                }
            }
        }
        let err = last_error.unwrap_or_else(|| DriverError::NoSuchElement(target.selector.describe()));
        if !state.retry.should_retry(&err, state.attempts) {
            return Err(StepFailed {
                error: if err.is_timeout() {
                    StepError::Timeout {
                        after_ms: state.settings.implicit_wait.as_millis() as u64,
                        action: format!("locating {}", target.selector.describe()),
                    }
                } else {
                    StepError::Failed(format!("element not found ({err})"))
                },
                selector_used: None,
            });
        }
        sleep(state.retry.calculate_backoff(state.attempts)).await;
    }
}

async fn assert_step(
    session: &mut dyn BrowserSession,
    step: &Step,
    state: &mut RunState<'_>,
) -> Result<StepOk, StepFailed> {
    let target = step
        .target
        .as_ref()
        .ok_or_else(|| StepFailed::message("assert step requires a target"))?;
    let expected = target.selector.value.as_str();
    match target.selector.strategy {
        SelectorStrategy::Title => {
            state.attempts += 1;
            let title = session.title().await?;
            if title.to_lowercase().contains(&expected.to_lowercase()) {
                Ok(StepOk::default())
            } else {
                Err(StepFailed::message(format!(
                    "page title '{title}' does not contain '{expected}'"
                )))
            }
        }
        SelectorStrategy::Url => {
            state.attempts += 1;
            let url = session.current_url().await?;
            if url.contains(expected) {
                Ok(StepOk::default())
            } else {
                Err(StepFailed::message(format!(
                    "current url '{url}' does not contain '{expected}'"
                )))
            }
        }
        _ => {
            let (handle, selector_used) = locate(session, target, state).await?;
            let fail = |message: String| StepFailed {
                error: StepError::Failed(message),
                selector_used: Some(selector_used.clone()),
            };
            if !session.is_displayed(&handle).await? {
                return Err(fail(format!("{selector_used} is not displayed")));
            }
            if let Some(text) = &step.params.text {
                let actual = session.element_text(&handle).await?;
                if !actual.contains(text.as_str()) {
                    return Err(fail(format!("element text '{actual}' does not contain '{text}'")));
                }
            }
            Ok(StepOk {
                selector_used: Some(selector_used),
                ..StepOk::default()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBrowserDriver;
    use strategy_builder::{Selector, StepParams};
    use testpilot_core_types::{Platform, Priority, TestType};

    fn strategy(steps: Vec<Step>) -> Strategy {
        Strategy {
            platform: Platform::Unknown,
            test_type: TestType::Functional,
            priority: Priority::Medium,
            base_url: "https://example.org".into(),
            estimated_duration_ms: strategy_builder::estimate_duration_ms(&steps),
            steps,
            fast_mode: false,
        }
    }

    fn step(id: &str, kind: StepKind, target: Option<Target>) -> Step {
        Step {
            id: id.into(),
            kind,
            description: id.into(),
            target,
            params: StepParams::default(),
            depends_on: None,
            optional: false,
        }
    }

    #[test]
    fn title_assertion_is_case_insensitive() {
        let driver = Arc::new(MockBrowserDriver::new().with_title("Instagram"));
        let executor = AutomationExecutor::new(driver, ArtifactStore::new("unused"));
        let strategy = strategy(vec![
            step("step-01", StepKind::Navigate, Some(Target::url("https://www.instagram.com"))),
            step("step-02", StepKind::Assert, Some(Target::title("instagram"))),
            step("step-03", StepKind::Assert, Some(Target::url("instagram.com"))),
        ]);
        let trace = tokio_test::block_on(executor.execute(
            &RunId::new(),
            &strategy,
            &ExecutionSettings::default(),
            &CancellationToken::new(),
        ));
        assert!(trace.step_results.iter().all(StepResult::succeeded));
        assert_eq!(trace.final_phase, SessionPhase::SessionClosed);
    }

    #[test]
    fn fallback_selector_is_reported() {
        let driver = Arc::new(MockBrowserDriver::new().with_missing("#primary"));
        let executor = AutomationExecutor::new(driver, ArtifactStore::new("unused"));
        let target = Target::new(Selector::css("#primary"))
            .with_fallbacks(vec![Selector::new(SelectorStrategy::Name, "secondary")]);
        let strategy = strategy(vec![step("step-01", StepKind::LocateElement, Some(target))]);
        let settings = ExecutionSettings {
            locate_attempts: 1,
            ..ExecutionSettings::default()
        };
        let trace = tokio_test::block_on(executor.execute(
            &RunId::new(),
            &strategy,
            &settings,
            &CancellationToken::new(),
        ));
        let result = &trace.step_results[0];
        assert!(result.succeeded());
        assert!(result.element_found);
        assert_eq!(result.selector_used.as_deref(), Some("name: secondary"));
    }

    #[test]
    fn navigate_without_url_target_fails() {
        let driver = Arc::new(MockBrowserDriver::new());
        let executor = AutomationExecutor::new(driver, ArtifactStore::new("unused"));
        let strategy = strategy(vec![step("step-01", StepKind::Navigate, None)]);
        let trace = tokio_test::block_on(executor.execute(
            &RunId::new(),
            &strategy,
            &ExecutionSettings::default(),
            &CancellationToken::new(),
        ));
        assert!(matches!(
            trace.step_results[0].error,
            Some(StepError::Failed(_))
        ));
    }
}
