//! Job status reconciliation.
//!
//! Each [`Reconciler::tick`] queries SLURM for the tracked jobs, reports jobs
//! that reached a terminal state and keeps the rest. The caller waits
//! [`Reconciler::next_interval`] between ticks.
//!
//! sacct may briefly stop listing a job it has already reported, so one tick
//! retries the query up to `status_attempts` times while any job seen by an
//! earlier attempt of the same tick is missing from the latest snapshot.

use crate::interval::AdaptiveInterval;
use crate::limiter::RateLimiter;
use crate::types::{FinishedJob, JobReport, JobReporter, JobStatus, SubmittedJob, ToJobStatus};
use berth_slurm::{ConfigError, DEFAULT_QUERY_TIMEOUT, SlurmJobState, StatusSnapshot, StatusSource};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

/// Reconciliation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Wait after a tick in which some job finished
    pub initial_interval: Duration,
    /// Added to the wait after a tick in which nothing finished
    pub interval_increment: Duration,
    pub max_interval: Duration,
    /// Status queries per tick
    pub status_attempts: u32,
    pub query_timeout: Duration,
    /// Consecutive UNKNOWN reports before a job counts as completed
    pub unknown_confirmations: u32,
    pub keep_successful_logs: bool,
    /// Minimum time between scheduler calls
    pub min_query_spacing: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(40),
            interval_increment: Duration::from_secs(10),
            max_interval: Duration::from_secs(180),
            status_attempts: 5,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            unknown_confirmations: 1,
            keep_successful_logs: false,
            min_query_spacing: Duration::ZERO,
        }
    }
}

impl ReconcileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.status_attempts < 1 {
            return Err(ConfigError::InvalidStatusAttempts(self.status_attempts));
        }
        Ok(())
    }
}

/// Result of one reconciliation cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickOutcome {
    /// Jobs reported and released this tick
    pub finished: Vec<FinishedJob>,
    /// Jobs still tracked
    pub pending: Vec<SubmittedJob>,
    /// Ids seen by an earlier query but absent from the last snapshot
    pub missing: BTreeSet<String>,
    pub attempts_made: u32,
}

/// Tracks submitted jobs until each reaches a terminal state.
#[derive(Debug)]
pub struct Reconciler {
    config: ReconcileConfig,
    active: Vec<SubmittedJob>,
    interval: AdaptiveInterval,
    limiter: RateLimiter,
    unknown_counts: HashMap<String, u32>,
    preemption_warned: bool,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        let interval = AdaptiveInterval::new(
            config.initial_interval,
            config.interval_increment,
            config.max_interval,
        );
        let limiter = RateLimiter::new(config.min_query_spacing);
        Self {
            config,
            active: Vec::new(),
            interval,
            limiter,
            unknown_counts: HashMap::new(),
            preemption_warned: false,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Start tracking a job. Already tracked ids are ignored.
    pub fn track(&mut self, job: SubmittedJob) {
        if self.active.iter().any(|j| j.external_id == job.external_id) {
            tracing::debug!("job {} is already tracked", job.external_id);
            return;
        }
        self.active.push(job);
    }

    pub fn active_jobs(&self) -> &[SubmittedJob] {
        &self.active
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.active.iter().map(|j| j.external_id.clone()).collect()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    /// How long to wait before the next tick.
    pub fn next_interval(&self) -> Duration {
        self.interval.current()
    }

    /// Limiter shared by all scheduler calls of this run.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn preemption_warned(&self) -> bool {
        self.preemption_warned
    }

    /// Run one reconciliation cycle.
    pub async fn tick<S, R>(&mut self, source: &S, reporter: &mut R) -> TickOutcome
    where
        S: StatusSource,
        R: JobReporter,
    {
        if self.active.is_empty() {
            self.interval.reset();
            return TickOutcome::default();
        }

        tracing::debug!(
            "Checking the status of {} active jobs with {} attempts",
            self.active.len(),
            self.config.status_attempts
        );
        let (snapshot, missing, attempts_made) = self.query_snapshot(source).await;

        if !missing.is_empty() {
            tracing::warn!(
                "Unable to get the status of all active jobs, even after {} attempts. \
                 These jobs were seen before but are no longer reported: {}. \
                 Please check with your cluster administrator that slurmdbd job \
                 accounting is set up properly.",
                attempts_made,
                missing.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }

        let finished = match snapshot {
            Some(snapshot) => self.apply_snapshot(&snapshot, reporter),
            None => {
                tracing::warn!(
                    "Could not query the status of {} active jobs",
                    self.active.len()
                );
                Vec::new()
            }
        };

        if finished.is_empty() {
            self.interval.grow();
        } else {
            self.interval.reset();
        }

        TickOutcome {
            finished,
            pending: self.active.clone(),
            missing,
            attempts_made,
        }
    }

    /// Query until every previously seen job is present in the latest
    /// snapshot, or attempts run out. Returns the last good snapshot.
    async fn query_snapshot<S: StatusSource>(
        &self,
        source: &S,
    ) -> (Option<StatusSnapshot>, BTreeSet<String>, u32) {
        let active: HashSet<&str> = self.active.iter().map(|j| j.external_id.as_str()).collect();
        let mut ever_seen: HashSet<String> = HashSet::new();
        let mut missing = BTreeSet::new();
        let mut snapshot = None;
        let mut attempts_made = 0;

        for attempt in 1..=self.config.status_attempts {
            attempts_made = attempt;
            let current = match self.limiter.run(source.query()).await {
                Ok(current) => current,
                Err(e) => {
                    tracing::debug!("status attempt {} failed: {}", attempt, e);
                    continue;
                }
            };

            let seen: HashSet<String> = current
                .keys()
                .filter(|id| active.contains(id.as_str()))
                .cloned()
                .collect();
            ever_seen.extend(seen.iter().cloned());
            missing = ever_seen.difference(&seen).cloned().collect();
            tracing::debug!(
                "attempt {}: {} of {} active jobs reported, {} missing",
                attempt,
                seen.len(),
                active.len(),
                missing.len()
            );

            snapshot = Some(current);
            if missing.is_empty() {
                break;
            }
        }

        (snapshot, missing, attempts_made)
    }

    /// Classify every tracked job against one snapshot. Terminal jobs are
    /// reported and released; applying the same snapshot again reports
    /// nothing new.
    pub fn apply_snapshot<R: JobReporter>(
        &mut self,
        snapshot: &StatusSnapshot,
        reporter: &mut R,
    ) -> Vec<FinishedJob> {
        let mut finished = Vec::new();
        let mut pending = Vec::with_capacity(self.active.len());

        for job in std::mem::take(&mut self.active) {
            // not yet in the accounting database, expected to show up later
            let Some(token) = snapshot.get(&job.external_id) else {
                pending.push(job);
                continue;
            };

            match SlurmJobState::from_token(token).to_job_status() {
                JobStatus::Completed => {
                    let remove_log = !self.config.keep_successful_logs;
                    finished.push(self.succeed(job, reporter, remove_log));
                }
                JobStatus::Failed => {
                    let message = failure_message(&job, token);
                    reporter.report_failure(&job, &message);
                    self.release(&job);
                    finished.push(FinishedJob {
                        job,
                        report: JobReport::Failed { message },
                    });
                }
                JobStatus::Unknown => {
                    let count = self
                        .unknown_counts
                        .entry(job.external_id.clone())
                        .or_default();
                    *count += 1;
                    if *count >= self.config.unknown_confirmations.max(1) {
                        // the job is gone and the scheduler lost track of it;
                        // a guess, so its log stays
                        finished.push(self.succeed(job, reporter, false));
                    } else {
                        tracing::debug!(
                            "job {} reported UNKNOWN ({} of {})",
                            job.external_id,
                            count,
                            self.config.unknown_confirmations
                        );
                        pending.push(job);
                    }
                }
                JobStatus::Preempted => {
                    if !self.preemption_warned {
                        self.preemption_warned = true;
                        tracing::warn!(
                            "A job preemption occurred (job {}). Leave the workflow running \
                             if possible, SLURM resumes preempted jobs; otherwise the job \
                             has to be restarted with the workflow.",
                            job.external_id
                        );
                    }
                    self.unknown_counts.remove(&job.external_id);
                    pending.push(job);
                }
                JobStatus::Pending | JobStatus::Running => {
                    self.unknown_counts.remove(&job.external_id);
                    pending.push(job);
                }
            }
        }

        self.active = pending;
        finished
    }

    fn succeed<R: JobReporter>(
        &mut self,
        job: SubmittedJob,
        reporter: &mut R,
        remove_log_file: bool,
    ) -> FinishedJob {
        reporter.report_success(&job);
        self.release(&job);
        if remove_log_file {
            remove_log(&job);
        }
        FinishedJob {
            job,
            report: JobReport::Succeeded,
        }
    }

    fn release(&mut self, job: &SubmittedJob) {
        self.unknown_counts.remove(&job.external_id);
    }
}

fn failure_message(job: &SubmittedJob, token: &str) -> String {
    let mut message = format!("job '{}' failed, status is: '{}'.", job.external_id, token);
    if let Some(log) = &job.log_path {
        message.push_str(&format!(" Log file: {log}"));
    }
    message
}

fn remove_log(job: &SubmittedJob) {
    let Some(log) = &job.log_path else {
        return;
    };
    if !log.exists() {
        return;
    }
    tracing::debug!("removing log of successful job {}: {}", job.external_id, log);
    if let Err(e) = std::fs::remove_file(log) {
        tracing::warn!("Could not remove log file {}: {}", log, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_slurm::StatusQueryError;
    use camino::Utf8PathBuf;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;

    /// Replays scripted query results; the last one repeats.
    struct ScriptedSource {
        script: Mutex<VecDeque<Option<StatusSnapshot>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<StatusSnapshot>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl StatusSource for ScriptedSource {
        fn query(&self) -> impl Future<Output = Result<StatusSnapshot, StatusQueryError>> + Send {
            *self.calls.lock().unwrap() += 1;
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.pop_front().flatten()
            } else {
                script.front().cloned().flatten()
            };
            async move { next.ok_or_else(|| StatusQueryError::DatabaseUnavailable("down".into())) }
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        successes: Vec<String>,
        failures: Vec<(String, String)>,
    }

    impl JobReporter for RecordingReporter {
        fn report_success(&mut self, job: &SubmittedJob) {
            self.successes.push(job.external_id.clone());
        }

        fn report_failure(&mut self, job: &SubmittedJob, message: &str) {
            self.failures
                .push((job.external_id.clone(), message.to_string()));
        }
    }

    fn snapshot(entries: &[(&str, &str)]) -> StatusSnapshot {
        entries
            .iter()
            .map(|(id, state)| (id.to_string(), state.to_string()))
            .collect()
    }

    fn reconciler_with(ids: &[&str], config: ReconcileConfig) -> Reconciler {
        let mut reconciler = Reconciler::new(config);
        for id in ids {
            reconciler.track(SubmittedJob::new(*id, format!("job_{id}")));
        }
        reconciler
    }

    fn reconciler(ids: &[&str]) -> Reconciler {
        reconciler_with(ids, ReconcileConfig::default())
    }

    fn pending_ids(outcome: &TickOutcome) -> Vec<&str> {
        outcome
            .pending
            .iter()
            .map(|j| j.external_id.as_str())
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = ReconcileConfig::default();
        assert_eq!(config.initial_interval, Duration::from_secs(40));
        assert_eq!(config.max_interval, Duration::from_secs(180));
        assert_eq!(config.status_attempts, 5);
        assert_eq!(config.unknown_confirmations, 1);
        assert!(config.validate().is_ok());

        let config = ReconcileConfig {
            status_attempts: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidStatusAttempts(0))
        );
    }

    #[tokio::test]
    async fn test_empty_set_skips_query() {
        let mut reconciler = reconciler(&[]);
        let source = ScriptedSource::new(vec![None]);
        let mut reporter = RecordingReporter::default();

        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert_eq!(outcome.attempts_made, 0);
        assert!(outcome.finished.is_empty());
        assert_eq!(source.calls(), 0);
        assert_eq!(reconciler.next_interval(), Duration::from_secs(40));
    }

    #[tokio::test]
    async fn test_classification() {
        let mut reconciler = reconciler(&["1", "2", "3", "4", "5"]);
        let source = ScriptedSource::new(vec![Some(snapshot(&[
            ("1", "COMPLETED"),
            ("2", "TIMEOUT"),
            ("3", "RUNNING"),
            ("4", "PENDING"),
            ("5", "UNKNOWN"),
            ("999", "COMPLETED"),
        ]))]);
        let mut reporter = RecordingReporter::default();

        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert_eq!(outcome.attempts_made, 1);
        assert_eq!(reporter.successes, vec!["1", "5"]);
        assert_eq!(reporter.failures.len(), 1);
        assert_eq!(reporter.failures[0].0, "2");
        assert_eq!(
            reporter.failures[0].1,
            "job '2' failed, status is: 'TIMEOUT'."
        );
        assert_eq!(pending_ids(&outcome), vec!["3", "4"]);
        assert_eq!(outcome.finished.len(), 3);
        assert_eq!(reconciler.active_ids(), vec!["3", "4"]);
        assert_eq!(reconciler.next_interval(), Duration::from_secs(40));
    }

    #[tokio::test]
    async fn test_failure_message_includes_log() {
        let mut reconciler = Reconciler::new(ReconcileConfig::default());
        reconciler
            .track(SubmittedJob::new("7", "job_7").with_log_path("logs/slurm-7.log".into()));
        let source = ScriptedSource::new(vec![Some(snapshot(&[("7", "OUT_OF_MEMORY")]))]);
        let mut reporter = RecordingReporter::default();

        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert_eq!(
            outcome.finished[0].report,
            JobReport::Failed {
                message: "job '7' failed, status is: 'OUT_OF_MEMORY'. Log file: logs/slurm-7.log"
                    .to_string()
            }
        );
    }

    #[test]
    fn test_same_snapshot_is_idempotent() {
        let mut reconciler = reconciler(&["1", "2", "3"]);
        let snap = snapshot(&[("1", "COMPLETED"), ("2", "FAILED"), ("3", "RUNNING")]);
        let mut reporter = RecordingReporter::default();

        let first = reconciler.apply_snapshot(&snap, &mut reporter);
        assert_eq!(first.len(), 2);
        let active_after_first = reconciler.active_ids();

        let second = reconciler.apply_snapshot(&snap, &mut reporter);
        assert!(second.is_empty());
        assert_eq!(reconciler.active_ids(), active_after_first);
        assert_eq!(reporter.successes, vec!["1"]);
        assert_eq!(reporter.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_job_absent_from_early_snapshots() {
        let mut reconciler = reconciler(&["1", "2"]);
        let source = ScriptedSource::new(vec![
            Some(snapshot(&[("2", "RUNNING")])),
            Some(snapshot(&[("2", "RUNNING")])),
            Some(snapshot(&[("1", "COMPLETED"), ("2", "RUNNING")])),
        ]);
        let mut reporter = RecordingReporter::default();

        for _ in 0..2 {
            let outcome = reconciler.tick(&source, &mut reporter).await;
            assert!(outcome.missing.is_empty());
            assert!(outcome.finished.is_empty());
            assert_eq!(pending_ids(&outcome), vec!["1", "2"]);
        }

        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert!(outcome.missing.is_empty());
        assert_eq!(reporter.successes, vec!["1"]);
        assert_eq!(pending_ids(&outcome), vec!["2"]);
    }

    #[tokio::test]
    async fn test_coverage_gap_recovered_within_tick() {
        let mut reconciler = reconciler(&["1", "2"]);
        let source = ScriptedSource::new(vec![
            None,
            None,
            Some(snapshot(&[("1", "COMPLETED"), ("2", "RUNNING")])),
        ]);
        let mut reporter = RecordingReporter::default();

        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert_eq!(outcome.attempts_made, 3);
        assert_eq!(source.calls(), 3);
        assert!(outcome.missing.is_empty());
        assert_eq!(reporter.successes, vec!["1"]);
        assert_eq!(pending_ids(&outcome), vec!["2"]);
        assert_eq!(reconciler.next_interval(), Duration::from_secs(40));
    }

    #[tokio::test]
    async fn test_coverage_gap_across_ticks() {
        let mut reconciler = reconciler(&["1", "2"]);
        let source = ScriptedSource::new(vec![
            Some(snapshot(&[("1", "RUNNING"), ("2", "RUNNING")])),
            Some(snapshot(&[("2", "RUNNING")])),
            Some(snapshot(&[("1", "COMPLETED"), ("2", "RUNNING")])),
        ]);
        let mut reporter = RecordingReporter::default();

        for _ in 0..2 {
            let outcome = reconciler.tick(&source, &mut reporter).await;
            assert_eq!(outcome.attempts_made, 1);
            assert!(outcome.missing.is_empty());
            assert_eq!(pending_ids(&outcome), vec!["1", "2"]);
        }

        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert_eq!(outcome.attempts_made, 1);
        assert!(outcome.missing.is_empty());
        assert_eq!(reporter.successes, vec!["1"]);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_dropped_job_does_not_exhaust_attempts() {
        let mut reconciler = reconciler(&["1", "2"]);
        let source = ScriptedSource::new(vec![
            Some(snapshot(&[("1", "RUNNING"), ("2", "RUNNING")])),
            Some(snapshot(&[("2", "RUNNING")])),
        ]);
        let mut reporter = RecordingReporter::default();

        for _ in 0..4 {
            let outcome = reconciler.tick(&source, &mut reporter).await;
            assert_eq!(outcome.attempts_made, 1);
            assert!(outcome.missing.is_empty());
            assert_eq!(pending_ids(&outcome), vec!["1", "2"]);
        }
        assert_eq!(source.calls(), 4);
        assert!(reporter.successes.is_empty());
    }

    #[tokio::test]
    async fn test_failed_queries_keep_jobs() {
        let mut reconciler = reconciler(&["1"]);
        let source = ScriptedSource::new(vec![None]);
        let mut reporter = RecordingReporter::default();

        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert_eq!(outcome.attempts_made, 5);
        assert_eq!(source.calls(), 5);
        assert_eq!(pending_ids(&outcome), vec!["1"]);
        assert_eq!(reconciler.next_interval(), Duration::from_secs(50));
    }

    #[tokio::test]
    async fn test_interval_adapts() {
        let mut reconciler = reconciler(&["1", "2"]);
        let running = snapshot(&[("1", "RUNNING"), ("2", "RUNNING")]);
        let mut script = vec![Some(running); 15];
        script.push(Some(snapshot(&[("1", "COMPLETED"), ("2", "RUNNING")])));
        let source = ScriptedSource::new(script);
        let mut reporter = RecordingReporter::default();

        let mut waits = Vec::new();
        for _ in 0..16 {
            reconciler.tick(&source, &mut reporter).await;
            waits.push(reconciler.next_interval().as_secs());
        }
        assert_eq!(&waits[..3], &[50, 60, 70]);
        assert_eq!(waits[13], 180);
        assert_eq!(waits[14], 180);
        assert_eq!(waits[15], 40);
    }

    #[tokio::test]
    async fn test_preemption_warns_once() {
        let mut reconciler = reconciler(&["1", "2"]);
        let source = ScriptedSource::new(vec![Some(snapshot(&[
            ("1", "PREEMPTED"),
            ("2", "PREEMPTED"),
        ]))]);
        let mut reporter = RecordingReporter::default();

        assert!(!reconciler.preemption_warned());
        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert!(reconciler.preemption_warned());
        assert_eq!(pending_ids(&outcome), vec!["1", "2"]);
        assert!(reporter.successes.is_empty() && reporter.failures.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_confirmations() {
        let config = ReconcileConfig {
            unknown_confirmations: 2,
            ..Default::default()
        };
        let mut reconciler = reconciler_with(&["1", "2"], config);
        let source = ScriptedSource::new(vec![
            Some(snapshot(&[("1", "UNKNOWN"), ("2", "UNKNOWN")])),
            Some(snapshot(&[("1", "UNKNOWN"), ("2", "RUNNING")])),
            Some(snapshot(&[("1", "UNKNOWN"), ("2", "UNKNOWN")])),
        ]);
        let mut reporter = RecordingReporter::default();

        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert!(outcome.finished.is_empty());

        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert_eq!(reporter.successes, vec!["1"]);
        assert_eq!(pending_ids(&outcome), vec!["2"]);

        // the RUNNING report reset job 2's count
        let outcome = reconciler.tick(&source, &mut reporter).await;
        assert!(outcome.finished.is_empty());
    }

    #[test]
    fn test_track_ignores_duplicates() {
        let mut reconciler = reconciler(&["1"]);
        reconciler.track(SubmittedJob::new("1", "again"));
        assert_eq!(reconciler.active_jobs().len(), 1);
        assert_eq!(reconciler.active_jobs()[0].logical_id, "job_1");
    }

    #[test]
    fn test_successful_logs_removed() {
        let dir = tempfile::tempdir().unwrap();
        let log = |name: &str| {
            let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
            std::fs::write(&path, "log").unwrap();
            path
        };
        let ok_log = log("ok.log");
        let failed_log = log("failed.log");

        let mut reconciler = Reconciler::new(ReconcileConfig::default());
        reconciler.track(SubmittedJob::new("1", "a").with_log_path(ok_log.clone()));
        reconciler.track(SubmittedJob::new("2", "b").with_log_path(failed_log.clone()));
        let mut reporter = RecordingReporter::default();
        reconciler.apply_snapshot(
            &snapshot(&[("1", "COMPLETED"), ("2", "FAILED")]),
            &mut reporter,
        );

        assert!(!ok_log.exists());
        assert!(failed_log.exists());
    }

    #[test]
    fn test_successful_logs_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("ok.log")).unwrap();
        std::fs::write(&path, "log").unwrap();

        let config = ReconcileConfig {
            keep_successful_logs: true,
            ..Default::default()
        };
        let mut reconciler = Reconciler::new(config);
        reconciler.track(SubmittedJob::new("1", "a").with_log_path(path.clone()));
        let mut reporter = RecordingReporter::default();
        reconciler.apply_snapshot(&snapshot(&[("1", "COMPLETED")]), &mut reporter);

        assert!(path.exists());
        assert_eq!(reporter.successes, vec!["1"]);
    }

    #[test]
    fn test_unknown_jobs_keep_logs() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("lost.log")).unwrap();
        std::fs::write(&path, "log").unwrap();

        let mut reconciler = Reconciler::new(ReconcileConfig::default());
        reconciler.track(SubmittedJob::new("1", "a").with_log_path(path.clone()));
        let mut reporter = RecordingReporter::default();
        let finished = reconciler.apply_snapshot(&snapshot(&[("1", "UNKNOWN")]), &mut reporter);

        assert_eq!(finished[0].report, JobReport::Succeeded);
        assert_eq!(reporter.successes, vec!["1"]);
        assert!(path.exists());
    }
}
